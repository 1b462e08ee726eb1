//! Collect Python sources under a directory.
//!
//! The walker honours `.gitignore` / `.ignore` files (no git repository
//! required), skips hidden entries, and never descends into the environment,
//! cache, and build directories in [`ALWAYS_EXCLUDE`].  Callers add their
//! own directory names through the `exclude` argument of
//! [`discover_python_files`].

use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

/// Extensions treated as Python source: modules, stubs, Cython.
pub const PYTHON_EXTENSIONS: &[&str] = &["py", "pyi", "pyx"];

/// Directory names skipped regardless of ignore files or `--exclude`.
const ALWAYS_EXCLUDE: &[&str] = &[
    // virtual environments
    "venv",
    "env",
    ".venv",
    ".env",
    "virtualenv",
    // caches
    "__pycache__",
    ".mypy_cache",
    ".ruff_cache",
    ".pytest_cache",
    ".hypothesis",
    // build output
    "build",
    "dist",
    ".eggs",
    "site-packages",
    // version control
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    ".tox",
    ".nox",
];

pub fn is_python_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PYTHON_EXTENSIONS.contains(&e))
}

/// Walk `root` and return every Python source not excluded.  A path is
/// excluded when one of its components is in [`ALWAYS_EXCLUDE`], or equals or
/// contains one of the `exclude` names.
///
/// Order is unspecified.
pub fn discover_python_files(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if !is_python_source(path) {
            continue;
        }
        let excluded = path.strip_prefix(root).unwrap_or(path).components().any(|c| {
            let Component::Normal(name) = c else {
                return false;
            };
            let name = name.to_string_lossy();
            ALWAYS_EXCLUDE.contains(&name.as_ref())
                || exclude.iter().any(|pat| name.contains(pat.as_str()))
        });
        if !excluded {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
