use crate::location::LineSet;
use crate::rules::PreservationRules;
use crate::strip::{rewrite, rewrite_lines};
use crate::types::{Removal, RemovalKind};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What to do with a stripped file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Keep the stripped text in the outcome for the caller to print.
    Print,
    /// Only report what would change.
    Check,
    /// Rewrite changed files in place.
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Changed,
    Unchanged,
    /// Left alone on purpose (e.g. unterminated string literal).
    Skipped(String),
    /// Could not be read or written.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: Status,
    pub removals: Vec<Removal>,
    /// Stripped text, only kept in [`Mode::Print`].
    pub output: Option<String>,
}

impl FileOutcome {
    fn new(path: &Path, status: Status) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            removals: Vec::new(),
            output: None,
        }
    }

    pub fn count(&self, kind: RemovalKind) -> usize {
        self.removals.iter().filter(|r| r.kind == kind).count()
    }

    pub fn is_changed(&self) -> bool {
        self.status == Status::Changed
    }
}

/// Strip every file in parallel.  With `lines`, only comments and
/// docstrings touching those lines are removed.  Per-file problems become
/// [`Status::Failed`] outcomes; results keep the order of `files`.
pub fn process_files(
    files: &[PathBuf],
    rules: &PreservationRules,
    mode: Mode,
    lines: Option<&LineSet>,
) -> Vec<FileOutcome> {
    files
        .par_iter()
        .map(|path| {
            process_file(path, rules, mode, lines).unwrap_or_else(|e| {
                warn!(path = %path.display(), "{e:#}");
                FileOutcome::new(path, Status::Failed(format!("{e:#}")))
            })
        })
        .collect()
}

fn process_file(
    path: &Path,
    rules: &PreservationRules,
    mode: Mode,
    lines: Option<&LineSet>,
) -> Result<FileOutcome> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let label = path.to_string_lossy();
    let result = match lines {
        Some(lines) => rewrite_lines(&source, &label, rules, lines),
        None => rewrite(&source, &label, rules),
    };

    if result.malformed {
        debug!(path = %path.display(), "skipped: unterminated string literal");
        let mut outcome = FileOutcome::new(
            path,
            Status::Skipped("unterminated string literal".to_string()),
        );
        if mode == Mode::Print {
            outcome.output = Some(source);
        }
        return Ok(outcome);
    }

    let changed = result.text != source;
    if changed && mode == Mode::Write {
        fs::write(path, &result.text)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    debug!(
        path = %path.display(),
        comments = result.count(RemovalKind::Comment),
        docstrings = result.count(RemovalKind::Docstring),
        "{}",
        if changed { "changed" } else { "unchanged" }
    );

    Ok(FileOutcome {
        path: path.to_path_buf(),
        status: if changed {
            Status::Changed
        } else {
            Status::Unchanged
        },
        removals: result.removals,
        output: (mode == Mode::Print).then_some(result.text),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_write_mode_rewrites_changed_files() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", "x = 1  # note\n");
        let b = write(&dir, "b.py", "y = 2\n");

        let rules = PreservationRules::default();
        let out = process_files(&[a.clone(), b.clone()], &rules, Mode::Write, None);
        assert_eq!(out[0].status, Status::Changed);
        assert_eq!(out[0].count(RemovalKind::Comment), 1);
        assert_eq!(out[1].status, Status::Unchanged);
        assert_eq!(fs::read_to_string(&a).unwrap(), "x = 1\n");
        assert_eq!(fs::read_to_string(&b).unwrap(), "y = 2\n");
    }

    #[test]
    fn test_check_mode_leaves_files_alone() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", "def f():\n    '''doc'''\n    return 1\n");

        let out = process_files(&[a.clone()], &PreservationRules::default(), Mode::Check, None);
        assert!(out[0].is_changed());
        assert_eq!(out[0].count(RemovalKind::Docstring), 1);
        assert!(out[0].output.is_none());
        assert!(fs::read_to_string(&a).unwrap().contains("'''doc'''"));
    }

    #[test]
    fn test_print_mode_returns_text() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", "# header\nx = 1\n");

        let out = process_files(&[a], &PreservationRules::default(), Mode::Print, None);
        assert_eq!(out[0].output.as_deref(), Some("x = 1\n"));
    }

    #[test]
    fn test_unterminated_literal_is_skipped() {
        let dir = TempDir::new().unwrap();
        let src = "# c\ns = '''open\n";
        let a = write(&dir, "a.py", src);

        let out = process_files(&[a.clone()], &PreservationRules::default(), Mode::Write, None);
        assert!(matches!(out[0].status, Status::Skipped(_)));
        assert_eq!(fs::read_to_string(&a).unwrap(), src);
    }

    #[test]
    fn test_unreadable_files_fail_individually() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("latin1.py");
        fs::write(&bad, b"s = '\xe9'\n").unwrap();
        let missing = dir.path().join("missing.py");
        let good = write(&dir, "good.py", "x = 1\n");

        let out = process_files(
            &[bad, missing, good],
            &PreservationRules::default(),
            Mode::Check,
            None,
        );
        assert!(matches!(out[0].status, Status::Failed(_)));
        assert!(matches!(out[1].status, Status::Failed(_)));
        assert_eq!(out[2].status, Status::Unchanged);
    }

    #[test]
    fn test_selected_lines_limit_removals() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.py", "x = 1  # keep\ny = 2  # drop\n");
        let lines: LineSet = "2".parse().unwrap();

        let rules = PreservationRules::default();
        let out = process_files(&[a.clone()], &rules, Mode::Write, Some(&lines));
        assert_eq!(out[0].status, Status::Changed);
        assert_eq!(out[0].removals.len(), 1);
        assert_eq!(fs::read_to_string(&a).unwrap(), "x = 1  # keep\ny = 2\n");
    }
}
