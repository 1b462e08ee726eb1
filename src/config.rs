//! Settings read from JSON files.
//!
//! Two layers are read: a global file in the user's home directory
//! (`~/.config/scour/config.json`) and a project file, `.scour.json` in the
//! working directory.  Both have the same shape:
//!
//! ```json
//! {
//!   "preserveDirectives": true,
//!   "tools": ["noqa", "pylint:"],
//!   "ignorePatterns": ["^# keep"],
//!   "fileIgnorePatterns": ["generated/"]
//! }
//! ```
//!
//! Every key is optional.  Pattern lists add up across layers (global first);
//! for the other keys the project file wins.  Command-line flags are merged
//! on top by the binary.

use dirs::home_dir;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::rules::{DEFAULT_TOOLS, Matcher, PreservationRule, PreservationRules};

/// Settings file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".scour.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write config file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize settings")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Location of the global settings file, if a home directory is known.
pub fn global_config_path() -> Option<PathBuf> {
    home_dir().map(|dir| dir.join(".config").join("scour").join("config.json"))
}

/// Which list a persisted pattern goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `ignorePatterns`: comments to keep.
    Comment,
    /// `fileIgnorePatterns`: paths to skip.
    File,
}

/// One settings file as written on disk.  Keys that are absent stay absent
/// when the file is saved again.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_directives: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_ignore_patterns: Vec<String>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`SettingsFile::load`], but a missing file is an empty layer.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the file as indented JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        content.push('\n');
        std::fs::write(path, content).map_err(write_err)
    }

    /// Append `pattern` to the list for `kind` after checking that it
    /// compiles.  Returns `false` when it was already there.
    pub fn add_pattern(&mut self, kind: PatternKind, pattern: &str) -> Result<bool, ConfigError> {
        compile(pattern)?;
        let list = match kind {
            PatternKind::Comment => &mut self.ignore_patterns,
            PatternKind::File => &mut self.file_ignore_patterns,
        };
        if list.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        list.push(pattern.to_string());
        Ok(true)
    }
}

/// Add `pattern` to the settings file at `path` and save it.  A missing file
/// is created.  Returns `false` when the pattern was already present.
pub fn persist_pattern(path: &Path, kind: PatternKind, pattern: &str) -> Result<bool, ConfigError> {
    let mut file = SettingsFile::load_or_default(path)?;
    let added = file.add_pattern(kind, pattern)?;
    if added {
        file.save(path)?;
    }
    Ok(added)
}

/// Effective settings after layering.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Keep the built-in rules (shebang, encoding, type comments, tools).
    pub preserve_directives: bool,

    /// Tool directive markers kept when `preserve_directives` is on.
    pub tools: Vec<String>,

    /// Extra regexes; a comment matching any of them is kept.
    pub ignore_patterns: Vec<String>,

    /// Regexes over file paths; matching files are not touched.
    pub file_ignore_patterns: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preserve_directives: true,
            tools: DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect(),
            ignore_patterns: Vec::new(),
            file_ignore_patterns: Vec::new(),
        }
    }
}

impl Settings {
    /// Apply `layers` in order on top of the defaults.
    pub fn layered(layers: impl IntoIterator<Item = SettingsFile>) -> Self {
        let mut settings = Self::default();
        for layer in layers {
            if let Some(preserve) = layer.preserve_directives {
                settings.preserve_directives = preserve;
            }
            if let Some(tools) = layer.tools {
                settings.tools = tools;
            }
            settings.ignore_patterns.extend(layer.ignore_patterns);
            settings.file_ignore_patterns.extend(layer.file_ignore_patterns);
        }
        settings
    }

    /// Global settings (when `global` is given and exists) overlaid with the
    /// project file at `local`.  An explicit local file must exist.
    pub fn load(global: Option<&Path>, local: &Path, explicit: bool) -> Result<Self, ConfigError> {
        let global = match global {
            Some(path) => SettingsFile::load_or_default(path)?,
            None => SettingsFile::default(),
        };
        let local = if explicit {
            SettingsFile::load(local)?
        } else {
            SettingsFile::load_or_default(local)?
        };
        Ok(Self::layered([global, local]))
    }

    /// Preservation rules for the stripper: the built-ins (unless disabled)
    /// followed by one rule per ignore pattern.
    pub fn rules(&self) -> Result<PreservationRules, ConfigError> {
        let mut rules = if self.preserve_directives {
            PreservationRules::builtin(self.tools.as_slice())
        } else {
            PreservationRules::none()
        };
        for pattern in &self.ignore_patterns {
            rules.push(PreservationRule::new(
                Matcher::Pattern(compile(pattern)?),
                format!("ignore pattern `{pattern}`"),
            ));
        }
        Ok(rules)
    }

    pub fn file_filter(&self) -> Result<FileFilter, ConfigError> {
        let patterns = self
            .file_ignore_patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<_, _>>()?;
        Ok(FileFilter { patterns })
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Path regexes from `fileIgnorePatterns`.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    patterns: Vec<Regex>,
}

impl FileFilter {
    /// Paths are matched with `/` separators on every platform.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let text = path.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|re| re.is_match(&text))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Span, SpanKind};
    use std::fs;
    use tempfile::TempDir;

    fn comment(text: &str) -> Span<'_> {
        Span {
            kind: SpanKind::Comment,
            start: 4,
            end: 4 + text.len(),
            text,
        }
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let f: SettingsFile = serde_json::from_str("{}").unwrap();
        assert_eq!(f, SettingsFile::default());
        let s = Settings::layered([f]);
        assert_eq!(s, Settings::default());
        assert!(s.preserve_directives);
        assert!(s.tools.iter().any(|t| t == "noqa"));
    }

    #[test]
    fn test_camel_case_keys() {
        let f: SettingsFile = serde_json::from_str(
            r#"{"preserveDirectives": false, "ignorePatterns": ["^# keep"], "fileIgnorePatterns": ["_pb2\\.py$"]}"#,
        )
        .unwrap();
        assert_eq!(f.preserve_directives, Some(false));
        assert_eq!(f.tools, None);
        let s = Settings::layered([f]);
        assert!(!s.preserve_directives);
        assert_eq!(s.ignore_patterns, ["^# keep"]);
        assert_eq!(s.file_ignore_patterns, ["_pb2\\.py$"]);
    }

    #[test]
    fn test_rules_from_settings() {
        let s = Settings {
            preserve_directives: false,
            ignore_patterns: vec!["^# keep".to_string()],
            ..Settings::default()
        };
        let rules = s.rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.preserves(&comment("# keep me"), 1));
        assert!(!rules.preserves(&comment("# noqa"), 1));
    }

    #[test]
    fn test_custom_tool_list() {
        let s = Settings {
            tools: vec!["nosec".to_string()],
            ..Settings::default()
        };
        let rules = s.rules().unwrap();
        assert!(rules.preserves(&comment("# nosec"), 1));
        assert!(!rules.preserves(&comment("# pylint: disable=all"), 1));
        assert!(rules.preserves(&comment("# type: int"), 1));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let s = Settings {
            ignore_patterns: vec!["(unclosed".to_string()],
            ..Settings::default()
        };
        let err = s.rules().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
        assert_eq!(err.to_string(), "invalid pattern `(unclosed`");
    }

    #[test]
    fn test_load_project_file() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(
            Settings::load(None, &local, false).unwrap(),
            Settings::default()
        );

        fs::write(&local, r#"{"tools": ["noqa"]}"#).unwrap();
        let s = Settings::load(None, &local, false).unwrap();
        assert_eq!(s.tools, ["noqa"]);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("strip.json");
        assert!(matches!(
            Settings::load(None, &missing, true),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_global_and_project_layers() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("home/config.json");
        let local = dir.path().join(CONFIG_FILE_NAME);
        fs::create_dir_all(dir.path().join("home")).unwrap();
        fs::write(
            &global,
            r#"{"preserveDirectives": false, "tools": ["nosec"], "ignorePatterns": ["^# g"], "fileIgnorePatterns": ["vendor/"]}"#,
        )
        .unwrap();
        fs::write(&local, r#"{"tools": ["noqa"], "ignorePatterns": ["^# l"]}"#).unwrap();

        let s = Settings::load(Some(&global), &local, false).unwrap();
        assert!(!s.preserve_directives, "unset project key keeps the global value");
        assert_eq!(s.tools, ["noqa"]);
        assert_eq!(s.ignore_patterns, ["^# g", "^# l"]);
        assert_eq!(s.file_ignore_patterns, ["vendor/"]);

        let missing_global = dir.path().join("nowhere/config.json");
        let s = Settings::load(Some(&missing_global), &local, false).unwrap();
        assert!(s.preserve_directives);
        assert_eq!(s.ignore_patterns, ["^# l"]);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SettingsFile::load(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            SettingsFile::load(&dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
        assert!(matches!(
            Settings::load(Some(&path), &dir.path().join("x.json"), false),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_persist_pattern_creates_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".config/scour/config.json");

        assert!(persist_pattern(&path, PatternKind::Comment, "^# keep").unwrap());
        assert!(persist_pattern(&path, PatternKind::File, "_pb2\\.py$").unwrap());
        assert!(!persist_pattern(&path, PatternKind::Comment, "^# keep").unwrap());

        let saved = SettingsFile::load(&path).unwrap();
        assert_eq!(saved.ignore_patterns, ["^# keep"]);
        assert_eq!(saved.file_ignore_patterns, ["_pb2\\.py$"]);
        assert_eq!(saved.tools, None);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"ignorePatterns\""), "got: {text}");
        assert!(!text.contains("tools"));
    }

    #[test]
    fn test_persist_pattern_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"preserveDirectives": false}"#).unwrap();
        persist_pattern(&path, PatternKind::Comment, "^# SPDX").unwrap();
        let saved = SettingsFile::load(&path).unwrap();
        assert_eq!(saved.preserve_directives, Some(false));
        assert_eq!(saved.ignore_patterns, ["^# SPDX"]);
    }

    #[test]
    fn test_persist_invalid_pattern_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let err = persist_pattern(&path, PatternKind::File, "(unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_global_config_path_under_home() {
        if let Some(path) = global_config_path() {
            assert!(path.ends_with(".config/scour/config.json"));
        }
    }

    #[test]
    fn test_file_filter() {
        let s = Settings {
            file_ignore_patterns: vec!["generated/".to_string(), "_pb2\\.py$".to_string()],
            ..Settings::default()
        };
        let filter = s.file_filter().unwrap();
        assert!(filter.is_ignored(Path::new("src/generated/x.py")));
        assert!(filter.is_ignored(Path::new("api/service_pb2.py")));
        assert!(!filter.is_ignored(Path::new("src/app.py")));
        assert!(!FileFilter::default().is_ignored(Path::new("generated/x.py")));
    }
}
