//! Comment preservation rules.
//!
//! A rule pairs a [`Matcher`] with a human-readable description.  The stripper
//! keeps any comment matched by at least one rule.  The built-in set covers:
//!
//! - the interpreter line (`#!` at byte 0)
//! - PEP 263 encoding declarations on line 1 or 2 (`# -*- coding: utf-8 -*-`)
//! - type comments (`# type: list[int]`)
//! - tool pragmas (`# noqa`, `# pylint: disable=...`, `# fmt: off`, ...)
//!
//! Callers extend the set with their own regular expressions (see
//! [`crate::config::Settings::rules`]).

use crate::types::Span;
use regex::Regex;

/// Tool directive markers preserved by default.  A marker matches when some
/// `#` in the comment is followed (after optional blanks) by the marker text.
pub const DEFAULT_TOOLS: &[&str] = &[
    "noqa", "pylint:", "flake8:", "mypy:", "pyright:", "yapf:", "isort:", "ruff:", "fmt:",
    "pragma:",
];

#[derive(Debug, Clone)]
pub enum Matcher {
    /// `#!` comment at the very start of the file.
    Shebang,
    /// `coding:` / `coding=` declaration on one of the first two lines.
    EncodingDeclaration,
    /// `#` followed by optional blanks and the given text, anywhere in the comment.
    Marker(String),
    /// User-supplied expression matched against the trimmed comment.
    Pattern(Regex),
}

impl Matcher {
    /// `comment` is the trimmed comment text including its leading `#`;
    /// `offset` is its byte offset in the file and `line` its 1-based line.
    pub fn matches(&self, comment: &str, offset: usize, line: usize) -> bool {
        match self {
            Matcher::Shebang => offset == 0 && comment.starts_with("#!"),
            Matcher::EncodingDeclaration => line <= 2 && is_encoding_declaration(comment),
            Matcher::Marker(marker) => has_marker(comment, marker),
            Matcher::Pattern(re) => re.is_match(comment),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreservationRule {
    pub matcher: Matcher,
    pub description: String,
}

impl PreservationRule {
    pub fn new(matcher: Matcher, description: impl Into<String>) -> Self {
        Self {
            matcher,
            description: description.into(),
        }
    }

    /// Rule for a tool directive such as `pylint:` or `noqa`.
    pub fn tool(marker: &str) -> Self {
        let name = marker.trim_end_matches(':');
        Self::new(
            Matcher::Marker(marker.to_string()),
            format!("{name} directive"),
        )
    }
}

/// Ordered set of preservation rules handed to the stripper.
#[derive(Debug, Clone)]
pub struct PreservationRules {
    rules: Vec<PreservationRule>,
}

impl Default for PreservationRules {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PreservationRules {
    /// No rules: every comment is removed.
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Shebang, encoding declaration, type comments, and one marker per tool.
    pub fn builtin<S: AsRef<str>>(tools: &[S]) -> Self {
        let mut rules = vec![
            PreservationRule::new(Matcher::Shebang, "interpreter line"),
            PreservationRule::new(Matcher::EncodingDeclaration, "source encoding declaration"),
            PreservationRule::new(Matcher::Marker("type:".to_string()), "type comment"),
        ];
        rules.extend(tools.iter().map(|t| PreservationRule::tool(t.as_ref())));
        Self { rules }
    }

    pub fn with_defaults() -> Self {
        Self::builtin(DEFAULT_TOOLS)
    }

    pub fn push(&mut self, rule: PreservationRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PreservationRule> {
        self.rules.iter()
    }

    /// First rule that keeps this comment span, found on `line`, if any.
    pub fn matching(&self, span: &Span<'_>, line: usize) -> Option<&PreservationRule> {
        let text = span.text.trim();
        self.rules
            .iter()
            .find(|r| r.matcher.matches(text, span.start, line))
    }

    pub fn preserves(&self, span: &Span<'_>, line: usize) -> bool {
        self.matching(span, line).is_some()
    }
}

fn has_marker(comment: &str, marker: &str) -> bool {
    comment.match_indices('#').any(|(i, _)| {
        comment[i + 1..]
            .trim_start_matches([' ', '\t'])
            .starts_with(marker)
    })
}

/// PEP 263: `coding[:=]\s*([-\w.]+)` anywhere in the comment.
fn is_encoding_declaration(comment: &str) -> bool {
    comment.match_indices("coding").any(|(i, m)| {
        let rest = &comment[i + m.len()..];
        let Some(rest) = rest.strip_prefix([':', '=']) else {
            return false;
        };
        rest.trim_start_matches([' ', '\t'])
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
