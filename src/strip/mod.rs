//! Comment and docstring removal.
//!
//! Works on the span stream produced by [`crate::scanner::scan`]: spans are
//! classified once against the original text, then the surviving ones are
//! written out line by line.  Code is copied verbatim apart from trailing
//! blanks on lines that end in code; lines that only held removed text vanish.
//!
//! The `*_lines` variants only remove comments and docstrings that touch one
//! of a given set of lines, for stripping just the part of a file that was
//! edited.

pub mod docstring;

use crate::location::{LineIndex, LineSet};
use crate::rules::PreservationRules;
use crate::scanner::scan;
use crate::types::{Removal, RemovalKind, Span, SpanKind};

use self::docstring::classify;

const BOM: char = '\u{feff}';

/// What happens to one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Keep,
    /// Removed; `None` for the blanks and continuations inside a docstring
    /// statement, which are not reported on their own.
    Drop(Option<RemovalKind>),
    /// Docstring that was a whole suite body, written as `pass`.
    Pass,
    /// Code after a docstring ending in `;`: the first bytes go, the rest stays.
    Trim(usize),
}

/// Result of rewriting one source buffer.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub text: String,
    pub removals: Vec<Removal>,
    /// The source has an unterminated string literal; `text` is the input.
    pub malformed: bool,
}

impl Rewrite {
    pub fn count(&self, kind: RemovalKind) -> usize {
        self.removals.iter().filter(|r| r.kind == kind).count()
    }
}

/// Remove comments and docstrings from a scanned source.
///
/// Returns the input unchanged if any literal is unterminated.
pub fn strip(spans: &[Span<'_>], rules: &PreservationRules) -> String {
    strip_within(spans, rules, None)
}

/// Like [`strip`], restricted to comments and docstrings touching `lines`.
pub fn strip_lines(spans: &[Span<'_>], rules: &PreservationRules, lines: &LineSet) -> String {
    strip_within(spans, rules, Some(lines))
}

fn strip_within(spans: &[Span<'_>], rules: &PreservationRules, only: Option<&LineSet>) -> String {
    if is_malformed(spans) {
        return spans.iter().map(|s| s.text).collect();
    }
    let (spans, actions) = decide(spans, rules, only);
    render(&spans, &actions)
}

/// Scan and strip `source`.
pub fn strip_source(source: &str, rules: &PreservationRules) -> String {
    strip(&scan(source), rules)
}

/// Removals `strip` would make, located in `source`.  `file` is only used
/// for labelling.
pub fn plan(source: &str, file: &str, rules: &PreservationRules) -> Vec<Removal> {
    rewrite(source, file, rules).removals
}

/// Strip `source` and report every removal.
pub fn rewrite(source: &str, file: &str, rules: &PreservationRules) -> Rewrite {
    rewrite_within(source, file, rules, None)
}

/// Like [`rewrite`], restricted to comments and docstrings touching `lines`.
pub fn rewrite_lines(
    source: &str,
    file: &str,
    rules: &PreservationRules,
    lines: &LineSet,
) -> Rewrite {
    rewrite_within(source, file, rules, Some(lines))
}

fn rewrite_within(
    source: &str,
    file: &str,
    rules: &PreservationRules,
    only: Option<&LineSet>,
) -> Rewrite {
    let spans = scan(source);
    if is_malformed(&spans) {
        return Rewrite {
            text: source.to_string(),
            removals: Vec::new(),
            malformed: true,
        };
    }

    let (spans, actions) = decide(&spans, rules, only);
    let index = LineIndex::new(source);
    let removals = spans
        .iter()
        .zip(&actions)
        .filter_map(|(span, action)| {
            let kind = match action {
                Action::Keep | Action::Drop(None) | Action::Trim(_) => return None,
                Action::Drop(Some(kind)) => *kind,
                Action::Pass => RemovalKind::Docstring,
            };
            let (line, col) = index.line_col(span.start);
            Some(Removal {
                file: file.to_string(),
                line,
                col,
                kind,
                excerpt: excerpt(span.text),
            })
        })
        .collect();

    Rewrite {
        text: render(&spans, &actions),
        removals,
        malformed: false,
    }
}

fn is_malformed(spans: &[Span<'_>]) -> bool {
    spans
        .iter()
        .filter_map(Span::literal)
        .any(|lit| !lit.terminated)
}

fn excerpt(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim_end().to_string()
}

fn newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Classify `spans` and pick an action for each.
fn decide<'src>(
    spans: &[Span<'src>],
    rules: &PreservationRules,
    only: Option<&LineSet>,
) -> (Vec<Span<'src>>, Vec<Action>) {
    let mut line = 1;
    let first_lines: Vec<usize> = spans
        .iter()
        .map(|s| {
            let at = line;
            line += newlines(s.text);
            at
        })
        .collect();
    // Spans `from..=to` touch a selected line.
    let selected = |from: usize, to: usize| {
        let last_line = first_lines[to] + newlines(spans[to].text);
        only.is_none_or(|set| set.overlaps(first_lines[from], last_line))
    };

    let classified = classify(spans);
    let mut actions: Vec<Action> = classified
        .spans
        .iter()
        .enumerate()
        .map(|(i, span)| match span.kind {
            SpanKind::Comment if !rules.preserves(span, first_lines[i]) && selected(i, i) => {
                Action::Drop(Some(RemovalKind::Comment))
            }
            _ => Action::Keep,
        })
        .collect();

    for group in &classified.groups {
        let Some(last) = group.spans.end.checked_sub(1) else {
            continue;
        };
        if !selected(group.spans.start, last) {
            continue;
        }
        for idx in group.spans.clone() {
            let span = &classified.spans[idx];
            if idx == group.spans.start && group.sole_body {
                actions[idx] = Action::Pass;
            } else if span.is_docstring() {
                actions[idx] = Action::Drop(Some(RemovalKind::Docstring));
            } else if !span.is_comment() {
                actions[idx] = Action::Drop(None);
            }
        }
        if group.separator > 0 {
            if let Some(action) = actions.get_mut(group.spans.end) {
                *action = Action::Trim(group.separator);
            }
        }
    }

    (classified.spans, actions)
}

fn render(spans: &[Span<'_>], actions: &[Action]) -> String {
    let total: usize = spans.iter().map(|s| s.text.len()).sum();
    let mut w = LineWriter::with_capacity(total);
    for (i, (span, action)) in spans.iter().zip(actions).enumerate() {
        let mut text = span.text;
        if i == 0 {
            // The byte order mark stays first even when line 1 goes.
            if let Some(rest) = text.strip_prefix(BOM) {
                w.out.push(BOM);
                text = rest;
            }
        }
        match *action {
            Action::Keep => w.kept(text, !matches!(span.kind, SpanKind::Str(_))),
            Action::Drop(_) => w.removed(),
            Action::Pass => w.replaced("pass"),
            Action::Trim(n) => {
                w.removed();
                w.kept(text.get(n..).unwrap_or_default(), true);
            }
        }
    }
    let mut out = w.finish();

    let had_final_newline = spans.last().is_none_or(|s| s.text.ends_with('\n'));
    if !had_final_newline && out.ends_with('\n') {
        out.pop();
        if out.ends_with('\r') {
            out.pop();
        }
    }
    out
}

/// Assembles output one physical line at a time so a line can be dropped
/// once it is known to hold nothing but removed text.
struct LineWriter {
    out: String,
    line: String,
    /// The current line lost a comment or docstring.
    removed: bool,
    /// The current line has surviving non-blank text.
    content: bool,
}

impl LineWriter {
    fn with_capacity(n: usize) -> Self {
        Self {
            out: String::with_capacity(n),
            line: String::new(),
            removed: false,
            content: false,
        }
    }

    /// Append surviving text.  `in_code` is false for string literals, whose
    /// embedded line breaks end lines that must not be trimmed.
    fn kept(&mut self, text: &str, in_code: bool) {
        let mut rest = text;
        while let Some(nl) = rest.find('\n') {
            self.push_content(&rest[..nl]);
            self.end_line(in_code);
            rest = &rest[nl + 1..];
        }
        self.push_content(rest);
    }

    fn removed(&mut self) {
        self.removed = true;
    }

    fn replaced(&mut self, with: &str) {
        self.removed = true;
        self.push_content(with);
    }

    fn push_content(&mut self, s: &str) {
        if !self.content && s.bytes().any(|b| !is_blank(b) && b != b'\r') {
            self.content = true;
        }
        self.line.push_str(s);
    }

    /// Close the current line at a `\n` from the source.
    fn end_line(&mut self, in_code: bool) {
        let crlf = self.line.ends_with('\r');
        if crlf {
            self.line.pop();
        }
        if in_code {
            trim_blanks(&mut self.line);
        }
        let emptied = in_code && self.removed && !self.content;
        if !emptied {
            self.out.push_str(&self.line);
            self.out.push_str(if crlf { "\r\n" } else { "\n" });
        }
        self.line.clear();
        self.removed = false;
        self.content = false;
    }

    fn finish(mut self) -> String {
        trim_blanks(&mut self.line);
        if self.content || !self.removed {
            self.out.push_str(&self.line);
        }
        self.out
    }
}

fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\x0c')
}

fn trim_blanks(line: &mut String) {
    let keep = line.trim_end_matches([' ', '\t', '\x0c']).len();
    line.truncate(keep);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
