//! Docstring position detection.
//!
//! A string literal is a docstring when it is the first statement of the
//! module or of a `def` / `async def` / `class` suite whose body starts on its
//! own line, and the statement consists of nothing but string literals
//! (implicit concatenation and backslash continuations allowed).
//!
//! This is not a parser.  A small tracker walks the span stream carrying:
//!
//! - bracket depth, so newlines inside `(...)` do not end a logical line
//! - whether the current logical line has seen anything significant yet
//! - the state of a `def`/`class` header (opened, colon seen)
//! - which suite, if any, is still waiting for its first statement
//!
//! Formatted, template and bytes literals are never docstrings, and a
//! statement containing one is left alone.
//!
//! Bare string statements that directly follow a docstring are claimed as
//! well: they are no-ops, and leaving them would turn the next one into the
//! docstring on a second pass.

use std::ops::Range;

use crate::types::{Span, SpanKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suite {
    Module,
    /// Body of a `def`/`class` whose header line is indented by `header_indent`.
    Body { header_indent: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    None,
    /// Logical line started with `def`/`class`; colon not seen yet.
    Open { indent: usize },
    /// Header colon seen at depth 0 with nothing after it so far.
    Colon { indent: usize },
}

/// One docstring statement: the literal spans it is made of and the blanks or
/// continuations between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocGroup {
    /// Span indices, first literal to last literal inclusive.
    pub spans: Range<usize>,
    /// The statement is the whole body of a `def`/`class`; the stripper
    /// substitutes `pass` for it.
    pub sole_body: bool,
    /// The statement ends with `;`.  This many leading bytes of the code span
    /// at `spans.end` (the separator and the blanks after it) go with it.
    pub separator: usize,
}

/// Spans with docstring roles applied.
#[derive(Debug, Clone)]
pub struct Classified<'src> {
    pub spans: Vec<Span<'src>>,
    pub groups: Vec<DocGroup>,
}

struct Tracker {
    depth: i32,
    at_line_start: bool,
    indent: usize,
    header: Header,
    awaiting: Option<Suite>,
    /// Previous significant byte was a backslash.
    continuation: bool,
    /// Line started with `async`; a following `def` opens a header.
    after_async: bool,
}

pub fn classify<'src>(spans: &[Span<'src>]) -> Classified<'src> {
    let mut out: Vec<Span<'src>> = spans.to_vec();
    let mut groups = Vec::new();
    let mut t = Tracker {
        depth: 0,
        at_line_start: true,
        indent: 0,
        header: Header::None,
        awaiting: Some(Suite::Module),
        continuation: false,
        after_async: false,
    };

    let mut i = 0;
    while i < spans.len() {
        match spans[i].kind {
            SpanKind::Comment => {}
            SpanKind::Code if i == 0 => {
                let text = spans[i].text;
                t.feed_code(text.strip_prefix('\u{feff}').unwrap_or(text));
            }
            SpanKind::Code => t.feed_code(spans[i].text),
            SpanKind::Str(_) => {
                if t.at_line_start {
                    t.at_line_start = false;
                    let suite = t.awaiting.take();
                    if let (Some(suite), 0) = (suite, t.depth) {
                        if let Some(stmt) = bare_string_statement(spans, i) {
                            let end = stmt.end;
                            for span in &mut out[i..end] {
                                *span = span.into_docstring();
                            }
                            let sole_body = match suite {
                                Suite::Module => false,
                                Suite::Body { .. } if stmt.more_on_line => false,
                                Suite::Body { header_indent } => {
                                    next_statement_indent(&spans[end..])
                                        .is_none_or(|ind| ind <= header_indent)
                                }
                            };
                            groups.push(DocGroup {
                                spans: i..end,
                                sole_body,
                                separator: stmt.separator,
                            });
                            // Let a following bare string be claimed too,
                            // unless another statement shares the line.
                            if !stmt.more_on_line {
                                t.awaiting = Some(suite);
                            }
                            i = end;
                            continue;
                        }
                    }
                } else if matches!(t.header, Header::Colon { .. }) {
                    // `def f(): "doc"` keeps its body on the header line.
                    t.header = Header::None;
                }
                t.after_async = false;
                t.continuation = false;
            }
        }
        i += 1;
    }

    Classified { spans: out, groups }
}

impl Tracker {
    fn feed_code(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut j = 0;
        while j < bytes.len() {
            let b = bytes[j];

            if self.at_line_start {
                match b {
                    b' ' | b'\x0c' => {
                        self.indent += 1;
                        j += 1;
                        continue;
                    }
                    b'\t' => {
                        self.indent = (self.indent + 8) & !7;
                        j += 1;
                        continue;
                    }
                    b'\r' => {
                        j += 1;
                        continue;
                    }
                    b'\n' => {
                        // Blank line.
                        self.indent = 0;
                        j += 1;
                        continue;
                    }
                    _ => {
                        // Anything but a string claims the first-statement slot.
                        self.at_line_start = false;
                        self.awaiting = None;
                        if is_word_byte(b) {
                            let end = word_end(bytes, j);
                            match &text[j..end] {
                                "def" | "class" => {
                                    self.header = Header::Open {
                                        indent: self.indent,
                                    }
                                }
                                "async" => self.after_async = true,
                                _ => {}
                            }
                            j = end;
                            continue;
                        }
                    }
                }
            }

            match b {
                b'\n' => {
                    if self.depth == 0 && !self.continuation {
                        self.end_logical_line();
                    }
                    self.continuation = false;
                }
                b' ' | b'\t' | b'\r' | b'\x0c' => {}
                b'\\' => self.continuation = true,
                _ => {
                    self.continuation = false;
                    match b {
                        b'(' | b'[' | b'{' => self.depth += 1,
                        b')' | b']' | b'}' => self.depth = (self.depth - 1).max(0),
                        b':' if self.depth == 0 && bytes.get(j + 1) != Some(&b'=') => {
                            if let Header::Open { indent } = self.header {
                                self.header = Header::Colon { indent };
                                j += 1;
                                continue;
                            }
                        }
                        _ => {}
                    }
                    if is_word_byte(b) {
                        let end = word_end(bytes, j);
                        if self.after_async && &text[j..end] == "def" {
                            self.header = Header::Open {
                                indent: self.indent,
                            };
                        }
                        self.after_async = false;
                        if matches!(self.header, Header::Colon { .. }) {
                            self.header = Header::None;
                        }
                        j = end;
                        continue;
                    }
                    self.after_async = false;
                    if matches!(self.header, Header::Colon { .. }) {
                        // Body continues on the header line (`class A: pass`).
                        self.header = Header::None;
                    }
                }
            }
            j += 1;
        }
    }

    fn end_logical_line(&mut self) {
        if let Header::Colon { indent } = self.header {
            self.awaiting = Some(Suite::Body {
                header_indent: indent,
            });
        }
        self.header = Header::None;
        self.at_line_start = true;
        self.after_async = false;
        self.indent = 0;
    }
}

struct Statement {
    /// One past the last literal.
    end: usize,
    /// Bytes of `spans[end]` taken by a trailing `;` and the blanks after it.
    separator: usize,
    /// Another statement follows the `;` on the same line.
    more_on_line: bool,
}

/// If the statement starting at the literal `spans[start]` is made only of
/// plain string literals, describe where it ends.
fn bare_string_statement(spans: &[Span<'_>], start: usize) -> Option<Statement> {
    let ends = |end, separator, more_on_line| {
        Some(Statement {
            end,
            separator,
            more_on_line,
        })
    };

    let mut last = start;
    for (k, span) in spans.iter().enumerate().skip(start) {
        match span.kind {
            SpanKind::Str(lit) => {
                if lit.prefix.formatted || lit.prefix.template || lit.prefix.bytes {
                    return None;
                }
                last = k;
            }
            SpanKind::Comment => {}
            SpanKind::Code => match statement_tail(span.text) {
                Tail::Blank => {}
                Tail::Ends => return ends(last + 1, 0, false),
                Tail::MoreCode => return None,
                Tail::Semicolon { skip, rest } => {
                    if k != last + 1 {
                        // A continuation sits between the literal and `;`.
                        return None;
                    }
                    let more_on_line = match rest {
                        Rest::LineEnds => false,
                        Rest::Code => true,
                        // `'a'; 'b'` is left alone; `'a';  # c` ends the line.
                        Rest::SpanEnds => match spans.get(k + 1).map(|s| s.kind) {
                            Some(SpanKind::Str(_)) => return None,
                            _ => false,
                        },
                    };
                    return ends(last + 1, skip, more_on_line);
                }
            },
        }
    }
    ends(last + 1, 0, false)
}

enum Tail {
    /// Only blanks and continuations; the statement goes on.
    Blank,
    /// A logical newline ends the statement.
    Ends,
    /// Something other than a string follows on the same logical line.
    MoreCode,
    /// `;` ends the statement; `skip` bytes cover it and the blanks after it.
    Semicolon { skip: usize, rest: Rest },
}

/// What follows a `;` and its blanks.
enum Rest {
    LineEnds,
    SpanEnds,
    Code,
}

fn statement_tail(text: &str) -> Tail {
    let bytes = text.as_bytes();
    let mut j = 0;
    while j < bytes.len() {
        match bytes[j] {
            b' ' | b'\t' | b'\r' | b'\x0c' => j += 1,
            b'\\' => {
                let mut k = j + 1;
                if bytes.get(k) == Some(&b'\r') {
                    k += 1;
                }
                if bytes.get(k) != Some(&b'\n') {
                    return Tail::MoreCode;
                }
                j = k + 1;
            }
            b'\n' => return Tail::Ends,
            b';' => {
                let mut k = j + 1;
                while matches!(bytes.get(k), Some(b' ' | b'\t' | b'\x0c')) {
                    k += 1;
                }
                let rest = match bytes.get(k) {
                    None => Rest::SpanEnds,
                    Some(b'\r' | b'\n') => Rest::LineEnds,
                    Some(_) => Rest::Code,
                };
                return Tail::Semicolon { skip: k, rest };
            }
            _ => return Tail::MoreCode,
        }
    }
    Tail::Blank
}

/// Indentation of the next line that holds code or a literal, skipping the
/// remainder of the current line, blank lines, and comment-only lines.
fn next_statement_indent(spans: &[Span<'_>]) -> Option<usize> {
    let mut line_done = false;
    let mut col = 0usize;
    for span in spans {
        match span.kind {
            SpanKind::Comment => {}
            SpanKind::Str(_) => {
                if line_done {
                    return Some(col);
                }
            }
            SpanKind::Code => {
                for b in span.text.bytes() {
                    match b {
                        b'\n' => {
                            line_done = true;
                            col = 0;
                        }
                        b' ' | b'\x0c' => col += 1,
                        b'\t' => col = (col + 8) & !7,
                        b'\r' | b'\\' => {}
                        _ if line_done => return Some(col),
                        _ => {}
                    }
                }
            }
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn word_end(bytes: &[u8], from: usize) -> usize {
    let mut end = from;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    end
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn docstrings(src: &str) -> Vec<String> {
        let spans = scan(src);
        classify(&spans)
            .spans
            .iter()
            .filter(|s| s.is_docstring())
            .map(|s| s.text.to_string())
            .collect()
    }

    fn sole_bodies(src: &str) -> Vec<String> {
        let spans = scan(src);
        let c = classify(&spans);
        c.groups
            .iter()
            .filter(|g| g.sole_body)
            .map(|g| c.spans[g.spans.start].text.to_string())
            .collect()
    }

    #[test]
    fn test_module_docstring() {
        assert_eq!(docstrings("\"\"\"Module.\"\"\"\nimport os\n"), ["\"\"\"Module.\"\"\""]);
    }

    #[test]
    fn test_module_docstring_after_shebang_and_comments() {
        let src = "#!/usr/bin/env python3\n# mypy: ignore-errors\n\n'''doc'''\nx = 1\n";
        assert_eq!(docstrings(src), ["'''doc'''"]);
    }

    #[test]
    fn test_function_docstring() {
        let src = "def f():\n    \"\"\"doc\"\"\"\n    return 1\n";
        assert_eq!(docstrings(src), ["\"\"\"doc\"\"\""]);
        assert!(sole_bodies(src).is_empty());
    }

    #[test]
    fn test_class_and_method_docstrings() {
        let src = "class A(B):\n    'A doc'\n\n    def m(self, x: int) -> int:  # c\n        \"\"\"m doc\"\"\"\n        return x\n";
        assert_eq!(docstrings(src), ["'A doc'", "\"\"\"m doc\"\"\""]);
    }

    #[test]
    fn test_async_def_docstring() {
        let src = "async def f():\n    \"doc\"\n    await g()\n";
        assert_eq!(docstrings(src), ["\"doc\""]);
    }

    #[test]
    fn test_multiline_header() {
        let src = "def f(\n    a: int = 1,\n    b: dict = {'k': 2},\n) -> None:\n    '''doc'''\n    pass\n";
        assert_eq!(docstrings(src), ["'''doc'''"]);
    }

    #[test]
    fn test_decorated_function() {
        let src = "@decorator(x=1)\ndef f():\n    'doc'\n    return 1\n";
        assert_eq!(docstrings(src), ["'doc'"]);
    }

    #[test]
    fn test_assignment_is_not_docstring() {
        assert!(docstrings("x = \"\"\"\ntext\n\"\"\"\n").is_empty());
        assert!(docstrings("def f():\n    x = '''doc'''\n").is_empty());
    }

    #[test]
    fn test_later_string_is_not_docstring() {
        let src = "import os\n\"\"\"not doc\"\"\"\n";
        assert!(docstrings(src).is_empty());
        let src = "def f():\n    x = 1\n    'not doc'\n";
        assert!(docstrings(src).is_empty());
    }

    #[test]
    fn test_string_with_method_call_is_not_docstring() {
        assert!(docstrings("'a,b'.split(',')\n").is_empty());
        assert!(docstrings("def f():\n    'x' + y\n").is_empty());
    }

    #[test]
    fn test_semicolon_after_docstring() {
        let groups = |src: &str| {
            let spans = scan(src);
            classify(&spans).groups
        };

        let src = "'''a'''; x = 1\n";
        assert_eq!(docstrings(src), ["'''a'''"]);
        assert_eq!(groups(src)[0].separator, 2);

        let src = "def f():\n    'doc';\n";
        assert_eq!(docstrings(src), ["'doc'"]);
        assert_eq!(sole_bodies(src), ["'doc'"]);

        assert!(sole_bodies("def f():\n    'doc'; return 1\n").is_empty());
        assert!(docstrings("def f():\n    'a'; 'b'\n").is_empty());
    }

    #[test]
    fn test_statement_after_semicolon_ends_claiming() {
        let src = "def f():\n    'doc'; x = 1\n    'later'\n";
        assert_eq!(docstrings(src), ["'doc'"]);
    }

    #[test]
    fn test_formatted_and_bytes_literals_are_not_docstrings() {
        assert!(docstrings("def f():\n    f\"{launch()}\"\n    return 1\n").is_empty());
        assert!(docstrings("b'x'\ny = 1\n").is_empty());
        assert!(docstrings("class A:\n    t'{x}'\n").is_empty());
        assert!(docstrings("def f():\n    'a' f'{b}'\n").is_empty());
        assert!(docstrings("def f():\n    rb'x'\n").is_empty());
        assert_eq!(docstrings("def f():\n    r'raw' u'doc'\n"), ["r'raw'", "u'doc'"]);
    }

    #[test]
    fn test_following_formatted_string_stops_the_group() {
        let src = "def f():\n    'doc'\n    f\"{x}\"\n    'after'\n";
        assert_eq!(docstrings(src), ["'doc'"]);
        assert!(sole_bodies(src).is_empty());
    }

    #[test]
    fn test_byte_order_mark_before_module_docstring() {
        let src = "\u{feff}\"\"\"doc\"\"\"\nx = 1\n";
        assert_eq!(docstrings(src), ["\"\"\"doc\"\"\""]);
    }

    #[test]
    fn test_one_line_def_keeps_string() {
        assert!(docstrings("def f(): 'doc'\n").is_empty());
        assert!(docstrings("class A: pass\n'not doc'\n").is_empty());
    }

    #[test]
    fn test_if_block_is_not_a_suite_for_docstrings() {
        assert!(docstrings("x = 1\nif x:\n    'not doc'\n").is_empty());
    }

    #[test]
    fn test_string_in_brackets_is_not_docstring() {
        assert!(docstrings("(\n'doc'\n)\n").is_empty());
    }

    #[test]
    fn test_implicit_concatenation() {
        let src = "def f():\n    'a' \\\n    'b'  # c\n    return 1\n";
        assert_eq!(docstrings(src), ["'a'", "'b'"]);
    }

    #[test]
    fn test_docstring_at_end_of_file() {
        assert_eq!(docstrings("'''only'''"), ["'''only'''"]);
    }

    #[test]
    fn test_following_bare_strings_are_claimed() {
        let src = "def f():\n    'a'\n    'b'\n    return 1\n";
        assert_eq!(docstrings(src), ["'a'", "'b'"]);
    }

    #[test]
    fn test_sole_body_detection() {
        let src = "class A:\n    \"\"\"only doc\"\"\"\n\nx = 1\n";
        assert_eq!(sole_bodies(src), ["\"\"\"only doc\"\"\""]);

        let src = "def f():\n    'doc'\n    # trailing comment\n";
        assert_eq!(sole_bodies(src), ["'doc'"]);

        let src = "def f():\n    'a'\n    'b'\n";
        assert_eq!(sole_bodies(src), ["'b'"]);
    }

    #[test]
    fn test_group_covers_continuation() {
        let src = "'a' \\\n'b'\nx = 1\n";
        let spans = scan(src);
        let c = classify(&spans);
        assert_eq!(c.groups.len(), 1);
        let texts: Vec<&str> = c.spans[c.groups[0].spans.clone()]
            .iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(texts, ["'a'", " \\\n", "'b'"]);
    }

    #[test]
    fn test_module_docstring_is_never_sole_body() {
        assert!(sole_bodies("'''doc'''\n").is_empty());
    }

    #[test]
    fn test_nested_defs() {
        let src = "def outer():\n    'o'\n    def inner():\n        'i'\n        return 1\n    return inner\n";
        assert_eq!(docstrings(src), ["'o'", "'i'"]);
        assert!(sole_bodies(src).is_empty());
    }

    #[test]
    fn test_walrus_in_header_default() {
        let src = "def f(x=(y := 1)):\n    'doc'\n    return x\n";
        assert_eq!(docstrings(src), ["'doc'"]);
    }
}
