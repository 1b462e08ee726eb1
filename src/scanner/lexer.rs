//! Span scanner.
//!
//! A single left-to-right pass over the source with an explicit state stack:
//!
//! - empty stack: ordinary code.  `#` opens a comment that runs to the end
//!   of the line; a quote (optionally preceded by prefix letters) opens a
//!   string literal.
//! - `Literal`: inside `'...'`, `"..."`, `'''...'''` or `"""..."""`.
//! - `Field`: inside a `{...}` replacement field of a formatted or template
//!   literal.  Quotes there open nested literals (`f"{d["k"]}"`), brackets are
//!   counted, and a `:` at bracket depth zero switches to the format spec.
//!
//! Only the outermost literal becomes a span, so a `#` anywhere between its
//! delimiters, including inside replacement fields, is literal text.  Inside
//! a literal a backslash always makes the next byte unable to close it (raw
//! literals included: `r"\""` is one literal).
//!
//! The scanner never fails.  If the input ends inside a literal, or a
//! single-line literal body reaches a newline, the rest of the file becomes
//! one open literal span with `terminated == false`.

use super::cursor::Cursor;
use crate::types::{Role, Span, SpanKind, StrPrefix, StringLiteral};

const BOM: &[u8] = "\u{feff}".as_bytes();

#[derive(Debug, Clone, Copy)]
struct Delim {
    quote: u8,
    triple: bool,
    prefix: StrPrefix,
}

impl Delim {
    fn has_fields(&self) -> bool {
        self.prefix.formatted || self.prefix.template
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Literal(Delim),
    /// `depth` counts brackets opened inside the field; `spec` is set after
    /// the top-level `:` that starts the format spec.
    Field { depth: u32, spec: bool },
}

pub struct Scanner<'src> {
    src: &'src str,
    cursor: Cursor<'src>,
    /// Start of the span under construction.
    mark: usize,
    /// Empty while in code; the bottom frame is always the outermost literal.
    stack: Vec<Frame>,
    spans: Vec<Span<'src>>,
}

/// Classify `source` into contiguous code, comment, and string-literal spans.
pub fn scan(source: &str) -> Vec<Span<'_>> {
    Scanner::new(source).run()
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            cursor: Cursor::new(src),
            mark: 0,
            stack: Vec::new(),
            spans: Vec::new(),
        }
    }

    pub fn run(mut self) -> Vec<Span<'src>> {
        // A byte order mark is part of the first code span, never a word.
        if self.cursor.starts_with(BOM) {
            self.cursor.advance(BOM.len());
        }

        while !self.cursor.is_eof() {
            match self.stack.last().copied() {
                None => self.step_code(),
                Some(Frame::Literal(d)) => self.step_literal(d),
                Some(Frame::Field { depth, spec }) => self.step_field(depth, spec),
            }
        }

        let end = self.cursor.pos();
        match self.stack.first().copied() {
            Some(Frame::Literal(outer)) => self.push_literal(outer, false, end),
            _ => self.push(SpanKind::Code, self.mark, end),
        }
        self.spans
    }

    // ── span emission ─────────────────────────────────────────────────────────

    fn push(&mut self, kind: SpanKind, start: usize, end: usize) {
        if start < end {
            self.spans.push(Span {
                kind,
                start,
                end,
                text: &self.src[start..end],
            });
        }
        self.mark = end;
    }

    fn push_literal(&mut self, d: Delim, terminated: bool, end: usize) {
        let lit = StringLiteral {
            quote: d.quote,
            triple: d.triple,
            prefix: d.prefix,
            terminated,
            role: Role::Expression,
        };
        self.push(SpanKind::Str(lit), self.mark, end);
        self.stack.clear();
    }

    // ── Code ──────────────────────────────────────────────────────────────────

    fn step_code(&mut self) {
        let Some(b) = self.cursor.peek() else {
            return;
        };

        match b {
            b'#' => {
                let start = self.cursor.pos();
                self.push(SpanKind::Code, self.mark, start);
                self.cursor.eat_line();
                self.push(SpanKind::Comment, start, self.cursor.pos());
            }
            b'"' | b'\'' => {
                let start = self.cursor.pos();
                self.push(SpanKind::Code, self.mark, start);
                self.open_literal(StrPrefix::default());
            }
            b if is_ident_start(b) => {
                if let Some((start, prefix)) = self.eat_word() {
                    self.push(SpanKind::Code, self.mark, start);
                    self.open_literal(prefix);
                }
            }
            b if b.is_ascii_digit() => {
                // Numeric literals (`1e5`, `0xff`, `1_000j`) never start strings.
                self.cursor.eat_while(is_ident_continue);
            }
            _ => self.cursor.bump(),
        }
    }

    /// Consume a whole identifier so a prefix is only recognised when it is a
    /// complete word: `xr"..."` is not a raw literal.  Returns the word start
    /// and prefix when the word is a literal prefix followed by a quote.
    fn eat_word(&mut self) -> Option<(usize, StrPrefix)> {
        let start = self.cursor.pos();
        self.cursor.eat_while(is_ident_continue);
        let word = &self.src[start..self.cursor.pos()];
        if !matches!(self.cursor.peek(), Some(b'"' | b'\'')) {
            return None;
        }
        StrPrefix::parse(word).map(|p| (start, p))
    }

    /// The cursor sits on an opening quote.
    fn open_literal(&mut self, prefix: StrPrefix) {
        let Some(quote) = self.cursor.peek() else {
            return;
        };
        let triple = self.cursor.peek_at(1) == Some(quote) && self.cursor.peek_at(2) == Some(quote);
        self.cursor.advance(if triple { 3 } else { 1 });
        self.stack.push(Frame::Literal(Delim {
            quote,
            triple,
            prefix,
        }));
    }

    // ── Literal bodies ────────────────────────────────────────────────────────

    fn step_literal(&mut self, d: Delim) {
        let Some(b) = self.cursor.peek() else {
            return;
        };
        let q = d.quote;
        match b {
            b'\\' => self.skip_escape(),
            b'\n' if !d.triple => {
                // Unterminated: the rest of the file stays one literal.
                self.cursor.jump_to_end();
            }
            _ if b == q && (!d.triple || self.cursor.starts_with(&[q, q, q])) => {
                self.cursor.advance(if d.triple { 3 } else { 1 });
                self.stack.pop();
                if self.stack.is_empty() {
                    let end = self.cursor.pos();
                    self.push_literal(d, true, end);
                }
            }
            b'{' | b'}' if d.has_fields() => {
                if self.cursor.peek_at(1) == Some(b) {
                    // `{{` / `}}` are escaped braces.
                    self.cursor.advance(2);
                } else {
                    self.cursor.bump();
                    if b == b'{' {
                        self.stack.push(Frame::Field {
                            depth: 0,
                            spec: false,
                        });
                    }
                }
            }
            _ => self.cursor.bump(),
        }
    }

    /// Skip a backslash and the byte it escapes.  A backslash before `\r\n`
    /// swallows both bytes of the line break.
    fn skip_escape(&mut self) {
        if self.cursor.peek_at(1) == Some(b'\r') && self.cursor.peek_at(2) == Some(b'\n') {
            self.cursor.advance(3);
        } else {
            self.cursor.advance(2);
        }
    }

    // ── Replacement fields ────────────────────────────────────────────────────

    fn step_field(&mut self, depth: u32, spec: bool) {
        let Some(b) = self.cursor.peek() else {
            return;
        };

        if spec {
            // Format spec: literal text with nested fields.
            self.cursor.bump();
            match b {
                b'{' => self.stack.push(Frame::Field {
                    depth: 0,
                    spec: false,
                }),
                b'}' => {
                    self.stack.pop();
                }
                _ => {}
            }
            return;
        }

        match b {
            b'"' | b'\'' => self.open_literal(StrPrefix::default()),
            b if is_ident_start(b) => {
                if let Some((_, prefix)) = self.eat_word() {
                    self.open_literal(prefix);
                }
            }
            b if b.is_ascii_digit() => self.cursor.eat_while(is_ident_continue),
            b'(' | b'[' | b'{' => {
                self.cursor.bump();
                self.set_field(depth + 1, false);
            }
            b')' | b']' => {
                self.cursor.bump();
                self.set_field(depth.saturating_sub(1), false);
            }
            b'}' => {
                self.cursor.bump();
                if depth == 0 {
                    self.stack.pop();
                } else {
                    self.set_field(depth - 1, false);
                }
            }
            b':' if depth == 0 => {
                self.cursor.bump();
                self.set_field(0, true);
            }
            _ => self.cursor.bump(),
        }
    }

    fn set_field(&mut self, depth: u32, spec: bool) {
        if let Some(top) = self.stack.last_mut() {
            *top = Frame::Field { depth, spec };
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

// ── Tests ─────────────────────────────────────────────────────────────────────
