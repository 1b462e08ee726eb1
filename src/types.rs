use std::fmt;

// ── String literals ───────────────────────────────────────────────────────────

/// Prefix letters that may precede an opening quote (`rb"..."`, `f'...'`).
///
/// Recorded for reporting; comment detection treats every variant the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrPrefix {
    pub raw: bool,
    pub bytes: bool,
    pub formatted: bool,
    pub unicode: bool,
    /// PEP 750 template string (`t"..."`).
    pub template: bool,
}

impl StrPrefix {
    /// Parse a prefix such as `rb` or `F`.  Returns `None` when `s` is not a
    /// legal literal prefix.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() > 2 {
            return None;
        }
        let mut p = StrPrefix::default();
        for b in s.bytes() {
            let seen = match b.to_ascii_lowercase() {
                b'r' => std::mem::replace(&mut p.raw, true),
                b'b' => std::mem::replace(&mut p.bytes, true),
                b'f' => std::mem::replace(&mut p.formatted, true),
                b'u' => std::mem::replace(&mut p.unicode, true),
                b't' => std::mem::replace(&mut p.template, true),
                _ => return None,
            };
            if seen {
                return None;
            }
        }
        // `u` never combines; `b` combines only with `r`; `f`/`t` only with `r`.
        let kinds = [p.bytes, p.formatted, p.unicode, p.template]
            .iter()
            .filter(|k| **k)
            .count();
        if kinds > 1 || (p.unicode && p.raw) {
            return None;
        }
        Some(p)
    }

    pub fn is_empty(&self) -> bool {
        *self == StrPrefix::default()
    }
}

/// Structural role of a string literal.  The scanner always emits
/// `Expression`; the stripper promotes suite-leading literals to `Docstring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Expression,
    Docstring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLiteral {
    /// `b'"'` or `b'\''`.
    pub quote: u8,
    pub triple: bool,
    pub prefix: StrPrefix,
    /// False when the input ended before the closing delimiter.
    pub terminated: bool,
    pub role: Role,
}

impl StringLiteral {
    pub fn is_docstring(&self) -> bool {
        self.role == Role::Docstring
    }
}

// ── Span ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Code,
    Comment,
    Str(StringLiteral),
}

/// A classified, non-overlapping slice of the source.  `text` always equals
/// `&source[start..end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'src> {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
    pub text: &'src str,
}

impl<'src> Span<'src> {
    pub fn is_comment(&self) -> bool {
        self.kind == SpanKind::Comment
    }

    pub fn literal(&self) -> Option<&StringLiteral> {
        match &self.kind {
            SpanKind::Str(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn is_docstring(&self) -> bool {
        self.literal().is_some_and(StringLiteral::is_docstring)
    }

    /// Copy of this span with its literal role set to `Docstring`.  Non-literal
    /// spans are returned unchanged.
    pub fn into_docstring(self) -> Self {
        match self.kind {
            SpanKind::Str(lit) => Span {
                kind: SpanKind::Str(StringLiteral {
                    role: Role::Docstring,
                    ..lit
                }),
                ..self
            },
            _ => self,
        }
    }
}

// ── Removal report ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalKind {
    Comment,
    Docstring,
}

impl fmt::Display for RemovalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            RemovalKind::Comment => "comment",
            RemovalKind::Docstring => "docstring",
        };
        write!(f, "{kind}")
    }
}

/// One span the stripper drops, located for reporting.
#[derive(Debug, Clone)]
pub struct Removal {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub kind: RemovalKind,
    /// First line of the removed text.
    pub excerpt: String,
}

impl fmt::Display for Removal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} {}",
            self.file, self.line, self.col, self.kind, self.excerpt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_display() {
        let r = Removal {
            file: "src/foo.py".to_string(),
            line: 12,
            col: 5,
            kind: RemovalKind::Comment,
            excerpt: "# TODO: later".to_string(),
        };
        assert_eq!(r.to_string(), "src/foo.py:12:5: comment # TODO: later");
    }

    #[test]
    fn test_removal_kind_display() {
        assert_eq!(RemovalKind::Comment.to_string(), "comment");
        assert_eq!(RemovalKind::Docstring.to_string(), "docstring");
    }

    #[test]
    fn test_prefix_parse_accepts_legal_combinations() {
        for p in ["r", "R", "b", "f", "u", "t", "rb", "Br", "fR", "rf", "tr", "Rt"] {
            assert!(StrPrefix::parse(p).is_some(), "{p} should be a prefix");
        }
        assert!(StrPrefix::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_prefix_parse_rejects_identifiers() {
        for p in ["x", "rr", "bf", "ub", "ur", "abc", "rbf", "ft"] {
            assert!(StrPrefix::parse(p).is_none(), "{p} should not be a prefix");
        }
    }

    #[test]
    fn test_into_docstring_only_touches_literals() {
        let code = Span {
            kind: SpanKind::Code,
            start: 0,
            end: 1,
            text: "x",
        };
        assert_eq!(code.into_docstring(), code);

        let lit = Span {
            kind: SpanKind::Str(StringLiteral {
                quote: b'"',
                triple: false,
                prefix: StrPrefix::default(),
                terminated: true,
                role: Role::Expression,
            }),
            start: 0,
            end: 2,
            text: "\"\"",
        };
        assert!(!lit.is_docstring());
        assert!(lit.into_docstring().is_docstring());
    }
}
