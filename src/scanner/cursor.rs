//! Byte cursor over a source buffer.
//!
//! Every delimiter the scanner cares about (`#`, quotes, backslash, newline)
//! is ASCII, so the cursor walks raw bytes.  Span boundaries are only ever
//! placed next to one of those bytes or at end of input, which keeps every
//! `&str` slice taken by the scanner on a UTF-8 char boundary.

pub struct Cursor<'src> {
    src: &'src [u8],
    pos: usize,
}

impl<'src> Cursor<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Byte under the cursor.
    pub fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    /// Byte `n` positions past the cursor.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.src.get(self.pos + n).copied()
    }

    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.src[self.pos.min(self.src.len())..].starts_with(pat)
    }

    /// Advance by `n` bytes, clamped to the end of input.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.src.len());
    }

    pub fn bump(&mut self) {
        self.advance(1);
    }

    /// Advance while `pred` holds for the byte under the cursor.
    pub fn eat_while(&mut self, mut pred: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Advance to the end of the current line, stopping before its terminator
    /// (`\n` or `\r\n`).
    pub fn eat_line(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' || (b == b'\r' && self.peek_at(1) == Some(b'\n')) {
                break;
            }
            self.pos += 1;
        }
    }

    pub fn jump_to_end(&mut self) {
        self.pos = self.src.len();
    }
}
