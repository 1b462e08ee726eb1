//! Lexical scanner for Python source.
//!
//! Splits source text into contiguous [`Span`](crate::types::Span)s of code,
//! comments, and string literals, borrowing every slice from the input.
//! Concatenating the spans' text always reproduces the input exactly.
//!
//! # Usage
//! ```
//! use scour::scanner::scan;
//! let spans = scan("x = 1  # note\n");
//! assert_eq!(spans.len(), 3);
//! ```

pub mod cursor;
pub mod lexer;

pub use lexer::scan;
