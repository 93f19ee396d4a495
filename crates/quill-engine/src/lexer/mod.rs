//! Lexical analysis (tokenization) of script source code.
//!
//! The lexer transforms source text into a flat vector of tokens that the
//! parser walks with an index, which keeps backtracking cheap.
//!
//! - `scanner.rs` - the `Scanner` that produces tokens
//! - `token.rs` - `Token` and `TokenKind` definitions
//!
//! ```rust
//! use quill_engine::lexer::{tokenize, TokenKind};
//!
//! let tokens = tokenize("let x = 42;").unwrap();
//! assert_eq!(tokens[3].kind, TokenKind::Number(42.0));
//! assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
//! ```

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Span, TEMPLATE_SENTINEL, Token, TokenKind};

use crate::error::Result;

/// Converts `source` into tokens terminated by [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Scanner::new(source).tokenize()
}
