//! Recursive-descent parser producing the AST.
//!
//! The parser walks a pre-scanned token vector by index, so speculative
//! parses (arrow parameter lists) can rewind by restoring a saved position.
//!
//! - `statements` - statement forms (declarations, loops, try, switch)
//! - `expressions` - the precedence ladder, literals, calls and templates
//!
//! ```rust
//! use quill_engine::parser::parse_source;
//!
//! let program = parse_source("let x = 1 + 2;").expect("should parse");
//! assert_eq!(program.body.len(), 1);
//! ```

mod expressions;
mod statements;

use crate::ast::Program;
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind, tokenize};

/// Parses a complete program from source text.
pub fn parse_source(source: &str) -> Result<Program> {
    Parser::new(tokenize(source)?).parse_program()
}

/// Deepest nesting of statements and expressions the parser accepts.
pub const MAX_NESTING: usize = 256;

/// A recursive descent parser over a token vector.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Creates a parser over `tokens`, which must end with [`TokenKind::Eof`].
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(Token::new(
                TokenKind::Eof,
                "",
                line,
                crate::lexer::Span::new(end, end),
            ));
        }
        Self { tokens, pos: 0, depth: 0 }
    }

    /// Parses the tokens into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(Error::parse("Nesting too deep", self.line()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn current(&self) -> &Token {
        // `new` guarantees a trailing Eof and `advance` never moves past it
        &self.tokens[self.pos]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn line(&self) -> usize {
        self.current().line
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("{kind:?}")))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        if let TokenKind::Identifier(name) = self.kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("Identifier"))
        }
    }

    /// Accepts an identifier or any reserved word, as allowed after `.` and
    /// as an object literal key.
    fn expect_property_name(&mut self) -> Result<String> {
        let token = self.current();
        let is_word = match &token.kind {
            TokenKind::Identifier(_) => true,
            kind => {
                kind.is_keyword()
                    || matches!(
                        kind,
                        TokenKind::True | TokenKind::False | TokenKind::Null | TokenKind::Undefined
                    )
            }
        };
        if is_word {
            let name = token.lexeme.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("property name"))
        }
    }

    /// Ends a statement: an explicit `;`, or an implied one before `}`, at
    /// end of input, or at a line break.
    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat(&TokenKind::Semicolon) {
            return Ok(());
        }
        let token = self.current();
        if matches!(token.kind, TokenKind::RightBrace | TokenKind::Eof) || token.newline_before {
            Ok(())
        } else {
            Err(self.unexpected("Semicolon"))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        Error::parse(format!("Expected {expected}, found {found}"), token.line)
    }
}
