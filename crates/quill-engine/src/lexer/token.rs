//! Token definitions for the lexer.

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source text the token was scanned from
    pub lexeme: String,
    /// 1-based line the token starts on
    pub line: usize,
    /// True when at least one line break separates this token from the previous one
    pub newline_before: bool,
    /// The span in the source code
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            newline_before: false,
            span,
        }
    }
}

/// The private marker that brackets each interpolated expression inside a
/// [`TokenKind::Template`] payload.
pub const TEMPLATE_SENTINEL: char = '\u{1}';

/// The different kinds of tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal (integer or floating point)
    Number(f64),
    /// String literal with escapes resolved
    String(String),
    /// Template literal; expression sources are wrapped in [`TEMPLATE_SENTINEL`]
    Template(String),
    /// Boolean true
    True,
    /// Boolean false
    False,
    /// null
    Null,
    /// undefined
    Undefined,

    /// Identifier
    Identifier(String),

    // Keywords
    Break,
    Case,
    Catch,
    Const,
    Continue,
    Default,
    Delete,
    Do,
    Else,
    Finally,
    For,
    Function,
    If,
    In,
    Instanceof,
    Let,
    New,
    Return,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,

    // Punctuation
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// .
    Dot,
    /// ...
    Ellipsis,
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// <
    LessThan,
    /// >
    GreaterThan,
    /// <=
    LessThanEqual,
    /// >=
    GreaterThanEqual,
    /// ==
    EqualEqual,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// **
    StarStar,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// >>>
    UnsignedRightShift,
    /// &
    Ampersand,
    /// |
    Pipe,
    /// ^
    Caret,
    /// !
    Bang,
    /// ~
    Tilde,
    /// &&
    AmpersandAmpersand,
    /// ||
    PipePipe,
    /// ??
    QuestionQuestion,
    /// ?
    Question,
    /// ?.
    QuestionDot,
    /// :
    Colon,
    /// =
    Equal,
    /// +=
    PlusEqual,
    /// -=
    MinusEqual,
    /// *=
    StarEqual,
    /// /=
    SlashEqual,
    /// %=
    PercentEqual,
    /// **=
    StarStarEqual,
    /// <<=
    LeftShiftEqual,
    /// >>=
    RightShiftEqual,
    /// >>>=
    UnsignedRightShiftEqual,
    /// &=
    AmpersandEqual,
    /// |=
    PipeEqual,
    /// ^=
    CaretEqual,
    /// =>
    Arrow,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Maps a word to its keyword token, if it is one.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "catch" => TokenKind::Catch,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "default" => TokenKind::Default,
            "delete" => TokenKind::Delete,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "in" => TokenKind::In,
            "instanceof" => TokenKind::Instanceof,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "switch" => TokenKind::Switch,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "try" => TokenKind::Try,
            "typeof" => TokenKind::Typeof,
            "undefined" => TokenKind::Undefined,
            "var" => TokenKind::Var,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Break
                | TokenKind::Case
                | TokenKind::Catch
                | TokenKind::Const
                | TokenKind::Continue
                | TokenKind::Default
                | TokenKind::Delete
                | TokenKind::Do
                | TokenKind::Else
                | TokenKind::Finally
                | TokenKind::For
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::In
                | TokenKind::Instanceof
                | TokenKind::Let
                | TokenKind::New
                | TokenKind::Return
                | TokenKind::Switch
                | TokenKind::This
                | TokenKind::Throw
                | TokenKind::Try
                | TokenKind::Typeof
                | TokenKind::Var
                | TokenKind::Void
                | TokenKind::While
        )
    }

    /// Returns true if this token is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Template(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Undefined
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len() {
        let span = Span::new(5, 15);
        assert_eq!(span.len(), 10);
        assert!(Span::new(5, 5).is_empty());
    }

    #[test]
    fn test_token_new() {
        let token = Token::new(TokenKind::Number(42.0), "42", 3, Span::new(0, 2));
        assert_eq!(token.kind, TokenKind::Number(42.0));
        assert_eq!(token.lexeme, "42");
        assert_eq!(token.line, 3);
        assert!(!token.newline_before);
    }

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword("while"), Some(TokenKind::While));
        assert_eq!(TokenKind::keyword("undefined"), Some(TokenKind::Undefined));
        assert_eq!(TokenKind::keyword("of"), None);
        assert_eq!(TokenKind::keyword("class"), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(TokenKind::If.is_keyword());
        assert!(TokenKind::Typeof.is_keyword());
        assert!(!TokenKind::Plus.is_keyword());
        assert!(!TokenKind::Identifier("x".to_string()).is_keyword());
        assert!(!TokenKind::True.is_keyword());
    }

    #[test]
    fn test_is_literal() {
        assert!(TokenKind::Number(1.0).is_literal());
        assert!(TokenKind::Template("a".to_string()).is_literal());
        assert!(TokenKind::Undefined.is_literal());
        assert!(!TokenKind::Arrow.is_literal());
        assert!(!TokenKind::Eof.is_literal());
    }
}
