//! The scanner that produces tokens from source text.

use super::token::TEMPLATE_SENTINEL;
use super::{Span, Token, TokenKind};
use crate::error::{Error, Result};

/// A scanner that tokenizes script source code.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    saw_newline: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            saw_newline: false,
        }
    }

    /// Creates a scanner whose line numbers start at `line`.
    ///
    /// Used when re-lexing a template interpolation so diagnostics point at
    /// the template's own line.
    pub fn starting_at_line(source: &'a str, line: usize) -> Self {
        Self {
            line,
            ..Self::new(source)
        }
    }

    /// Scans the whole input, ending with an [`TokenKind::Eof`] token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Result<Token> {
        self.saw_newline = false;
        self.skip_whitespace_and_comments()?;

        let start = self.current_pos;
        let line = self.line;
        let newline_before = self.saw_newline;

        let Some((_pos, ch)) = self.advance() else {
            let mut eof = Token::new(TokenKind::Eof, "", line, Span::new(start, start));
            eof.newline_before = newline_before;
            return Ok(eof);
        };

        let kind = match ch {
            // Single-character tokens
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,

            // Multi-character tokens
            '.' => self.scan_dot()?,
            '+' => self.scan_plus(),
            '-' => self.scan_minus(),
            '*' => self.scan_star(),
            '/' => self.scan_slash(),
            '%' => self.scan_percent(),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' => self.scan_ampersand(),
            '|' => self.scan_pipe(),
            '^' => self.scan_caret(),
            '?' => self.scan_question(),

            '"' | '\'' => self.scan_string(ch, line)?,
            '`' => self.scan_template(line)?,
            '0'..='9' => self.scan_number(ch)?,
            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => {
                return Err(Error::lex(format!("Unexpected character '{ch}'"), line));
            }
        };

        let span = Span::new(start, self.current_pos);
        let mut token = Token::new(kind, &self.source[start..self.current_pos], line, span);
        token.newline_before = newline_before;
        Ok(token)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.saw_newline = true;
            }
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if ch == '\n' || ch == '\r' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        let line = self.line;
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        let mut closed = false;
                        while let Some((_, ch)) = self.advance() {
                            if prev == '*' && ch == '/' {
                                closed = true;
                                break;
                            }
                            prev = ch;
                        }
                        if !closed {
                            return Err(Error::lex("Unterminated block comment", line));
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(())
    }

    fn scan_dot(&mut self) -> Result<TokenKind> {
        match self.peek() {
            Some('.') => {
                self.advance();
                if self.peek() == Some('.') {
                    self.advance();
                    Ok(TokenKind::Ellipsis)
                } else {
                    Err(Error::lex("Unexpected '..'", self.line))
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.scan_number('.'),
            _ => Ok(TokenKind::Dot),
        }
    }

    fn scan_plus(&mut self) -> TokenKind {
        match self.peek() {
            Some('+') => {
                self.advance();
                TokenKind::PlusPlus
            }
            Some('=') => {
                self.advance();
                TokenKind::PlusEqual
            }
            _ => TokenKind::Plus,
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        match self.peek() {
            Some('-') => {
                self.advance();
                TokenKind::MinusMinus
            }
            Some('=') => {
                self.advance();
                TokenKind::MinusEqual
            }
            _ => TokenKind::Minus,
        }
    }

    fn scan_star(&mut self) -> TokenKind {
        match self.peek() {
            Some('*') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::StarStarEqual
                } else {
                    TokenKind::StarStar
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::StarEqual
            }
            _ => TokenKind::Star,
        }
    }

    fn scan_slash(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::SlashEqual
        } else {
            TokenKind::Slash
        }
    }

    fn scan_percent(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::PercentEqual
        } else {
            TokenKind::Percent
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        match self.peek() {
            Some('<') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::LeftShiftEqual
                } else {
                    TokenKind::LeftShift
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::LessThanEqual
            }
            _ => TokenKind::LessThan,
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        match self.peek() {
            Some('>') => {
                self.advance();
                match self.peek() {
                    Some('>') => {
                        self.advance();
                        if self.peek() == Some('=') {
                            self.advance();
                            TokenKind::UnsignedRightShiftEqual
                        } else {
                            TokenKind::UnsignedRightShift
                        }
                    }
                    Some('=') => {
                        self.advance();
                        TokenKind::RightShiftEqual
                    }
                    _ => TokenKind::RightShift,
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::GreaterThanEqual
            }
            _ => TokenKind::GreaterThan,
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        match self.peek() {
            Some('=') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::StrictEqual
                } else {
                    TokenKind::EqualEqual
                }
            }
            Some('>') => {
                self.advance();
                TokenKind::Arrow
            }
            _ => TokenKind::Equal,
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        match self.peek() {
            Some('=') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::StrictNotEqual
                } else {
                    TokenKind::NotEqual
                }
            }
            _ => TokenKind::Bang,
        }
    }

    fn scan_ampersand(&mut self) -> TokenKind {
        match self.peek() {
            Some('&') => {
                self.advance();
                TokenKind::AmpersandAmpersand
            }
            Some('=') => {
                self.advance();
                TokenKind::AmpersandEqual
            }
            _ => TokenKind::Ampersand,
        }
    }

    fn scan_pipe(&mut self) -> TokenKind {
        match self.peek() {
            Some('|') => {
                self.advance();
                TokenKind::PipePipe
            }
            Some('=') => {
                self.advance();
                TokenKind::PipeEqual
            }
            _ => TokenKind::Pipe,
        }
    }

    fn scan_caret(&mut self) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            TokenKind::CaretEqual
        } else {
            TokenKind::Caret
        }
    }

    fn scan_question(&mut self) -> TokenKind {
        match self.peek() {
            Some('?') => {
                self.advance();
                TokenKind::QuestionQuestion
            }
            // `a?.5:1` is a conditional, not optional chaining
            Some('.') if !self.peek_next().is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                TokenKind::QuestionDot
            }
            _ => TokenKind::Question,
        }
    }

    fn scan_string(&mut self, quote: char, line: usize) -> Result<TokenKind> {
        let mut value = String::new();

        loop {
            match self.advance() {
                None | Some((_, '\n')) => {
                    return Err(Error::lex("Unterminated string literal", line));
                }
                Some((_, ch)) if ch == quote => break,
                Some((_, '\\')) => self.scan_escape(&mut value, line)?,
                Some((_, ch)) => value.push(ch),
            }
        }

        Ok(TokenKind::String(value))
    }

    fn scan_escape(&mut self, value: &mut String, line: usize) -> Result<()> {
        let Some((_, escaped)) = self.advance() else {
            return Err(Error::lex("Unterminated string literal", line));
        };
        match escaped {
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            '\\' => value.push('\\'),
            '\'' => value.push('\''),
            '"' => value.push('"'),
            '`' => value.push('`'),
            '0' => value.push('\0'),
            // line continuation
            '\n' => {}
            'x' => {
                let ch = self.scan_hex_escape(2, line)?;
                value.push(ch);
            }
            'u' => {
                let ch = if self.peek() == Some('{') {
                    self.advance();
                    let mut digits = String::new();
                    while let Some((_, ch)) = self.advance() {
                        if ch == '}' {
                            break;
                        }
                        digits.push(ch);
                    }
                    decode_code_point(&digits, line)?
                } else {
                    self.scan_hex_escape(4, line)?
                };
                value.push(ch);
            }
            other => {
                value.push('\\');
                value.push(other);
            }
        }
        Ok(())
    }

    fn scan_hex_escape(&mut self, count: usize, line: usize) -> Result<char> {
        let mut digits = String::with_capacity(count);
        for _ in 0..count {
            match self.advance() {
                Some((_, ch)) if ch.is_ascii_hexdigit() => digits.push(ch),
                _ => return Err(Error::lex("Invalid hexadecimal escape sequence", line)),
            }
        }
        decode_code_point(&digits, line)
    }

    /// Scans a template body. Literal text is copied with escapes resolved;
    /// each `${...}` contributes its raw source wrapped in the sentinel.
    fn scan_template(&mut self, line: usize) -> Result<TokenKind> {
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return Err(Error::lex("Unterminated template literal", line)),
                Some((_, '`')) => break,
                Some((_, '$')) if self.peek() == Some('{') => {
                    self.advance();
                    value.push(TEMPLATE_SENTINEL);
                    self.scan_template_expression(&mut value, line)?;
                    value.push(TEMPLATE_SENTINEL);
                }
                Some((_, '\\')) => {
                    let Some((_, escaped)) = self.advance() else {
                        return Err(Error::lex("Unterminated template literal", line));
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        '\\' => value.push('\\'),
                        '`' => value.push('`'),
                        '$' => value.push('$'),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                Some((_, TEMPLATE_SENTINEL)) => {
                    return Err(Error::lex(
                        "Template literal contains the reserved character U+0001",
                        self.line,
                    ));
                }
                Some((_, ch)) => value.push(ch),
            }
        }

        Ok(TokenKind::Template(value))
    }

    fn scan_template_expression(&mut self, value: &mut String, line: usize) -> Result<()> {
        let mut depth = 1usize;
        loop {
            let Some((_, ch)) = self.advance() else {
                return Err(Error::lex("Unterminated template expression", line));
            };
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                '"' | '\'' | '`' => {
                    // copy nested literals verbatim so their braces don't count
                    value.push(ch);
                    while let Some((_, inner)) = self.advance() {
                        value.push(inner);
                        if inner == '\\' {
                            if let Some((_, next)) = self.advance() {
                                value.push(next);
                            }
                        } else if inner == ch {
                            break;
                        }
                    }
                    continue;
                }
                TEMPLATE_SENTINEL => {
                    return Err(Error::lex(
                        "Template literal contains the reserved character U+0001",
                        self.line,
                    ));
                }
                _ => {}
            }
            value.push(ch);
        }
    }

    fn scan_number(&mut self, first: char) -> Result<TokenKind> {
        let line = self.line;
        let mut value = String::from(first);

        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => return self.scan_radix_number(16),
                Some('o' | 'O') => return self.scan_radix_number(8),
                Some('b' | 'B') => return self.scan_radix_number(2),
                _ => {}
            }
        }

        self.scan_digits(&mut value);

        if first != '.' && self.peek() == Some('.') {
            value.push('.');
            self.advance();
            self.scan_digits(&mut value);
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(Error::lex(format!("Malformed number '{value}'"), line));
            }
            self.scan_digits(&mut value);
        }

        if self.peek().is_some_and(is_id_start) {
            return Err(Error::lex(
                format!("Identifier starts immediately after number '{value}'"),
                line,
            ));
        }

        value
            .parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| Error::lex(format!("Malformed number '{value}'"), line))
    }

    fn scan_digits(&mut self, value: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                if ch != '_' {
                    value.push(ch);
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_radix_number(&mut self, radix: u32) -> Result<TokenKind> {
        let line = self.line;
        self.advance(); // consume the radix letter
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_digit(radix) || ch == '_' {
                if ch != '_' {
                    value.push(ch);
                }
                self.advance();
            } else {
                break;
            }
        }

        u64::from_str_radix(&value, radix)
            .map(|n| TokenKind::Number(n as f64))
            .map_err(|_| Error::lex(format!("Malformed number literal '{value}'"), line))
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::keyword(&name).unwrap_or(TokenKind::Identifier(name))
    }
}

fn decode_code_point(digits: &str, line: usize) -> Result<char> {
    u32::from_str_radix(digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| Error::lex(format!("Invalid escape code point '{digits}'"), line))
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("{ } ( )"),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let mut scanner = Scanner::new("42 3.14 0xff 0b1010 1e3 .5 2.5E-1");
        for expected in [42.0, 3.14, 255.0, 10.0, 1000.0, 0.5, 0.25] {
            assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Number(expected));
        }
    }

    #[test]
    fn test_strings_and_escapes() {
        let mut scanner = Scanner::new(r#""a\tb" 'it\'s' "\x41B" "\q""#);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::String("a\tb".into()));
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::String("it's".into()));
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::String("AB".into()));
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::String("\\q".into()));
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("function of $x undefined"),
            vec![
                TokenKind::Function,
                TokenKind::Identifier("of".into()),
                TokenKind::Identifier("$x".into()),
                TokenKind::Undefined,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("1 // one\n/* two\nlines */ 2"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn test_line_numbers_and_newline_flag() {
        let tokens = Scanner::new("a\n\nb /* x\n */ c").tokenize().unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
        assert!(tokens[1].newline_before);
        assert_eq!(tokens[2].line, 4);
        assert!(tokens[2].newline_before);
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds(">>>= **= ?? ?. => ..."),
            vec![
                TokenKind::UnsignedRightShiftEqual,
                TokenKind::StarStarEqual,
                TokenKind::QuestionQuestion,
                TokenKind::QuestionDot,
                TokenKind::Arrow,
                TokenKind::Ellipsis,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_template_marks_expressions() {
        let tokens = Scanner::new("`hi ${1 + {a:1}.a}!`").tokenize().unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Template("hi \u{1}1 + {a:1}.a\u{1}!".into())
        );
    }

    #[test]
    fn test_template_rejects_sentinel() {
        let err = Scanner::new("`a\u{1}b`").tokenize().unwrap_err();
        assert!(matches!(err, Error::Lex { line: 1, .. }));
    }

    #[test]
    fn test_unknown_character_reports_line() {
        let err = Scanner::new("let a = 1;\nlet b = @;").tokenize().unwrap_err();
        match err {
            Error::Lex { message, line } => {
                assert!(message.contains('@'));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        assert!(Scanner::new("'abc").tokenize().is_err());
    }
}
