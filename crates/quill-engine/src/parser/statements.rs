//! Statement parsing.

use super::Parser;
use crate::ast::*;
use crate::error::Result;
use crate::lexer::TokenKind;
use std::rc::Rc;

impl Parser {
    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<StatementNode> {
        self.nested(Self::parse_statement_level)
    }

    fn parse_statement_level(&mut self) -> Result<StatementNode> {
        let line = self.line();
        let statement = match self.kind() {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let declaration = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Statement::VariableDeclaration(declaration)
            }
            TokenKind::Function => self.parse_function_declaration()?,
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::Switch => self.parse_switch_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Do => self.parse_do_while_statement()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Break => Statement::Break(self.parse_jump_label()?),
            TokenKind::Continue => Statement::Continue(self.parse_jump_label()?),
            TokenKind::Throw => {
                self.advance();
                let argument = self.parse_expression()?;
                self.consume_semicolon()?;
                Statement::Throw(argument)
            }
            TokenKind::Try => self.parse_try_statement()?,
            TokenKind::LeftBrace => Statement::Block(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
                Statement::Empty
            }
            TokenKind::Identifier(label) if matches!(self.peek_kind(1), TokenKind::Colon) => {
                let label = label.clone();
                self.advance();
                self.advance();
                let body = self.parse_statement()?;
                Statement::Labeled(LabeledStatement {
                    label,
                    body: Box::new(body),
                })
            }
            _ => {
                let expression = self.parse_expression()?;
                self.consume_semicolon()?;
                Statement::Expression(expression)
            }
        };
        Ok(Spanned::new(statement, line))
    }

    /// Parses `{ ... }` into its statement list.
    pub(super) fn parse_block(&mut self) -> Result<Vec<StatementNode>> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    /// Parses `break`/`continue` and the optional label on the same line.
    fn parse_jump_label(&mut self) -> Result<Option<String>> {
        self.advance();
        let label = match self.kind() {
            TokenKind::Identifier(label) if !self.current().newline_before => {
                let label = label.clone();
                self.advance();
                Some(label)
            }
            _ => None,
        };
        self.consume_semicolon()?;
        Ok(label)
    }

    fn parse_variable_kind(&mut self) -> Option<VariableKind> {
        let kind = match self.kind() {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => return None,
        };
        self.advance();
        Some(kind)
    }

    /// Parses a declaration without its terminating semicolon, so `for`
    /// headers can reuse it.
    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration> {
        let Some(kind) = self.parse_variable_kind() else {
            return Err(self.unexpected("variable keyword"));
        };

        let mut declarations = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat(&TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { name, init });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_function_declaration(&mut self) -> Result<Statement> {
        let line = self.line();
        self.advance(); // consume 'function'
        let name = self.expect_identifier()?;
        let function = self.parse_function_rest(Some(name), line)?;
        Ok(Statement::FunctionDeclaration(Rc::new(function)))
    }

    /// Parses `(params) { body }` after a function's name.
    pub(super) fn parse_function_rest(
        &mut self,
        name: Option<String>,
        line: usize,
    ) -> Result<FunctionLiteral> {
        let params = self.parse_parameters()?;
        let body = self.parse_block()?;
        Ok(FunctionLiteral {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            line,
        })
    }

    /// Parses a parenthesized parameter list with defaults and a trailing rest.
    pub(super) fn parse_parameters(&mut self) -> Result<Vec<Param>> {
        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();

        while !self.check(&TokenKind::RightParen) {
            let rest = self.eat(&TokenKind::Ellipsis);
            let name = self.expect_identifier()?;
            let default = if !rest && self.eat(&TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            params.push(Param {
                name,
                default,
                rest,
            });
            if rest || !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RightParen)?;
        Ok(params)
    }

    fn parse_if_statement(&mut self) -> Result<Statement> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement> {
        self.advance(); // consume 'switch'
        self.expect(&TokenKind::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::LeftBrace)?;

        let mut cases = Vec::new();
        while !self.eat(&TokenKind::RightBrace) {
            let test = if self.eat(&TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.eat(&TokenKind::Default) {
                None
            } else {
                return Err(self.unexpected("Case"));
            };
            self.expect(&TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !matches!(
                self.kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, consequent });
        }

        Ok(Statement::Switch(SwitchStatement {
            discriminant,
            cases,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement> {
        self.advance(); // consume 'do'
        let body = Box::new(self.parse_statement()?);
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.eat(&TokenKind::Semicolon);
        Ok(Statement::DoWhile(WhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        if let Some(statement) = self.try_parse_for_each()? {
            return Ok(statement);
        }

        let init_line = self.line();
        let init = match self.kind() {
            TokenKind::Semicolon => None,
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let declaration = self.parse_variable_declaration()?;
                Some(Box::new(Spanned::new(
                    Statement::VariableDeclaration(declaration),
                    init_line,
                )))
            }
            _ => {
                let expression = self.parse_expression()?;
                Some(Box::new(Spanned::new(
                    Statement::Expression(expression),
                    init_line,
                )))
            }
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    /// Recognizes `[var|let|const] name in|of expr)` by lookahead, leaving the
    /// position untouched when the header is a classic three-clause one.
    fn try_parse_for_each(&mut self) -> Result<Option<Statement>> {
        let start = self.pos;
        let kind = self.parse_variable_kind();

        let TokenKind::Identifier(name) = self.kind() else {
            self.pos = start;
            return Ok(None);
        };
        let name = name.clone();

        let is_of = match self.peek_kind(1) {
            TokenKind::In => false,
            TokenKind::Identifier(word) if word == "of" => true,
            _ => {
                self.pos = start;
                return Ok(None);
            }
        };
        self.advance(); // name
        self.advance(); // in / of

        let right = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        let each = ForEachStatement {
            kind,
            name,
            right,
            body,
        };
        Ok(Some(if is_of {
            Statement::ForOf(each)
        } else {
            Statement::ForIn(each)
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement> {
        self.advance(); // consume 'return'
        let token = self.current();
        let argument = if matches!(
            token.kind,
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) || token.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::Return(argument))
    }

    fn parse_try_statement(&mut self) -> Result<Statement> {
        self.advance(); // consume 'try'
        let block = self.parse_block()?;

        let handler = if self.eat(&TokenKind::Catch) {
            let param = if self.eat(&TokenKind::LeftParen) {
                let name = self.expect_identifier()?;
                self.expect(&TokenKind::RightParen)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("Catch or Finally"));
        }

        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::error::Error;
    use crate::parser::parse_source;

    fn parse_ok(src: &str) -> Program {
        parse_source(src).unwrap_or_else(|e| panic!("failed to parse {src:?}: {e}"))
    }

    fn parse_stmt(src: &str) -> Statement {
        parse_ok(src).body.remove(0).node
    }

    fn parse_err(src: &str) -> Error {
        parse_source(src).expect_err("expected a parse error")
    }

    #[test]
    fn test_parse_var_let_const() {
        for (src, kind) in [
            ("var a = 1;", VariableKind::Var),
            ("let a = 1;", VariableKind::Let),
            ("const a = 1;", VariableKind::Const),
        ] {
            match parse_stmt(src) {
                Statement::VariableDeclaration(decl) => assert_eq!(decl.kind, kind),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_multiple_declarators() {
        match parse_stmt("var a = 1, b, c = a;") {
            Statement::VariableDeclaration(decl) => {
                assert_eq!(decl.declarations.len(), 3);
                assert!(decl.declarations[1].init.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_optional_semicolons() {
        let program = parse_ok("var a = 1\nvar b = 2\nfunction f() { return a }");
        assert_eq!(program.body.len(), 3);
        assert_eq!(program.body[1].line, 2);
        assert_eq!(program.body[2].line, 3);
    }

    #[test]
    fn test_missing_semicolon_on_same_line() {
        assert!(matches!(parse_err("var a = 1 var b = 2"), Error::Parse { .. }));
    }

    #[test]
    fn test_return_before_newline_has_no_argument() {
        let program = parse_ok("function f() { return\n1 }");
        let Statement::FunctionDeclaration(func) = &program.body[0].node else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &func.body else {
            panic!("expected block body");
        };
        assert_eq!(body[0].node, Statement::Return(None));
    }

    #[test]
    fn test_function_declaration_params() {
        match parse_stmt("function f(a, b = 2, ...rest) {}") {
            Statement::FunctionDeclaration(func) => {
                assert_eq!(func.name.as_deref(), Some("f"));
                assert_eq!(func.params.len(), 3);
                assert!(func.params[1].default.is_some());
                assert!(func.params[2].rest);
                assert_eq!(func.arity(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_for_variants() {
        assert!(matches!(parse_stmt("for (let i = 0; i < 3; i++) {}"), Statement::For(_)));
        assert!(matches!(parse_stmt("for (;;) {}"), Statement::For(_)));
        assert!(matches!(parse_stmt("for (var k in obj) {}"), Statement::ForIn(_)));
        assert!(matches!(parse_stmt("for (const v of arr) {}"), Statement::ForOf(_)));
        match parse_stmt("for (k in obj) {}") {
            Statement::ForIn(each) => {
                assert_eq!(each.name, "k");
                assert!(each.kind.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_switch() {
        match parse_stmt("switch (x) { case 1: a(); case 2: b(); break; default: c(); }") {
            Statement::Switch(switch) => {
                assert_eq!(switch.cases.len(), 3);
                assert_eq!(switch.cases[1].consequent.len(), 2);
                assert!(switch.cases[2].test.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_try_forms() {
        match parse_stmt("try { a(); } catch (e) { b(); } finally { c(); }") {
            Statement::Try(t) => {
                assert_eq!(t.handler.unwrap().param.as_deref(), Some("e"));
                assert!(t.finalizer.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_stmt("try {} catch { }"), Statement::Try(_)));
        assert!(matches!(parse_err("try {}"), Error::Parse { .. }));
    }

    #[test]
    fn test_labels() {
        match parse_stmt("outer: for (;;) { break outer; }") {
            Statement::Labeled(labeled) => {
                assert_eq!(labeled.label, "outer");
                assert!(matches!(labeled.body.node, Statement::For(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parse_stmt("continue\nfoo"), Statement::Continue(None));
    }

    #[test]
    fn test_do_while() {
        assert!(matches!(parse_stmt("do { x++ } while (x < 3)"), Statement::DoWhile(_)));
    }

    #[test]
    fn test_unclosed_block_is_error() {
        let err = parse_err("function f() {\n  return 1;\n");
        assert_eq!(err.line(), Some(3));
    }
}
