//! Expression parsing: precedence climbing from assignment down to primaries.

use super::Parser;
use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::{Scanner, TEMPLATE_SENTINEL, TokenKind};
use crate::runtime::value::number_to_string;
use std::rc::Rc;

type Operand = fn(&mut Parser) -> Result<Expression>;

impl Parser {
    /// Parses a full expression, including comma sequences.
    pub fn parse_expression(&mut self) -> Result<Expression> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.eat(&TokenKind::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expression::Sequence(expressions))
    }

    /// Parses an assignment-level expression (no top-level commas).
    pub(super) fn parse_assignment(&mut self) -> Result<Expression> {
        self.nested(Self::parse_assignment_level)
    }

    fn parse_assignment_level(&mut self) -> Result<Expression> {
        if let TokenKind::Identifier(name) = self.kind()
            && matches!(self.peek_kind(1), TokenKind::Arrow)
        {
            let line = self.line();
            let param = Param {
                name: name.clone(),
                default: None,
                rest: false,
            };
            self.advance(); // name
            self.advance(); // =>
            return self.finish_arrow(vec![param], line);
        }

        if self.check(&TokenKind::LeftParen)
            && let Some(arrow) = self.try_parse_arrow()?
        {
            return Ok(arrow);
        }

        let line = self.line();
        let target = self.parse_conditional()?;

        let Some(operator) = assignment_operator(self.kind()) else {
            return Ok(target);
        };
        if !is_assignment_target(&target) {
            return Err(Error::parse("Invalid assignment target", line));
        }
        self.advance();

        let value = self.parse_assignment()?;
        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            target: Box::new(target),
            value: Box::new(value),
        }))
    }

    /// Tries `(params) =>`, rewinding to the `(` if the tokens turn out to
    /// be a parenthesized expression instead.
    fn try_parse_arrow(&mut self) -> Result<Option<Expression>> {
        let start = self.pos;
        let line = self.line();

        let params = match self.parse_parameters() {
            Ok(params) if self.check(&TokenKind::Arrow) => params,
            _ => {
                self.pos = start;
                return Ok(None);
            }
        };
        self.advance(); // =>

        self.finish_arrow(params, line).map(Some)
    }

    fn finish_arrow(&mut self, params: Vec<Param>, line: usize) -> Result<Expression> {
        let body = if self.check(&TokenKind::LeftBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(Expression::Function(Rc::new(FunctionLiteral {
            name: None,
            params,
            body,
            is_arrow: true,
            line,
        })))
    }

    fn parse_conditional(&mut self) -> Result<Expression> {
        let test = self.parse_logical_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }

        let consequent = self.parse_assignment()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(Expression::Conditional(ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }))
    }

    /// `||` and `??` share a precedence level.
    fn parse_logical_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_logical_and()?;
        loop {
            let operator = match self.kind() {
                TokenKind::PipePipe => LogicalOperator::Or,
                TokenKind::QuestionQuestion => LogicalOperator::Nullish,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_logical_and()?;
            left = logical(operator, left, right);
        }
    }

    fn parse_logical_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_bitwise_or()?;
        while self.eat(&TokenKind::AmpersandAmpersand) {
            let right = self.parse_bitwise_or()?;
            left = logical(LogicalOperator::And, left, right);
        }
        Ok(left)
    }

    /// Parses one left-associative binary level.
    fn parse_binary_level(
        &mut self,
        operand: Operand,
        operator_for: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> Result<Expression> {
        let mut left = operand(self)?;
        while let Some(operator) = operator_for(self.kind()) {
            self.advance();
            let right = operand(self)?;
            left = binary(operator, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_bitwise_xor, |kind| {
            matches!(kind, TokenKind::Pipe).then_some(BinaryOperator::BitwiseOr)
        })
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_bitwise_and, |kind| {
            matches!(kind, TokenKind::Caret).then_some(BinaryOperator::BitwiseXor)
        })
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_equality, |kind| {
            matches!(kind, TokenKind::Ampersand).then_some(BinaryOperator::BitwiseAnd)
        })
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_relational, |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOperator::Equal),
            TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
            TokenKind::StrictEqual => Some(BinaryOperator::StrictEqual),
            TokenKind::StrictNotEqual => Some(BinaryOperator::StrictNotEqual),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_shift, |kind| match kind {
            TokenKind::LessThan => Some(BinaryOperator::LessThan),
            TokenKind::LessThanEqual => Some(BinaryOperator::LessThanEqual),
            TokenKind::GreaterThan => Some(BinaryOperator::GreaterThan),
            TokenKind::GreaterThanEqual => Some(BinaryOperator::GreaterThanEqual),
            TokenKind::In => Some(BinaryOperator::In),
            TokenKind::Instanceof => Some(BinaryOperator::Instanceof),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::LeftShift => Some(BinaryOperator::LeftShift),
            TokenKind::RightShift => Some(BinaryOperator::RightShift),
            TokenKind::UnsignedRightShift => Some(BinaryOperator::UnsignedRightShift),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        self.parse_binary_level(Self::parse_exponent, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            TokenKind::Percent => Some(BinaryOperator::Modulo),
            _ => None,
        })
    }

    /// `**` is right-associative.
    fn parse_exponent(&mut self) -> Result<Expression> {
        let base = self.parse_unary()?;
        if !self.eat(&TokenKind::StarStar) {
            return Ok(base);
        }
        let exponent = self.nested(Self::parse_exponent)?;
        Ok(binary(BinaryOperator::Exponent, base, exponent))
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let operator = match self.kind() {
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Tilde => UnaryOperator::BitwiseNot,
            TokenKind::Typeof => UnaryOperator::Typeof,
            TokenKind::Void => UnaryOperator::Void,
            TokenKind::Delete => UnaryOperator::Delete,
            TokenKind::PlusPlus | TokenKind::MinusMinus => return self.parse_prefix_update(),
            _ => return self.parse_postfix(),
        };
        self.advance();
        let argument = self.nested(Self::parse_unary)?;
        Ok(Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(argument),
        }))
    }

    fn parse_prefix_update(&mut self) -> Result<Expression> {
        let line = self.line();
        let operator = update_operator(self.kind());
        self.advance();
        let argument = self.nested(Self::parse_unary)?;
        if !is_assignment_target(&argument) {
            return Err(Error::parse("Invalid update target", line));
        }
        Ok(Expression::Update(UpdateExpression {
            operator,
            prefix: true,
            argument: Box::new(argument),
        }))
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let line = self.line();
        let expression = self.parse_call_member()?;

        let token = self.current();
        if !matches!(token.kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
            || token.newline_before
        {
            return Ok(expression);
        }
        if !is_assignment_target(&expression) {
            return Err(Error::parse("Invalid update target", line));
        }
        let operator = update_operator(&token.kind);
        self.advance();

        Ok(Expression::Update(UpdateExpression {
            operator,
            prefix: false,
            argument: Box::new(expression),
        }))
    }

    fn parse_call_member(&mut self) -> Result<Expression> {
        let mut expression = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.kind() {
                TokenKind::LeftParen => {
                    let arguments = self.parse_arguments()?;
                    expression = call(expression, arguments, false);
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_property_name()?;
                    expression = member(expression, MemberProperty::Identifier(name), false);
                }
                TokenKind::LeftBracket => {
                    let property = self.parse_computed_property()?;
                    expression = member(expression, property, false);
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    expression = match self.kind() {
                        TokenKind::LeftParen => {
                            let arguments = self.parse_arguments()?;
                            call(expression, arguments, true)
                        }
                        TokenKind::LeftBracket => {
                            let property = self.parse_computed_property()?;
                            member(expression, property, true)
                        }
                        _ => {
                            let name = self.expect_property_name()?;
                            member(expression, MemberProperty::Identifier(name), true)
                        }
                    };
                }
                _ => return Ok(expression),
            }
        }
    }

    /// `new Callee(args)`; the callee is a member chain without calls.
    fn parse_new(&mut self) -> Result<Expression> {
        self.advance(); // consume 'new'

        let mut callee = if self.check(&TokenKind::New) {
            self.nested(Self::parse_new)?
        } else {
            self.parse_primary()?
        };
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_property_name()?;
                    callee = member(callee, MemberProperty::Identifier(name), false);
                }
                TokenKind::LeftBracket => {
                    let property = self.parse_computed_property()?;
                    callee = member(callee, property, false);
                }
                _ => break,
            }
        }

        let arguments = if self.check(&TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expression::New(NewExpression {
            callee: Box::new(callee),
            arguments,
        }))
    }

    fn parse_computed_property(&mut self) -> Result<MemberProperty> {
        self.expect(&TokenKind::LeftBracket)?;
        let property = self.parse_expression()?;
        self.expect(&TokenKind::RightBracket)?;
        Ok(MemberProperty::Computed(Box::new(property)))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>> {
        self.expect(&TokenKind::LeftParen)?;
        let mut arguments = Vec::new();
        while !self.check(&TokenKind::RightParen) {
            arguments.push(self.parse_element()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(arguments)
    }

    /// An argument or array element, which may be a spread.
    fn parse_element(&mut self) -> Result<Expression> {
        if self.eat(&TokenKind::Ellipsis) {
            Ok(Expression::Spread(Box::new(self.parse_assignment()?)))
        } else {
            self.parse_assignment()
        }
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.current();
        let line = token.line;
        let expression = match &token.kind {
            TokenKind::Number(n) => Expression::Literal(Literal::Number(*n)),
            TokenKind::String(s) => Expression::Literal(Literal::String(s.clone())),
            TokenKind::True => Expression::Literal(Literal::Boolean(true)),
            TokenKind::False => Expression::Literal(Literal::Boolean(false)),
            TokenKind::Null => Expression::Literal(Literal::Null),
            TokenKind::Undefined => Expression::Literal(Literal::Undefined),
            TokenKind::Identifier(name) => Expression::Identifier(name.clone()),
            TokenKind::This => Expression::This,
            TokenKind::Template(raw) => {
                let raw = raw.clone();
                self.advance();
                return parse_template(&raw, line);
            }
            TokenKind::Function => return self.parse_function_expression(),
            TokenKind::LeftParen => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expression);
            }
            TokenKind::LeftBracket => return self.parse_array_literal(),
            TokenKind::LeftBrace => return self.parse_object_literal(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expression)
    }

    fn parse_function_expression(&mut self) -> Result<Expression> {
        let line = self.line();
        self.advance(); // consume 'function'
        let name = match self.kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let function = self.parse_function_rest(name, line)?;
        Ok(Expression::Function(Rc::new(function)))
    }

    fn parse_array_literal(&mut self) -> Result<Expression> {
        self.expect(&TokenKind::LeftBracket)?;
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBracket) {
            if self.check(&TokenKind::Comma) {
                // hole
                self.advance();
                elements.push(Expression::Literal(Literal::Undefined));
                continue;
            }
            elements.push(self.parse_element()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut members = Vec::new();

        while !self.check(&TokenKind::RightBrace) {
            members.push(self.parse_object_member()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RightBrace)?;
        Ok(Expression::Object(members))
    }

    fn parse_object_member(&mut self) -> Result<ObjectMember> {
        if self.eat(&TokenKind::Ellipsis) {
            return Ok(ObjectMember::Spread(self.parse_assignment()?));
        }

        let line = self.line();
        let mut shorthand = None;
        let key = match self.kind() {
            TokenKind::LeftBracket => {
                self.advance();
                let key = self.parse_assignment()?;
                self.expect(&TokenKind::RightBracket)?;
                PropertyKey::Computed(Box::new(key))
            }
            TokenKind::String(s) => {
                let key = s.clone();
                self.advance();
                PropertyKey::Static(key)
            }
            TokenKind::Number(n) => {
                let key = number_to_string(*n);
                self.advance();
                PropertyKey::Static(key)
            }
            TokenKind::Identifier(name) => {
                shorthand = Some(name.clone());
                PropertyKey::Static(self.expect_property_name()?)
            }
            _ => PropertyKey::Static(self.expect_property_name()?),
        };

        let value = if self.eat(&TokenKind::Colon) {
            self.parse_assignment()?
        } else if self.check(&TokenKind::LeftParen) {
            let name = match &key {
                PropertyKey::Static(name) => Some(name.clone()),
                PropertyKey::Computed(_) => None,
            };
            Expression::Function(Rc::new(self.parse_function_rest(name, line)?))
        } else if let Some(name) = shorthand {
            Expression::Identifier(name)
        } else {
            return Err(self.unexpected("Colon"));
        };

        Ok(ObjectMember::Property(Property { key, value }))
    }
}

/// Splits a template payload on the sentinel; odd segments are expression
/// sources, which are scanned and parsed on their own.
fn parse_template(raw: &str, line: usize) -> Result<Expression> {
    let mut parts = Vec::new();
    for (index, segment) in raw.split(TEMPLATE_SENTINEL).enumerate() {
        if index % 2 == 0 {
            if !segment.is_empty() {
                parts.push(TemplatePart::Text(segment.to_string()));
            }
            continue;
        }

        let tokens = Scanner::starting_at_line(segment, line).tokenize()?;
        let mut parser = Parser::new(tokens);
        let expression = parser.parse_expression()?;
        if !parser.is_at_end() {
            return Err(parser.unexpected("'}' closing template expression"));
        }
        parts.push(TemplatePart::Expression(expression));
    }
    Ok(Expression::Template(parts))
}

fn assignment_operator(kind: &TokenKind) -> Option<AssignmentOperator> {
    let operator = match kind {
        TokenKind::Equal => AssignmentOperator::Assign,
        TokenKind::PlusEqual => AssignmentOperator::AddAssign,
        TokenKind::MinusEqual => AssignmentOperator::SubtractAssign,
        TokenKind::StarEqual => AssignmentOperator::MultiplyAssign,
        TokenKind::SlashEqual => AssignmentOperator::DivideAssign,
        TokenKind::PercentEqual => AssignmentOperator::ModuloAssign,
        TokenKind::StarStarEqual => AssignmentOperator::ExponentAssign,
        TokenKind::LeftShiftEqual => AssignmentOperator::LeftShiftAssign,
        TokenKind::RightShiftEqual => AssignmentOperator::RightShiftAssign,
        TokenKind::UnsignedRightShiftEqual => AssignmentOperator::UnsignedRightShiftAssign,
        TokenKind::AmpersandEqual => AssignmentOperator::BitwiseAndAssign,
        TokenKind::PipeEqual => AssignmentOperator::BitwiseOrAssign,
        TokenKind::CaretEqual => AssignmentOperator::BitwiseXorAssign,
        _ => return None,
    };
    Some(operator)
}

fn update_operator(kind: &TokenKind) -> UpdateOperator {
    if matches!(kind, TokenKind::MinusMinus) {
        UpdateOperator::Decrement
    } else {
        UpdateOperator::Increment
    }
}

fn is_assignment_target(expression: &Expression) -> bool {
    matches!(
        expression,
        Expression::Identifier(_) | Expression::Member(MemberExpression { optional: false, .. })
    )
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
    Expression::Logical(LogicalExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn call(callee: Expression, arguments: Vec<Expression>, optional: bool) -> Expression {
    Expression::Call(CallExpression {
        callee: Box::new(callee),
        arguments,
        optional,
    })
}

fn member(object: Expression, property: MemberProperty, optional: bool) -> Expression {
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property,
        optional,
    })
}
