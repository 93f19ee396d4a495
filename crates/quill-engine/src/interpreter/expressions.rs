//! Expression evaluation.

use super::Interpreter;
use crate::ast::{
    AssignmentExpression, CallExpression, Expression, Literal, LogicalOperator, MemberExpression,
    MemberProperty, ObjectMember, PropertyKey, TemplatePart, UnaryExpression, UnaryOperator,
    UpdateExpression, UpdateOperator,
};
use crate::error::{Error, Result};
use crate::runtime::value::number_to_string;
use crate::runtime::{Function, Object, Scope, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// An assignable location.
enum Reference {
    Variable(String),
    Property(Value, String),
}

impl Interpreter {
    /// Evaluates an expression to a value.
    pub(crate) fn evaluate(&mut self, expr: &Expression, scope: &Scope) -> Result<Value> {
        match expr {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Undefined => Value::Undefined,
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expression::Identifier(name) => scope
                .get(name)
                .ok_or_else(|| Error::reference_error(name)),
            Expression::This => Ok(scope.get("this").unwrap_or_default()),
            Expression::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expression(expr) => {
                            let value = self.evaluate(expr, scope)?;
                            out.push_str(&self.stringify(&value)?);
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expression::Array(elements) => {
                let values = self.evaluate_list(elements, scope)?;
                Ok(Value::array(values))
            }
            Expression::Object(members) => self.evaluate_object(members, scope),
            Expression::Function(literal) => Ok(Value::Function(Rc::new(Function::closure(
                literal.clone(),
                scope.clone(),
                None,
            )))),
            Expression::Unary(unary) => self.evaluate_unary(unary, scope),
            Expression::Update(update) => self.evaluate_update(update, scope),
            Expression::Binary(binary) => {
                let left = self.evaluate(&binary.left, scope)?;
                let right = self.evaluate(&binary.right, scope)?;
                self.binary(binary.operator, &left, &right)
            }
            Expression::Logical(logical) => {
                let left = self.evaluate(&logical.left, scope)?;
                let short_circuit = match logical.operator {
                    LogicalOperator::And => !left.to_boolean(),
                    LogicalOperator::Or => left.to_boolean(),
                    LogicalOperator::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right, scope)
                }
            }
            Expression::Assignment(assignment) => self.evaluate_assignment(assignment, scope),
            Expression::Conditional(conditional) => {
                if self.evaluate(&conditional.test, scope)?.to_boolean() {
                    self.evaluate(&conditional.consequent, scope)
                } else {
                    self.evaluate(&conditional.alternate, scope)
                }
            }
            Expression::Member(_) | Expression::Call(_) => {
                Ok(self.evaluate_chain(expr, scope)?.unwrap_or_default())
            }
            Expression::New(new) => {
                let callee = self.evaluate(&new.callee, scope)?;
                if !callee.is_function() {
                    return Err(Error::type_error(format!(
                        "{} is not a constructor",
                        describe(&new.callee)
                    )));
                }
                let args = self.evaluate_list(&new.arguments, scope)?;
                self.construct(&callee, &args)
            }
            Expression::Spread(inner) => self.evaluate(inner, scope),
            Expression::Sequence(expressions) => {
                let mut last = Value::Undefined;
                for expr in expressions {
                    last = self.evaluate(expr, scope)?;
                }
                Ok(last)
            }
        }
    }

    /// Evaluates `expr`, naming an anonymous function literal after the
    /// binding or property it is assigned to.
    pub(crate) fn evaluate_named(&mut self, expr: &Expression, name: &str, scope: &Scope) -> Result<Value> {
        match expr {
            Expression::Function(literal) if literal.name.is_none() => Ok(Value::Function(Rc::new(
                Function::closure(literal.clone(), scope.clone(), Some(name)),
            ))),
            other => self.evaluate(other, scope),
        }
    }

    /// Evaluates array elements or call arguments, expanding spreads.
    fn evaluate_list(&mut self, expressions: &[Expression], scope: &Scope) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(expressions.len());
        for expr in expressions {
            match expr {
                Expression::Spread(inner) => {
                    let spread = self.evaluate(inner, scope)?;
                    match spread {
                        Value::Array(array) => values.extend(array.borrow().elements.iter().cloned()),
                        Value::String(s) => values.extend(s.chars().map(|c| Value::String(c.to_string()))),
                        other => {
                            return Err(Error::type_error(format!(
                                "{} is not iterable",
                                other.type_of()
                            )));
                        }
                    }
                }
                other => values.push(self.evaluate(other, scope)?),
            }
        }
        Ok(values)
    }

    fn evaluate_object(&mut self, members: &[ObjectMember], scope: &Scope) -> Result<Value> {
        let mut object = Object::new();
        for member in members {
            match member {
                ObjectMember::Property(property) => {
                    let key = match &property.key {
                        PropertyKey::Static(key) => key.clone(),
                        PropertyKey::Computed(expr) => {
                            let key = self.evaluate(expr, scope)?;
                            self.property_key(&key)?
                        }
                    };
                    let value = self.evaluate_named(&property.value, &key, scope)?;
                    object.set(key, value);
                }
                ObjectMember::Spread(expr) => match self.evaluate(expr, scope)? {
                    Value::Object(source) => {
                        for (key, value) in source.borrow().properties() {
                            object.set(key.clone(), value.clone());
                        }
                    }
                    Value::Array(source) => {
                        let source = source.borrow();
                        for (index, value) in source.elements.iter().enumerate() {
                            object.set(index.to_string(), value.clone());
                        }
                        for (key, value) in source.properties() {
                            object.set(key.clone(), value.clone());
                        }
                    }
                    Value::String(s) => {
                        for (index, c) in s.chars().enumerate() {
                            object.set(index.to_string(), Value::String(c.to_string()));
                        }
                    }
                    _ => {}
                },
            }
        }
        Ok(Value::Object(Rc::new(RefCell::new(object))))
    }

    /// Converts a computed key to a property name.
    pub(crate) fn property_key(&mut self, key: &Value) -> Result<String> {
        match key {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(number_to_string(*n)),
            other => self.stringify(other),
        }
    }

    fn member_key(&mut self, property: &MemberProperty, scope: &Scope) -> Result<String> {
        match property {
            MemberProperty::Identifier(name) => Ok(name.clone()),
            MemberProperty::Computed(expr) => {
                let key = self.evaluate(expr, scope)?;
                self.property_key(&key)
            }
        }
    }

    /// Evaluates a member/call chain. `None` means an optional link met a
    /// nullish value and the rest of the chain was skipped.
    fn evaluate_chain(&mut self, expr: &Expression, scope: &Scope) -> Result<Option<Value>> {
        match expr {
            Expression::Member(member) => {
                Ok(self.evaluate_member(member, scope)?.map(|(_, value)| value))
            }
            Expression::Call(call) => self.evaluate_call(call, scope),
            other => self.evaluate(other, scope).map(Some),
        }
    }

    /// Returns the object and the property value.
    fn evaluate_member(&mut self, member: &MemberExpression, scope: &Scope) -> Result<Option<(Value, Value)>> {
        let Some(object) = self.evaluate_chain(&member.object, scope)? else {
            return Ok(None);
        };
        if member.optional && object.is_nullish() {
            return Ok(None);
        }
        let key = self.member_key(&member.property, scope)?;
        let value = self.get_property(&object, &key)?;
        Ok(Some((object, value)))
    }

    fn evaluate_call(&mut self, call: &CallExpression, scope: &Scope) -> Result<Option<Value>> {
        let (this, callee) = match &*call.callee {
            Expression::Member(member) => match self.evaluate_member(member, scope)? {
                Some(pair) => pair,
                None => return Ok(None),
            },
            other => match self.evaluate_chain(other, scope)? {
                Some(callee) => (Value::Undefined, callee),
                None => return Ok(None),
            },
        };
        if call.optional && callee.is_nullish() {
            return Ok(None);
        }

        let args = self.evaluate_list(&call.arguments, scope)?;
        match &callee {
            Value::Function(function) => self.call(function, this, &args).map(Some),
            _ => Err(Error::type_error(format!(
                "{} is not a function",
                describe(&call.callee)
            ))),
        }
    }

    fn evaluate_unary(&mut self, unary: &UnaryExpression, scope: &Scope) -> Result<Value> {
        match unary.operator {
            UnaryOperator::Typeof => {
                if let Expression::Identifier(name) = &*unary.argument
                    && !scope.has(name)
                {
                    return Ok(Value::from("undefined"));
                }
                let value = self.evaluate(&unary.argument, scope)?;
                Ok(Value::from(value.type_of()))
            }
            UnaryOperator::Delete => match &*unary.argument {
                Expression::Member(member) => {
                    let object = self.evaluate(&member.object, scope)?;
                    if member.optional && object.is_nullish() {
                        return Ok(Value::Boolean(true));
                    }
                    let key = self.member_key(&member.property, scope)?;
                    Ok(Value::Boolean(self.delete_property(&object, &key)?))
                }
                Expression::Identifier(_) => Ok(Value::Boolean(false)),
                other => {
                    self.evaluate(other, scope)?;
                    Ok(Value::Boolean(true))
                }
            },
            operator => {
                let value = self.evaluate(&unary.argument, scope)?;
                Ok(Self::unary(operator, &value))
            }
        }
    }

    fn reference(&mut self, target: &Expression, scope: &Scope) -> Result<Reference> {
        match target {
            Expression::Identifier(name) => Ok(Reference::Variable(name.clone())),
            Expression::Member(member) if !member.optional => {
                let object = self.evaluate(&member.object, scope)?;
                let key = self.member_key(&member.property, scope)?;
                if object.is_nullish() {
                    return Err(Error::type_error(format!(
                        "Cannot set properties of {} (setting '{key}')",
                        object.to_js_string()
                    )));
                }
                Ok(Reference::Property(object, key))
            }
            _ => Err(Error::runtime("Invalid assignment target")),
        }
    }

    fn read(&mut self, reference: &Reference, scope: &Scope) -> Result<Value> {
        match reference {
            Reference::Variable(name) => scope.get(name).ok_or_else(|| Error::reference_error(name)),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    fn write(&mut self, reference: &Reference, value: Value, scope: &Scope) -> Result<()> {
        match reference {
            Reference::Variable(name) => scope.set(name, value, self.config.implicit_globals),
            Reference::Property(object, key) => self.set_property(object, key, value),
        }
    }

    fn evaluate_assignment(&mut self, assignment: &AssignmentExpression, scope: &Scope) -> Result<Value> {
        let reference = self.reference(&assignment.target, scope)?;
        let value = match assignment.operator.binary_operator() {
            None => {
                let name = match &reference {
                    Reference::Variable(name) | Reference::Property(_, name) => name.clone(),
                };
                self.evaluate_named(&assignment.value, &name, scope)?
            }
            Some(operator) => {
                let current = self.read(&reference, scope)?;
                let operand = self.evaluate(&assignment.value, scope)?;
                self.binary(operator, &current, &operand)?
            }
        };
        self.write(&reference, value.clone(), scope)?;
        Ok(value)
    }

    fn evaluate_update(&mut self, update: &UpdateExpression, scope: &Scope) -> Result<Value> {
        let reference = self.reference(&update.argument, scope)?;
        let old = self.read(&reference, scope)?.to_number();
        let new = match update.operator {
            UpdateOperator::Increment => old + 1.0,
            UpdateOperator::Decrement => old - 1.0,
        };
        self.write(&reference, Value::Number(new), scope)?;
        Ok(Value::Number(if update.prefix { new } else { old }))
    }
}

/// Source-like text for an expression, used in error messages.
fn describe(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(name) => name.clone(),
        Expression::This => "this".to_string(),
        Expression::Member(member) => match &member.property {
            MemberProperty::Identifier(name) => format!("{}.{name}", describe(&member.object)),
            MemberProperty::Computed(_) => format!("{}[...]", describe(&member.object)),
        },
        Expression::Call(call) => format!("{}(...)", describe(&call.callee)),
        _ => "expression".to_string(),
    }
}
