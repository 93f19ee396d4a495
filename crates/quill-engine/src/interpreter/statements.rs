//! Statement execution.

use super::{Completion, Interpreter};
use crate::ast::{
    ForEachStatement, ForStatement, Statement, StatementNode, SwitchStatement, TryStatement,
    VariableDeclaration, VariableKind, WhileStatement,
};
use crate::error::{Error, Result};
use crate::runtime::{Function, Scope, Value};
use std::rc::Rc;

impl Interpreter {
    /// Binds function declarations and `var` names of a statement list
    /// before it runs.
    pub(crate) fn hoist_declarations(&mut self, body: &[StatementNode], scope: &Scope) {
        self.hoist_functions(body, scope);
        hoist_vars(body, scope);
    }

    fn hoist_functions(&mut self, body: &[StatementNode], scope: &Scope) {
        for statement in body {
            if let Statement::FunctionDeclaration(literal) = &statement.node {
                let function = Function::closure(literal.clone(), scope.clone(), None);
                scope.define(function.name().to_string(), Value::Function(Rc::new(function)));
            }
        }
    }

    /// Executes statements in order, stopping at the first abrupt completion.
    pub(crate) fn execute_block(&mut self, body: &[StatementNode], scope: &Scope) -> Result<Completion> {
        let mut last = Value::Undefined;
        for statement in body {
            match self.execute(statement, scope)? {
                Completion::Normal(value) => {
                    if !matches!(
                        statement.node,
                        Statement::VariableDeclaration(_)
                            | Statement::FunctionDeclaration(_)
                            | Statement::Empty
                    ) {
                        last = value;
                    }
                }
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal(last))
    }

    /// Executes a statement list in a fresh child scope.
    fn execute_scoped(&mut self, body: &[StatementNode], scope: &Scope) -> Result<Completion> {
        let inner = scope.child();
        self.hoist_functions(body, &inner);
        self.execute_block(body, &inner)
    }

    /// Executes one statement, attributing errors to its line.
    pub(crate) fn execute(&mut self, statement: &StatementNode, scope: &Scope) -> Result<Completion> {
        self.execute_labeled(statement, scope, &[])
    }

    fn execute_labeled(
        &mut self,
        statement: &StatementNode,
        scope: &Scope,
        labels: &[String],
    ) -> Result<Completion> {
        self.line = statement.line;
        self.execute_node(&statement.node, scope, labels)
            .map_err(|err| err.with_line(statement.line))
    }

    fn execute_node(&mut self, node: &Statement, scope: &Scope, labels: &[String]) -> Result<Completion> {
        match node {
            Statement::Expression(expr) => Ok(Completion::Normal(self.evaluate(expr, scope)?)),
            Statement::VariableDeclaration(declaration) => {
                self.declare(declaration, scope)?;
                Ok(Completion::Normal(Value::Undefined))
            }
            Statement::FunctionDeclaration(_) | Statement::Empty => {
                Ok(Completion::Normal(Value::Undefined))
            }
            Statement::Block(body) => self.execute_scoped(body, scope),
            Statement::If(stmt) => {
                if self.evaluate(&stmt.test, scope)?.to_boolean() {
                    self.execute(&stmt.consequent, scope)
                } else if let Some(alternate) = &stmt.alternate {
                    self.execute(alternate, scope)
                } else {
                    Ok(Completion::Normal(Value::Undefined))
                }
            }
            Statement::Switch(stmt) => self.execute_switch(stmt, scope),
            Statement::While(stmt) => self.execute_while(stmt, scope, labels),
            Statement::DoWhile(stmt) => self.execute_do_while(stmt, scope, labels),
            Statement::For(stmt) => self.execute_for(stmt, scope, labels),
            Statement::ForIn(stmt) => self.execute_for_in(stmt, scope, labels),
            Statement::ForOf(stmt) => self.execute_for_of(stmt, scope, labels),
            Statement::Return(argument) => {
                let value = match argument {
                    Some(expr) => self.evaluate(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Break(label) => Ok(Completion::Break(label.clone())),
            Statement::Continue(label) => Ok(Completion::Continue(label.clone())),
            Statement::Throw(expr) => Ok(Completion::Thrown(self.evaluate(expr, scope)?)),
            Statement::Try(stmt) => self.execute_try(stmt, scope),
            Statement::Labeled(labeled) => {
                let mut own = labels.to_vec();
                own.push(labeled.label.clone());
                let completion = self.execute_labeled(&labeled.body, scope, &own)?;
                Ok(match completion {
                    Completion::Break(Some(label)) if label == labeled.label => {
                        Completion::Normal(Value::Undefined)
                    }
                    other => other,
                })
            }
        }
    }

    fn declare(&mut self, declaration: &VariableDeclaration, scope: &Scope) -> Result<()> {
        for declarator in &declaration.declarations {
            let value = match &declarator.init {
                Some(init) => Some(self.evaluate_named(init, &declarator.name, scope)?),
                None => None,
            };
            match declaration.kind {
                VariableKind::Var => scope.define_var(&declarator.name, value),
                VariableKind::Let => scope.define(declarator.name.as_str(), value.unwrap_or_default()),
                VariableKind::Const => {
                    scope.define_const(declarator.name.as_str(), value.unwrap_or_default())
                }
            }
        }
        Ok(())
    }

    fn execute_while(&mut self, stmt: &WhileStatement, scope: &Scope, labels: &[String]) -> Result<Completion> {
        loop {
            self.tick()?;
            if !self.evaluate(&stmt.test, scope)?.to_boolean() {
                return Ok(Completion::Normal(Value::Undefined));
            }
            let completion = self.execute(&stmt.body, scope)?;
            if let Some(exit) = loop_exit(completion, labels) {
                return Ok(exit);
            }
        }
    }

    fn execute_do_while(
        &mut self,
        stmt: &WhileStatement,
        scope: &Scope,
        labels: &[String],
    ) -> Result<Completion> {
        loop {
            self.tick()?;
            let completion = self.execute(&stmt.body, scope)?;
            if let Some(exit) = loop_exit(completion, labels) {
                return Ok(exit);
            }
            if !self.evaluate(&stmt.test, scope)?.to_boolean() {
                return Ok(Completion::Normal(Value::Undefined));
            }
        }
    }

    /// A classic `for`. `let` bindings of the initializer are copied into
    /// a fresh scope per iteration, so closures see that iteration's value.
    fn execute_for(&mut self, stmt: &ForStatement, scope: &Scope, labels: &[String]) -> Result<Completion> {
        let loop_scope = scope.child();
        let mut per_iteration = Vec::new();
        if let Some(init) = &stmt.init {
            if let Statement::VariableDeclaration(declaration) = &init.node
                && declaration.kind == VariableKind::Let
            {
                per_iteration = declaration
                    .declarations
                    .iter()
                    .map(|declarator| declarator.name.clone())
                    .collect();
            }
            self.execute(init, &loop_scope)?;
        }

        loop {
            self.tick()?;
            if let Some(test) = &stmt.test
                && !self.evaluate(test, &loop_scope)?.to_boolean()
            {
                return Ok(Completion::Normal(Value::Undefined));
            }

            let iteration = loop_scope.child();
            for name in &per_iteration {
                iteration.define(name.as_str(), loop_scope.get(name).unwrap_or_default());
            }
            let completion = self.execute(&stmt.body, &iteration)?;
            for name in &per_iteration {
                loop_scope.define(name.as_str(), iteration.get(name).unwrap_or_default());
            }
            if let Some(exit) = loop_exit(completion, labels) {
                return Ok(exit);
            }

            if let Some(update) = &stmt.update {
                self.evaluate(update, &loop_scope)?;
            }
        }
    }

    fn bind_loop_variable(&mut self, stmt: &ForEachStatement, scope: &Scope, iteration: &Scope, value: Value) -> Result<()> {
        match stmt.kind {
            Some(VariableKind::Let) => iteration.define(stmt.name.as_str(), value),
            Some(VariableKind::Const) => iteration.define_const(stmt.name.as_str(), value),
            Some(VariableKind::Var) => scope.define_var(&stmt.name, Some(value)),
            None => scope.set(&stmt.name, value, self.config.implicit_globals)?,
        }
        Ok(())
    }

    /// Iterates own keys: object keys in insertion order, array indices
    /// then properties, string indices.
    fn execute_for_in(&mut self, stmt: &ForEachStatement, scope: &Scope, labels: &[String]) -> Result<Completion> {
        let object = self.evaluate(&stmt.right, scope)?;
        let keys = match &object {
            Value::Object(object) => object.borrow().keys(),
            Value::Array(array) => array.borrow().keys(),
            Value::Function(function) => function.properties().keys().cloned().collect(),
            Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };

        for key in keys {
            self.tick()?;
            let iteration = scope.child();
            self.bind_loop_variable(stmt, scope, &iteration, Value::String(key))?;
            let completion = self.execute(&stmt.body, &iteration)?;
            if let Some(exit) = loop_exit(completion, labels) {
                return Ok(exit);
            }
        }
        Ok(Completion::Normal(Value::Undefined))
    }

    /// Iterates array elements (live, by index) or string characters.
    fn execute_for_of(&mut self, stmt: &ForEachStatement, scope: &Scope, labels: &[String]) -> Result<Completion> {
        let iterable = self.evaluate(&stmt.right, scope)?;
        let mut index = 0;
        let chars: Vec<char> = match &iterable {
            Value::String(s) => s.chars().collect(),
            Value::Array(_) => Vec::new(),
            other => {
                return Err(Error::type_error(format!(
                    "{} is not iterable",
                    other.type_of()
                )));
            }
        };

        loop {
            let item = match &iterable {
                Value::Array(array) => array.borrow().elements.get(index).cloned(),
                _ => chars.get(index).map(|c| Value::String(c.to_string())),
            };
            let Some(item) = item else {
                return Ok(Completion::Normal(Value::Undefined));
            };
            index += 1;

            self.tick()?;
            let iteration = scope.child();
            self.bind_loop_variable(stmt, scope, &iteration, item)?;
            let completion = self.execute(&stmt.body, &iteration)?;
            if let Some(exit) = loop_exit(completion, labels) {
                return Ok(exit);
            }
        }
    }

    /// Cases match with strict equality and fall through until `break`.
    fn execute_switch(&mut self, stmt: &SwitchStatement, scope: &Scope) -> Result<Completion> {
        let discriminant = self.evaluate(&stmt.discriminant, scope)?;

        let mut start = None;
        for (index, case) in stmt.cases.iter().enumerate() {
            if let Some(test) = &case.test
                && super::strict_equals(&discriminant, &self.evaluate(test, scope)?)
            {
                start = Some(index);
                break;
            }
        }
        let start = start.or_else(|| stmt.cases.iter().position(|case| case.test.is_none()));
        let Some(start) = start else {
            return Ok(Completion::Normal(Value::Undefined));
        };

        let inner = scope.child();
        for case in &stmt.cases {
            self.hoist_functions(&case.consequent, &inner);
        }
        let mut last = Value::Undefined;
        for case in &stmt.cases[start..] {
            match self.execute_block(&case.consequent, &inner)? {
                Completion::Normal(value) => last = value,
                Completion::Break(None) => return Ok(Completion::Normal(last)),
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal(last))
    }

    /// `finally` runs once whatever the outcome, except when the budget ran
    /// out. An abrupt completion from `finally` replaces the pending one.
    fn execute_try(&mut self, stmt: &TryStatement, scope: &Scope) -> Result<Completion> {
        let mut outcome = self.execute_scoped(&stmt.block, scope);

        if let Some(handler) = &stmt.handler {
            let pending = std::mem::replace(&mut outcome, Ok(Completion::Normal(Value::Undefined)));
            let caught = match pending {
                Ok(Completion::Thrown(value)) => Some(Ok(value)),
                Err(err) if err.is_catchable() => Some(self.catch_value(err)),
                other => {
                    outcome = other;
                    None
                }
            };
            if let Some(caught) = caught {
                outcome = match caught {
                    Ok(value) => {
                        let catch_scope = scope.child();
                        if let Some(param) = &handler.param {
                            catch_scope.define(param.as_str(), value);
                        }
                        self.hoist_functions(&handler.body, &catch_scope);
                        self.execute_block(&handler.body, &catch_scope)
                    }
                    Err(err) => Err(err),
                };
            }
        }

        let Some(finalizer) = &stmt.finalizer else {
            return outcome;
        };
        if let Err(err) = &outcome
            && !err.is_catchable()
        {
            return outcome;
        }

        let pending = self.pending_throw.take();
        match self.execute_scoped(finalizer, scope)? {
            Completion::Normal(_) => {
                if pending.is_some() {
                    self.pending_throw = pending;
                }
                outcome
            }
            abrupt => Ok(abrupt),
        }
    }
}

/// Decides what a loop does after its body completed. `None` continues
/// with the next iteration; `Some` ends the loop with that completion.
fn loop_exit(completion: Completion, labels: &[String]) -> Option<Completion> {
    match completion {
        Completion::Normal(_) => None,
        Completion::Continue(None) => None,
        Completion::Continue(Some(label)) if labels.contains(&label) => None,
        Completion::Break(None) => Some(Completion::Normal(Value::Undefined)),
        Completion::Break(Some(label)) if labels.contains(&label) => {
            Some(Completion::Normal(Value::Undefined))
        }
        abrupt => Some(abrupt),
    }
}

/// Declares every `var` of a function body up front, without descending
/// into nested functions.
fn hoist_vars(body: &[StatementNode], scope: &Scope) {
    for statement in body {
        hoist_statement_vars(&statement.node, scope);
    }
}

fn hoist_statement_vars(node: &Statement, scope: &Scope) {
    match node {
        Statement::VariableDeclaration(declaration) if declaration.kind == VariableKind::Var => {
            for declarator in &declaration.declarations {
                scope.define_var(&declarator.name, None);
            }
        }
        Statement::Block(body) => hoist_vars(body, scope),
        Statement::If(stmt) => {
            hoist_statement_vars(&stmt.consequent.node, scope);
            if let Some(alternate) = &stmt.alternate {
                hoist_statement_vars(&alternate.node, scope);
            }
        }
        Statement::While(stmt) | Statement::DoWhile(stmt) => hoist_statement_vars(&stmt.body.node, scope),
        Statement::For(stmt) => {
            if let Some(init) = &stmt.init {
                hoist_statement_vars(&init.node, scope);
            }
            hoist_statement_vars(&stmt.body.node, scope);
        }
        Statement::ForIn(stmt) | Statement::ForOf(stmt) => {
            if stmt.kind == Some(VariableKind::Var) {
                scope.define_var(&stmt.name, None);
            }
            hoist_statement_vars(&stmt.body.node, scope);
        }
        Statement::Switch(stmt) => {
            for case in &stmt.cases {
                hoist_vars(&case.consequent, scope);
            }
        }
        Statement::Try(stmt) => {
            hoist_vars(&stmt.block, scope);
            if let Some(handler) = &stmt.handler {
                hoist_vars(&handler.body, scope);
            }
            if let Some(finalizer) = &stmt.finalizer {
                hoist_vars(finalizer, scope);
            }
        }
        Statement::Labeled(labeled) => hoist_statement_vars(&labeled.body.node, scope),
        _ => {}
    }
}
