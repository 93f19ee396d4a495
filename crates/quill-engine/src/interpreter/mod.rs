//! The tree-walking interpreter.
//!
//! Statements produce a [`Completion`] that carries abrupt control flow
//! (return, break, continue, throw) up to the construct that consumes it.
//! Expressions produce `Result<Value>`: a script `throw` crossing a call
//! boundary travels as [`Error::Thrown`] while the thrown value itself waits
//! in the interpreter until a `catch` claims it.
//!
//! ## Structure
//!
//! - `statements` - statement execution, loops, labels, try/finally
//! - `expressions` - expression evaluation, calls, optional chains
//! - `operators` - arithmetic, bitwise and relational operators
//! - `comparison` - loose and strict equality
//! - `properties` - property access on every value kind
//! - `array_methods`, `string_methods`, `number_methods` - intrinsic methods

mod array_methods;
mod comparison;
mod expressions;
mod number_methods;
mod operators;
mod properties;
mod statements;
mod string_methods;

pub use comparison::{loose_equals, strict_equals};
pub use number_methods::format_radix;
pub use properties::own_keys;
pub use operators::{to_int32, to_uint32};
pub(crate) use operators::power;

use crate::ast::{FunctionBody, Program};
use crate::builtins;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::interop::Dispatcher;
use crate::runtime::function::Closure;
use crate::runtime::{Function, FunctionKind, Object, Scope, Value};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use tracing::trace;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Ran to the end, with the value of the last expression statement
    Normal(Value),
    /// `return`
    Return(Value),
    /// `break`, with its label if any
    Break(Option<String>),
    /// `continue`, with its label if any
    Continue(Option<String>),
    /// `throw`
    Thrown(Value),
}

impl Completion {
    /// Returns true for anything but [`Completion::Normal`].
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }
}

/// Steps and elapsed time since the current entry into the engine.
#[derive(Debug)]
struct Budget {
    steps: u64,
    started: Instant,
}

impl Budget {
    fn new() -> Self {
        Self {
            steps: 0,
            started: Instant::now(),
        }
    }
}

/// Executes programs and calls functions.
pub struct Interpreter {
    config: EngineConfig,
    global: Scope,
    /// The value of a `throw` in flight as [`Error::Thrown`]
    pending_throw: Option<Value>,
    budget: Budget,
    depth: usize,
    /// Line of the statement being executed
    line: usize,
    dispatcher: Dispatcher,
    error_prototypes: FxHashMap<String, Rc<RefCell<Object>>>,
}

impl Interpreter {
    /// Creates an interpreter with the runtime library installed.
    pub fn new(config: EngineConfig) -> Self {
        let mut interpreter = Self {
            config,
            global: Scope::new_global(),
            pending_throw: None,
            budget: Budget::new(),
            depth: 0,
            line: 0,
            dispatcher: Dispatcher::new(),
            error_prototypes: FxHashMap::default(),
        };
        builtins::install(&mut interpreter);
        interpreter
    }

    /// The configuration this interpreter runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The global scope.
    pub fn global(&self) -> &Scope {
        &self.global
    }

    /// The host member dispatcher.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Line of the statement currently executing.
    pub fn current_line(&self) -> usize {
        self.line
    }

    /// Restarts the step and time budget. Called on every entry from the
    /// embedder.
    pub fn reset_budget(&mut self) {
        self.budget = Budget::new();
    }

    /// Counts one step against the budget.
    pub(crate) fn tick(&mut self) -> Result<()> {
        self.budget.steps += 1;
        if let Some(max) = self.config.max_steps
            && self.budget.steps > max
        {
            return Err(Error::interrupted());
        }
        if let Some(limit) = self.config.time_limit
            && self.budget.steps % 256 == 0
            && self.budget.started.elapsed() > limit
        {
            return Err(Error::interrupted());
        }
        Ok(())
    }

    /// Runs a program in the global scope.
    ///
    /// The result is the value of the last expression statement, or the
    /// value of a top-level `return`.
    pub fn run_program(&mut self, program: &Program) -> Result<Value> {
        self.reset_budget();
        self.depth = 0;
        let global = self.global.clone();
        self.hoist_declarations(&program.body, &global);

        let completion = self.execute_block(&program.body, &global);
        let result = match completion {
            Ok(Completion::Normal(value) | Completion::Return(value)) => Ok(value),
            Ok(Completion::Break(_)) => {
                Err(Error::runtime("Illegal break statement").with_line(self.line))
            }
            Ok(Completion::Continue(_)) => {
                Err(Error::runtime("Illegal continue statement").with_line(self.line))
            }
            Ok(Completion::Thrown(value)) => Err(self.throw_value(value).with_line(self.line)),
            Err(err) => Err(err),
        };
        if result.is_err() {
            self.pending_throw = None;
        }
        result
    }

    /// Calls `callee` with a receiver and arguments.
    pub fn call_function(&mut self, callee: &Value, this: Value, args: &[Value]) -> Result<Value> {
        match callee {
            Value::Function(function) => self.call(function, this, args),
            other => Err(Error::type_error(format!(
                "{} is not a function",
                other.to_js_string()
            ))),
        }
    }

    /// Calls a function from the embedder: the budget restarts and a
    /// thrown value leaves as [`Error::Thrown`].
    pub fn call_from_host(&mut self, callee: &Value, this: Value, args: &[Value]) -> Result<Value> {
        self.reset_budget();
        let result = self.call_function(callee, this, args);
        if result.is_err() {
            self.pending_throw = None;
        }
        result
    }

    pub(crate) fn call(&mut self, function: &Rc<Function>, this: Value, args: &[Value]) -> Result<Value> {
        if self.depth >= self.config.max_call_depth {
            return Err(Error::runtime("RangeError: Maximum call stack size exceeded"));
        }
        self.tick()?;

        self.depth += 1;
        let result = self.invoke(function, this, args);
        self.depth -= 1;
        result
    }

    fn invoke(&mut self, function: &Rc<Function>, this: Value, args: &[Value]) -> Result<Value> {
        match &function.kind {
            FunctionKind::Native(native) => {
                let func = native.func.clone();
                func(self, this, args)
            }
            FunctionKind::Bound(bound) => {
                let mut merged = bound.args.clone();
                merged.extend_from_slice(args);
                let target = bound.target.clone();
                let this = bound.this.clone();
                self.invoke(&target, this, &merged)
            }
            FunctionKind::Closure(closure) => self.call_closure(function, closure, this, args),
        }
    }

    fn call_closure(
        &mut self,
        function: &Rc<Function>,
        closure: &Closure,
        this: Value,
        args: &[Value],
    ) -> Result<Value> {
        let literal = closure.literal.clone();
        trace!(name = function.name(), line = literal.line, "call");
        let scope = closure.scope.function_child();

        if !literal.is_arrow {
            if let Some(name) = &literal.name {
                scope.define(name.as_str(), Value::Function(function.clone()));
            }
            scope.define("this", this);
            scope.define("arguments", Value::array(args.to_vec()));
        }

        for (index, param) in literal.params.iter().enumerate() {
            let value = if param.rest {
                Value::array(args.get(index..).map(<[Value]>::to_vec).unwrap_or_default())
            } else {
                match (args.get(index), &param.default) {
                    (Some(arg), _) if !arg.is_undefined() => arg.clone(),
                    (_, Some(default)) => self.evaluate(default, &scope)?,
                    _ => Value::Undefined,
                }
            };
            scope.define(param.name.as_str(), value);
        }

        match &literal.body {
            FunctionBody::Expression(expr) => self.evaluate(expr, &scope),
            FunctionBody::Block(body) => {
                self.hoist_declarations(body, &scope);
                match self.execute_block(body, &scope)? {
                    Completion::Normal(_) => Ok(Value::Undefined),
                    Completion::Return(value) => Ok(value),
                    Completion::Thrown(value) => Err(self.throw_value(value).with_line(self.line)),
                    Completion::Break(_) => Err(Error::runtime("Illegal break statement")),
                    Completion::Continue(_) => Err(Error::runtime("Illegal continue statement")),
                }
            }
        }
    }

    /// Calls `callee` as a constructor.
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        let Value::Function(function) = callee else {
            return Err(Error::type_error(format!(
                "{} is not a constructor",
                callee.to_js_string()
            )));
        };
        if !function.is_constructor() {
            return Err(Error::type_error(format!(
                "{} is not a constructor",
                display_name(function)
            )));
        }

        let instance = match self.get_property(callee, "prototype")? {
            Value::Object(prototype) => Object::with_prototype(prototype),
            _ => Object::new(),
        };
        let instance = Value::Object(Rc::new(RefCell::new(instance)));
        let result = self.call(function, instance.clone(), args)?;
        Ok(match result {
            Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Host(_) => result,
            _ => instance,
        })
    }

    /// Stores `value` as the in-flight thrown value and returns the error
    /// that carries it to the nearest `catch`.
    pub(crate) fn throw_value(&mut self, value: Value) -> Error {
        let display = thrown_display(&value);
        self.pending_throw = Some(value);
        Error::Thrown {
            value: display,
            line: None,
        }
    }

    /// Converts a catchable error into the value a `catch` clause binds.
    /// Uncatchable errors come back unchanged.
    pub(crate) fn catch_value(&mut self, err: Error) -> std::result::Result<Value, Error> {
        match err {
            Error::Thrown { value, .. } => {
                Ok(self.pending_throw.take().unwrap_or(Value::String(value)))
            }
            Error::Runtime { message, .. } => {
                let (name, message) = split_error_name(&message);
                Ok(self.make_error(name, message))
            }
            other => Err(other),
        }
    }

    /// Creates an error object such as the ones `catch` receives.
    pub fn make_error(&mut self, name: &str, message: &str) -> Value {
        let mut error = Object::with_prototype(self.error_prototype(name));
        error.set("name", Value::from(name));
        error.set("message", Value::from(message));
        Value::Object(Rc::new(RefCell::new(error)))
    }

    /// The shared prototype of errors named `name`.
    pub fn error_prototype(&mut self, name: &str) -> Rc<RefCell<Object>> {
        self.error_prototypes
            .entry(name.to_string())
            .or_insert_with(|| {
                let mut prototype = Object::new();
                prototype.set(
                    "toString",
                    Value::native("toString", 0, |interp, this, _| {
                        let name = interp.get_property(&this, "name")?;
                        let message = interp.get_property(&this, "message")?;
                        let name = if name.is_undefined() {
                            "Error".to_string()
                        } else {
                            name.to_js_string()
                        };
                        let message = message.to_js_string();
                        Ok(Value::from(if message.is_empty() || message == "undefined" {
                            name
                        } else {
                            format!("{name}: {message}")
                        }))
                    }),
                );
                Rc::new(RefCell::new(prototype))
            })
            .clone()
    }

    /// Converts a value to a string, honoring a script-defined `toString`
    /// on objects.
    pub fn stringify(&mut self, value: &Value) -> Result<String> {
        if let Value::Object(object) = value {
            let method = object.borrow().get("toString");
            if let Some(method @ Value::Function(_)) = method {
                return Ok(self.call_function(&method, value.clone(), &[])?.to_js_string());
            }
        }
        Ok(value.to_js_string())
    }
}

/// Splits "TypeError: message" into its name and message.
fn split_error_name(message: &str) -> (&str, &str) {
    match message.split_once(": ") {
        Some((name, rest))
            if name.ends_with("Error") && name.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (name, rest)
        }
        _ => ("Error", message),
    }
}

/// The display form of a thrown value: "name: message" for error-like
/// objects, the plain string form otherwise.
fn thrown_display(value: &Value) -> String {
    if let Value::Object(object) = value {
        let object = object.borrow();
        if let Some(message) = object.get("message") {
            let name = object
                .get("name")
                .map_or_else(|| "Error".to_string(), |name| name.to_js_string());
            return format!("{name}: {}", message.to_js_string());
        }
    }
    value.to_js_string()
}

fn display_name(function: &Function) -> String {
    if function.name().is_empty() {
        "anonymous".to_string()
    } else {
        function.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::time::Duration;

    pub(super) fn run_with(config: EngineConfig, source: &str) -> Result<Value> {
        let program = parse_source(source)?;
        Interpreter::new(config).run_program(&program)
    }

    pub(super) fn run(source: &str) -> Value {
        run_with(EngineConfig::default(), source).unwrap()
    }

    pub(super) fn run_err(source: &str) -> Error {
        run_with(EngineConfig::default(), source).unwrap_err()
    }

    #[test]
    fn test_split_error_name() {
        assert_eq!(split_error_name("TypeError: x is not a function"), ("TypeError", "x is not a function"));
        assert_eq!(split_error_name("bad thing: here"), ("Error", "bad thing: here"));
        assert_eq!(split_error_name("plain"), ("Error", "plain"));
    }

    #[test]
    fn test_closure_captures_scope() {
        let result = run(
            "function counter() { let n = 0; return () => ++n; }
             const c = counter(); c(); c(); c()",
        );
        assert_eq!(result, Value::from(3));
    }

    #[test]
    fn test_parameters() {
        assert_eq!(run("function f(a, b) { return b; } f(1)"), Value::Undefined);
        assert_eq!(run("function f(a, b = 5) { return a + b; } f(1)"), Value::from(6));
        assert_eq!(run("function f(a, ...rest) { return rest.length; } f(1, 2, 3)"), Value::from(2));
        assert_eq!(run("function f() { return arguments.length; } f(1, 2, 3)"), Value::from(3));
    }

    #[test]
    fn test_this_binding() {
        assert_eq!(run("const o = { n: 2, get() { return this.n; } }; o.get()"), Value::from(2));
        assert_eq!(
            run("const o = { n: 4, get() { const f = () => this.n; return f(); } }; o.get()"),
            Value::from(4)
        );
    }

    #[test]
    fn test_named_function_expression_recursion() {
        let result = run("const fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); }; fact(5)");
        assert_eq!(result, Value::from(120));
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(run("1; return 7; 9"), Value::from(7));
    }

    #[test]
    fn test_stray_break_is_error() {
        let err = run_err("break;");
        assert!(err.message().contains("Illegal break"));
    }

    #[test]
    fn test_uncaught_throw() {
        let err = run_err("\n\nthrow new Error('boom');");
        assert!(matches!(err, Error::Thrown { .. }));
        assert_eq!(err.message(), "Error: boom");
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_construct() {
        let result = run(
            "function Point(x) { this.x = x; }
             Point.prototype.double = function () { return this.x * 2; };
             const p = new Point(21);
             p.double()",
        );
        assert_eq!(result, Value::from(42));
        assert_eq!(run("function P() {} new P() instanceof P"), Value::from(true));
        assert!(run_err("const f = () => 1; new f()").message().contains("not a constructor"));
    }

    #[test]
    fn test_constructor_returning_object() {
        assert_eq!(run("function F() { return { v: 1 }; } new F().v"), Value::from(1));
        assert_eq!(run("function F() { this.v = 2; return 5; } new F().v"), Value::from(2));
    }

    #[test]
    fn test_step_budget() {
        let config = EngineConfig {
            max_steps: Some(1_000),
            ..EngineConfig::default()
        };
        let err = run_with(config, "while (true) {}").unwrap_err();
        assert!(matches!(err, Error::Interrupted { .. }));
        assert_eq!(err.message(), "execution budget exceeded");
    }

    #[test]
    fn test_budget_not_catchable() {
        let config = EngineConfig {
            max_steps: Some(1_000),
            ..EngineConfig::default()
        };
        let err = run_with(config, "try { for (;;) {} } catch (e) { 'caught' } finally { x = 1 }")
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted { .. }));
    }

    #[test]
    fn test_time_budget() {
        let config = EngineConfig {
            time_limit: Some(Duration::from_millis(20)),
            ..EngineConfig::default()
        };
        let err = run_with(config, "let i = 0; while (true) { i++; }").unwrap_err();
        assert!(matches!(err, Error::Interrupted { .. }));
    }

    #[test]
    fn test_call_depth_limit() {
        let config = EngineConfig {
            max_call_depth: 32,
            ..EngineConfig::default()
        };
        let err = run_with(config, "function f() { return f(); } f()").unwrap_err();
        assert!(err.message().contains("Maximum call stack size exceeded"));
    }

    #[test]
    fn test_stringify_uses_script_to_string() {
        assert_eq!(
            run("const o = { toString() { return 'custom'; } }; `${o}` + '!'"),
            Value::from("custom!")
        );
    }
}
