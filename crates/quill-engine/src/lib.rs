// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # quill-engine
//!
//! An embeddable scripting runtime for a JavaScript-like language.
//!
//! ## Overview
//!
//! - Lexer and recursive-descent parser producing an immutable AST
//! - Tree-walking interpreter with closures, labels and try/catch/finally
//! - Dynamic values: objects with a one-level prototype, arrays, functions
//!   and opaque host handles
//! - Host interop through statically declared binding tables with
//!   overload scoring
//! - A small runtime library (`Math`, `JSON`, `Object`, `Array`, `Date`, ...)
//! - A cooperative step/time budget in place of preemption
//!
//! ## Quick Start
//!
//! ```rust
//! use quill_engine::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.execute("function greet(name) { return 'hi ' + name; }").unwrap();
//!
//! let greet = engine.get_global("greet");
//! let result = engine.call(&greet, Value::Undefined, &[Value::from("quill")]).unwrap();
//! assert_eq!(result, Value::from("hi quill"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod config;
pub mod error;
pub mod interop;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;

pub use builtins::json::{from_json, to_json};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use interpreter::Interpreter;
pub use runtime::Value;

use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// A script engine: one global scope and the interpreter that runs code
/// against it.
///
/// Values produced by one engine must not be passed to another.
pub struct Engine {
    interpreter: Interpreter,
}

impl Engine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            interpreter: Interpreter::new(config),
        }
    }

    /// Parses and runs `source`, returning the value of the last expression
    /// statement (or of a top-level `return`).
    ///
    /// # Examples
    ///
    /// ```rust
    /// let mut engine = quill_engine::Engine::new();
    /// let value = engine.execute("const xs = [1, 2, 3]; xs.map(x => x * 2).join()").unwrap();
    /// assert_eq!(value.to_js_string(), "2,4,6");
    /// ```
    pub fn execute(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse_source(source)?;
        debug!(statements = program.body.len(), "parsed program");
        self.interpreter.run_program(&program)
    }

    /// Reads and runs a script file.
    pub fn execute_file(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        debug!(path = %path.display(), "executing file");
        let source = std::fs::read_to_string(path)?;
        self.execute(&source)
    }

    /// Creates or replaces a global binding.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.interpreter.global().define(name, value);
    }

    /// Reads a global binding; undefined when absent.
    pub fn get_global(&self, name: &str) -> Value {
        self.interpreter.global().get(name).unwrap_or_default()
    }

    /// Calls a script value from the host. The execution budget restarts
    /// for every call.
    pub fn call(&mut self, function: &Value, this: Value, args: &[Value]) -> Result<Value> {
        self.interpreter.call_from_host(function, this, args)
    }

    /// Installs a native function as a global.
    pub fn register_native<F>(&mut self, name: &str, arity: usize, func: F)
    where
        F: Fn(&mut Interpreter, Value, &[Value]) -> Result<Value> + 'static,
    {
        self.define_global(name, Value::native(name, arity, func));
    }

    /// Installs a host object as a global.
    pub fn define_host(&mut self, name: &str, object: Rc<dyn interop::HostObject>) {
        self.define_global(name, Value::host(object));
    }

    /// The underlying interpreter.
    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.interpreter.global().clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quiet() -> Engine {
        Engine::with_config(EngineConfig {
            console_echo: false,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_execute_returns_last_value() {
        let mut engine = quiet();
        assert_eq!(engine.execute("1 + 2").unwrap(), Value::from(3));
        assert_eq!(engine.execute("let x = 5;").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_globals_persist_between_executions() {
        let mut engine = quiet();
        engine.execute("var total = 10; function bump(n) { total += n; return total; }").unwrap();
        let bump = engine.get_global("bump");
        assert_eq!(engine.call(&bump, Value::Undefined, &[Value::from(5)]).unwrap(), Value::from(15));
        assert_eq!(engine.get_global("total"), Value::from(15));
        assert_eq!(engine.get_global("missing"), Value::Undefined);
    }

    #[test]
    fn test_register_native() {
        let mut engine = quiet();
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        engine.register_native("tally", 1, move |_, _, args| {
            seen.set(seen.get() + 1);
            Ok(Value::Number(args.first().map_or(0.0, Value::to_number) * 2.0))
        });
        assert_eq!(engine.execute("tally(4) + tally(1)").unwrap(), Value::from(10));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_errors_carry_lines() {
        let mut engine = quiet();
        let err = engine.execute("let a = 1;\nlet b = 2;\nnope();").unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert!(err.message().contains("nope is not defined"));

        let err = engine.execute("let = ;").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_execute_file() {
        let mut engine = quiet();
        let err = engine.execute_file("/definitely/not/here.js").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_call_non_function() {
        let mut engine = quiet();
        let err = engine.call(&Value::from(1), Value::Undefined, &[]).unwrap_err();
        assert!(err.message().contains("is not a function"));
    }
}
