//! The runtime library: globals installed into every engine.
//!
//! Each submodule owns one global (or a small family of them) and exposes a
//! `register` function. Builtins are plain functions with the native
//! callable signature, wrapped into function values at install time.

pub mod array;
pub mod boolean;
pub mod console;
pub mod date;
pub mod error;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;
pub mod timers;

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};

/// A builtin: interpreter, `this`, arguments.
pub type Builtin = fn(&mut Interpreter, Value, &[Value]) -> Result<Value>;

/// Installs the runtime library into the interpreter's global scope.
pub fn install(interp: &mut Interpreter) {
    let global = interp.global().clone();
    global::register(&global);
    console::register(&global);
    math::register(&global);
    json::register(&global);
    object::register(&global);
    array::register(&global);
    string::register(&global);
    number::register(&global);
    boolean::register(&global);
    date::register(&global);
    timers::register(&global);
    error::register(interp, &global);
}

/// Builds a plain object holding the given functions and constants.
pub(crate) fn namespace(functions: &[(&str, usize, Builtin)], constants: &[(&str, f64)]) -> Value {
    let mut entries: Vec<(&str, Value)> = constants
        .iter()
        .map(|&(name, value)| (name, Value::Number(value)))
        .collect();
    entries.extend(
        functions
            .iter()
            .map(|&(name, arity, func)| (name, Value::native(name, arity, func))),
    );
    Value::object_from(entries)
}

/// Wraps a builtin as a function value carrying static members.
pub(crate) fn constructor(name: &str, arity: usize, func: Builtin, statics: &[(&str, usize, Builtin)]) -> Value {
    let value = Value::native(name, arity, func);
    if let Value::Function(function) = &value {
        for &(member, member_arity, member_func) in statics {
            function.set(member, Value::native(member, member_arity, member_func));
        }
    }
    value
}

/// The argument at `index`, or undefined.
pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// The argument at `index` converted to a number; NaN when missing.
pub(crate) fn number_arg(args: &[Value], index: usize) -> f64 {
    args.get(index).map_or(f64::NAN, Value::to_number)
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::config::EngineConfig;
    use crate::interpreter::Interpreter;
    use crate::parser::parse_source;
    use crate::runtime::Value;

    /// Runs `source` in a fresh quiet interpreter.
    pub fn eval(source: &str) -> crate::error::Result<Value> {
        let config = EngineConfig {
            console_echo: false,
            ..EngineConfig::default()
        };
        let mut interp = Interpreter::new(config);
        let program = parse_source(source)?;
        interp.run_program(&program)
    }

    pub fn run(source: &str) -> Value {
        match eval(source) {
            Ok(value) => value,
            Err(err) => panic!("script failed: {err}"),
        }
    }

    #[test]
    fn test_globals_installed() {
        for name in [
            "console", "Math", "JSON", "Object", "Array", "String", "Number", "Boolean", "Date",
            "Error", "TypeError", "parseInt", "setTimeout",
        ] {
            assert_eq!(run(&format!("typeof {name} !== 'undefined'")), Value::from(true), "{name}");
        }
    }

    #[test]
    fn test_constructor_statics() {
        assert_eq!(run("typeof Array.isArray"), Value::from("function"));
        assert_eq!(run("Array.isArray.name"), Value::from("isArray"));
    }
}
