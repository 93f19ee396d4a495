//! The `console` object.
//!
//! Every call is recorded as a debug-level `tracing` event under the
//! `quill::console` target. With `console_echo` enabled the line is also
//! written to stdout (`log`, `info`, `debug`) or stderr (`warn`, `error`).

use super::{Builtin, namespace};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};
use tracing::debug;

pub fn register(global: &Scope) {
    const METHODS: &[(&str, usize, Builtin)] = &[
        ("log", 0, log),
        ("info", 0, info),
        ("debug", 0, debug),
        ("warn", 0, warn),
        ("error", 0, error),
    ];
    global.define("console", namespace(METHODS, &[]));
}

/// Joins arguments the way the console shows them: top-level strings bare,
/// everything else inspected.
pub fn format_line(args: &[Value]) -> String {
    args.iter().map(Value::inspect).collect::<Vec<_>>().join(" ")
}

fn emit(interp: &Interpreter, level: &str, args: &[Value]) {
    let line = format_line(args);
    debug!(target: "quill::console", level, "{line}");
    if interp.config().console_echo {
        match level {
            "warn" | "error" => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }
}

fn log(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    emit(interp, "log", args);
    Ok(Value::Undefined)
}

fn info(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    emit(interp, "info", args);
    Ok(Value::Undefined)
}

fn debug(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    emit(interp, "debug", args);
    Ok(Value::Undefined)
}

fn warn(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    emit(interp, "warn", args);
    Ok(Value::Undefined)
}

fn error(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    emit(interp, "error", args);
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::super::tests::run;
    use super::*;

    #[test]
    fn test_format_line() {
        let args = [
            Value::from("count:"),
            Value::from(3),
            Value::array(vec![Value::from("a"), Value::from(1)]),
        ];
        assert_eq!(format_line(&args), "count: 3 [ 'a', 1 ]");
        assert_eq!(format_line(&[]), "");
    }

    #[test]
    fn test_console_returns_undefined() {
        assert_eq!(run("console.log('x', 1)"), Value::Undefined);
        assert_eq!(run("console.error({ a: 1 })"), Value::Undefined);
    }
}
