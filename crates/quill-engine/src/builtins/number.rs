//! The `Number` conversion function, its predicates and constants.

use super::global::{parse_float, parse_int};
use super::{Builtin, constructor};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn register(global: &Scope) {
    const STATICS: &[(&str, usize, Builtin)] = &[
        ("isInteger", 1, is_integer),
        ("isSafeInteger", 1, is_safe_integer),
        ("isFinite", 1, is_finite),
        ("isNaN", 1, is_nan),
        ("parseFloat", 1, parse_float),
        ("parseInt", 2, parse_int),
    ];
    let number = constructor("Number", 1, to_number, STATICS);
    if let Value::Function(function) = &number {
        for (name, value) in [
            ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
            ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("EPSILON", f64::EPSILON),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ] {
            function.set(name, Value::Number(value));
        }
    }
    global.define("Number", number);
}

fn to_number(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
}

/// The number argument, without coercion.
fn strict_number(args: &[Value]) -> Option<f64> {
    match args.first() {
        Some(Value::Number(n)) => Some(*n),
        _ => None,
    }
}

fn is_integer(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(strict_number(args).is_some_and(|n| n.is_finite() && n.fract() == 0.0)))
}

fn is_safe_integer(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(
        strict_number(args).is_some_and(|n| n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER),
    ))
}

fn is_finite(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(strict_number(args).is_some_and(f64::is_finite)))
}

fn is_nan(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(strict_number(args).is_some_and(f64::is_nan)))
}

#[cfg(test)]
mod tests {
    use super::super::tests::run;
    use super::*;

    #[test]
    fn test_number_conversion() {
        assert_eq!(run("Number('  42 ')"), Value::from(42));
        assert_eq!(run("Number()"), Value::from(0));
        assert_eq!(run("Number(true)"), Value::from(1));
        assert_eq!(run("Number('0x10')"), Value::from(16));
        assert_eq!(run("isNaN(Number('abc'))"), Value::from(true));
    }

    #[test]
    fn test_predicates_do_not_coerce() {
        assert_eq!(run("Number.isInteger(5)"), Value::from(true));
        assert_eq!(run("Number.isInteger(5.5)"), Value::from(false));
        assert_eq!(run("Number.isInteger('5')"), Value::from(false));
        assert_eq!(run("Number.isNaN('abc')"), Value::from(false));
        assert_eq!(run("Number.isNaN(NaN)"), Value::from(true));
        assert_eq!(run("Number.isFinite(Infinity)"), Value::from(false));
        assert_eq!(run("Number.isSafeInteger(Number.MAX_SAFE_INTEGER + 2)"), Value::from(false));
    }

    #[test]
    fn test_shared_parsers() {
        assert_eq!(run("Number.parseInt('ff', 16)"), Value::from(255));
        assert_eq!(run("Number.parseFloat('2.5kg')"), Value::from(2.5));
    }
}
