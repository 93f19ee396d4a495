//! The `Math` object.

use super::{Builtin, namespace, number_arg};
use crate::error::Result;
use crate::interpreter::{Interpreter, power};
use crate::runtime::{Scope, Value};
use std::f64::consts;

const CONSTANTS: &[(&str, f64)] = &[
    ("E", consts::E),
    ("LN10", consts::LN_10),
    ("LN2", consts::LN_2),
    ("LOG2E", consts::LOG2_E),
    ("LOG10E", consts::LOG10_E),
    ("PI", consts::PI),
    ("SQRT1_2", consts::FRAC_1_SQRT_2),
    ("SQRT2", consts::SQRT_2),
];

const FUNCTIONS: &[(&str, usize, Builtin)] = &[
    ("abs", 1, abs),
    ("acos", 1, acos),
    ("asin", 1, asin),
    ("atan", 1, atan),
    ("atan2", 2, atan2),
    ("cbrt", 1, cbrt),
    ("ceil", 1, ceil),
    ("cos", 1, cos),
    ("exp", 1, exp),
    ("floor", 1, floor),
    ("hypot", 2, hypot),
    ("log", 1, log),
    ("log2", 1, log2),
    ("log10", 1, log10),
    ("max", 2, max),
    ("min", 2, min),
    ("pow", 2, pow),
    ("random", 0, random),
    ("round", 1, round),
    ("sign", 1, sign),
    ("sin", 1, sin),
    ("sqrt", 1, sqrt),
    ("tan", 1, tan),
    ("trunc", 1, trunc),
];

pub fn register(global: &Scope) {
    global.define("Math", namespace(FUNCTIONS, CONSTANTS));
}

macro_rules! unary {
    ($($name:ident => $op:expr;)*) => {
        $(
            fn $name(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
                let op: fn(f64) -> f64 = $op;
                Ok(Value::Number(op(number_arg(args, 0))))
            }
        )*
    };
}

unary! {
    abs => f64::abs;
    acos => f64::acos;
    asin => f64::asin;
    atan => f64::atan;
    cbrt => f64::cbrt;
    ceil => f64::ceil;
    cos => f64::cos;
    exp => f64::exp;
    floor => f64::floor;
    log => f64::ln;
    log2 => f64::log2;
    log10 => f64::log10;
    sin => f64::sin;
    sqrt => f64::sqrt;
    tan => f64::tan;
    trunc => f64::trunc;
    round => round_half_up;
    sign => sign_of;
}

/// Rounds half-way values toward positive infinity: `round(-2.5)` is -2.
fn round_half_up(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    (x + 0.5).floor()
}

fn sign_of(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 { x } else { x.signum() }
}

fn atan2(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(number_arg(args, 0).atan2(number_arg(args, 1))))
}

fn hypot(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let sum: f64 = args.iter().map(|v| v.to_number().powi(2)).sum();
    Ok(Value::Number(sum.sqrt()))
}

fn pow(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(power(number_arg(args, 0), number_arg(args, 1))))
}

fn max(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let mut result = f64::NEG_INFINITY;
    for n in args.iter().map(Value::to_number) {
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.max(n);
    }
    Ok(Value::Number(result))
}

fn min(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let mut result = f64::INFINITY;
    for n in args.iter().map(Value::to_number) {
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.min(n);
    }
    Ok(Value::Number(result))
}

fn random(_: &mut Interpreter, _this: Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(rand::random::<f64>()))
}
