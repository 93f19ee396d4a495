//! Number method implementations.

use crate::error::{Error, Result};
use crate::runtime::Value;
use crate::runtime::value::number_to_string;

/// Method names available on number values.
pub const METHODS: &[&str] = &["toExponential", "toFixed", "toPrecision", "toString", "valueOf"];

fn digits_arg(args: &[Value], max: f64) -> Result<Option<usize>> {
    match args.first() {
        None | Some(Value::Undefined) => Ok(None),
        Some(value) => {
            let digits = value.to_number().trunc();
            if !(0.0..=max).contains(&digits) {
                return Err(Error::runtime(format!(
                    "RangeError: digits argument must be between 0 and {max}"
                )));
            }
            Ok(Some(digits as usize))
        }
    }
}

/// Calls a number method.
pub fn call_number_method(n: f64, method: &str, args: &[Value]) -> Result<Value> {
    Ok(match method {
        "toString" => {
            let radix = match args.first() {
                None | Some(Value::Undefined) => 10,
                Some(value) => value.to_number() as u32,
            };
            if !(2..=36).contains(&radix) {
                return Err(Error::runtime("RangeError: toString() radix must be between 2 and 36"));
            }
            if radix == 10 || !n.is_finite() {
                Value::String(number_to_string(n))
            } else {
                Value::String(format_radix(n.trunc() as i64, radix))
            }
        }
        "toFixed" => {
            let digits = digits_arg(args, 100.0)?.unwrap_or(0);
            if !n.is_finite() || n.abs() >= 1e21 {
                Value::String(number_to_string(n))
            } else {
                Value::String(format!("{n:.digits$}"))
            }
        }
        "toExponential" => {
            let formatted = match digits_arg(args, 100.0)? {
                Some(digits) => format!("{n:.digits$e}"),
                None => format!("{n:e}"),
            };
            Value::String(with_exponent_sign(formatted))
        }
        "toPrecision" => match digits_arg(args, 100.0)? {
            None => Value::String(number_to_string(n)),
            Some(0) => {
                return Err(Error::runtime("RangeError: toPrecision() argument must be between 1 and 100"));
            }
            Some(precision) => Value::String(to_precision(n, precision)),
        },
        "valueOf" => Value::Number(n),
        _ => Value::Undefined,
    })
}

fn with_exponent_sign(formatted: String) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

/// Fixed notation with `precision` significant digits, switching to
/// exponent notation when the exponent falls outside the digits.
fn to_precision(n: f64, precision: usize) -> String {
    if !n.is_finite() {
        return number_to_string(n);
    }
    if n == 0.0 {
        return format!("{:.*}", precision - 1, 0.0);
    }
    let exponent = n.abs().log10().floor() as i32;
    if exponent < -6 || exponent >= precision as i32 {
        return with_exponent_sign(format!("{:.*e}", precision - 1, n));
    }
    let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
    format!("{n:.decimals$}")
}

/// Formats an integer in a given radix.
pub fn format_radix(mut n: i64, radix: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let negative = n < 0;
    if negative {
        n = -n;
    }
    let mut digits = Vec::new();
    while n > 0 {
        let digit = (n % radix as i64) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('?'));
        n /= radix as i64;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}
