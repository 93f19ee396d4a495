//! Global functions and constants: `parseInt`, `parseFloat`, `isNaN`,
//! `isFinite`, URI component encoding, `NaN`, `Infinity`, `undefined`.

use super::{arg, number_arg};
use crate::error::{Error, Result};
use crate::interpreter::{Interpreter, to_int32};
use crate::runtime::{Scope, Value};

pub fn register(global: &Scope) {
    global.define("undefined", Value::Undefined);
    global.define("NaN", Value::Number(f64::NAN));
    global.define("Infinity", Value::Number(f64::INFINITY));
    global.define("parseInt", Value::native("parseInt", 2, parse_int));
    global.define("parseFloat", Value::native("parseFloat", 1, parse_float));
    global.define("isNaN", Value::native("isNaN", 1, is_nan));
    global.define("isFinite", Value::native("isFinite", 1, is_finite));
    global.define(
        "encodeURIComponent",
        Value::native("encodeURIComponent", 1, encode_uri_component),
    );
    global.define(
        "decodeURIComponent",
        Value::native("decodeURIComponent", 1, decode_uri_component),
    );
}

pub(crate) fn parse_int(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let text = arg(args, 0).to_js_string();
    let radix = match args.get(1) {
        None | Some(Value::Undefined) => 0,
        Some(value) => to_int32(value.to_number()),
    };
    Ok(Value::Number(parse_integer(&text, radix)))
}

pub(crate) fn parse_float(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(parse_decimal(&arg(args, 0).to_js_string())))
}

fn is_nan(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(number_arg(args, 0).is_nan()))
}

fn is_finite(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(number_arg(args, 0).is_finite()))
}

fn encode_uri_component(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let text = arg(args, 0).to_js_string();
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    Ok(Value::String(encoded))
}

fn decode_uri_component(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let text = arg(args, 0).to_js_string();
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = text
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| Error::runtime("URIError: URI malformed"))?;
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded)
        .map(Value::String)
        .map_err(|_| Error::runtime("URIError: URI malformed"))
}

/// Parses the longest integer prefix of `text` in `radix`.
///
/// A radix of 0 means 10, or 16 when the digits start with `0x`. Leading
/// whitespace and a sign are skipped. No digits yields NaN.
pub fn parse_integer(text: &str, radix: i32) -> f64 {
    let text = text.trim_start();
    let (negative, mut digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut radix = radix;
    if (radix == 0 || radix == 16) && (digits.starts_with("0x") || digits.starts_with("0X")) {
        digits = &digits[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let radix = radix as u32;
    let mut value = 0.0;
    let mut any = false;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        value = value * radix as f64 + digit as f64;
        any = true;
    }
    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -value,
        (true, false) => value,
    }
}

/// Parses the longest decimal literal prefix of `text`.
pub fn parse_decimal(text: &str) -> f64 {
    let text = text.trim_start();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned.starts_with("Infinity") {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let bytes = text.as_bytes();
    let mut end = text.len() - unsigned.len();
    let mantissa_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - mantissa_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while fraction_end < bytes.len() && bytes[fraction_end].is_ascii_digit() {
            fraction_end += 1;
        }
        digits += fraction_end - fraction_start;
        end = fraction_end;
    }
    if digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exponent_end = end + 1;
        if exponent_end < bytes.len() && matches!(bytes[exponent_end], b'+' | b'-') {
            exponent_end += 1;
        }
        let exponent_digits = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > exponent_digits {
            end = exponent_end;
        }
    }
    text[..end].parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{eval, run};
    use super::*;

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42", 0), 42.0);
        assert_eq!(parse_integer("  -17px", 0), -17.0);
        assert_eq!(parse_integer("0x1F", 0), 31.0);
        assert_eq!(parse_integer("ff", 16), 255.0);
        assert_eq!(parse_integer("101", 2), 5.0);
        assert_eq!(parse_integer("12.9", 10), 12.0);
        assert!(parse_integer("abc", 10).is_nan());
        assert!(parse_integer("", 0).is_nan());
        assert!(parse_integer("10", 1).is_nan());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("3.14abc"), 3.14);
        assert_eq!(parse_decimal("  .5"), 0.5);
        assert_eq!(parse_decimal("1e3"), 1000.0);
        assert_eq!(parse_decimal("2e"), 2.0);
        assert_eq!(parse_decimal("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_decimal("x1").is_nan());
        assert!(parse_decimal(".").is_nan());
    }

    #[test]
    fn test_global_functions() {
        assert_eq!(run("parseInt('08')"), Value::from(8));
        assert_eq!(run("parseInt('z', 36)"), Value::from(35));
        assert_eq!(run("isNaN('abc')"), Value::from(true));
        assert_eq!(run("isNaN('12')"), Value::from(false));
        assert_eq!(run("isFinite(1 / 0)"), Value::from(false));
        assert_eq!(run("typeof undefined"), Value::from("undefined"));
    }

    #[test]
    fn test_uri_components() {
        assert_eq!(run("encodeURIComponent('a b&c/é')"), Value::from("a%20b%26c%2F%C3%A9"));
        assert_eq!(run("decodeURIComponent('a%20b%26c%2F%C3%A9')"), Value::from("a b&c/é"));
        let err = eval("decodeURIComponent('%zz')").unwrap_err();
        assert!(err.message().contains("URIError"));
    }
}
