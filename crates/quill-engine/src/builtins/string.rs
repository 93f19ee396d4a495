//! The `String` conversion function and `String.fromCharCode`.
//! Instance methods live with the interpreter.

use super::{Builtin, constructor};
use crate::error::Result;
use crate::interpreter::{Interpreter, to_uint32};
use crate::runtime::{Scope, Value};

pub fn register(global: &Scope) {
    const STATICS: &[(&str, usize, Builtin)] = &[("fromCharCode", 1, from_char_code)];
    global.define("String", constructor("String", 1, string, STATICS));
}

/// `String(value)`, honoring a script `toString` on objects.
fn string(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    match args.first() {
        None => Ok(Value::from("")),
        Some(value) => Ok(Value::String(interp.stringify(value)?)),
    }
}

/// Code units outside the scalar range become U+FFFD.
fn from_char_code(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let text = args
        .iter()
        .map(|code| {
            let unit = to_uint32(code.to_number()) & 0xFFFF;
            char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect::<String>();
    Ok(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::super::tests::run;
    use super::*;

    #[test]
    fn test_string_conversion() {
        assert_eq!(run("String(12)"), Value::from("12"));
        assert_eq!(run("String()"), Value::from(""));
        assert_eq!(run("String([1, [2, 3]])"), Value::from("1,2,3"));
        assert_eq!(run("String({ toString() { return 'custom'; } })"), Value::from("custom"));
    }

    #[test]
    fn test_from_char_code() {
        assert_eq!(run("String.fromCharCode(72, 105)"), Value::from("Hi"));
    }
}
