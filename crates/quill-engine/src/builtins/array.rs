//! The `Array` constructor: `Array(n)`, `Array(...items)`, `isArray`,
//! `from` and `of`. Instance methods live with the interpreter.

use super::{Builtin, arg, constructor};
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::runtime::object::MAX_ARRAY_LENGTH;
use crate::runtime::{Scope, Value};

pub fn register(global: &Scope) {
    const STATICS: &[(&str, usize, Builtin)] = &[("isArray", 1, is_array), ("from", 1, from), ("of", 0, of)];
    global.define("Array", constructor("Array", 1, array_constructor, STATICS));
}

fn array_constructor(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    match args {
        [Value::Number(n)] => {
            let limit = interp.config().max_array_length.min(MAX_ARRAY_LENGTH);
            if n.fract() != 0.0 || *n < 0.0 || *n > limit as f64 {
                return Err(Error::runtime("RangeError: Invalid array length"));
            }
            Ok(Value::array(vec![Value::Undefined; *n as usize]))
        }
        items => Ok(Value::array(items.to_vec())),
    }
}

fn is_array(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(matches!(args.first(), Some(Value::Array(_)))))
}

/// `Array.from(source, mapFn?)` over arrays and strings.
fn from(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let items = match arg(args, 0) {
        Value::Array(array) => array.borrow().elements.clone(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        Value::Undefined | Value::Null => {
            return Err(Error::type_error("Array.from requires an array-like or iterable"));
        }
        _ => Vec::new(),
    };
    let Some(map) = args.get(1).filter(|f| !f.is_undefined()) else {
        return Ok(Value::array(items));
    };
    let mut mapped = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        mapped.push(interp.call_function(map, Value::Undefined, &[item, Value::from(index)])?);
    }
    Ok(Value::array(mapped))
}

fn of(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::array(args.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{eval, run};
    use super::*;

    #[test]
    fn test_array_constructor() {
        assert_eq!(run("new Array(3).length"), Value::from(3));
        assert_eq!(run("Array(1, 2).join('-')"), Value::from("1-2"));
        assert_eq!(run("new Array('3').length"), Value::from(1));
        assert!(eval("new Array(-1)").is_err());
        assert_eq!(run("[] instanceof Array"), Value::from(true));
    }

    #[test]
    fn test_statics() {
        assert_eq!(run("Array.isArray([]) && !Array.isArray('x')"), Value::from(true));
        assert_eq!(run("Array.from('abc').join(',')"), Value::from("a,b,c"));
        assert_eq!(run("Array.from([1, 2], x => x * 10).join()"), Value::from("10,20"));
        assert_eq!(run("Array.of(7).length"), Value::from(1));
    }
}
