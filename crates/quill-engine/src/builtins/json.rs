//! The `JSON` object, backed by `serde_json`.
//!
//! [`to_json`] and [`from_json`] are public so embedders can move script
//! values in and out of JSON documents without going through text.

use super::{Builtin, arg, namespace};
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Number};

/// Largest integer that f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn register(global: &Scope) {
    const FUNCTIONS: &[(&str, usize, Builtin)] = &[("stringify", 3, stringify), ("parse", 2, parse)];
    global.define("JSON", namespace(FUNCTIONS, &[]));
}

fn stringify(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let Some(json) = to_json(&arg(args, 0))? else {
        return Ok(Value::Undefined);
    };
    let indent = match args.get(2) {
        Some(Value::Number(n)) if *n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Some(Value::String(s)) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    Ok(Value::String(write_json(&json, &indent)?))
}

fn parse(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let text = arg(args, 0).to_js_string();
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| Error::runtime(format!("SyntaxError: {err}")))?;
    Ok(from_json(&json))
}

/// Serializes `json` compactly, or pretty-printed with `indent` per level.
pub fn write_json(json: &serde_json::Value, indent: &str) -> Result<String> {
    if indent.is_empty() {
        return serde_json::to_string(json).map_err(|err| Error::runtime(err.to_string()));
    }
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
    json.serialize(&mut serializer)
        .map_err(|err| Error::runtime(err.to_string()))?;
    String::from_utf8(out).map_err(|err| Error::runtime(err.to_string()))
}

/// Converts a script value to JSON.
///
/// Returns `None` for values JSON cannot represent at the top level
/// (undefined and functions). Such values are dropped from objects and
/// become `null` in arrays. Non-finite numbers become `null`. Host handles
/// use their zero-argument `toJSON` member when they declare one and their
/// display string otherwise. Cycles are a TypeError.
pub fn to_json(value: &Value) -> Result<Option<serde_json::Value>> {
    let mut seen = Vec::new();
    convert(value, &mut seen)
}

fn convert(value: &Value, seen: &mut Vec<*const ()>) -> Result<Option<serde_json::Value>> {
    Ok(Some(match value {
        Value::Undefined | Value::Function(_) => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Host(host) => {
            let to_json = host
                .members()
                .iter()
                .position(|member| member.name == "toJSON" && member.accepts(0));
            match to_json {
                Some(index) => {
                    let value = host.invoke(index, Vec::new()).map_err(Error::runtime)?;
                    return convert(&value, seen);
                }
                None => serde_json::Value::String(host.display()),
            }
        }
        Value::Array(array) => {
            let id = std::rc::Rc::as_ptr(array) as *const ();
            enter(seen, id)?;
            let elements = array.borrow().elements.clone();
            let mut items = Vec::with_capacity(elements.len());
            for element in &elements {
                items.push(convert(element, seen)?.unwrap_or(serde_json::Value::Null));
            }
            seen.pop();
            serde_json::Value::Array(items)
        }
        Value::Object(object) => {
            let id = std::rc::Rc::as_ptr(object) as *const ();
            enter(seen, id)?;
            let properties: Vec<(String, Value)> = object
                .borrow()
                .properties()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let mut map = Map::new();
            for (key, value) in properties {
                if let Some(json) = convert(&value, seen)? {
                    map.insert(key, json);
                }
            }
            seen.pop();
            serde_json::Value::Object(map)
        }
    }))
}

fn enter(seen: &mut Vec<*const ()>, id: *const ()) -> Result<()> {
    if seen.contains(&id) {
        return Err(Error::type_error("Converting circular structure to JSON"));
    }
    seen.push(id);
    Ok(())
}

fn number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Converts parsed JSON into a script value. Object key order is kept.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::object_from(map.iter().map(|(key, value)| (key.clone(), from_json(value))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{eval, run};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify() {
        assert_eq!(
            run("JSON.stringify({ b: 1, a: [true, null, 'x'], skip: undefined, f() {} })"),
            Value::from(r#"{"b":1,"a":[true,null,"x"]}"#)
        );
        assert_eq!(run("JSON.stringify([undefined, NaN, 1.5])"), Value::from("[null,null,1.5]"));
        assert_eq!(run("JSON.stringify(undefined)"), Value::Undefined);
        assert_eq!(run("JSON.stringify('q\"')"), Value::from(r#""q\"""#));
    }

    #[test]
    fn test_stringify_indent() {
        assert_eq!(
            run("JSON.stringify({ a: [1] }, null, 2)"),
            Value::from("{\n  \"a\": [\n    1\n  ]\n}")
        );
    }

    #[test]
    fn test_stringify_cycle() {
        let err = eval("const o = {}; o.self = o; JSON.stringify(o)").unwrap_err();
        assert!(err.message().contains("circular"));
        assert_eq!(
            run("const o = {}; o.self = o; try { JSON.stringify(o); 'no' } catch (e) { e.name }"),
            Value::from("TypeError")
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(run("JSON.parse('{\"z\": 1, \"a\": [2, 3]}').a[1]"), Value::from(3));
        assert_eq!(run("Object.keys(JSON.parse('{\"z\": 1, \"a\": 2}')).join()"), Value::from("z,a"));
        assert_eq!(
            run("try { JSON.parse('{bad'); } catch (e) { e.name }"),
            Value::from("SyntaxError")
        );
    }

    #[test]
    fn test_json_conversions() {
        let value = from_json(&json!({ "name": "quill", "tags": ["a"], "n": 2 }));
        assert_eq!(to_json(&value).unwrap(), Some(json!({ "name": "quill", "tags": ["a"], "n": 2 })));
    }
}
