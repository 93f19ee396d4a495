//! Script value representation and the primitive conversions.

use super::function::{Function, FunctionKind};
use super::object::{Array, Object};
use crate::interop::HostObject;
use crate::interpreter::Interpreter;
use crate::error::Result;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A script value.
///
/// Scalars are compared by value; objects, arrays, functions and host
/// handles by identity. Values hold `Rc`s, so they never leave the thread
/// that created the engine.
#[derive(Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Ordered key/value object
    Object(Rc<RefCell<Object>>),
    /// Array
    Array(Rc<RefCell<Array>>),
    /// Closure, native or bound function
    Function(Rc<Function>),
    /// Opaque object owned by the embedding application
    Host(Rc<dyn HostObject>),
}

impl PartialEq for Value {
    /// Strict equality: no coercion, NaN is unequal to itself.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl Value {
    /// Creates an empty object value.
    pub fn object() -> Self {
        Value::Object(Rc::new(RefCell::new(Object::new())))
    }

    /// Creates an object value from `(key, value)` pairs, in order.
    pub fn object_from<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut object = Object::new();
        for (key, value) in entries {
            object.set(key, value);
        }
        Value::Object(Rc::new(RefCell::new(object)))
    }

    /// Creates an array value holding `elements`.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(Array::from(elements))))
    }

    /// Wraps a native callable as a function value.
    pub fn native<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&mut Interpreter, Value, &[Value]) -> Result<Value> + 'static,
    {
        Value::Function(Rc::new(Function::native(name, arity, func)))
    }

    /// Wraps a host object as an opaque handle.
    pub fn host(object: Rc<dyn HostObject>) -> Self {
        Value::Host(object)
    }

    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is null or undefined.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value can be called.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns the string slice if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Converts the value to a boolean.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Host(_) => true,
        }
    }

    /// Converts the value to a number.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            Value::Host(host) => host.as_number().unwrap_or(f64::NAN),
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// Converts the value to its string form.
    pub fn to_js_string(&self) -> String {
        let mut seen = Vec::new();
        self.to_string_guarded(&mut seen)
    }

    fn to_string_guarded(&self, seen: &mut Vec<*const ()>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Array(array) => {
                let id = Rc::as_ptr(array) as *const ();
                if seen.contains(&id) {
                    return String::new();
                }
                seen.push(id);
                let joined = array
                    .borrow()
                    .elements
                    .iter()
                    .map(|element| match element {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_string_guarded(seen),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                seen.pop();
                joined
            }
            Value::Function(function) => match &function.kind {
                FunctionKind::Closure(_) => format!("function {}() {{...}}", function.name()),
                _ => format!("function {}() {{ [native code] }}", function.name()),
            },
            Value::Host(host) => host.display(),
        }
    }

    /// Returns the `typeof` string for this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) | Value::Array(_) | Value::Host(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Renders the value for display in the console and the REPL.
    ///
    /// Strings nested in containers are quoted; top-level strings are not.
    pub fn inspect(&self) -> String {
        let mut seen = Vec::new();
        self.inspect_guarded(&mut seen, false)
    }

    fn inspect_guarded(&self, seen: &mut Vec<*const ()>, nested: bool) -> String {
        match self {
            Value::String(s) if nested => format!("'{}'", s.replace('\'', "\\'")),
            Value::Array(array) => {
                let id = Rc::as_ptr(array) as *const ();
                if seen.contains(&id) {
                    return "[Circular]".to_string();
                }
                seen.push(id);
                let array = array.borrow();
                let mut parts: Vec<String> = array
                    .elements
                    .iter()
                    .map(|element| element.inspect_guarded(seen, true))
                    .collect();
                parts.extend(
                    array
                        .properties()
                        .iter()
                        .map(|(key, value)| format!("{key}: {}", value.inspect_guarded(seen, true))),
                );
                seen.pop();
                if parts.is_empty() {
                    "[]".to_string()
                } else {
                    format!("[ {} ]", parts.join(", "))
                }
            }
            Value::Object(object) => {
                let id = Rc::as_ptr(object) as *const ();
                if seen.contains(&id) {
                    return "[Circular]".to_string();
                }
                seen.push(id);
                let parts: Vec<String> = object
                    .borrow()
                    .properties()
                    .iter()
                    .map(|(key, value)| format!("{key}: {}", value.inspect_guarded(seen, true)))
                    .collect();
                seen.pop();
                if parts.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", parts.join(", "))
                }
            }
            Value::Function(function) => {
                let name = function.name();
                if name.is_empty() {
                    "[Function (anonymous)]".to_string()
                } else {
                    format!("[Function: {name}]")
                }
            }
            other => other.to_js_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Object(_) | Value::Array(_) => write!(f, "{}", self.inspect()),
            Value::Function(function) => write!(f, "Function({})", function.name()),
            Value::Host(host) => write!(f, "Host({})", host.type_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Formats a number the way scripts see it: integers below 1e21 have no
/// fraction, very large and very small magnitudes use exponent notation.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if n.fract() == 0.0 && magnitude < 1e21 {
        return format!("{n:.0}");
    }
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    format!("{n}")
}

/// Parses a numeric string: surrounding whitespace is ignored, the empty
/// string is 0, `0x`/`0o`/`0b` prefixes select a radix, and anything else
/// that is not a decimal literal is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }

    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let is_decimal = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !is_decimal {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-42.0), "-42");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(1e20), "100000000000000000000");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0xff"), 255.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("nan").is_nan());
    }

    #[test]
    fn test_to_boolean() {
        assert!(!Value::Undefined.to_boolean());
        assert!(!Value::Null.to_boolean());
        assert!(!Value::Number(0.0).to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::from("").to_boolean());
        assert!(Value::from("0").to_boolean());
        assert!(Value::array(vec![]).to_boolean());
        assert!(Value::object().to_boolean());
    }

    #[test]
    fn test_to_number() {
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
        assert_eq!(Value::Boolean(true).to_number(), 1.0);
        assert_eq!(Value::from("  7 ").to_number(), 7.0);
        assert_eq!(Value::array(vec![Value::from(5)]).to_number(), 5.0);
        assert!(Value::object().to_number().is_nan());
    }

    #[test]
    fn test_to_js_string() {
        let array = Value::array(vec![Value::from(1), Value::Null, Value::from("a")]);
        assert_eq!(array.to_js_string(), "1,,a");
        assert_eq!(Value::object().to_js_string(), "[object Object]");
        assert_eq!(Value::Boolean(false).to_js_string(), "false");
    }

    #[test]
    fn test_self_containing_array_terminates() {
        let array = Value::array(vec![Value::from(1)]);
        if let Value::Array(inner) = &array {
            inner.borrow_mut().elements.push(array.clone());
        }
        assert_eq!(array.to_js_string(), "1,");
        assert_eq!(array.inspect(), "[ 1, [Circular] ]");
    }

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::array(vec![]).type_of(), "object");
        assert_eq!(Value::from(1).type_of(), "number");
        let f = Value::native("f", 0, |_, _, _| Ok(Value::Undefined));
        assert_eq!(f.type_of(), "function");
    }

    #[test]
    fn test_identity_equality() {
        let a = Value::object();
        let b = Value::object();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_inspect() {
        let value = Value::object_from([
            ("name", Value::from("quill")),
            ("tags", Value::array(vec![Value::from(1), Value::from("x")])),
        ]);
        assert_eq!(value.inspect(), "{ name: 'quill', tags: [ 1, 'x' ] }");
        assert_eq!(Value::from("top").inspect(), "top");
    }
}
