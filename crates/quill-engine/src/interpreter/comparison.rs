//! Loose (`==`) and strict (`===`) equality.

use crate::runtime::Value;
use crate::runtime::value::string_to_number;

/// Strict equality: same kind and same value, references by identity.
/// NaN is unequal to itself.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    a == b
}

/// Loose equality with type coercion.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // Same kind compares strictly
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(_), Value::Boolean(_))
        | (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Array(_), Value::Array(_))
        | (Value::Function(_), Value::Function(_))
        | (Value::Host(_), Value::Host(_)) => strict_equals(a, b),

        // null == undefined
        (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => true,
        (Value::Null | Value::Undefined, _) | (_, Value::Null | Value::Undefined) => false,

        // Number and string compare numerically
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            *n == string_to_number(s)
        }

        // A boolean converts to a number first
        (Value::Boolean(flag), other) | (other, Value::Boolean(flag)) => {
            let number = Value::Number(if *flag { 1.0 } else { 0.0 });
            loose_equals(&number, other)
        }

        // Objects never equal a primitive
        _ => false,
    }
}
