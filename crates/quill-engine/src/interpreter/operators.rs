//! Arithmetic, bitwise, relational and type-test operators.

use super::comparison::{loose_equals, strict_equals};
use super::Interpreter;
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{Error, Result};
use crate::runtime::Value;
use std::rc::Rc;

const TWO_POW_32: f64 = 4_294_967_296.0;

/// Converts a number to a signed 32-bit integer, wrapping modulo 2^32.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Converts a number to an unsigned 32-bit integer, wrapping modulo 2^32.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(TWO_POW_32) as u32
}

pub(crate) fn power(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

impl Interpreter {
    pub(super) fn unary(operator: UnaryOperator, value: &Value) -> Value {
        match operator {
            UnaryOperator::Minus => Value::Number(-value.to_number()),
            UnaryOperator::Plus => Value::Number(value.to_number()),
            UnaryOperator::Not => Value::Boolean(!value.to_boolean()),
            UnaryOperator::BitwiseNot => Value::from(!to_int32(value.to_number())),
            UnaryOperator::Typeof => Value::from(value.type_of()),
            UnaryOperator::Void | UnaryOperator::Delete => Value::Undefined,
        }
    }

    /// Applies a binary operator to evaluated operands.
    pub(crate) fn binary(&mut self, operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
        use BinaryOperator::*;

        let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
        let int32 = |f: fn(i32, i32) -> i32| {
            Value::from(f(to_int32(left.to_number()), to_int32(right.to_number())))
        };
        let shift = right.to_number();

        Ok(match operator {
            Add => return self.add(left, right),
            Subtract => number(|a, b| a - b),
            Multiply => number(|a, b| a * b),
            Divide => number(|a, b| a / b),
            Modulo => number(|a, b| a % b),
            Exponent => number(power),
            Equal => Value::Boolean(loose_equals(left, right)),
            NotEqual => Value::Boolean(!loose_equals(left, right)),
            StrictEqual => Value::Boolean(strict_equals(left, right)),
            StrictNotEqual => Value::Boolean(!strict_equals(left, right)),
            LessThan => Value::Boolean(compare(left, right, |o| o.is_lt())),
            LessThanEqual => Value::Boolean(compare(left, right, |o| o.is_le())),
            GreaterThan => Value::Boolean(compare(left, right, |o| o.is_gt())),
            GreaterThanEqual => Value::Boolean(compare(left, right, |o| o.is_ge())),
            BitwiseAnd => int32(|a, b| a & b),
            BitwiseOr => int32(|a, b| a | b),
            BitwiseXor => int32(|a, b| a ^ b),
            LeftShift => Value::from(to_int32(left.to_number()).wrapping_shl(to_uint32(shift) & 31)),
            RightShift => Value::from(to_int32(left.to_number()) >> (to_uint32(shift) & 31)),
            UnsignedRightShift => {
                Value::Number((to_uint32(left.to_number()) >> (to_uint32(shift) & 31)) as f64)
            }
            In => {
                let key = self.property_key(left)?;
                Value::Boolean(self.has_property(right, &key)?)
            }
            Instanceof => Value::Boolean(self.instance_of(left, right)?),
        })
    }

    /// `+` concatenates when either side is a string and adds numerically
    /// otherwise.
    fn add(&mut self, left: &Value, right: &Value) -> Result<Value> {
        if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
            let mut text = self.stringify(left)?;
            text.push_str(&self.stringify(right)?);
            Ok(Value::String(text))
        } else {
            Ok(Value::Number(left.to_number() + right.to_number()))
        }
    }

    /// Host handles test their type name against a class name, a handle or
    /// a function of the same name.
    /// Script objects compare their prototype with the constructor's
    /// `prototype`.
    fn instance_of(&mut self, left: &Value, right: &Value) -> Result<bool> {
        if let Value::Host(host) = left {
            return match right {
                Value::String(name) => Ok(host.is_instance_of(name)),
                Value::Host(class) => Ok(host.is_instance_of(class.type_name())),
                Value::Function(class) => Ok(host.is_instance_of(class.name())),
                _ => Err(Error::type_error(
                    "Right-hand side of 'instanceof' is not a host type",
                )),
            };
        }

        let Value::Function(constructor) = right else {
            return Err(Error::type_error("Right-hand side of 'instanceof' is not callable"));
        };
        if constructor.is_native() {
            match (constructor.name(), left) {
                ("Object", Value::Object(_) | Value::Array(_) | Value::Function(_)) => return Ok(true),
                ("Array", Value::Array(_)) | ("Function", Value::Function(_)) => return Ok(true),
                _ => {}
            }
        }

        let Value::Object(object) = left else {
            return Ok(false);
        };
        if constructor.is_native()
            && constructor.name() == "Error"
            && let Some(own) = object.borrow().prototype()
        {
            let own = own.clone();
            return Ok(self.error_prototypes.values().any(|p| Rc::ptr_eq(p, &own)));
        }
        let prototype = self.get_property(right, "prototype")?;
        let object = object.borrow();
        Ok(match (object.prototype(), &prototype) {
            (Some(own), Value::Object(expected)) => Rc::ptr_eq(own, expected),
            _ => false,
        })
    }
}

/// Relational comparison: strings compare by code point, everything else
/// numerically. Any NaN makes the comparison false.
fn compare(left: &Value, right: &Value, test: fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return test(a.as_str().cmp(b.as_str()));
    }
    left.to_number()
        .partial_cmp(&right.to_number())
        .is_some_and(test)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{run, run_err};
    use super::*;

    #[test]
    fn test_to_int32() {
        assert_eq!(to_int32(0.0), 0);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(4_294_967_295.0), -1);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_int32(3.9), 3);
        assert_eq!(to_int32(-3.9), -3);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(f64::INFINITY), 0);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
    }

    #[test]
    fn test_bitwise_operators() {
        assert_eq!(run("5 & 3"), Value::from(1));
        assert_eq!(run("5 | 3"), Value::from(7));
        assert_eq!(run("5 ^ 3"), Value::from(6));
        assert_eq!(run("~5"), Value::from(-6));
        assert_eq!(run("1 << 31"), Value::from(-2_147_483_648));
        assert_eq!(run("1 << 33"), Value::from(2));
        assert_eq!(run("-8 >> 1"), Value::from(-4));
        assert_eq!(run("-1 >>> 0"), Value::from(4_294_967_295.0));
        assert_eq!(run("-8 >>> 28"), Value::from(15));
    }

    #[test]
    fn test_equality_operators() {
        assert_eq!(run("1 == '1'"), Value::from(true));
        assert_eq!(run("1 === '1'"), Value::from(false));
        assert_eq!(run("null == undefined"), Value::from(true));
        assert_eq!(run("null === undefined"), Value::from(false));
        assert_eq!(run("NaN == NaN"), Value::from(false));
        assert_eq!(run("const o = {}; o === o"), Value::from(true));
        assert_eq!(run("({}) == ({})"), Value::from(false));
    }

    #[test]
    fn test_relational() {
        assert_eq!(run("'b' > 'a'"), Value::from(true));
        assert_eq!(run("'10' < '9'"), Value::from(true));
        assert_eq!(run("10 < 9"), Value::from(false));
        assert_eq!(run("'10' < 9"), Value::from(false));
        assert_eq!(run("NaN < 1 || NaN >= 1"), Value::from(false));
    }

    #[test]
    fn test_exponent_edge_cases() {
        assert_eq!(run("2 ** -1"), Value::from(0.5));
        assert!(run("1 ** NaN").as_number().is_some_and(f64::is_nan));
        assert!(run("1 ** Infinity").as_number().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_in_operator() {
        assert_eq!(run("'a' in { a: undefined }"), Value::from(true));
        assert_eq!(run("0 in [5]"), Value::from(true));
        assert_eq!(run("1 in [5]"), Value::from(false));
        assert_eq!(run("'length' in [5]"), Value::from(true));
        assert!(run_err("'a' in 'abc'").message().contains("'in' operator"));
    }

    #[test]
    fn test_instanceof() {
        assert_eq!(run("[] instanceof Array"), Value::from(true));
        assert_eq!(run("({}) instanceof Array"), Value::from(false));
        assert_eq!(run("function A() {} function B() {} new A() instanceof B"), Value::from(false));
        assert_eq!(run("5 instanceof Object"), Value::from(false));
        assert!(run_err("({}) instanceof 5").message().contains("not callable"));
    }
}
