//! The `Object` constructor and its static helpers.

use super::{Builtin, arg, constructor};
use crate::error::{Error, Result};
use crate::interpreter::{Interpreter, own_keys};
use crate::runtime::{Object, Scope, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub fn register(global: &Scope) {
    const STATICS: &[(&str, usize, Builtin)] = &[
        ("keys", 1, keys),
        ("values", 1, values),
        ("entries", 1, entries),
        ("assign", 2, assign),
        ("fromEntries", 1, from_entries),
        ("create", 1, create),
        ("getPrototypeOf", 1, get_prototype_of),
    ];
    global.define("Object", constructor("Object", 1, object_constructor, STATICS));
}

/// `Object(value)`: object-like values pass through, anything else yields
/// a fresh empty object.
fn object_constructor(_: &mut Interpreter, this: Value, args: &[Value]) -> Result<Value> {
    match arg(args, 0) {
        value @ (Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Host(_)) => Ok(value),
        _ if matches!(this, Value::Object(_)) => Ok(this),
        _ => Ok(Value::object()),
    }
}

fn keys(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let keys = own_keys(&arg(args, 0));
    Ok(Value::array(keys.into_iter().map(Value::String).collect()))
}

fn values(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    let mut values = Vec::new();
    for key in own_keys(&target) {
        values.push(interp.get_property(&target, &key)?);
    }
    Ok(Value::array(values))
}

fn entries(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    let mut entries = Vec::new();
    for key in own_keys(&target) {
        let value = interp.get_property(&target, &key)?;
        entries.push(Value::array(vec![Value::String(key), value]));
    }
    Ok(Value::array(entries))
}

/// Copies own properties of every source onto the target, left to right.
fn assign(interp: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    if target.is_nullish() {
        return Err(Error::type_error("Cannot convert undefined or null to object"));
    }
    for source in args.iter().skip(1) {
        for key in own_keys(source) {
            let value = interp.get_property(source, &key)?;
            interp.set_property(&target, &key, value)?;
        }
    }
    Ok(target)
}

fn from_entries(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let Value::Array(pairs) = arg(args, 0) else {
        return Err(Error::type_error("Object.fromEntries expects an array of entries"));
    };
    let mut object = Object::new();
    for pair in pairs.borrow().elements.iter() {
        let Value::Array(pair) = pair else {
            return Err(Error::type_error("Iterator value is not an entry object"));
        };
        let pair = pair.borrow();
        let key = pair.elements.first().cloned().unwrap_or_default();
        let value = pair.elements.get(1).cloned().unwrap_or_default();
        object.set(key.to_js_string(), value);
    }
    Ok(Value::Object(Rc::new(RefCell::new(object))))
}

fn create(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    let object = match arg(args, 0) {
        Value::Object(prototype) => Object::with_prototype(prototype),
        Value::Null => Object::new(),
        _ => return Err(Error::type_error("Object prototype may only be an Object or null")),
    };
    Ok(Value::Object(Rc::new(RefCell::new(object))))
}

fn get_prototype_of(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(match arg(args, 0) {
        Value::Object(object) => object
            .borrow()
            .prototype()
            .map_or(Value::Null, |prototype| Value::Object(prototype.clone())),
        _ => Value::Null,
    })
}
