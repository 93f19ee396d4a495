//! Property access for every kind of value.

use super::Interpreter;
use super::{array_methods, number_methods, string_methods};
use crate::error::{Error, Result};
use crate::interop::{capitalize, find_accessor};
use crate::runtime::object::array_index;
use crate::runtime::{Function, Object, Value};
use std::cell::RefCell;
use std::rc::Rc;

impl Interpreter {
    /// Reads `target[key]`.
    ///
    /// Strings, numbers, arrays and functions fall back to their intrinsic
    /// methods, returned bound to `target`. Host handles go through the
    /// interop dispatcher.
    pub fn get_property(&mut self, target: &Value, key: &str) -> Result<Value> {
        match target {
            Value::Undefined | Value::Null => Err(Error::type_error(format!(
                "Cannot read properties of {} (reading '{key}')",
                target.to_js_string()
            ))),
            Value::Boolean(b) => Ok(match key {
                "toString" => {
                    let text = b.to_string();
                    Value::native("toString", 0, move |_, _, _| Ok(Value::from(text.as_str())))
                }
                _ => Value::Undefined,
            }),
            Value::Number(n) => {
                if !number_methods::METHODS.contains(&key) {
                    return Ok(Value::Undefined);
                }
                let n = *n;
                let method = key.to_string();
                Ok(Value::native(key, 0, move |_, _, args| {
                    number_methods::call_number_method(n, &method, args)
                }))
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::from(s.chars().count()));
                }
                if let Some(index) = array_index(key) {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map_or(Value::Undefined, |c| Value::String(c.to_string())));
                }
                if !string_methods::METHODS.contains(&key) {
                    return Ok(Value::Undefined);
                }
                let receiver = s.clone();
                let method = key.to_string();
                Ok(Value::native(key, 0, move |_, _, args| {
                    string_methods::call_string_method(&receiver, &method, args)
                }))
            }
            Value::Object(object) => {
                if let Some(value) = object.borrow().get(key) {
                    return Ok(value);
                }
                Ok(match key {
                    "hasOwnProperty" => {
                        let object = object.clone();
                        Value::native(key, 1, move |interp, _, args| {
                            let key = interp.property_key(args.first().unwrap_or(&Value::Undefined))?;
                            Ok(Value::Boolean(object.borrow().has_own(&key)))
                        })
                    }
                    "toString" => Value::native(key, 0, |_, _, _| Ok(Value::from("[object Object]"))),
                    _ => Value::Undefined,
                })
            }
            Value::Array(array) => {
                if let Some(value) = array.borrow().get(key) {
                    return Ok(value);
                }
                if !array_methods::METHODS.contains(&key) {
                    return Ok(Value::Undefined);
                }
                let receiver = array.clone();
                let method = key.to_string();
                Ok(Value::native(key, 0, move |interp, _, args| {
                    array_methods::call_array_method(interp, &receiver, &method, args)
                }))
            }
            Value::Function(function) => {
                if let Some(value) = function.get(key) {
                    return Ok(value);
                }
                Ok(match key {
                    "prototype" if function.is_constructor() => {
                        let prototype = Value::Object(Rc::new(RefCell::new(Object::new())));
                        function.set("prototype", prototype.clone());
                        prototype
                    }
                    "call" | "apply" | "bind" => function_method(function.clone(), key),
                    _ => Value::Undefined,
                })
            }
            Value::Host(host) => self.dispatcher.get_property(host, key),
        }
    }

    /// Writes `target[key] = value`. Writes to primitives are ignored.
    pub fn set_property(&mut self, target: &Value, key: &str, value: Value) -> Result<()> {
        match target {
            Value::Undefined | Value::Null => Err(Error::type_error(format!(
                "Cannot set properties of {} (setting '{key}')",
                target.to_js_string()
            ))),
            Value::Object(object) => {
                object.borrow_mut().set(key, value);
                Ok(())
            }
            Value::Array(array) => array.borrow_mut().set(key, value, self.config().max_array_length),
            Value::Function(function) => {
                function.set(key, value);
                Ok(())
            }
            Value::Host(host) => self.dispatcher.set_property(host, key, value),
            Value::Boolean(_) | Value::Number(_) | Value::String(_) => Ok(()),
        }
    }

    /// `delete target[key]`; true unless the target is nullish.
    pub fn delete_property(&mut self, target: &Value, key: &str) -> Result<bool> {
        match target {
            Value::Undefined | Value::Null => Err(Error::type_error(format!(
                "Cannot convert {} to object",
                target.to_js_string()
            ))),
            Value::Object(object) => {
                object.borrow_mut().delete(key);
                Ok(true)
            }
            Value::Array(array) => {
                array.borrow_mut().delete(key);
                Ok(true)
            }
            Value::Function(function) => {
                function.delete(key);
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    /// The `in` operator.
    pub fn has_property(&mut self, target: &Value, key: &str) -> Result<bool> {
        match target {
            Value::Object(object) => Ok(object.borrow().has(key)),
            Value::Array(array) => Ok(array.borrow().has(key)),
            Value::Function(function) => Ok(function.has(key)),
            Value::Host(host) => {
                let members = host.members();
                let capitalized = capitalize(key);
                Ok(members.iter().any(|member| member.name == key)
                    || find_accessor(members, &format!("get{capitalized}")).is_some()
                    || find_accessor(members, &format!("is{capitalized}")).is_some())
            }
            other => Err(Error::type_error(format!(
                "Cannot use 'in' operator to search for '{key}' in {}",
                other.to_js_string()
            ))),
        }
    }
}

/// Own enumerable keys, in the order `for...in` visits them.
pub fn own_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Object(object) => object.borrow().keys(),
        Value::Array(array) => array.borrow().keys(),
        Value::Function(function) => function.properties().keys().cloned().collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// `fn.call`, `fn.apply` and `fn.bind`, bound to `function`.
fn function_method(function: Rc<Function>, name: &str) -> Value {
    match name {
        "call" => Value::native("call", 1, move |interp, _, args| {
            let this = args.first().cloned().unwrap_or_default();
            interp.call(&function, this, args.get(1..).unwrap_or_default())
        }),
        "apply" => Value::native("apply", 2, move |interp, _, args| {
            let this = args.first().cloned().unwrap_or_default();
            let spread = match args.get(1) {
                None | Some(Value::Undefined | Value::Null) => Vec::new(),
                Some(Value::Array(array)) => array.borrow().elements.clone(),
                Some(_) => {
                    return Err(Error::type_error("apply expects an array of arguments"));
                }
            };
            interp.call(&function, this, &spread)
        }),
        _ => Value::native("bind", 1, move |_, _, args| {
            let this = args.first().cloned().unwrap_or_default();
            let bound = args.get(1..).map(<[Value]>::to_vec).unwrap_or_default();
            Ok(Value::Function(Rc::new(Function::bound(function.clone(), this, bound))))
        }),
    }
}
