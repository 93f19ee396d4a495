//! Error constructors.
//!
//! Each constructor shares its `prototype` with the errors the interpreter
//! creates for failures of the same name, so a caught `TypeError` from a
//! native passes `e instanceof TypeError`.

use super::arg;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};
use std::rc::Rc;

const ERROR_NAMES: &[&str] = &[
    "Error",
    "TypeError",
    "RangeError",
    "SyntaxError",
    "ReferenceError",
    "URIError",
    "EvalError",
];

pub fn register(interp: &mut Interpreter, global: &Scope) {
    for &name in ERROR_NAMES {
        let prototype = interp.error_prototype(name);
        prototype.borrow_mut().set("name", Value::from(name));
        let constructor = Value::native(name, 1, move |interp, this, args| construct(interp, name, this, args));
        if let Value::Function(function) = &constructor {
            function.set("prototype", Value::Object(prototype));
        }
        global.define(name, constructor);
    }
}

/// `new TypeError(message)` fills in the fresh instance; a plain call
/// builds one.
fn construct(interp: &mut Interpreter, name: &str, this: Value, args: &[Value]) -> Result<Value> {
    let message = match arg(args, 0) {
        Value::Undefined => String::new(),
        value => interp.stringify(&value)?,
    };
    let prototype = interp.error_prototype(name);
    if let Value::Object(instance) = &this {
        let constructed = instance
            .borrow()
            .prototype()
            .is_some_and(|own| Rc::ptr_eq(own, &prototype));
        if constructed {
            let mut instance = instance.borrow_mut();
            instance.set("name", Value::from(name));
            instance.set("message", Value::String(message));
            drop(instance);
            return Ok(this);
        }
    }
    Ok(interp.make_error(name, &message))
}
