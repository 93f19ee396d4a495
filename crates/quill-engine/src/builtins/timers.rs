//! Timer placeholders.
//!
//! The engine has no event loop, so `setTimeout` and `setInterval` only
//! validate their callback and return timer id 0. Embedders with a scheduler
//! replace these globals (the host crate does).

use super::arg;
use crate::error::{Error, Result};
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};

pub fn register(global: &Scope) {
    global.define("setTimeout", Value::native("setTimeout", 2, set_timer));
    global.define("setInterval", Value::native("setInterval", 2, set_timer));
    global.define("clearTimeout", Value::native("clearTimeout", 1, clear_timer));
    global.define("clearInterval", Value::native("clearInterval", 1, clear_timer));
}

fn set_timer(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    if !arg(args, 0).is_function() {
        return Err(Error::type_error("timer callback must be a function"));
    }
    Ok(Value::from(0))
}

fn clear_timer(_: &mut Interpreter, _this: Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::Undefined)
}
