//! The `Boolean` conversion function.

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::runtime::{Scope, Value};

pub fn register(global: &Scope) {
    global.define("Boolean", Value::native("Boolean", 1, boolean));
}

fn boolean(_: &mut Interpreter, _this: Value, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(args.first().is_some_and(Value::to_boolean)))
}
