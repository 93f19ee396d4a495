//! Function representation: script closures, native callables and bound
//! functions.

use super::environment::Scope;
use super::object::PropertyMap;
use super::value::Value;
use crate::ast::FunctionLiteral;
use crate::error::Result;
use crate::interpreter::Interpreter;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Signature of a native callable: interpreter, `this`, arguments.
pub type NativeFn = dyn Fn(&mut Interpreter, Value, &[Value]) -> Result<Value>;

/// A function value.
pub struct Function {
    /// What the function does when called
    pub kind: FunctionKind,
    name: String,
    properties: RefCell<PropertyMap>,
}

/// The callable part of a function.
pub enum FunctionKind {
    /// A script function with its captured scope
    Closure(Closure),
    /// A native Rust callable
    Native(NativeFunction),
    /// The result of `fn.bind(this, ...args)`
    Bound(BoundFunction),
}

/// A script function paired with the scope it was created in.
pub struct Closure {
    /// The shared function literal
    pub literal: Rc<FunctionLiteral>,
    /// The defining scope
    pub scope: Scope,
}

/// A native callable.
pub struct NativeFunction {
    /// Declared parameter count, reported as `length`
    pub arity: usize,
    /// The callback
    pub func: Rc<NativeFn>,
}

/// A function with a fixed receiver and leading arguments.
pub struct BoundFunction {
    /// The wrapped function
    pub target: Rc<Function>,
    /// The receiver passed on every call
    pub this: Value,
    /// Arguments prepended to every call
    pub args: Vec<Value>,
}

impl Function {
    /// Creates a closure over `scope`. `name` overrides the literal's own
    /// name, so `const f = () => {}` reports `f`.
    pub fn closure(literal: Rc<FunctionLiteral>, scope: Scope, name: Option<&str>) -> Self {
        let name = name
            .map(str::to_string)
            .or_else(|| literal.name.clone())
            .unwrap_or_default();
        Self {
            kind: FunctionKind::Closure(Closure { literal, scope }),
            name,
            properties: RefCell::default(),
        }
    }

    /// Creates a native function.
    pub fn native<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&mut Interpreter, Value, &[Value]) -> Result<Value> + 'static,
    {
        Self {
            kind: FunctionKind::Native(NativeFunction {
                arity,
                func: Rc::new(func),
            }),
            name: name.to_string(),
            properties: RefCell::default(),
        }
    }

    /// Binds `target` to a receiver and leading arguments.
    pub fn bound(target: Rc<Function>, this: Value, args: Vec<Value>) -> Self {
        let name = format!("bound {}", target.name());
        Self {
            kind: FunctionKind::Bound(BoundFunction { target, this, args }),
            name,
            properties: RefCell::default(),
        }
    }

    /// The function's name; empty for anonymous functions.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of declared parameters, as reported by `length`.
    pub fn arity(&self) -> usize {
        match &self.kind {
            FunctionKind::Closure(closure) => closure.literal.arity(),
            FunctionKind::Native(native) => native.arity,
            FunctionKind::Bound(bound) => bound.target.arity().saturating_sub(bound.args.len()),
        }
    }

    /// Returns true for native callables.
    pub fn is_native(&self) -> bool {
        matches!(self.kind, FunctionKind::Native(_))
    }

    /// Whether `new` may be applied. Arrow functions cannot construct.
    pub fn is_constructor(&self) -> bool {
        match &self.kind {
            FunctionKind::Closure(closure) => !closure.literal.is_arrow,
            FunctionKind::Native(_) => true,
            FunctionKind::Bound(bound) => bound.target.is_constructor(),
        }
    }

    /// Gets an own property, including the synthesized `name` and `length`.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.properties.borrow().get(key) {
            return Some(value.clone());
        }
        match key {
            "name" => Some(Value::from(self.name.as_str())),
            "length" => Some(Value::from(self.arity())),
            _ => None,
        }
    }

    /// Sets an own property.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.properties.borrow_mut().insert(key.into(), value);
    }

    /// Checks own properties, including `name` and `length`.
    pub fn has(&self, key: &str) -> bool {
        matches!(key, "name" | "length") || self.properties.borrow().contains_key(key)
    }

    /// Removes an own property.
    pub fn delete(&self, key: &str) -> bool {
        self.properties.borrow_mut().shift_remove(key).is_some()
    }

    /// The own property map.
    pub fn properties(&self) -> Ref<'_, PropertyMap> {
        self.properties.borrow()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FunctionKind::Closure(_) => write!(f, "Closure({})", self.name),
            FunctionKind::Native(_) => write!(f, "NativeFunction({})", self.name),
            FunctionKind::Bound(_) => write!(f, "BoundFunction({})", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionBody, Param};

    fn literal(params: &[&str], is_arrow: bool) -> Rc<FunctionLiteral> {
        Rc::new(FunctionLiteral {
            name: Some("original".to_string()),
            params: params
                .iter()
                .map(|name| Param {
                    name: name.to_string(),
                    default: None,
                    rest: false,
                })
                .collect(),
            body: FunctionBody::Block(Vec::new()),
            is_arrow,
            line: 1,
        })
    }

    #[test]
    fn test_closure_name_override() {
        let scope = Scope::new_global();
        let named = Function::closure(literal(&["a"], false), scope.clone(), None);
        assert_eq!(named.name(), "original");
        let renamed = Function::closure(literal(&["a"], false), scope, Some("handler"));
        assert_eq!(renamed.name(), "handler");
    }

    #[test]
    fn test_synthesized_properties() {
        let native = Function::native("max", 2, |_, _, _| Ok(Value::Undefined));
        assert_eq!(native.get("name"), Some(Value::from("max")));
        assert_eq!(native.get("length"), Some(Value::from(2)));
        assert_eq!(native.get("missing"), None);

        native.set("name", Value::from("renamed"));
        assert_eq!(native.get("name"), Some(Value::from("renamed")));
    }

    #[test]
    fn test_bound_arity_and_name() {
        let scope = Scope::new_global();
        let target = Rc::new(Function::closure(literal(&["a", "b", "c"], false), scope, None));
        let bound = Function::bound(target, Value::Null, vec![Value::from(1)]);
        assert_eq!(bound.arity(), 2);
        assert_eq!(bound.name(), "bound original");
    }

    #[test]
    fn test_arrows_are_not_constructors() {
        let scope = Scope::new_global();
        assert!(!Function::closure(literal(&[], true), scope.clone(), None).is_constructor());
        assert!(Function::closure(literal(&[], false), scope, None).is_constructor());
    }
}
