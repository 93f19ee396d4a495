//! Lexical environments for variable binding.

use super::value::Value;
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A lexical environment: bindings plus the enclosing environment.
#[derive(Debug, Default)]
pub struct Environment {
    /// The bindings in this environment
    bindings: FxHashMap<String, Binding>,
    /// The outer (parent) environment
    outer: Option<Scope>,
    /// Function bodies and the global scope receive `var` declarations
    var_target: bool,
}

/// A variable binding.
#[derive(Debug, Clone)]
struct Binding {
    /// The value
    value: Value,
    /// Whether the binding is mutable (const is not)
    mutable: bool,
}

/// A shared handle to an [`Environment`].
///
/// Closures keep their defining scope alive by holding a `Scope`.
#[derive(Debug, Clone)]
pub struct Scope(Rc<RefCell<Environment>>);

impl Scope {
    /// Creates a root (global) scope.
    pub fn new_global() -> Self {
        Self(Rc::new(RefCell::new(Environment {
            var_target: true,
            ..Environment::default()
        })))
    }

    /// Creates a block scope nested in this one.
    pub fn child(&self) -> Self {
        Self(Rc::new(RefCell::new(Environment {
            outer: Some(self.clone()),
            ..Environment::default()
        })))
    }

    /// Creates a function-body scope nested in this one.
    pub fn function_child(&self) -> Self {
        let scope = self.child();
        scope.0.borrow_mut().var_target = true;
        scope
    }

    /// Creates or replaces a mutable binding in this scope only.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.insert(name.into(), value, true);
    }

    /// Creates an immutable binding in this scope only.
    pub fn define_const(&self, name: impl Into<String>, value: Value) {
        self.insert(name.into(), value, false);
    }

    fn insert(&self, name: String, value: Value, mutable: bool) {
        self.0
            .borrow_mut()
            .bindings
            .insert(name, Binding { value, mutable });
    }

    /// Declares a `var` in the nearest function or global scope. An
    /// existing binding keeps its value when no initializer is given.
    pub fn define_var(&self, name: &str, value: Option<Value>) {
        let target = self.var_scope();
        let exists = target.0.borrow().bindings.contains_key(name);
        match value {
            Some(value) => target.define(name, value),
            None if !exists => target.define(name, Value::Undefined),
            None => {}
        }
    }

    fn var_scope(&self) -> Scope {
        let mut current = self.clone();
        loop {
            let outer = {
                let env = current.0.borrow();
                if env.var_target {
                    return current.clone();
                }
                env.outer.clone()
            };
            match outer {
                Some(outer) => current = outer,
                None => return current,
            }
        }
    }

    /// Looks a name up through the scope chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let outer = {
                let env = current.0.borrow();
                if let Some(binding) = env.bindings.get(name) {
                    return Some(binding.value.clone());
                }
                env.outer.clone()
            };
            current = outer?;
        }
    }

    /// Returns true if the name resolves anywhere in the chain.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns true if this scope itself binds the name.
    pub fn has_own(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// Assigns to the nearest binding of `name`.
    ///
    /// An unresolved name becomes a new global when `implicit_globals` is
    /// set and is a ReferenceError otherwise. Constants reject assignment.
    pub fn set(&self, name: &str, value: Value, implicit_globals: bool) -> Result<()> {
        let mut current = self.clone();
        loop {
            let outer = {
                let mut env = current.0.borrow_mut();
                if let Some(binding) = env.bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(Error::type_error(format!(
                            "Assignment to constant variable '{name}'"
                        )));
                    }
                    binding.value = value;
                    return Ok(());
                }
                env.outer.clone()
            };
            match outer {
                Some(outer) => current = outer,
                None => break,
            }
        }

        if implicit_globals {
            current.define(name, value);
            Ok(())
        } else {
            Err(Error::reference_error(name))
        }
    }

    /// The root of the chain.
    pub fn root(&self) -> Scope {
        let mut current = self.clone();
        loop {
            let outer = current.0.borrow().outer.clone();
            match outer {
                Some(outer) => current = outer,
                None => return current,
            }
        }
    }

    /// Names bound directly in this scope, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().bindings.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops every binding in this scope. Global functions hold the global
    /// scope, so the engine clears it on drop to break those cycles.
    pub fn clear(&self) {
        let bindings = std::mem::take(&mut self.0.borrow_mut().bindings);
        drop(bindings);
    }

    /// Returns true if both handles refer to the same environment.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
