//! Runtime types: values, objects, functions and scopes.

pub mod environment;
pub mod function;
pub mod object;
pub mod value;

pub use environment::Scope;
pub use function::{Function, FunctionKind, NativeFn};
pub use object::{Array, Object, PropertyMap};
pub use value::Value;
