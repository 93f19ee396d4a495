//! Host object interop.
//!
//! Scripts see host objects as opaque handles. Every host type publishes a
//! static binding table of [`HostMember`]s; property reads and method calls
//! on a handle resolve against that table. When a name is overloaded the
//! dispatcher scores each candidate against the call-site arguments and
//! remembers the decision.
//!
//! ```rust
//! use std::any::Any;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use quill_engine::interop::{HostArg, HostMember, HostObject, ParamKind};
//! use quill_engine::{Engine, Value};
//!
//! struct Counter(Cell<i32>);
//!
//! static COUNTER_MEMBERS: &[HostMember] = &[
//!     HostMember::new("getCount", &[]),
//!     HostMember::new("add", &[ParamKind::Int]),
//! ];
//!
//! impl HostObject for Counter {
//!     fn type_name(&self) -> &str {
//!         "Counter"
//!     }
//!
//!     fn members(&self) -> &'static [HostMember] {
//!         COUNTER_MEMBERS
//!     }
//!
//!     fn invoke(&self, index: usize, args: Vec<HostArg>) -> Result<Value, String> {
//!         match (index, args.as_slice()) {
//!             (0, []) => Ok(Value::from(self.0.get())),
//!             (1, [HostArg::Int(n)]) => {
//!                 self.0.set(self.0.get() + n);
//!                 Ok(Value::Undefined)
//!             }
//!             _ => Err("bad arguments".to_string()),
//!         }
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! engine.define_global("counter", Value::host(Rc::new(Counter(Cell::new(0)))));
//! let result = engine.execute("counter.add(2); counter.add(3); counter.count").unwrap();
//! assert_eq!(result, Value::from(5));
//! ```

mod dispatch;

pub use dispatch::{Dispatcher, score};

use crate::runtime::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The declared kind of a host member parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Text
    Str,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// Double precision float
    Double,
    /// Single precision float
    Float,
    /// 16-bit integer
    Short,
    /// 8-bit integer
    Byte,
    /// A single character
    Char,
    /// Boolean
    Bool,
    /// A host object of the named type, as judged by
    /// [`HostObject::is_instance_of`]
    Host(&'static str),
    /// Any script value, passed through unconverted
    Any,
}

/// One entry of a host type's binding table.
#[derive(Debug, Clone, Copy)]
pub struct HostMember {
    /// Member name as scripts call it
    pub name: &'static str,
    /// Declared parameter kinds
    pub params: &'static [ParamKind],
    /// The last parameter repeats for any extra arguments
    pub variadic: bool,
}

impl HostMember {
    /// Declares a fixed-arity member.
    pub const fn new(name: &'static str, params: &'static [ParamKind]) -> Self {
        Self {
            name,
            params,
            variadic: false,
        }
    }

    /// Declares a member whose last parameter accepts any number of arguments.
    pub const fn variadic(name: &'static str, params: &'static [ParamKind]) -> Self {
        Self {
            name,
            params,
            variadic: true,
        }
    }

    /// Whether a call with `count` arguments fits this member's arity.
    pub fn accepts(&self, count: usize) -> bool {
        if self.variadic {
            count + 1 >= self.params.len()
        } else {
            count == self.params.len()
        }
    }

    /// The declared kind for argument `index`, repeating the last kind of a
    /// variadic member.
    pub fn param(&self, index: usize) -> Option<ParamKind> {
        match self.params.get(index) {
            Some(kind) => Some(*kind),
            None if self.variadic => self.params.last().copied(),
            None => None,
        }
    }
}

/// An argument converted to the declared kind of the selected member.
#[derive(Clone)]
pub enum HostArg {
    /// A nullish argument for a text or host parameter
    Null,
    /// Text
    Str(String),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Double
    Double(f64),
    /// Float
    Float(f32),
    /// 16-bit integer
    Short(i16),
    /// 8-bit integer
    Byte(i8),
    /// Single character
    Char(char),
    /// Boolean
    Bool(bool),
    /// Host object
    Host(Rc<dyn HostObject>),
    /// Unconverted value
    Any(Value),
}

impl fmt::Debug for HostArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostArg::Null => write!(f, "Null"),
            HostArg::Str(s) => write!(f, "Str({s:?})"),
            HostArg::Int(n) => write!(f, "Int({n})"),
            HostArg::Long(n) => write!(f, "Long({n})"),
            HostArg::Double(n) => write!(f, "Double({n})"),
            HostArg::Float(n) => write!(f, "Float({n})"),
            HostArg::Short(n) => write!(f, "Short({n})"),
            HostArg::Byte(n) => write!(f, "Byte({n})"),
            HostArg::Char(c) => write!(f, "Char({c:?})"),
            HostArg::Bool(b) => write!(f, "Bool({b})"),
            HostArg::Host(host) => write!(f, "Host({})", host.type_name()),
            HostArg::Any(value) => write!(f, "Any({value:?})"),
        }
    }
}

impl HostArg {
    /// Converts `value` for a parameter of `kind`. Nullish values stay
    /// [`HostArg::Null`] except for `Any`; integer kinds truncate.
    pub fn convert(value: &Value, kind: ParamKind) -> HostArg {
        if kind == ParamKind::Any {
            return HostArg::Any(value.clone());
        }
        if value.is_nullish() {
            return HostArg::Null;
        }
        let number = || value.to_number();
        match kind {
            ParamKind::Str => HostArg::Str(value.to_js_string()),
            ParamKind::Int => HostArg::Int(number() as i32),
            ParamKind::Long => HostArg::Long(number() as i64),
            ParamKind::Double => HostArg::Double(number()),
            ParamKind::Float => HostArg::Float(number() as f32),
            ParamKind::Short => HostArg::Short(number() as i16),
            ParamKind::Byte => HostArg::Byte(number() as i8),
            ParamKind::Char => value
                .to_js_string()
                .chars()
                .next()
                .map_or(HostArg::Null, HostArg::Char),
            ParamKind::Bool => HostArg::Bool(value.to_boolean()),
            ParamKind::Host(_) => match value {
                Value::Host(host) => HostArg::Host(host.clone()),
                other => HostArg::Any(other.clone()),
            },
            ParamKind::Any => HostArg::Any(value.clone()),
        }
    }

    /// Text content, if this is a string argument.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostArg::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// An object owned by the embedding application.
///
/// Implementations use interior mutability: handles are shared between
/// every script value that references them.
pub trait HostObject: Any {
    /// The runtime type name, used in errors, `instanceof` and the dispatch
    /// cache.
    fn type_name(&self) -> &str;

    /// The binding table. Member order is the overload tie-break order.
    fn members(&self) -> &'static [HostMember];

    /// Invokes the member at `index` in [`members`](Self::members) with
    /// arguments already converted to its declared kinds. An `Err` becomes
    /// a script RuntimeError prefixed with the type and member name.
    fn invoke(&self, index: usize, args: Vec<HostArg>) -> Result<Value, String>;

    /// The string form of the handle.
    fn display(&self) -> String {
        format!("[host {}]", self.type_name())
    }

    /// The numeric value of the handle, if it has one.
    fn as_number(&self) -> Option<f64> {
        None
    }

    /// Whether this object counts as an instance of `type_name`.
    fn is_instance_of(&self, type_name: &str) -> bool {
        self.type_name() == type_name
    }

    /// Access to the concrete type, for natives that receive a handle back.
    fn as_any(&self) -> &dyn Any;
}

/// Capitalizes the first character of a property name: `count` → `Count`.
pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Finds a zero-argument member named `name`.
pub(crate) fn find_accessor(members: &[HostMember], name: &str) -> Option<usize> {
    members
        .iter()
        .position(|member| member.name == name && member.accepts(0))
}
