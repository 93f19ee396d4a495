//! Overload resolution and property access for host objects.

use super::{HostArg, HostMember, HostObject, ParamKind, capitalize, find_accessor};
use crate::error::{Error, Result};
use crate::runtime::Value;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use tracing::debug;

/// The coarse kind of a call-site argument. Two calls with the same shape
/// always score the same, so a decision can be reused. Host handles are
/// told apart by type name since `Host` parameters are typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ArgShape {
    Nullish,
    Boolean,
    Number,
    Char,
    Text,
    Host(String),
    Other,
}

impl ArgShape {
    fn of(value: &Value) -> Self {
        match value {
            Value::Undefined | Value::Null => ArgShape::Nullish,
            Value::Boolean(_) => ArgShape::Boolean,
            Value::Number(_) => ArgShape::Number,
            Value::String(s) if s.chars().count() == 1 => ArgShape::Char,
            Value::String(_) => ArgShape::Text,
            Value::Host(host) => ArgShape::Host(host.type_name().to_string()),
            _ => ArgShape::Other,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct DispatchKey {
    type_name: String,
    member: String,
    shape: Vec<ArgShape>,
}

/// How well a value fits a parameter kind.
pub fn score(kind: ParamKind, value: &Value) -> u32 {
    match (kind, value) {
        (ParamKind::Any, _) => 1,
        (ParamKind::Str, Value::String(_)) => 10,
        (ParamKind::Int | ParamKind::Double, Value::Number(_)) => 10,
        (ParamKind::Long | ParamKind::Float, Value::Number(_)) => 9,
        (ParamKind::Short | ParamKind::Byte, Value::Number(_)) => 8,
        (ParamKind::Char, Value::String(s)) if s.chars().count() == 1 => 8,
        (ParamKind::Bool, Value::Boolean(_)) => 10,
        (ParamKind::Host(type_name), Value::Host(host)) if host.is_instance_of(type_name) => 10,
        (ParamKind::Str | ParamKind::Host(_), Value::Undefined | Value::Null) => 1,
        _ => 0,
    }
}

fn score_member(member: &HostMember, args: &[Value]) -> u32 {
    args.iter()
        .enumerate()
        .filter_map(|(index, arg)| member.param(index).map(|kind| score(kind, arg)))
        .sum::<u32>()
        + 100
}

/// Resolves member calls on host objects and caches the decisions.
#[derive(Debug, Default)]
pub struct Dispatcher {
    cache: FxHashMap<DispatchKey, Option<usize>>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached decisions.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Picks the member to call for `name` with `args`.
    ///
    /// Members whose arity fits are preferred; when none fits, every member
    /// with the name competes. The highest score wins and the first declared
    /// member wins a tie.
    pub fn resolve(&mut self, host: &dyn HostObject, name: &str, args: &[Value]) -> Option<usize> {
        let key = DispatchKey {
            type_name: host.type_name().to_string(),
            member: name.to_string(),
            shape: args.iter().map(ArgShape::of).collect(),
        };
        if let Some(decision) = self.cache.get(&key) {
            return *decision;
        }

        let members = host.members();
        let named: Vec<usize> = members
            .iter()
            .enumerate()
            .filter(|(_, member)| member.name == name)
            .map(|(index, _)| index)
            .collect();
        let fitting: Vec<usize> = named
            .iter()
            .copied()
            .filter(|&index| members[index].accepts(args.len()))
            .collect();
        let candidates = if fitting.is_empty() { named } else { fitting };

        let mut best: Option<(usize, u32)> = None;
        for index in candidates {
            let score = score_member(&members[index], args);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((index, score));
            }
        }

        let decision = best.map(|(index, _)| index);
        debug!(
            host = key.type_name,
            member = name,
            arity = args.len(),
            ?decision,
            "resolved host member"
        );
        self.cache.insert(key, decision);
        decision
    }

    /// Calls member `name` on `host`.
    pub fn invoke(&mut self, host: &Rc<dyn HostObject>, name: &str, args: &[Value]) -> Result<Value> {
        let index = self.resolve(host.as_ref(), name, args).ok_or_else(|| {
            Error::runtime(format!(
                "no method '{name}' with {} argument(s) on {}",
                args.len(),
                host.type_name()
            ))
        })?;
        let member = &host.members()[index];
        let declared = if member.variadic {
            args.len().max(member.params.len().saturating_sub(1))
        } else {
            member.params.len()
        };
        let converted = (0..declared)
            .filter_map(|i| {
                let kind = member.param(i)?;
                Some(HostArg::convert(args.get(i).unwrap_or(&Value::Undefined), kind))
            })
            .collect();
        host.invoke(index, converted)
            .map_err(|message| Error::runtime(format!("{}.{name}: {message}", host.type_name())))
    }

    /// Reads property `name` of `host`: a `get<Name>` accessor, then an
    /// `is<Name>` accessor, otherwise a callable that dispatches `name`.
    /// Calling it with no matching member raises the "no method" error.
    pub fn get_property(&mut self, host: &Rc<dyn HostObject>, name: &str) -> Result<Value> {
        let members = host.members();
        let capitalized = capitalize(name);
        for accessor in [format!("get{capitalized}"), format!("is{capitalized}")] {
            if let Some(index) = find_accessor(members, &accessor) {
                return host.invoke(index, Vec::new()).map_err(|message| {
                    Error::runtime(format!("{}.{accessor}: {message}", host.type_name()))
                });
            }
        }

        let target = host.clone();
        let member = name.to_string();
        Ok(Value::native(name, 0, move |interp, _this, args| {
            interp.dispatcher_mut().invoke(&target, &member, args)
        }))
    }

    /// Writes property `name` through a one-argument `set<Name>` member.
    pub fn set_property(&mut self, host: &Rc<dyn HostObject>, name: &str, value: Value) -> Result<()> {
        let setter = format!("set{}", capitalize(name));
        if !host.members().iter().any(|member| member.name == setter) {
            return Err(Error::type_error(format!(
                "Cannot set property '{name}' of {}",
                host.type_name()
            )));
        }
        self.invoke(host, &setter, &[value]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Sign {
        text: RefCell<String>,
        calls: RefCell<Vec<&'static str>>,
    }

    static SIGN_MEMBERS: &[HostMember] = &[
        HostMember::new("getText", &[]),
        HostMember::new("setText", &[ParamKind::Str]),
        HostMember::new("setText", &[ParamKind::Int]),
        HostMember::new("isLit", &[]),
        HostMember::new("fail", &[]),
        HostMember::new("pick", &[ParamKind::Any]),
        HostMember::new("pick", &[ParamKind::Any]),
        HostMember::variadic("join", &[ParamKind::Str, ParamKind::Str]),
        HostMember::new("hang", &[ParamKind::Host("Frame")]),
        HostMember::new("hang", &[ParamKind::Host("Sign")]),
    ];

    impl HostObject for Sign {
        fn type_name(&self) -> &str {
            "Sign"
        }

        fn members(&self) -> &'static [HostMember] {
            SIGN_MEMBERS
        }

        fn invoke(&self, index: usize, args: Vec<HostArg>) -> std::result::Result<Value, String> {
            match (index, args.as_slice()) {
                (0, []) => Ok(Value::from(self.text.borrow().as_str())),
                (1, [HostArg::Str(s)]) => {
                    self.calls.borrow_mut().push("text");
                    *self.text.borrow_mut() = s.clone();
                    Ok(Value::Undefined)
                }
                (2, [HostArg::Int(n)]) => {
                    self.calls.borrow_mut().push("number");
                    *self.text.borrow_mut() = format!("#{n}");
                    Ok(Value::Undefined)
                }
                (3, []) => Ok(Value::from(true)),
                (4, []) => Err("out of ink".to_string()),
                (5, _) => Ok(Value::from("first")),
                (6, _) => Ok(Value::from("second")),
                (8, [HostArg::Host(_)]) => Ok(Value::from("frame")),
                (9, [HostArg::Host(_)]) => Ok(Value::from("sign")),
                (7, parts) => Ok(Value::from(
                    parts
                        .iter()
                        .filter_map(HostArg::as_str)
                        .collect::<Vec<_>>()
                        .join(" "),
                )),
                _ => Err("unexpected call".to_string()),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn sign() -> Rc<dyn HostObject> {
        Rc::new(Sign::default())
    }

    #[test]
    fn test_scores() {
        assert_eq!(score(ParamKind::Str, &Value::from("a")), 10);
        assert_eq!(score(ParamKind::Int, &Value::from(1)), 10);
        assert_eq!(score(ParamKind::Long, &Value::from(1)), 9);
        assert_eq!(score(ParamKind::Byte, &Value::from(1)), 8);
        assert_eq!(score(ParamKind::Char, &Value::from("a")), 8);
        assert_eq!(score(ParamKind::Char, &Value::from("ab")), 0);
        assert_eq!(score(ParamKind::Any, &Value::from(true)), 1);
        assert_eq!(score(ParamKind::Str, &Value::Null), 1);
        assert_eq!(score(ParamKind::Int, &Value::from("1")), 0);

        let handle = Value::Host(sign());
        assert_eq!(score(ParamKind::Host("Sign"), &handle), 10);
        assert_eq!(score(ParamKind::Host("Frame"), &handle), 0);
        assert_eq!(score(ParamKind::Host("Frame"), &Value::Null), 1);
    }

    #[test]
    fn test_host_overload_follows_argument_type() {
        let host = sign();
        let mut dispatcher = Dispatcher::new();
        let other = Value::Host(sign());
        assert_eq!(dispatcher.invoke(&host, "hang", &[other]).unwrap(), Value::from("sign"));
    }

    #[test]
    fn test_numeric_overload_selected() {
        let host = sign();
        let mut dispatcher = Dispatcher::new();
        dispatcher.invoke(&host, "setText", &[Value::from(7)]).unwrap();
        dispatcher.invoke(&host, "setText", &[Value::from("hi")]).unwrap();
        let sign = host.as_any().downcast_ref::<Sign>().unwrap();
        assert_eq!(*sign.calls.borrow(), vec!["number", "text"]);
        assert_eq!(dispatcher.cached(), 2);
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        let host = sign();
        let mut dispatcher = Dispatcher::new();
        let result = dispatcher.invoke(&host, "pick", &[Value::from(1)]).unwrap();
        assert_eq!(result, Value::from("first"));
    }

    #[test]
    fn test_getter_and_boolean_accessor() {
        let host = sign();
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_property(&host, "text", Value::from("open")).unwrap();
        assert_eq!(dispatcher.get_property(&host, "text").unwrap(), Value::from("open"));
        assert_eq!(dispatcher.get_property(&host, "lit").unwrap(), Value::from(true));
        assert!(dispatcher.get_property(&host, "join").unwrap().is_function());
        assert!(dispatcher.get_property(&host, "missing").unwrap().is_function());
    }

    #[test]
    fn test_variadic_member() {
        let host = sign();
        let mut dispatcher = Dispatcher::new();
        let args = [Value::from("a"), Value::from("b"), Value::from("c")];
        assert_eq!(dispatcher.invoke(&host, "join", &args).unwrap(), Value::from("a b c"));
        assert_eq!(
            dispatcher.invoke(&host, "join", &[Value::from("solo")]).unwrap(),
            Value::from("solo")
        );
    }

    #[test]
    fn test_errors() {
        let host = sign();
        let mut dispatcher = Dispatcher::new();
        let err = dispatcher.invoke(&host, "nothing", &[Value::Null]).unwrap_err();
        assert_eq!(err.message(), "no method 'nothing' with 1 argument(s) on Sign");

        let err = dispatcher.invoke(&host, "fail", &[]).unwrap_err();
        assert_eq!(err.message(), "Sign.fail: out of ink");

        assert!(dispatcher.set_property(&host, "size", Value::from(1)).is_err());
    }
}
