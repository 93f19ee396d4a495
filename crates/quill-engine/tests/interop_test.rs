//! Host object interop through the public API.

use quill_engine::interop::{HostArg, HostMember, HostObject, ParamKind};
use quill_engine::{Engine, EngineConfig, Value};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// A host type with a getter and an overloaded setter.
#[derive(Default)]
struct Banner {
    label: RefCell<String>,
    log: RefCell<Vec<&'static str>>,
}

static BANNER_MEMBERS: &[HostMember] = &[
    HostMember::new("getLabel", &[]),
    HostMember::new("setLabel", &[ParamKind::Str]),
    HostMember::new("setLabel", &[ParamKind::Int]),
    HostMember::new("isVisible", &[]),
    HostMember::variadic("join", &[ParamKind::Str]),
    HostMember::new("fail", &[]),
    HostMember::new("pin", &[ParamKind::Host("Banner")]),
    HostMember::new("pin", &[ParamKind::Host("Flag")]),
];

impl HostObject for Banner {
    fn type_name(&self) -> &str {
        "Banner"
    }

    fn members(&self) -> &'static [HostMember] {
        BANNER_MEMBERS
    }

    fn invoke(&self, index: usize, args: Vec<HostArg>) -> Result<Value, String> {
        match (index, args.as_slice()) {
            (0, []) => Ok(Value::from(self.label.borrow().as_str())),
            (1, [HostArg::Str(text)]) => {
                self.log.borrow_mut().push("text");
                *self.label.borrow_mut() = text.clone();
                Ok(Value::Undefined)
            }
            (2, [HostArg::Int(n)]) => {
                self.log.borrow_mut().push("number");
                *self.label.borrow_mut() = format!("#{n}");
                Ok(Value::Undefined)
            }
            (3, []) => Ok(Value::from(true)),
            (4, parts) => Ok(Value::from(
                parts.iter().filter_map(HostArg::as_str).collect::<Vec<_>>().join("+"),
            )),
            (5, []) => Err("torn".to_string()),
            (6, [HostArg::Host(other)]) => Ok(Value::from(format!("banner {}", other.type_name()))),
            (7, [HostArg::Host(other)]) => Ok(Value::from(format!("flag {}", other.type_name()))),
            _ => Err("unexpected arguments".to_string()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A second host type, used as an argument.
struct Flag;

impl HostObject for Flag {
    fn type_name(&self) -> &str {
        "Flag"
    }

    fn members(&self) -> &'static [HostMember] {
        &[]
    }

    fn invoke(&self, _index: usize, _args: Vec<HostArg>) -> Result<Value, String> {
        Err("no members".to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn engine_with_banner() -> (Engine, Rc<Banner>) {
    let mut engine = Engine::with_config(EngineConfig {
        console_echo: false,
        ..EngineConfig::default()
    });
    let banner = Rc::new(Banner::default());
    engine.define_host("banner", banner.clone());
    (engine, banner)
}

#[test]
fn test_getter_and_overloaded_setter() {
    let (mut engine, banner) = engine_with_banner();
    engine.execute("banner.setLabel('hello')").unwrap();
    assert_eq!(engine.execute("banner.label").unwrap(), Value::from("hello"));

    engine.execute("banner.setLabel(42)").unwrap();
    assert_eq!(engine.execute("banner.label").unwrap(), Value::from("#42"));

    engine.execute("banner.label = 'assigned'").unwrap();
    engine.execute("banner.label = 7").unwrap();
    assert_eq!(*banner.log.borrow(), vec!["text", "number", "text", "number"]);
    assert_eq!(engine.execute("banner.label").unwrap(), Value::from("#7"));
}

#[test]
fn test_boolean_accessor_and_variadic() {
    let (mut engine, _) = engine_with_banner();
    assert_eq!(engine.execute("banner.visible").unwrap(), Value::from(true));
    assert_eq!(engine.execute("banner.join('a', 'b', 'c')").unwrap(), Value::from("a+b+c"));
    assert_eq!(engine.execute("typeof banner.nothing").unwrap(), Value::from("function"));
}

#[test]
fn test_host_overload_follows_argument_type() {
    let (mut engine, _) = engine_with_banner();
    engine.define_host("flag", Rc::new(Flag));
    assert_eq!(engine.execute("banner.pin(flag)").unwrap(), Value::from("flag Flag"));
    assert_eq!(engine.execute("banner.pin(banner)").unwrap(), Value::from("banner Banner"));
    assert_eq!(engine.execute("banner.pin(flag)").unwrap(), Value::from("flag Flag"));
}

#[test]
fn test_host_errors_are_runtime_errors() {
    let (mut engine, _) = engine_with_banner();
    let err = engine.execute("banner.fail()").unwrap_err();
    assert_eq!(err.message(), "Banner.fail: torn");

    let err = engine.execute("banner.missing()").unwrap_err();
    assert!(err.message().starts_with("no method 'missing' with 0 argument(s) on Banner"));

    assert_eq!(
        engine.execute("try { banner.nothing(1) } catch (e) { e.message }").unwrap(),
        Value::from("no method 'nothing' with 1 argument(s) on Banner")
    );

    assert_eq!(
        engine.execute("try { banner.fail() } catch (e) { e.message }").unwrap(),
        Value::from("Banner.fail: torn")
    );
}

#[test]
fn test_host_instanceof_and_display() {
    let (mut engine, _) = engine_with_banner();
    assert_eq!(engine.execute("banner instanceof 'Banner'").unwrap(), Value::from(true));
    assert_eq!(engine.execute("banner instanceof 'Other'").unwrap(), Value::from(false));
    assert_eq!(engine.execute("typeof banner").unwrap(), Value::from("object"));
    assert_eq!(engine.execute("'' + banner").unwrap(), Value::from("[host Banner]"));
}

#[test]
fn test_dispatch_decisions_are_cached() {
    let (mut engine, banner) = engine_with_banner();
    engine
        .execute("for (let i = 0; i < 10; i++) { banner.setLabel(i); banner.setLabel('x' + i); }")
        .unwrap();
    assert_eq!(banner.log.borrow().len(), 20);
    assert_eq!(banner.log.borrow()[18..], ["number", "text"]);
    assert!(engine.interpreter_mut().dispatcher_mut().cached() >= 2);
}

#[test]
fn test_host_calls_back_into_script() {
    let (mut engine, _) = engine_with_banner();
    engine
        .execute("var handlers = []; function on(fn) { handlers.push(fn); } on(n => banner.setLabel(n * 2));")
        .unwrap();
    let handlers = engine.get_global("handlers");
    let handler = match &handlers {
        Value::Array(array) => array.borrow().elements[0].clone(),
        other => panic!("expected array, got {other:?}"),
    };
    engine.call(&handler, Value::Undefined, &[Value::from(21)]).unwrap();
    assert_eq!(engine.execute("banner.label").unwrap(), Value::from("#42"));
}
