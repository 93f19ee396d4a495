// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Globals installed into every script
//!
//! ```js
//! const server = getServer();
//! server.getEventManager().on("join", (event) => server.log(event.name + " joined"));
//! server.getCommandManager().register("ping", (sender, args) => sender.sendMessage("pong"));
//! const db = server.getStorage();
//! db.increment("stats.pings");
//! server.repeat(20, () => server.broadcast(color("&aStill here")));
//! ```
//!
//! Every binding closes over the script's [`ScriptContext`]. Registrations
//! land in the context, never in the manager, so a script that fails to
//! load leaves nothing behind.

use crate::color;
use crate::config::HostConfig;
use crate::registry::{Command, EventPriority, Registry};
use crate::scheduler::{Scheduler, TimerId};
use crate::storage::Storage;
use quill_engine::builtins::date::DateValue;
use quill_engine::{Engine, Error, Result, Value, from_json, to_json};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

/// Receives `server.broadcast` messages: script name, then the message
/// with its formatting codes intact
pub type Broadcast = Rc<dyn Fn(&str, &str)>;

/// State shared between a script instance and the bindings it calls
pub struct ScriptContext {
    name: String,
    config: HostConfig,
    broadcast: Broadcast,
    pub(crate) registry: RefCell<Registry>,
    pub(crate) scheduler: RefCell<Scheduler>,
    pub(crate) storage: RefCell<Storage>,
}

impl ScriptContext {
    /// Context for the script `name`, with its storage opened from the
    /// data directory
    pub fn new(name: impl Into<String>, config: HostConfig, broadcast: Broadcast) -> Self {
        let name = name.into();
        let storage = Storage::open(config.data_dir.join(format!("{name}.json")));
        Self {
            name,
            config,
            broadcast,
            registry: RefCell::default(),
            scheduler: RefCell::default(),
            storage: RefCell::new(storage),
        }
    }

    /// Script name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drop every registration and pending timer
    pub fn discard(&self) {
        self.registry.borrow_mut().clear();
        self.scheduler.borrow_mut().clear();
    }
}

type ApiFn = fn(&ScriptContext, &[Value]) -> Result<Value>;

/// Install `getServer`, `color` and the timer functions into `engine`
pub fn install(engine: &mut Engine, context: &Rc<ScriptContext>) {
    let server = server_object(context);
    engine.register_native("getServer", 0, move |_, _, _| Ok(server.clone()));

    let globals: &[(&str, usize, ApiFn)] = &[
        ("color", 1, color_text),
        ("setTimeout", 2, set_timeout),
        ("setInterval", 2, set_interval),
        ("clearTimeout", 1, cancel),
        ("clearInterval", 1, cancel),
    ];
    for (name, value) in bindings(context, globals) {
        engine.define_global(&name, value);
    }
}

fn server_object(context: &Rc<ScriptContext>) -> Value {
    let events = Value::object_from(bindings(
        context,
        &[("on", 2, on), ("onPriority", 3, on_priority)],
    ));
    let commands = Value::object_from(bindings(
        context,
        &[
            ("register", 2, register),
            ("registerFull", 4, register_full),
            ("registerTab", 3, register_tab),
            ("registerWithTab", 5, register_with_tab),
        ],
    ));
    let storage = Value::object_from(bindings(context, STORAGE));

    let mut members = bindings(
        context,
        &[
            ("broadcast", 1, broadcast),
            ("log", 1, log),
            ("now", 0, now),
            ("getName", 0, script_name),
            ("getTick", 0, current_tick),
            ("schedule", 2, schedule),
            ("repeat", 2, repeat),
            ("cancel", 1, cancel),
            ("color", 1, color_text),
        ],
    );
    members.push(constant("getEventManager", events));
    members.push(constant("getCommandManager", commands));
    members.push(constant("getStorage", storage));
    Value::object_from(members)
}

fn bindings(context: &Rc<ScriptContext>, table: &[(&str, usize, ApiFn)]) -> Vec<(String, Value)> {
    table
        .iter()
        .map(|&(name, arity, func)| {
            let context = Rc::clone(context);
            let value = Value::native(name, arity, move |_, _, args| func(&context, args));
            (name.to_string(), value)
        })
        .collect()
}

fn constant(name: &str, value: Value) -> (String, Value) {
    (name.to_string(), Value::native(name, 0, move |_, _, _| Ok(value.clone())))
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn usage(text: &str) -> Error {
    Error::runtime(format!("Usage: {text}"))
}

fn require(args: &[Value], count: usize, text: &str) -> Result<()> {
    if args.len() < count {
        return Err(usage(text));
    }
    Ok(())
}

/// The function at `index`, or a usage error
fn function_at(args: &[Value], index: usize, text: &str) -> Result<Value> {
    match args.get(index) {
        Some(callback @ Value::Function(_)) => Ok(callback.clone()),
        _ => Err(usage(text)),
    }
}

fn host_error(err: crate::error::HostError) -> Error {
    Error::runtime(err.to_string())
}

// Events

fn on(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let callback = function_at(args, 1, "events.on(event, function)")?;
    subscribe(context, &arg(args, 0).to_js_string(), EventPriority::Normal, callback);
    Ok(Value::Undefined)
}

fn on_priority(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let callback = function_at(args, 2, "events.onPriority(event, priority, function)")?;
    let priority = EventPriority::parse_or_normal(&arg(args, 1).to_js_string());
    subscribe(context, &arg(args, 0).to_js_string(), priority, callback);
    Ok(Value::Undefined)
}

fn subscribe(context: &ScriptContext, event: &str, priority: EventPriority, callback: Value) {
    context.registry.borrow_mut().on(event, priority, callback);
    debug!(script = %context.name, event, %priority, "registered event handler");
}

// Commands

fn register(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    const USAGE: &str = "commands.register(name, function)";
    let handler = function_at(args, 1, USAGE)?;
    add_command(context, Command::new(&command_name(args, USAGE)?, handler))
}

fn register_full(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    const USAGE: &str = "commands.registerFull(name, description, usage, function)";
    let handler = function_at(args, 3, USAGE)?;
    let command = Command::new(&command_name(args, USAGE)?, handler)
        .describe(arg(args, 1).to_js_string(), arg(args, 2).to_js_string());
    add_command(context, command)
}

fn register_tab(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    const USAGE: &str = "commands.registerTab(name, function, tabFunction)";
    let handler = function_at(args, 1, USAGE)?;
    let completer = function_at(args, 2, USAGE)?;
    let command = Command::new(&command_name(args, USAGE)?, handler).with_completer(completer);
    add_command(context, command)
}

fn register_with_tab(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    const USAGE: &str = "commands.registerWithTab(name, description, usage, function, tabFunction)";
    let handler = function_at(args, 3, USAGE)?;
    let completer = function_at(args, 4, USAGE)?;
    let command = Command::new(&command_name(args, USAGE)?, handler)
        .describe(arg(args, 1).to_js_string(), arg(args, 2).to_js_string())
        .with_completer(completer);
    add_command(context, command)
}

fn command_name(args: &[Value], text: &str) -> Result<String> {
    let name = arg(args, 0).to_js_string();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(usage(text));
    }
    Ok(name)
}

fn add_command(context: &ScriptContext, command: Command) -> Result<Value> {
    let name = command.name.clone();
    let replaced = context.registry.borrow_mut().register(command).is_some();
    debug!(script = %context.name, command = %name, replaced, "registered command");
    Ok(Value::Undefined)
}

// Server

fn broadcast(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let message = arg(args, 0).to_js_string();
    info!(target: "quill::broadcast", script = %context.name, "{}", color::strip(&message));
    (context.broadcast)(&context.name, &message);
    Ok(Value::Undefined)
}

fn log(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let message = arg(args, 0).to_js_string();
    info!(target: "quill::script", script = %context.name, "{message}");
    Ok(Value::Undefined)
}

fn now(_: &ScriptContext, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(DateValue::now().millis()))
}

fn script_name(context: &ScriptContext, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(context.name.as_str()))
}

fn current_tick(context: &ScriptContext, _args: &[Value]) -> Result<Value> {
    Ok(Value::Number(context.scheduler.borrow().now() as f64))
}

fn color_text(_: &ScriptContext, args: &[Value]) -> Result<Value> {
    Ok(Value::String(match args.first() {
        Some(text) => color::colorize(&text.to_js_string()),
        None => String::new(),
    }))
}

// Timers

fn ticks(value: &Value) -> u64 {
    let n = value.to_number();
    if n.is_finite() && n > 0.0 { n as u64 } else { 0 }
}

fn timer_id(id: TimerId) -> Value {
    Value::Number(id.0 as f64)
}

fn schedule(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let callback = function_at(args, 1, "server.schedule(ticks, function)")?;
    let delay = ticks(&arg(args, 0));
    Ok(timer_id(context.scheduler.borrow_mut().schedule(delay, callback)))
}

fn repeat(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let callback = function_at(args, 1, "server.repeat(ticks, function)")?;
    let period = ticks(&arg(args, 0));
    Ok(timer_id(context.scheduler.borrow_mut().repeat(period, callback)))
}

fn set_timeout(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let callback = function_at(args, 0, "setTimeout(function, milliseconds)")?;
    let delay = context.config.millis_to_ticks(arg(args, 1).to_number());
    Ok(timer_id(context.scheduler.borrow_mut().schedule(delay, callback)))
}

fn set_interval(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let callback = function_at(args, 0, "setInterval(function, milliseconds)")?;
    let period = context.config.millis_to_ticks(arg(args, 1).to_number());
    Ok(timer_id(context.scheduler.borrow_mut().repeat(period, callback)))
}

fn cancel(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let id = TimerId(ticks(&arg(args, 0)));
    Ok(Value::from(context.scheduler.borrow_mut().cancel(id)))
}

// Storage

const STORAGE: &[(&str, usize, ApiFn)] = &[
    ("set", 2, storage_set),
    ("setObj", 2, storage_set),
    ("get", 2, storage_get),
    ("getObj", 1, storage_get_object),
    ("has", 1, storage_has),
    ("delete", 1, storage_delete),
    ("keys", 1, storage_keys),
    ("increment", 2, storage_increment),
    ("decrement", 2, storage_decrement),
    ("getOrSet", 2, storage_get_or_set),
    ("push", 2, storage_push),
    ("getArray", 1, storage_get_array),
    ("save", 0, storage_save),
    ("clear", 0, storage_clear),
    ("debug", 0, storage_debug),
];

fn key(args: &[Value], text: &str) -> Result<String> {
    require(args, 1, text)?;
    Ok(arg(args, 0).to_js_string())
}

fn json(value: &Value) -> Result<serde_json::Value> {
    Ok(to_json(value)?.unwrap_or(serde_json::Value::Null))
}

fn storage_set(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    require(args, 2, "storage.set(key, value)")?;
    let value = json(&args[1])?;
    context.storage.borrow_mut().set(&args[0].to_js_string(), value);
    Ok(Value::Undefined)
}

fn storage_get(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let key = key(args, "storage.get(key, default?)")?;
    let storage = context.storage.borrow();
    Ok(match storage.get(&key) {
        Some(value) if !value.is_null() => from_json(value),
        _ => arg(args, 1),
    })
}

fn storage_get_object(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let key = key(args, "storage.getObj(key)")?;
    let storage = context.storage.borrow();
    Ok(match storage.get(&key) {
        Some(value @ serde_json::Value::Object(_)) => from_json(value),
        _ => Value::Null,
    })
}

fn storage_has(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let key = key(args, "storage.has(key)")?;
    Ok(Value::from(context.storage.borrow().has(&key)))
}

fn storage_delete(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let key = key(args, "storage.delete(key)")?;
    Ok(Value::from(context.storage.borrow_mut().delete(&key)))
}

fn storage_keys(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let prefix = args.first().filter(|prefix| !prefix.is_nullish()).map(Value::to_js_string);
    let keys = context.storage.borrow().keys(prefix.as_deref());
    Ok(Value::array(keys.into_iter().map(Value::from).collect()))
}

fn amount(args: &[Value]) -> f64 {
    args.get(1).filter(|n| !n.is_undefined()).map_or(1.0, Value::to_number)
}

fn storage_increment(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let key = key(args, "storage.increment(key, amount?)")?;
    Ok(Value::Number(context.storage.borrow_mut().increment(&key, amount(args))))
}

fn storage_decrement(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let key = key(args, "storage.decrement(key, amount?)")?;
    Ok(Value::Number(context.storage.borrow_mut().increment(&key, -amount(args))))
}

fn storage_get_or_set(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    require(args, 2, "storage.getOrSet(key, default)")?;
    let key = args[0].to_js_string();
    let mut storage = context.storage.borrow_mut();
    if let Some(value) = storage.get(&key).filter(|value| !value.is_null()) {
        return Ok(from_json(value));
    }
    storage.set(&key, json(&args[1])?);
    Ok(args[1].clone())
}

fn storage_push(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    require(args, 2, "storage.push(key, value)")?;
    let value = json(&args[1])?;
    let len = context.storage.borrow_mut().push(&args[0].to_js_string(), value);
    Ok(Value::from(len))
}

fn storage_get_array(context: &ScriptContext, args: &[Value]) -> Result<Value> {
    let key = key(args, "storage.getArray(key)")?;
    let storage = context.storage.borrow();
    Ok(match storage.get(&key) {
        Some(value @ serde_json::Value::Array(_)) => from_json(value),
        _ => Value::array(Vec::new()),
    })
}

fn storage_save(context: &ScriptContext, _args: &[Value]) -> Result<Value> {
    context.storage.borrow_mut().save().map_err(host_error)?;
    Ok(Value::Undefined)
}

fn storage_clear(context: &ScriptContext, _args: &[Value]) -> Result<Value> {
    context.storage.borrow_mut().clear();
    Ok(Value::Undefined)
}

fn storage_debug(context: &ScriptContext, _args: &[Value]) -> Result<Value> {
    Ok(Value::String(context.storage.borrow().to_pretty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_engine::EngineConfig;

    struct Fixture {
        _dir: tempfile::TempDir,
        engine: Engine,
        context: Rc<ScriptContext>,
        broadcasts: Rc<RefCell<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HostConfig::new(dir.path());
        config.engine = EngineConfig {
            console_echo: false,
            ..EngineConfig::default()
        };
        let broadcasts = Rc::new(RefCell::new(Vec::new()));
        let sink = broadcasts.clone();
        let broadcast: Broadcast = Rc::new(move |_script: &str, message: &str| sink.borrow_mut().push(message.to_string()));
        let context = Rc::new(ScriptContext::new("demo", config.clone(), broadcast));
        let mut engine = Engine::with_config(config.engine.clone());
        install(&mut engine, &context);
        Fixture {
            _dir: dir,
            engine,
            context,
            broadcasts,
        }
    }

    #[test]
    fn test_registrations_land_in_context() {
        let mut f = fixture();
        f.engine
            .execute(
                r#"
                const server = getServer();
                server.getEventManager().on("join", e => e);
                server.getEventManager().onPriority("join", "lowest", e => e);
                server.getCommandManager().register("Ping", (s, a) => 1);
                server.getCommandManager().registerWithTab("warp", "Teleport", "/warp <name>", (s, a) => 1, (s, a) => []);
                "#,
            )
            .unwrap();
        let registry = f.context.registry.borrow();
        assert_eq!(registry.event_count(), 2);
        assert_eq!(registry.command_names(), ["ping", "warp"]);
        let warp = registry.command("warp").unwrap();
        assert_eq!(warp.usage, "/warp <name>");
        assert!(warp.completer.is_some());
    }

    #[test]
    fn test_usage_errors() {
        let mut f = fixture();
        let err = f.engine.execute("getServer().getEventManager().on('join')").unwrap_err();
        assert!(err.message().contains("Usage: events.on(event, function)"));

        let caught = f
            .engine
            .execute("try { getServer().getCommandManager().register('x', 5); } catch (e) { e.message }")
            .unwrap();
        assert_eq!(caught, Value::from("Usage: commands.register(name, function)"));
    }

    #[test]
    fn test_storage_bindings() {
        let mut f = fixture();
        let result = f
            .engine
            .execute(
                r#"
                const db = getServer().getStorage();
                db.set("balance.alice", 10);
                db.increment("balance.alice", 5);
                db.decrement("balance.bob");
                db.push("log", "a");
                const len = db.push("log", { at: 1 });
                [db.get("balance.alice"), db.get("missing", "dflt"), db.keys("balance").join(), len,
                 db.getOrSet("motd", "hi"), db.getOrSet("motd", "other"), db.getObj("log"), db.getArray("log")[1].at].join("|")
                "#,
            )
            .unwrap();
        assert_eq!(result, Value::from("15|dflt|alice,bob|2|hi|hi||1"));
        assert!(f.context.storage.borrow().is_dirty());

        f.engine.execute("getServer().getStorage().save()").unwrap();
        assert!(!f.context.storage.borrow().is_dirty());
        assert!(f.context.storage.borrow().path().exists());
    }

    #[test]
    fn test_timers_and_broadcast() {
        let mut f = fixture();
        f.engine
            .execute(
                r#"
                const server = getServer();
                const a = server.schedule(2, () => 1);
                const b = setTimeout(() => 2, 120);
                const c = server.repeat(1, () => 3);
                server.cancel(a);
                server.broadcast(color("&aHello") + " " + server.getName());
                "#,
            )
            .unwrap();
        assert_eq!(f.context.scheduler.borrow().len(), 2);
        let broadcasts = f.broadcasts.borrow();
        assert_eq!(broadcasts.len(), 1);
        assert!(broadcasts[0].ends_with(" demo"));
        assert!(broadcasts[0].starts_with("\u{1b}["));
    }

    #[test]
    fn test_discard() {
        let mut f = fixture();
        f.engine
            .execute("getServer().repeat(5, () => 0); getServer().getCommandManager().register('a', () => 0);")
            .unwrap();
        f.context.discard();
        assert!(f.context.scheduler.borrow().is_empty());
        assert_eq!(f.context.registry.borrow().command_count(), 0);
    }
}
