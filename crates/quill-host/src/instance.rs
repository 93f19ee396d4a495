// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! One loaded script

use crate::api::{self, Broadcast, ScriptContext};
use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::registry::EventHandler;
use crate::sender::CommandSender;
use quill_engine::{Engine, Value};
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// What kind of callback the host invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    /// An event handler
    Event,
    /// A command handler
    Command,
    /// A tab-completion handler
    Completion,
    /// A scheduled or repeating timer
    Timer,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Event => "event",
            Self::Command => "command",
            Self::Completion => "completion",
            Self::Timer => "timer",
        })
    }
}

/// Result of one callback invocation. Failures have already been logged.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The callback returned normally
    Ok(Value),
    /// The callback raised; the message is the rendered error
    Failed(String),
}

impl CallOutcome {
    /// Whether the callback returned normally
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Counts of what a script has registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registrations {
    /// Event handlers
    pub events: usize,
    /// Commands
    pub commands: usize,
    /// Pending timers
    pub timers: usize,
}

/// A script whose top level ran successfully, with everything it
/// registered
pub struct ScriptInstance {
    name: String,
    path: PathBuf,
    engine: Engine,
    context: Rc<ScriptContext>,
    /// Failures per callback, keyed by kind and name
    failures: FxHashMap<(CallbackKind, String), u32>,
}

impl ScriptInstance {
    /// Run the script at `path`, with its timers counting from tick `now`.
    /// On failure every registration the script made is dropped and its
    /// storage is not written.
    pub fn load(path: &Path, config: &HostConfig, broadcast: Broadcast, now: u64) -> Result<Self> {
        let name = script_name(path)?;
        let source = std::fs::read_to_string(path)?;

        let context = Rc::new(ScriptContext::new(name.clone(), config.clone(), broadcast));
        context.scheduler.borrow_mut().advance_to(now);
        let mut engine = Engine::with_config(config.engine.clone());
        api::install(&mut engine, &context);

        if let Err(err) = engine.execute(&source) {
            context.discard();
            warn!(script = %name, error = %err, "script failed to load");
            return Err(err.into());
        }

        let instance = Self {
            name,
            path: path.to_path_buf(),
            engine,
            context,
            failures: FxHashMap::default(),
        };
        let registered = instance.registrations();
        info!(
            script = %instance.name,
            events = registered.events,
            commands = registered.commands,
            timers = registered.timers,
            "loaded script"
        );
        Ok(instance)
    }

    /// Script name (the file name without `.js`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Script file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// What the script has registered so far
    pub fn registrations(&self) -> Registrations {
        let registry = self.context.registry.borrow();
        Registrations {
            events: registry.event_count(),
            commands: registry.command_count(),
            timers: self.context.scheduler.borrow().len(),
        }
    }

    /// Names of the commands this script handles
    pub fn commands(&self) -> Vec<String> {
        self.context.registry.borrow().command_names()
    }

    /// Whether the script registered `command`
    pub fn has_command(&self, command: &str) -> bool {
        self.context.registry.borrow().command(command).is_some()
    }

    /// How often a callback has failed
    pub fn failures(&self, kind: CallbackKind, name: &str) -> u32 {
        self.failures.get(&(kind, name.to_string())).copied().unwrap_or(0)
    }

    /// Call every handler for `event` with `payload`, lowest priority first
    pub fn emit(&mut self, event: &str, payload: &Value) -> Vec<CallOutcome> {
        let handlers = self.event_handlers(event);
        debug!(script = %self.name, event, handlers = handlers.len(), "emitting event");
        handlers
            .iter()
            .map(|handler| self.call_handler(event, &handler.callback, payload))
            .collect()
    }

    /// This script's handlers for `event`, in call order
    pub fn event_handlers(&self, event: &str) -> Vec<EventHandler> {
        self.context.registry.borrow().handlers(event)
    }

    /// Call one of this script's event handlers
    pub fn call_handler(&mut self, event: &str, handler: &Value, payload: &Value) -> CallOutcome {
        self.guarded_call(CallbackKind::Event, event, handler, &[payload.clone()])
    }

    /// Run `command` as `sender`. Returns `None` if the script does not
    /// handle it. A failing handler also sends the error to the sender.
    pub fn run_command(&mut self, command: &str, sender: &Rc<CommandSender>, args: &[String]) -> Option<CallOutcome> {
        let (name, handler) = {
            let registry = self.context.registry.borrow();
            let command = registry.command(command)?;
            (command.name.clone(), command.handler.clone())
        };
        let outcome = self.guarded_call(CallbackKind::Command, &name, &handler, &command_args(sender, args));
        if let CallOutcome::Failed(message) = &outcome {
            sender.send(format!("&cCommand error: {message}"));
        }
        Some(outcome)
    }

    /// Completion candidates for the last argument of `command`, filtered
    /// by its prefix (case-insensitive)
    pub fn complete(&mut self, command: &str, sender: &Rc<CommandSender>, args: &[String]) -> Vec<String> {
        let (name, completer) = {
            let registry = self.context.registry.borrow();
            match registry.command(command) {
                Some(command) => (command.name.clone(), command.completer.clone()),
                None => return Vec::new(),
            }
        };
        let Some(completer) = completer else {
            return Vec::new();
        };
        let outcome = self.guarded_call(CallbackKind::Completion, &name, &completer, &command_args(sender, args));
        let CallOutcome::Ok(Value::Array(candidates)) = outcome else {
            return Vec::new();
        };

        let prefix = args.last().map(|arg| arg.to_lowercase()).unwrap_or_default();
        let candidates = candidates.borrow();
        candidates
            .elements
            .iter()
            .map(Value::to_js_string)
            .filter(|candidate| candidate.to_lowercase().starts_with(&prefix))
            .collect()
    }

    /// Advance the script's timers to tick `now` and fire the due ones
    pub fn tick(&mut self, now: u64) -> Vec<CallOutcome> {
        let due = self.context.scheduler.borrow_mut().due(now);
        due.iter()
            .map(|timer| {
                let label = timer.id.0.to_string();
                self.guarded_call(CallbackKind::Timer, &label, &timer.callback, &[])
            })
            .collect()
    }

    /// Write storage if it has unsaved changes
    pub fn save(&self) -> Result<bool> {
        self.context.storage.borrow_mut().flush()
    }

    /// Cancel timers, drop registrations and flush storage
    pub fn unload(self) -> Result<()> {
        let saved = self.save();
        self.context.discard();
        info!(script = %self.name, "unloaded script");
        saved.map(|_| ())
    }

    /// Call a script function, catching and logging every failure. The
    /// callback stays registered whatever happens.
    fn guarded_call(&mut self, kind: CallbackKind, name: &str, callback: &Value, args: &[Value]) -> CallOutcome {
        match self.engine.call(callback, Value::Undefined, args) {
            Ok(value) => CallOutcome::Ok(value),
            Err(err) => {
                let failures = self.failures.entry((kind, name.to_string())).or_default();
                *failures += 1;
                warn!(
                    script = %self.name,
                    %kind,
                    name,
                    failures = *failures,
                    error = %err,
                    "script callback failed"
                );
                CallOutcome::Failed(err.to_string())
            }
        }
    }
}

impl fmt::Debug for ScriptInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptInstance")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("registrations", &self.registrations())
            .finish()
    }
}

fn command_args(sender: &Rc<CommandSender>, args: &[String]) -> [Value; 2] {
    let args = args.iter().map(|arg| Value::from(arg.as_str())).collect();
    [Value::host(sender.clone()), Value::array(args)]
}

/// The file stem, which names the script and its storage document
fn script_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HostError::InvalidName(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_engine::EngineConfig;
    use std::time::Duration;

    fn setup(source: &str) -> (tempfile::TempDir, HostConfig, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HostConfig::new(dir.path());
        config.engine = EngineConfig {
            console_echo: false,
            ..EngineConfig::sandboxed(100_000, Duration::from_secs(5))
        };
        let path = dir.path().join("demo.js");
        std::fs::write(&path, source).unwrap();
        (dir, config, path)
    }

    fn quiet() -> Broadcast {
        Rc::new(|_: &str, _: &str| {})
    }

    #[test]
    fn test_load_and_emit() {
        let (_dir, config, path) = setup(
            r#"
            const em = getServer().getEventManager();
            em.on("join", e => { e.seen.push("normal"); });
            em.onPriority("join", "monitor", e => { e.seen.push("monitor"); });
            em.onPriority("join", "LOW", e => { e.seen.push("low"); });
            "#,
        );
        let mut instance = ScriptInstance::load(&path, &config, quiet(), 0).unwrap();
        assert_eq!(instance.name(), "demo");
        assert_eq!(instance.registrations().events, 3);

        let payload = quill_engine::from_json(&serde_json::json!({ "seen": [] }));
        let outcomes = instance.emit("join", &payload);
        assert!(outcomes.iter().all(CallOutcome::is_ok));
        let seen = quill_engine::to_json(&payload).unwrap().unwrap();
        assert_eq!(seen, serde_json::json!({ "seen": ["low", "normal", "monitor"] }));
        assert!(instance.emit("quit", &payload).is_empty());
    }

    #[test]
    fn test_failed_load_rolls_back() {
        let (_dir, config, path) = setup(
            r#"
            getServer().getCommandManager().register("early", () => 1);
            getServer().repeat(1, () => 1);
            getServer().getStorage().set("k", 1);
            undefinedFunction();
            "#,
        );
        let err = ScriptInstance::load(&path, &config, quiet(), 0).unwrap_err();
        assert!(err.is_script_error());
        assert!(err.to_string().contains("undefinedFunction is not defined"));
        assert!(!config.data_dir.join("demo.json").exists());
    }

    #[test]
    fn test_syntax_error_aborts_load() {
        let (_dir, config, path) = setup("getServer().getEventManager().on('x', () => {});\nlet = ;");
        let err = ScriptInstance::load(&path, &config, quiet(), 0).unwrap_err();
        assert!(matches!(err, HostError::Engine(quill_engine::Error::Parse { line: 2, .. })));
    }

    #[test]
    fn test_error_boundary_keeps_handler() {
        let (_dir, config, path) = setup(
            r#"
            let calls = 0;
            getServer().getEventManager().on("tick", () => { calls++; throw new Error("boom " + calls); });
            getServer().getEventManager().on("tick", () => { calls++; return calls; });
            "#,
        );
        let mut instance = ScriptInstance::load(&path, &config, quiet(), 0).unwrap();
        let first = instance.emit("tick", &Value::Undefined);
        assert!(matches!(&first[0], CallOutcome::Failed(message) if message.starts_with("Uncaught Error: boom 1")));
        assert_eq!(first[1], CallOutcome::Ok(Value::from(2)));

        let second = instance.emit("tick", &Value::Undefined);
        assert!(matches!(&second[0], CallOutcome::Failed(message) if message.contains("boom 3")));
        assert_eq!(instance.failures(CallbackKind::Event, "tick"), 2);
        assert_eq!(instance.registrations().events, 2);
    }

    #[test]
    fn test_runaway_callback_is_interrupted() {
        let (_dir, config, path) = setup("getServer().getEventManager().on('spin', () => { while (true) {} });");
        let mut instance = ScriptInstance::load(&path, &config, quiet(), 0).unwrap();
        let outcomes = instance.emit("spin", &Value::Undefined);
        assert!(matches!(&outcomes[0], CallOutcome::Failed(message) if message.contains("budget")));
    }

    #[test]
    fn test_commands_and_completion() {
        let (_dir, config, path) = setup(
            r#"
            const cm = getServer().getCommandManager();
            cm.registerTab("Warp", (sender, args) => {
                sender.sendMessage("warping " + sender.name + " to " + args[0]);
                return args.length;
            }, (sender, args) => ["Home", "hub", "mine"]);
            cm.register("broken", (sender, args) => { throw "nope"; });
            "#,
        );
        let mut instance = ScriptInstance::load(&path, &config, quiet(), 0).unwrap();
        let sender = Rc::new(CommandSender::new("alice"));

        let outcome = instance.run_command("WARP", &sender, &["home".to_string()]);
        assert_eq!(outcome, Some(CallOutcome::Ok(Value::from(1))));
        assert_eq!(sender.take_messages(), ["warping alice to home"]);

        assert_eq!(instance.complete("warp", &sender, &["H".to_string()]), ["Home", "hub"]);
        assert_eq!(instance.complete("warp", &sender, &[]), ["Home", "hub", "mine"]);
        assert!(instance.complete("broken", &sender, &[]).is_empty());

        let failed = instance.run_command("broken", &sender, &[]);
        assert!(matches!(&failed, Some(CallOutcome::Failed(message)) if message.starts_with("Uncaught nope")));
        let replies = sender.take_messages();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("&cCommand error: Uncaught nope"));
        assert!(instance.run_command("missing", &sender, &[]).is_none());
    }

    #[test]
    fn test_timers_fire_on_tick() {
        let (_dir, config, path) = setup(
            r#"
            var log = [];
            const server = getServer();
            server.schedule(2, () => log.push("once"));
            const id = server.repeat(1, () => { log.push("rep"); if (log.length >= 4) server.cancel(id); });
            setTimeout(() => log.push("timeout"), 100);
            "#,
        );
        let mut instance = ScriptInstance::load(&path, &config, quiet(), 0).unwrap();
        for tick in 1..=5 {
            instance.tick(tick);
        }
        let log = instance.engine.get_global("log");
        assert_eq!(log.to_js_string(), "rep,once,rep,timeout,rep");
        assert_eq!(instance.registrations().timers, 0);
    }

    #[test]
    fn test_unload_flushes_storage() {
        let (_dir, config, path) = setup("getServer().getStorage().set('visits', 3);");
        let instance = ScriptInstance::load(&path, &config, quiet(), 0).unwrap();
        instance.unload().unwrap();
        let saved = std::fs::read_to_string(config.data_dir.join("demo.json")).unwrap();
        assert!(saved.contains("\"visits\": 3"));
    }
}
