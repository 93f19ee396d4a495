// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-script event and command registrations

use quill_engine::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::str::FromStr;

/// Order in which event handlers run; lowest first, `Monitor` last
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum EventPriority {
    /// Runs first
    Lowest,
    /// Runs early
    Low,
    /// Default priority
    #[default]
    Normal,
    /// Runs late
    High,
    /// Runs after every other modifying handler
    Highest,
    /// Runs last; meant for observing the outcome
    Monitor,
}

impl EventPriority {
    /// Parses a priority name, falling back to `Normal` for unknown names
    pub fn parse_or_normal(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for EventPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOWEST" => Ok(Self::Lowest),
            "LOW" => Ok(Self::Low),
            "NORMAL" => Ok(Self::Normal),
            "HIGH" => Ok(Self::High),
            "HIGHEST" => Ok(Self::Highest),
            "MONITOR" => Ok(Self::Monitor),
            other => Err(format!("unknown event priority '{other}'")),
        }
    }
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lowest => "LOWEST",
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
            Self::Highest => "HIGHEST",
            Self::Monitor => "MONITOR",
        };
        f.write_str(name)
    }
}

/// A script function subscribed to an event
#[derive(Debug, Clone)]
pub struct EventHandler {
    /// Priority band
    pub priority: EventPriority,
    /// Function called with the event payload
    pub callback: Value,
}

/// A command registered by a script
#[derive(Debug, Clone)]
pub struct Command {
    /// Lowercased command name
    pub name: String,
    /// One-line description
    pub description: String,
    /// Usage text, `/name` by default
    pub usage: String,
    /// Function called with `(sender, args)`
    pub handler: Value,
    /// Optional function returning completion candidates
    pub completer: Option<Value>,
}

/// Default description for commands registered without one
pub const DEFAULT_DESCRIPTION: &str = "Script command";

impl Command {
    /// A command with the default description and usage
    pub fn new(name: &str, handler: Value) -> Self {
        let name = name.to_lowercase();
        Self {
            usage: format!("/{name}"),
            name,
            description: DEFAULT_DESCRIPTION.to_string(),
            handler,
            completer: None,
        }
    }

    /// Set the description and usage
    pub fn describe(mut self, description: impl Into<String>, usage: impl Into<String>) -> Self {
        self.description = description.into();
        self.usage = usage.into();
        self
    }

    /// Set the completion function
    pub fn with_completer(mut self, completer: Value) -> Self {
        self.completer = Some(completer);
        self
    }
}

/// Everything one script has registered
#[derive(Debug, Default)]
pub struct Registry {
    /// Handlers per event, kept sorted by priority; registration order
    /// within a priority
    events: FxHashMap<String, Vec<EventHandler>>,
    commands: FxHashMap<String, Command>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to `event`
    pub fn on(&mut self, event: &str, priority: EventPriority, callback: Value) {
        let handlers = self.events.entry(event.to_string()).or_default();
        let index = handlers.partition_point(|handler| handler.priority <= priority);
        handlers.insert(index, EventHandler { priority, callback });
    }

    /// Handlers for `event` in call order
    pub fn handlers(&self, event: &str) -> Vec<EventHandler> {
        self.events.get(event).cloned().unwrap_or_default()
    }

    /// Add or replace a command. Returns the command it replaced.
    pub fn register(&mut self, command: Command) -> Option<Command> {
        self.commands.insert(command.name.clone(), command)
    }

    /// Look up a command by name, case-insensitively
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.to_lowercase())
    }

    /// Registered command names, sorted
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of event handlers
    pub fn event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    /// Number of commands
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.events.clear();
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parsing() {
        assert_eq!("high".parse::<EventPriority>(), Ok(EventPriority::High));
        assert_eq!(EventPriority::parse_or_normal("MONITOR"), EventPriority::Monitor);
        assert_eq!(EventPriority::parse_or_normal("urgent"), EventPriority::Normal);
        assert_eq!(EventPriority::Lowest.to_string(), "LOWEST");
    }

    #[test]
    fn test_handlers_sorted_by_priority_then_order() {
        let mut registry = Registry::new();
        registry.on("join", EventPriority::High, Value::from("high"));
        registry.on("join", EventPriority::Normal, Value::from("first"));
        registry.on("join", EventPriority::Lowest, Value::from("lowest"));
        registry.on("join", EventPriority::Normal, Value::from("second"));

        let order: Vec<String> = registry
            .handlers("join")
            .iter()
            .map(|handler| handler.callback.to_js_string())
            .collect();
        assert_eq!(order, ["lowest", "first", "second", "high"]);
        assert_eq!(registry.event_count(), 4);
        assert!(registry.handlers("quit").is_empty());
    }

    #[test]
    fn test_commands_are_lowercased() {
        let mut registry = Registry::new();
        let command = Command::new("Spawn", Value::Undefined);
        assert_eq!(command.usage, "/spawn");
        assert_eq!(command.description, DEFAULT_DESCRIPTION);
        assert!(registry.register(command).is_none());

        assert!(registry.command("SPAWN").is_some());
        let replaced = registry.register(Command::new("spawn", Value::Null).describe("Go home", "/spawn [name]"));
        assert!(replaced.is_some());
        assert_eq!(registry.command("spawn").map(|c| c.usage.as_str()), Some("/spawn [name]"));
        assert_eq!(registry.command_names(), ["spawn"]);

        registry.clear();
        assert_eq!(registry.command_count(), 0);
    }
}
