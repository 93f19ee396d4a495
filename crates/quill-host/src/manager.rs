// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loading, unloading and dispatching to scripts

use crate::api::Broadcast;
use crate::color;
use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::instance::{CallOutcome, Registrations, ScriptInstance};
use crate::registry::EventPriority;
use crate::sender::CommandSender;
use quill_engine::Value;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Outcome of a successful [`ScriptManager::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Script name
    pub name: String,
    /// Whether an already loaded copy was replaced
    pub replaced: bool,
    /// What the script registered while loading
    pub registrations: Registrations,
}

/// Outcome of [`ScriptManager::load_all`]
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Scripts that loaded
    pub loaded: Vec<String>,
    /// Scripts that failed, with the reason
    pub failed: Vec<(String, HostError)>,
}

/// One line of [`ScriptManager::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSummary {
    /// Script name
    pub name: String,
    /// What the script has registered
    pub registrations: Registrations,
}

/// Owns every loaded script
pub struct ScriptManager {
    config: HostConfig,
    broadcast: Broadcast,
    /// Loaded scripts in load order; later scripts win command conflicts
    scripts: Vec<ScriptInstance>,
    tick: u64,
}

impl ScriptManager {
    /// A manager that prints broadcasts to stdout
    pub fn new(config: HostConfig) -> Self {
        let broadcast: Broadcast = Rc::new(|_script: &str, message: &str| println!("{}", color::colorize(message)));
        Self::with_broadcast(config, broadcast)
    }

    /// A manager that hands broadcasts to `broadcast`
    pub fn with_broadcast(config: HostConfig, broadcast: Broadcast) -> Self {
        Self {
            config,
            broadcast,
            scripts: Vec::new(),
            tick: 0,
        }
    }

    /// Host configuration
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The current tick
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Load (or reload) the script `name`; `.js` is appended if missing.
    /// If the script fails, the previously loaded copy stays unloaded.
    pub fn load(&mut self, name: &str) -> Result<LoadReport> {
        let name = normalize(name)?;
        let path = self.path_of(&name);
        if !path.is_file() {
            return Err(HostError::ScriptNotFound(path));
        }

        // A previous copy goes away even when its storage cannot be saved
        let replaced = match self.take(&name) {
            Some(previous) => {
                if let Err(err) = previous.unload() {
                    warn!(script = %name, error = %err, "failed to save storage of replaced script");
                }
                true
            }
            None => false,
        };

        let instance = ScriptInstance::load(&path, &self.config, self.broadcast.clone(), self.tick)?;
        let report = LoadReport {
            name: name.clone(),
            replaced,
            registrations: instance.registrations(),
        };
        self.scripts.push(instance);
        Ok(report)
    }

    /// Load every `*.js` file in the scripts directory, in name order
    pub fn load_all(&mut self) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for file in self.available()? {
            match self.load(&file) {
                Ok(loaded) => report.loaded.push(loaded.name),
                Err(err) => report.failed.push((file, err)),
            }
        }
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "loaded scripts directory"
        );
        Ok(report)
    }

    /// Unload `name`, cancelling its timers and saving its storage
    pub fn unload(&mut self, name: &str) -> Result<()> {
        let name = normalize(name)?;
        let instance = self.take(&name).ok_or_else(|| HostError::not_loaded(&name))?;
        instance.unload()
    }

    /// Unload every script. Returns how many were unloaded.
    pub fn unload_all(&mut self) -> usize {
        let scripts = std::mem::take(&mut self.scripts);
        let count = scripts.len();
        for instance in scripts {
            let name = instance.name().to_string();
            if let Err(err) = instance.unload() {
                warn!(script = %name, error = %err, "failed to save storage on unload");
            }
        }
        count
    }

    /// Unload then load `name`
    pub fn reload(&mut self, name: &str) -> Result<LoadReport> {
        let name = normalize(name)?;
        if !self.is_loaded(&name) {
            return Err(HostError::not_loaded(name));
        }
        self.load(&name)
    }

    /// Loaded scripts, sorted by name
    pub fn list(&self) -> Vec<ScriptSummary> {
        let mut summaries: Vec<ScriptSummary> = self
            .scripts
            .iter()
            .map(|instance| ScriptSummary {
                name: instance.name().to_string(),
                registrations: instance.registrations(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// `*.js` files in the scripts directory, sorted
    pub fn available(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.config.scripts_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.ends_with(".js") && entry.file_type()?.is_file() {
                files.push(file_name.to_string());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Whether `name` is loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        normalize(name).is_ok_and(|name| self.scripts.iter().any(|instance| instance.name() == name))
    }

    /// A loaded script
    pub fn get(&self, name: &str) -> Option<&ScriptInstance> {
        let name = normalize(name).ok()?;
        self.scripts.iter().find(|instance| instance.name() == name)
    }

    /// Flush every script's storage. Returns how many documents were
    /// written; failures are logged.
    pub fn save_all(&self) -> usize {
        self.scripts
            .iter()
            .filter(|instance| match instance.save() {
                Ok(saved) => saved,
                Err(err) => {
                    warn!(script = %instance.name(), error = %err, "failed to save storage");
                    false
                }
            })
            .count()
    }

    /// Deliver `event` to every script's handlers. Handlers run by
    /// priority across all scripts; within a priority, scripts run in load
    /// order. Handlers may mutate `payload`.
    pub fn emit(&mut self, event: &str, payload: &Value) -> Vec<(String, CallOutcome)> {
        let mut queue: Vec<(EventPriority, usize, Value)> = Vec::new();
        for (index, instance) in self.scripts.iter().enumerate() {
            queue.extend(
                instance
                    .event_handlers(event)
                    .into_iter()
                    .map(|handler| (handler.priority, index, handler.callback)),
            );
        }
        queue.sort_by_key(|(priority, _, _)| *priority);
        debug!(event, handlers = queue.len(), "emitting event");

        queue
            .into_iter()
            .map(|(_, index, callback)| {
                let instance = &mut self.scripts[index];
                let outcome = instance.call_handler(event, &callback, payload);
                (instance.name().to_string(), outcome)
            })
            .collect()
    }

    /// Run a command. `None` if no script handles it.
    pub fn command(&mut self, command: &str, sender: &Rc<CommandSender>, args: &[String]) -> Option<CallOutcome> {
        let instance = self.owner_mut(command)?;
        debug!(script = %instance.name(), command, "running command");
        instance.run_command(command, sender, args)
    }

    /// Tab-complete a command's last argument
    pub fn complete(&mut self, command: &str, sender: &Rc<CommandSender>, args: &[String]) -> Vec<String> {
        match self.owner_mut(command) {
            Some(instance) => instance.complete(command, sender, args),
            None => Vec::new(),
        }
    }

    /// Every registered command with the script that handles it, sorted
    pub fn commands(&self) -> Vec<(String, String)> {
        let mut commands: Vec<(String, String)> = Vec::new();
        for instance in self.scripts.iter().rev() {
            for command in instance.commands() {
                if !commands.iter().any(|(name, _)| *name == command) {
                    commands.push((command, instance.name().to_string()));
                }
            }
        }
        commands.sort();
        commands
    }

    /// Advance one tick and fire due timers. Returns how many ran.
    pub fn tick(&mut self) -> usize {
        self.tick += 1;
        let now = self.tick;
        self.scripts
            .iter_mut()
            .map(|instance| instance.tick(now).len())
            .sum()
    }

    fn owner_mut(&mut self, command: &str) -> Option<&mut ScriptInstance> {
        self.scripts
            .iter_mut()
            .rev()
            .find(|instance| instance.has_command(command))
    }

    fn take(&mut self, name: &str) -> Option<ScriptInstance> {
        let index = self.scripts.iter().position(|instance| instance.name() == name)?;
        Some(self.scripts.remove(index))
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.config.scripts_dir.join(format!("{name}.js"))
    }
}

/// `greet.js` and `greet` both name the script `greet`. Paths are refused.
fn normalize(name: &str) -> Result<String> {
    let stem = name.trim().strip_suffix(".js").unwrap_or(name.trim());
    if stem.is_empty() || stem.contains(['/', '\\']) || stem.starts_with('.') {
        return Err(HostError::InvalidName(name.to_string()));
    }
    Ok(stem.to_string())
}
