// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Administrative console for `quill host`.
//!
//! Reads one command per line and applies it to a [`ScriptManager`].

use owo_colors::OwoColorize;
use quill_engine::{Value, from_json};
use quill_host::{CallOutcome, CommandSender, HostError, ScriptManager, color};
use std::rc::Rc;

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Load(String),
    LoadAll,
    Unload(String),
    Reload(String),
    List,
    Available,
    Emit { event: String, payload: serde_json::Value },
    Cmd { name: String, args: Vec<String> },
    Complete { name: String, args: Vec<String> },
    Commands,
    Tick(u64),
    Save,
    Quit,
}

impl ConsoleCommand {
    /// Parse a console line. Blank lines parse to `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "" => return Ok(None),
            "help" | "?" => Self::Help,
            "load" if rest == "*" || rest.eq_ignore_ascii_case("all") => Self::LoadAll,
            "load" => Self::Load(required(rest, "load <script>")?),
            "unload" => Self::Unload(required(rest, "unload <script>")?),
            "reload" => Self::Reload(required(rest, "reload <script>")?),
            "list" | "ls" => Self::List,
            "available" => Self::Available,
            "emit" => {
                let (event, payload) = match rest.split_once(char::is_whitespace) {
                    Some((event, payload)) => (event, payload.trim()),
                    None => (rest, ""),
                };
                let event = required(event, "emit <event> [json]")?;
                let payload = if payload.is_empty() {
                    serde_json::Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(payload).map_err(|err| format!("Invalid payload: {err}"))?
                };
                Self::Emit { event, payload }
            }
            "cmd" | "/" => {
                let mut parts = rest.split_whitespace().map(str::to_string);
                let name = parts.next().ok_or("Usage: cmd <command> [args...]")?;
                Self::Cmd {
                    name,
                    args: parts.collect(),
                }
            }
            "complete" | "tab" => {
                let mut parts: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                if parts.is_empty() {
                    return Err("Usage: complete <command> [args...]".to_string());
                }
                let name = parts.remove(0);
                // Completing the first argument
                if parts.is_empty() {
                    parts.push(String::new());
                }
                Self::Complete { name, args: parts }
            }
            "commands" => Self::Commands,
            "tick" => {
                let count = if rest.is_empty() {
                    1
                } else {
                    rest.parse::<u64>()
                        .map_err(|_| format!("Invalid tick count: '{rest}'"))?
                };
                Self::Tick(count)
            }
            "save" => Self::Save,
            "quit" | "exit" | "stop" => Self::Quit,
            // A leading slash runs a script command directly
            other if other.starts_with('/') && other.len() > 1 => Self::Cmd {
                name: word[1..].to_string(),
                args: rest.split_whitespace().map(str::to_string).collect(),
            },
            other => return Err(format!("Unknown command '{other}'. Type 'help' for a list.")),
        };
        Ok(Some(command))
    }

    /// Commands for the help listing
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            ("load <script|all>", "Load a script, or every script in the directory"),
            ("unload <script>", "Unload a script and save its storage"),
            ("reload <script>", "Reload a loaded script"),
            ("list", "Show loaded scripts and what they registered"),
            ("available", "Show script files on disk"),
            ("emit <event> [json]", "Fire an event with an optional JSON payload"),
            ("cmd <command> [args]", "Run a script command as the console (or /command)"),
            ("complete <command> [args]", "Tab-complete a script command's last argument"),
            ("commands", "Show registered script commands"),
            ("tick [n]", "Advance the scheduler by n ticks"),
            ("save", "Flush every script's storage"),
            ("quit", "Unload everything and exit"),
        ]
    }
}

fn required(text: &str, usage: &str) -> Result<String, String> {
    if text.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(text.to_string())
    }
}

/// What the console loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs console commands against a manager, writing results to stdout
pub struct Console {
    sender: Rc<CommandSender>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            sender: Rc::new(CommandSender::console()),
        }
    }

    /// Parse and run one line
    pub fn handle_line(&self, manager: &mut ScriptManager, line: &str) -> Flow {
        match ConsoleCommand::parse(line) {
            Ok(Some(command)) => self.execute(manager, command),
            Ok(None) => Flow::Continue,
            Err(message) => {
                eprintln!("{}: {}", "Error".red().bold(), message);
                Flow::Continue
            }
        }
    }

    pub fn execute(&self, manager: &mut ScriptManager, command: ConsoleCommand) -> Flow {
        match command {
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Load(name) => match manager.load(&name) {
                Ok(report) => {
                    let verb = if report.replaced { "Reloaded" } else { "Loaded" };
                    println!(
                        "{} {} ({} events, {} commands, {} timers)",
                        verb.green(),
                        report.name.cyan(),
                        report.registrations.events,
                        report.registrations.commands,
                        report.registrations.timers
                    );
                }
                Err(err) => print_host_error(&name, &err),
            },
            ConsoleCommand::LoadAll => load_all(manager),
            ConsoleCommand::Unload(name) => match manager.unload(&name) {
                Ok(()) => println!("{} {}", "Unloaded".green(), name.cyan()),
                Err(err) => print_host_error(&name, &err),
            },
            ConsoleCommand::Reload(name) => match manager.reload(&name) {
                Ok(report) => println!("{} {}", "Reloaded".green(), report.name.cyan()),
                Err(err) => print_host_error(&name, &err),
            },
            ConsoleCommand::List => {
                let scripts = manager.list();
                if scripts.is_empty() {
                    println!("{}", "No scripts loaded".dimmed());
                }
                for script in scripts {
                    let counts = script.registrations;
                    println!(
                        "  {:20} {}",
                        script.name.cyan(),
                        format!(
                            "{} events, {} commands, {} timers",
                            counts.events, counts.commands, counts.timers
                        )
                        .dimmed()
                    );
                }
            }
            ConsoleCommand::Available => match manager.available() {
                Ok(files) => {
                    for file in files {
                        let loaded = manager.is_loaded(&file);
                        let marker = if loaded { "*".green().to_string() } else { " ".to_string() };
                        println!("  {marker} {file}");
                    }
                }
                Err(err) => print_host_error("scripts", &err),
            },
            ConsoleCommand::Emit { event, payload } => {
                let payload = from_json(&payload);
                let outcomes = manager.emit(&event, &payload);
                let failed = outcomes.iter().filter(|(_, outcome)| !outcome.is_ok()).count();
                println!(
                    "{} {} to {} handlers ({} failed)",
                    "Emitted".green(),
                    event.cyan(),
                    outcomes.len(),
                    failed
                );
                if !outcomes.is_empty() {
                    println!("  {} {}", "payload".dimmed(), payload.inspect());
                }
            }
            ConsoleCommand::Cmd { name, args } => {
                match manager.command(&name, &self.sender, &args) {
                    Some(CallOutcome::Ok(value)) if !value_is_silent(&value) => {
                        self.flush_messages();
                        println!("{}", value.inspect().dimmed());
                    }
                    Some(_) => self.flush_messages(),
                    None => eprintln!("{}: unknown command '/{}'", "Error".red().bold(), name),
                }
            }
            ConsoleCommand::Complete { name, args } => {
                let candidates = manager.complete(&name, &self.sender, &args);
                self.flush_messages();
                if candidates.is_empty() {
                    println!("{}", "No completions".dimmed());
                } else {
                    println!("{}", candidates.join("  "));
                }
            }
            ConsoleCommand::Commands => {
                for (command, script) in manager.commands() {
                    println!("  {:20} {}", format!("/{command}").cyan(), script.dimmed());
                }
            }
            ConsoleCommand::Tick(count) => {
                let fired: usize = (0..count).map(|_| manager.tick()).sum();
                println!(
                    "{} {} (tick {}, {} timers fired)",
                    "Advanced".green(),
                    count,
                    manager.current_tick(),
                    fired
                );
            }
            ConsoleCommand::Save => {
                let saved = manager.save_all();
                println!("{} {} storage documents", "Saved".green(), saved);
            }
            ConsoleCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn flush_messages(&self) {
        for message in self.sender.take_messages() {
            println!("{}", color::colorize(&message));
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the whole scripts directory, printing a summary
pub fn load_all(manager: &mut ScriptManager) {
    match manager.load_all() {
        Ok(report) => {
            println!(
                "{} {} scripts ({} failed)",
                "Loaded".green(),
                report.loaded.len(),
                report.failed.len()
            );
            for (name, err) in &report.failed {
                print_host_error(name, err);
            }
        }
        Err(err) => print_host_error("scripts", &err),
    }
}

fn value_is_silent(value: &Value) -> bool {
    matches!(value, Value::Undefined | Value::Boolean(true))
}

fn print_host_error(subject: &str, err: &HostError) {
    let label = if err.is_script_error() { "Script error" } else { "Error" };
    eprintln!("{} in {}: {}", label.red().bold(), subject.cyan(), err);
}

fn print_help() {
    println!();
    println!("{}", "Console Commands:".white().bold());
    println!();
    for (command, description) in ConsoleCommand::all_commands() {
        println!("  {:28} {}", command.cyan(), description.dimmed());
    }
    println!();
}
