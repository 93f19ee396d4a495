// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Quill - an embeddable JavaScript-like scripting runtime
//!
//! This is the main entry point for the quill CLI.
//!
//! ## Modes
//!
//! - `quill` starts the interactive REPL
//! - `quill FILE` runs a script file
//! - `quill -e CODE` evaluates an expression
//! - `quill host DIR` loads a scripts directory and reads admin commands
//!   from stdin while ticking timers

mod console;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use quill_engine::{Engine, EngineConfig};
use quill_host::{HostConfig, ScriptManager};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command line interface
#[derive(Debug, Parser)]
#[command(name = "quill", version, about = "Quill scripting runtime")]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Stop scripts after this many loop iterations and calls
    #[arg(long, value_name = "STEPS", global = true)]
    max_steps: Option<u64>,

    /// Stop scripts after this many milliseconds
    #[arg(long, value_name = "MS", global = true)]
    time_limit: Option<u64>,

    /// Make assignment to undeclared names an error
    #[arg(long, global = true)]
    no_implicit_globals: bool,

    /// Evaluate code and print the result
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Script file to execute; starts the REPL when omitted
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Host a directory of scripts with an admin console on stdin
    Host {
        /// Directory containing `*.js` scripts
        dir: PathBuf,

        /// Directory for per-script storage (default: DIR/data)
        #[arg(long, value_name = "DIR")]
        data: Option<PathBuf>,

        /// Length of one tick in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 50)]
        tick: u64,

        /// Start without loading any scripts
        #[arg(long)]
        no_load: bool,
    },
}

impl Cli {
    /// Engine configuration with the budget flags applied over `base`
    fn engine_config(&self, base: EngineConfig) -> EngineConfig {
        EngineConfig {
            implicit_globals: base.implicit_globals && !self.no_implicit_globals,
            max_steps: self.max_steps.or(base.max_steps),
            time_limit: self.time_limit.map(Duration::from_millis).or(base.time_limit),
            ..base
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Command::Host { .. }) => run_host(&cli),
        None => match (&cli.eval, &cli.file) {
            (Some(code), _) => run_eval(&cli, code),
            (None, Some(path)) => run_file(&cli, path),
            (None, None) => repl::Repl::new(cli.engine_config(EngineConfig::default()))
                .and_then(|mut repl| repl.run())
                .context("REPL failed"),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {:#}", "Error".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Execute a script file.
fn run_file(cli: &Cli, path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file not found '{}'", path.display());
    }
    let mut engine = Engine::with_config(cli.engine_config(EngineConfig::default()));
    debug!(path = %path.display(), "running file");
    engine.execute_file(path)?;
    Ok(())
}

/// Evaluate code from the command line.
fn run_eval(cli: &Cli, code: &str) -> Result<()> {
    let mut engine = Engine::with_config(cli.engine_config(EngineConfig::default()));
    let value = engine.execute(code)?;
    if !value.is_undefined() {
        println!("{}", value.inspect());
    }
    Ok(())
}

/// Host a scripts directory until `quit` or end of input.
fn run_host(cli: &Cli) -> Result<()> {
    let Some(Command::Host {
        dir,
        data,
        tick,
        no_load,
    }) = &cli.command
    else {
        anyhow::bail!("host mode requires a scripts directory");
    };
    if !dir.is_dir() {
        anyhow::bail!("scripts directory not found '{}'", dir.display());
    }

    let mut config = HostConfig::new(dir);
    if let Some(data) = data {
        config.data_dir = data.clone();
    }
    config.tick = Duration::from_millis((*tick).max(1));
    config.engine = cli.engine_config(config.engine);

    host_runtime()?.block_on(host_loop(config, !*no_load))
}

/// Single-threaded runtime with the timer and I/O drivers the host loop needs.
fn host_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()
        .context("failed to start runtime")
}

async fn host_loop(config: HostConfig, load: bool) -> Result<()> {
    let tick_length = config.tick;
    info!(dir = %config.scripts_dir.display(), tick_ms = tick_length.as_millis() as u64, "starting host");
    let mut manager = ScriptManager::new(config);
    let console = console::Console::new();

    println!(
        "{} {} {}",
        "Quill host".bright_cyan().bold(),
        format!("v{}", quill_host::VERSION).dimmed(),
        "(type 'help' for commands)".dimmed()
    );
    if load {
        console::load_all(&mut manager);
    }

    let mut interval = tokio::time::interval(tick_length);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                manager.tick();
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if console.handle_line(&mut manager, &line) == console::Flow::Quit {
                    break;
                }
            }
        }
    }

    let unloaded = manager.unload_all();
    info!(unloaded, "host stopped");
    println!("{} {} scripts", "Unloaded".green(), unloaded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_modes() {
        let cli = Cli::try_parse_from(["quill"]).unwrap();
        assert!(cli.file.is_none() && cli.command.is_none());

        let cli = Cli::try_parse_from(["quill", "script.js", "--max-steps", "100"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("script.js")));
        assert_eq!(cli.engine_config(EngineConfig::default()).max_steps, Some(100));

        let cli = Cli::try_parse_from(["quill", "host", "scripts", "--tick", "100", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Command::Host { tick: 100, .. })));

        assert!(Cli::try_parse_from(["quill", "-e", "1", "file.js"]).is_err());
    }

    #[test]
    fn test_host_runtime_drives_timers() {
        let runtime = host_runtime().unwrap();
        let ticks = runtime.block_on(async {
            let mut interval = tokio::time::interval(Duration::from_millis(1));
            for _ in 0..3 {
                interval.tick().await;
            }
            3
        });
        assert_eq!(ticks, 3);
    }

    #[test]
    fn test_engine_config_flags() {
        let cli = Cli::try_parse_from(["quill", "--time-limit", "250", "--no-implicit-globals"]).unwrap();
        let config = cli.engine_config(EngineConfig::sandboxed(10, Duration::from_secs(1)));
        assert_eq!(config.time_limit, Some(Duration::from_millis(250)));
        assert_eq!(config.max_steps, Some(10));
        assert!(!config.implicit_globals);
    }
}
