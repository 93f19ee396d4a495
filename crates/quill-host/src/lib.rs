// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # quill-host
//!
//! Runs a directory of Quill scripts against a host application.
//!
//! Each script gets its own engine and a `getServer()` API for:
//!
//! - Event handlers with priorities (`on`, `onPriority`)
//! - Commands with optional tab completion
//! - Tick-based timers (`schedule`, `repeat`, `setTimeout`, ...)
//! - Persistent JSON storage with dotted keys
//! - Broadcasts and `&`-code colors
//!
//! Loading is transactional: a script whose top level fails leaves no
//! registrations behind. Callbacks that fail later are logged and stay
//! registered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quill_host::{CommandSender, HostConfig, ScriptManager};
//! use std::rc::Rc;
//!
//! let mut manager = ScriptManager::new(HostConfig::new("scripts"));
//! let report = manager.load_all()?;
//! println!("{} loaded, {} failed", report.loaded.len(), report.failed.len());
//!
//! let console = Rc::new(CommandSender::console());
//! manager.command("hello", &console, &[]);
//! for message in console.take_messages() {
//!     println!("{message}");
//! }
//! manager.tick();
//! # Ok::<(), quill_host::HostError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod color;
pub mod config;
pub mod error;
pub mod instance;
pub mod manager;
pub mod registry;
pub mod scheduler;
pub mod sender;
pub mod storage;

// Re-exports
pub use config::HostConfig;
pub use error::{HostError, Result};
pub use instance::{CallOutcome, CallbackKind, Registrations, ScriptInstance};
pub use manager::{BatchReport, LoadReport, ScriptManager, ScriptSummary};
pub use registry::EventPriority;
pub use sender::CommandSender;

/// Version of the script host
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
