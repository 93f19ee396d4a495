// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the script host

use std::path::PathBuf;
use thiserror::Error;

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;

/// Errors that can occur while managing scripts
#[derive(Debug, Error)]
pub enum HostError {
    /// Script engine error (parse or uncaught runtime failure)
    #[error("{0}")]
    Engine(#[from] quill_engine::Error),

    /// No script file with that name in the scripts directory
    #[error("Script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    /// The named script is not loaded
    #[error("Script is not loaded: {0}")]
    NotLoaded(String),

    /// Script names must be plain file names
    #[error("Invalid script name: '{0}'")]
    InvalidName(String),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    /// Create a not-loaded error
    pub fn not_loaded(name: impl Into<String>) -> Self {
        Self::NotLoaded(name.into())
    }

    /// Whether the error came from the script itself rather than the host
    pub fn is_script_error(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}
