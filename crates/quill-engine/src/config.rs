// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Engine configuration.

use std::time::Duration;

/// Default limit on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Default limit on array length.
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 10_000_000;

/// Settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Assigning to an undeclared name creates a global. When disabled the
    /// assignment is a ReferenceError.
    pub implicit_globals: bool,
    /// Maximum loop iterations plus calls per `execute` or `call`.
    pub max_steps: Option<u64>,
    /// Wall-clock limit per `execute` or `call`.
    pub time_limit: Option<Duration>,
    /// Maximum nesting of script calls.
    pub max_call_depth: usize,
    /// Maximum array length a script can create by writing `length`, an
    /// index, or calling `Array(n)`. Capped at 2^32 - 1.
    pub max_array_length: usize,
    /// Write `console.*` output to stdout/stderr in addition to the log.
    pub console_echo: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            implicit_globals: true,
            max_steps: None,
            time_limit: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            console_echo: true,
        }
    }
}

impl EngineConfig {
    /// A configuration with both budgets set, for untrusted scripts.
    pub fn sandboxed(max_steps: u64, time_limit: Duration) -> Self {
        Self {
            max_steps: Some(max_steps),
            time_limit: Some(time_limit),
            ..Self::default()
        }
    }

    /// Whether any budget is configured.
    pub fn is_budgeted(&self) -> bool {
        self.max_steps.is_some() || self.time_limit.is_some()
    }
}
