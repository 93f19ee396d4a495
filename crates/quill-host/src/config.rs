// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host configuration

use quill_engine::EngineConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default length of one scheduler tick (20 ticks per second)
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Where scripts and their data live, and how they run
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Directory scanned for `*.js` scripts
    pub scripts_dir: PathBuf,
    /// Directory holding one `<script>.json` storage document per script
    pub data_dir: PathBuf,
    /// Wall-clock length of one tick
    pub tick: Duration,
    /// Configuration for every script engine
    pub engine: EngineConfig,
}

impl HostConfig {
    /// Scripts in `scripts_dir`, data in its `data` subdirectory
    pub fn new(scripts_dir: impl AsRef<Path>) -> Self {
        let scripts_dir = scripts_dir.as_ref().to_path_buf();
        Self {
            data_dir: scripts_dir.join("data"),
            scripts_dir,
            ..Self::default()
        }
    }

    /// Converts a millisecond delay to whole ticks, rounding up
    pub fn millis_to_ticks(&self, millis: f64) -> u64 {
        let tick = self.tick.as_secs_f64() * 1000.0;
        if !millis.is_finite() || millis <= 0.0 || tick <= 0.0 {
            return 0;
        }
        (millis / tick).ceil() as u64
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
            data_dir: PathBuf::from("scripts/data"),
            tick: DEFAULT_TICK,
            engine: EngineConfig::sandboxed(5_000_000, Duration::from_secs(5)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_follows_scripts_dir() {
        let config = HostConfig::new("/srv/scripts");
        assert_eq!(config.data_dir, PathBuf::from("/srv/scripts/data"));
        assert!(config.engine.is_budgeted());
    }

    #[test]
    fn test_millis_to_ticks() {
        let config = HostConfig::default();
        assert_eq!(config.millis_to_ticks(0.0), 0);
        assert_eq!(config.millis_to_ticks(50.0), 1);
        assert_eq!(config.millis_to_ticks(51.0), 2);
        assert_eq!(config.millis_to_ticks(1000.0), 20);
        assert_eq!(config.millis_to_ticks(f64::NAN), 0);
    }
}
