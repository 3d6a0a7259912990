//! Defines the configuration for the `ClockEngine`.
//!
//! The struct is designed to be deserialized from a TOML file using `serde`
//! via the `config` crate, with `CIRCLOCK_*` environment variables layered on
//! top. Every field has a default, so an empty file (or no file) is valid.

use crate::events::HourFormat;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// The top-level configuration for the `ClockEngine`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// The zone "real time" is read in. Uses IANA names
    /// (e.g., "America/Bogota").
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Initial display format, `"12h"` or `"24h"`.
    #[serde(default)]
    pub format: HourFormat,

    /// Whether the engine aligns itself with the time source when created.
    #[serde(default = "default_true")]
    pub auto_sync: bool,

    /// Cadence of the ticker that advances the clock. Must be non-zero.
    /// Alarm checking follows the ticks, so it has no cadence of its own.
    #[serde(default = "default_interval_ms")]
    pub tick_interval_ms: u64,

    /// How long `stop` waits for a background loop before aborting it.
    #[serde(default = "default_interval_ms")]
    pub stop_timeout_ms: u64,

    /// Capacity of each broadcast channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl ClockConfig {
    /// Loads configuration from an optional TOML file plus the environment.
    ///
    /// A missing file is not an error; a malformed or invalid one is.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let config: Self = builder
            .add_source(config::Environment::with_prefix("CIRCLOCK"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "tick_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// The ticker period, never shorter than one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            format: HourFormat::default(),
            auto_sync: true,
            tick_interval_ms: default_interval_ms(),
            stop_timeout_ms: default_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

// --- Default value functions for serde ---

fn default_timezone() -> Tz {
    chrono_tz::America::Bogota
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    256
}
