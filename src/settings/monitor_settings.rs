//! Monitor settings
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional file (TOML, JSON, YAML, ... by extension), then `KM_*` environment
//! variables.

use config::{Config, Environment, File};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::collectors::sample::Direction;
use crate::display::formatting::UnitMode;
use crate::monitor::errors::MonitorError;
use crate::monitor::quantizer::{DEFAULT_THRESHOLDS, LevelQuantizer};

/// Default polling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 2000;
/// Interval used when the configured one is out of range
pub const FALLBACK_INTERVAL_MS: u64 = 1000;
/// Shortest accepted polling interval in milliseconds
pub const MIN_INTERVAL_MS: u64 = 250;
/// Longest accepted polling interval in milliseconds
pub const MAX_INTERVAL_MS: u64 = 32750;
/// Default auto-hide threshold in KiB/s
pub const DEFAULT_AUTO_HIDE_THRESHOLD_KB: u64 = 10;

/// Environment variable prefix (`KM_INTERVAL_MS`, `KM_DIRECTION`, ...)
pub const ENV_PREFIX: &str = "KM";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Polling interval in milliseconds
    pub interval_ms: u64,
    /// Ascending level thresholds in bytes per second
    pub thresholds: Vec<u64>,
    /// Counter that drives the level and the directions shown as text
    pub direction: Direction,
    /// Unit used by the throughput text
    pub unit: UnitMode,
    /// Hide the throughput text below `auto_hide_threshold_kb`
    pub auto_hide: bool,
    pub auto_hide_threshold_kb: u64,
    /// Meter consumer enabled
    pub meter_enabled: bool,
    /// Throughput text consumer enabled
    pub text_enabled: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            direction: Direction::Down,
            unit: UnitMode::Bits,
            auto_hide: false,
            auto_hide_threshold_kb: DEFAULT_AUTO_HIDE_THRESHOLD_KB,
            meter_enabled: true,
            text_enabled: false,
        }
    }
}

impl MonitorSettings {
    /// Loads settings from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading monitor settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: MonitorSettings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("thresholds"),
            )
            .build()?
            .try_deserialize()?;

        settings.validated()
    }

    /// Checks the values that cannot be repaired silently
    pub fn validated(self) -> Result<Self, MonitorError> {
        self.quantizer()?;
        Ok(self)
    }

    /// Builds the quantizer for the configured threshold table
    pub fn quantizer(&self) -> Result<LevelQuantizer, MonitorError> {
        LevelQuantizer::new(self.thresholds.clone())
    }

    /// Polling interval, falling back to one second when out of range
    pub fn effective_interval(&self) -> Duration {
        let interval_ms = if (MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&self.interval_ms) {
            self.interval_ms
        } else {
            warn!(
                "Polling interval {}ms outside {}..={}ms - using {}ms",
                self.interval_ms, MIN_INTERVAL_MS, MAX_INTERVAL_MS, FALLBACK_INTERVAL_MS
            );
            FALLBACK_INTERVAL_MS
        };
        Duration::from_millis(interval_ms)
    }

    /// Auto-hide threshold when auto-hide is enabled
    pub fn auto_hide_threshold(&self) -> Option<u64> {
        self.auto_hide.then_some(self.auto_hide_threshold_kb)
    }
}
