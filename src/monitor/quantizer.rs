//! Throughput quantization
//!
//! Maps a byte/s rate onto a small ordinal level using an ascending threshold
//! table. Level `i` is assigned when `thresholds[i-1] <= rate < thresholds[i]`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::monitor::errors::MonitorError;

/// Default threshold table in bytes per second (levels 0..=8)
pub const DEFAULT_THRESHOLDS: [u64; 8] = [
    1,
    5 * 1024,
    25 * 1024,
    125 * 1024,
    250 * 1024,
    450 * 1024,
    750 * 1024,
    1000 * 1024,
];

/// Quantized traffic level, `0` meaning no traffic
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Level(u32);

impl Level {
    pub const ZERO: Level = Level(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the number of thresholds the rate has met or exceeded
///
/// The table must be ascending; the scan stops at the first threshold above
/// the rate.
pub fn quantize(rate: u64, thresholds: &[u64]) -> Level {
    let met = thresholds
        .iter()
        .take_while(|&&threshold| rate >= threshold)
        .count();
    Level(met as u32)
}

/// A validated threshold table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelQuantizer {
    thresholds: Vec<u64>,
}

impl Default for LevelQuantizer {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl LevelQuantizer {
    /// Creates a quantizer, rejecting empty or non strictly ascending tables
    pub fn new(thresholds: Vec<u64>) -> Result<Self, MonitorError> {
        if thresholds.is_empty() {
            return Err(MonitorError::InvalidThresholds {
                reason: "threshold table is empty".to_string(),
            });
        }

        if let Some(pair) = thresholds.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(MonitorError::InvalidThresholds {
                reason: format!(
                    "thresholds must be strictly ascending ({} is followed by {})",
                    pair[0], pair[1]
                ),
            });
        }

        Ok(Self { thresholds })
    }

    pub fn quantize(&self, rate: u64) -> Level {
        quantize(rate, &self.thresholds)
    }

    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    /// Number of distinct levels (table size + 1)
    pub fn level_count(&self) -> usize {
        self.thresholds.len() + 1
    }

    /// Highest level this table can produce
    pub fn max_level(&self) -> Level {
        Level(self.thresholds.len() as u32)
    }

    /// Lower bound (inclusive) of the rate range mapped to `level`
    pub fn lower_bound(&self, level: Level) -> Option<u64> {
        match level.value() as usize {
            0 => Some(0),
            index => self.thresholds.get(index - 1).copied(),
        }
    }
}
