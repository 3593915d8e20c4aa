//! Traffic samples and measurements
//!
//! This module contains the raw counter samples taken from the system and the
//! measurements derived from two consecutive samples.

use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::monitor::quantizer::Level;

/// Which traffic counter a value refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received bytes only
    #[default]
    Down,
    /// Transmitted bytes only
    Up,
    /// Received plus transmitted bytes
    Both,
}

impl Direction {
    /// Whether the upload counter is part of this direction
    pub fn includes_up(self) -> bool {
        matches!(self, Direction::Up | Direction::Both)
    }

    /// Whether the download counter is part of this direction
    pub fn includes_down(self) -> bool {
        matches!(self, Direction::Down | Direction::Both)
    }
}

/// Cumulative counter values read at a single monotonic instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Total bytes received since boot
    pub rx_bytes: u64,
    /// Total bytes transmitted since boot
    pub tx_bytes: u64,
    /// Monotonic clock value when the counters were read (milliseconds)
    pub timestamp_ms: u64,
}

impl Sample {
    pub fn new(rx_bytes: u64, tx_bytes: u64, timestamp_ms: u64) -> Self {
        Self {
            rx_bytes,
            tx_bytes,
            timestamp_ms,
        }
    }

    /// Counter value tracked for the given direction
    pub fn total_bytes(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Down => self.rx_bytes,
            Direction::Up => self.tx_bytes,
            Direction::Both => self.rx_bytes.saturating_add(self.tx_bytes),
        }
    }

    /// Whole seconds elapsed between `earlier` and this sample
    pub fn seconds_since(&self, earlier: &Sample) -> u64 {
        self.timestamp_ms.saturating_sub(earlier.timestamp_ms) / 1000
    }
}

/// Throughput derived from two consecutive samples of one counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Measurement {
    /// Bytes counted between the two samples, zero on counter regression
    pub delta_bytes: u64,
    /// Whole seconds between the two samples, always greater than zero
    pub delta_seconds: u64,
    /// Integer rate in bytes per second
    pub rate_bytes_per_sec: u64,
}

impl Measurement {
    /// Computes a measurement from two counter values
    ///
    /// Returns `None` when less than one full second separates the samples.
    /// A counter that went backwards (interface reset, reboot) is clamped to a
    /// zero delta instead of producing a huge rate.
    pub fn from_counters(
        previous_bytes: u64,
        current_bytes: u64,
        delta_seconds: u64,
    ) -> Option<Self> {
        if delta_seconds == 0 {
            return None;
        }

        let delta_bytes = if current_bytes >= previous_bytes {
            current_bytes - previous_bytes
        } else {
            debug!(
                "Counter regression detected ({} -> {}) - clamping delta to zero",
                previous_bytes, current_bytes
            );
            0
        };

        Some(Self {
            delta_bytes,
            delta_seconds,
            rate_bytes_per_sec: delta_bytes / delta_seconds,
        })
    }

    /// Computes the measurement of one direction between two samples
    pub fn between(previous: &Sample, current: &Sample, direction: Direction) -> Option<Self> {
        let delta_seconds = current.seconds_since(previous);
        let measurement = Self::from_counters(
            previous.total_bytes(direction),
            current.total_bytes(direction),
            delta_seconds,
        );

        if measurement.is_none() {
            trace!(
                "Samples {}ms and {}ms are less than a second apart - no measurement",
                previous.timestamp_ms, current.timestamp_ms
            );
        }

        measurement
    }

    /// Rate as a floating point value for display purposes
    pub fn rate_f64(&self) -> f64 {
        self.rate_bytes_per_sec as f64
    }
}

/// Raw per-tick deltas delivered to throughput-text consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficReport {
    /// Wall-clock time the report was produced
    pub timestamp: DateTime<Utc>,
    /// Received-bytes measurement
    pub download: Measurement,
    /// Transmitted-bytes measurement
    pub upload: Measurement,
    /// Level computed for this tick (may equal the previous one)
    pub level: Level,
}

impl TrafficReport {
    /// Builds a report for both directions, `None` if the samples are too close
    pub fn between(previous: &Sample, current: &Sample, level: Level) -> Option<Self> {
        let download = Measurement::between(previous, current, Direction::Down)?;
        let upload = Measurement::between(previous, current, Direction::Up)?;
        Some(Self {
            timestamp: Utc::now(),
            download,
            upload,
            level,
        })
    }

    /// Rate of the counter selected by `direction`
    pub fn rate_for(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Down => self.download.rate_bytes_per_sec,
            Direction::Up => self.upload.rate_bytes_per_sec,
            Direction::Both => self
                .download
                .rate_bytes_per_sec
                .saturating_add(self.upload.rate_bytes_per_sec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_bytes_per_direction() {
        let sample = Sample::new(1_000, 250, 0);
        assert_eq!(sample.total_bytes(Direction::Down), 1_000);
        assert_eq!(sample.total_bytes(Direction::Up), 250);
        assert_eq!(sample.total_bytes(Direction::Both), 1_250);

        let saturated = Sample::new(u64::MAX, 1, 0);
        assert_eq!(saturated.total_bytes(Direction::Both), u64::MAX);
    }

    #[test]
    fn test_seconds_since_truncates() {
        let first = Sample::new(0, 0, 1_000);
        assert_eq!(Sample::new(0, 0, 1_999).seconds_since(&first), 0);
        assert_eq!(Sample::new(0, 0, 2_000).seconds_since(&first), 1);
        assert_eq!(Sample::new(0, 0, 5_500).seconds_since(&first), 4);

        // Clock going backwards never underflows
        assert_eq!(Sample::new(0, 0, 500).seconds_since(&first), 0);
    }

    #[test]
    fn test_measurement_rate() {
        let measurement = Measurement::from_counters(0, 12_000, 1).unwrap();
        assert_eq!(measurement.delta_bytes, 12_000);
        assert_eq!(measurement.delta_seconds, 1);
        assert_eq!(measurement.rate_bytes_per_sec, 12_000);

        let measurement = Measurement::from_counters(1_000, 4_001, 2).unwrap();
        assert_eq!(measurement.rate_bytes_per_sec, 1_500);
    }

    #[test]
    fn test_measurement_requires_full_second() {
        assert!(Measurement::from_counters(0, 10_000, 0).is_none());

        let previous = Sample::new(0, 0, 10_000);
        let current = Sample::new(50_000, 0, 10_900);
        assert!(Measurement::between(&previous, &current, Direction::Down).is_none());
    }

    #[test]
    fn test_counter_regression_clamps_to_zero() {
        let previous = Sample::new(1_000_000, 0, 0);
        let current = Sample::new(500_000, 0, 2_000);

        let measurement = Measurement::between(&previous, &current, Direction::Down).unwrap();
        assert_eq!(measurement.delta_seconds, 2);
        assert_eq!(measurement.delta_bytes, 0);
        assert_eq!(measurement.rate_bytes_per_sec, 0);
    }

    #[test]
    fn test_traffic_report_rates() {
        let previous = Sample::new(0, 0, 0);
        let current = Sample::new(4_000, 2_000, 2_000);

        let report = TrafficReport::between(&previous, &current, Level::new(1)).unwrap();
        assert_eq!(report.rate_for(Direction::Down), 2_000);
        assert_eq!(report.rate_for(Direction::Up), 1_000);
        assert_eq!(report.rate_for(Direction::Both), 3_000);
        assert_eq!(report.level, Level::new(1));

        assert!(TrafficReport::between(&previous, &Sample::new(1, 1, 999), Level::ZERO).is_none());
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::Both).unwrap(), "\"both\"");
        let parsed: Direction = serde_json::from_str("\"up\"").unwrap();
        assert_eq!(parsed, Direction::Up);
        assert!(Direction::Both.includes_up() && Direction::Both.includes_down());
        assert!(!Direction::Down.includes_up());
    }
}
