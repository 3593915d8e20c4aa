//! Error types for the traffic monitor
//!
//! Runtime anomalies (skipped ticks, counter regressions, unavailable counters)
//! never become errors. These variants only cover construction and
//! configuration problems.

use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// The level threshold table is empty or not strictly ascending
    #[error("Invalid threshold table: {reason}")]
    InvalidThresholds { reason: String },

    /// Layered configuration could not be loaded or deserialized
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// The monitor needs a tokio runtime to drive its polling task
    #[error("No tokio runtime available to run the polling task")]
    NoRuntime,

    /// Reading the system counters failed
    #[error("Counter source I/O error: {0}")]
    CounterSource(#[from] std::io::Error),

    /// The system counters could not be parsed
    #[error("Malformed counters in {origin}: {reason}")]
    CounterFormat { origin: String, reason: String },
}

/// Logs a structured error event with the operation that raised it
pub fn log_error_event(error: &MonitorError, context: &str) {
    let category = match error {
        MonitorError::InvalidThresholds { .. } => "configuration",
        MonitorError::Config(_) => "configuration_source",
        MonitorError::NoRuntime => "runtime",
        MonitorError::CounterSource(_) | MonitorError::CounterFormat { .. } => "counter_source",
    };

    error!(
        "ERROR_EVENT: context={}, category={}, error={}",
        context, category, error
    );
}
