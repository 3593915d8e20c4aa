//! kaipo-meter: device-wide network activity levels
//!
//! Samples the system's cumulative traffic counters on a fixed interval while
//! anyone is listening, converts the throughput into a discrete activity level
//! and notifies observers when that level changes.

pub mod collectors;
pub mod display;
pub mod monitor;
pub mod settings;
