//! Traffic level monitor
//!
//! Turns periodic counter samples into a small discrete activity level and
//! tells registered observers when that level changes.
//!
//! ## Module Organization
//!
//! - `quantizer`: threshold table and rate to level mapping
//! - `registry`: observer trait and the identity-keyed observer set
//! - `traffic_monitor`: the start/stop state machine and the polling task
//! - `gate`: registers an observer only while it is attached, enabled and connected
//! - `channel`: observer that forwards callbacks into a tokio channel
//! - `errors`: construction and configuration errors
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use kaipo_meter::collectors::{RateSampler, MonotonicClock, default_counter_source};
//! use kaipo_meter::monitor::{ChannelObserver, TrafficMonitor};
//! use kaipo_meter::settings::MonitorSettings;
//!
//! # async fn run() -> Result<(), kaipo_meter::monitor::MonitorError> {
//! let sampler = RateSampler::new(default_counter_source(), Arc::new(MonotonicClock::new()));
//! let monitor = TrafficMonitor::new(sampler, &MonitorSettings::default())?;
//!
//! let (observer, mut events) = ChannelObserver::new();
//! monitor.add_observer(Arc::new(observer));
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod errors;
pub mod gate;
pub mod quantizer;
pub mod registry;
pub mod traffic_monitor;

pub use channel::{ChannelObserver, MonitorEvent};
pub use errors::MonitorError;
pub use gate::ObserverGate;
pub use quantizer::{DEFAULT_THRESHOLDS, Level, LevelQuantizer, quantize};
pub use registry::{LevelObserver, ObserverRef, ObserverRegistry};
pub use traffic_monitor::{TickOutcome, TrafficMonitor};

#[cfg(test)]
pub mod tests;
