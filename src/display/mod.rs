//! Display helpers for monitor output
//!
//! - `formatting`: rate and byte formatting with bit/byte unit scaling
//! - `text`: the up/down throughput text with auto-hide

pub mod formatting;
pub mod text;

pub use formatting::{UnitMode, format_bytes, format_rate};
pub use text::{ThroughputText, should_hide};
