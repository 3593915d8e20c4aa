//! Monitor configuration
//!
//! - `monitor_settings`: layered settings loading and validation
//! - `packed_state`: decoding of the legacy packed settings word

pub mod monitor_settings;
pub mod packed_state;

pub use monitor_settings::MonitorSettings;
pub use packed_state::has_mask;
