//! Legacy packed settings word
//!
//! Older status-bar builds stored the traffic display settings in one 32-bit
//! integer: feature flags in the low bits and the refresh period in the upper
//! 16 bits.

use crate::collectors::sample::Direction;
use crate::display::formatting::UnitMode;
use crate::settings::monitor_settings::MonitorSettings;

pub const METER_ENABLED_MASK: u32 = 0x0000_0001;
pub const TEXT_ENABLED_MASK: u32 = 0x0000_0002;
pub const UP_TRAFFIC_MASK: u32 = 0x0000_0004;
pub const DOWN_TRAFFIC_MASK: u32 = 0x0000_0008;
/// Byte units are selected only when the whole low nibble is set
pub const UNIT_SWITCH_MASK: u32 = 0x0000_000F;
pub const REFRESH_PERIOD_MASK: u32 = 0xFFFF_0000;

/// Whether every bit of `mask` is set in `value`
pub fn has_mask(value: u32, mask: u32) -> bool {
    value & mask == mask
}

impl MonitorSettings {
    /// Decodes a packed settings word on top of the defaults
    ///
    /// The refresh period is taken verbatim; out-of-range periods are handled
    /// by [`MonitorSettings::effective_interval`].
    pub fn from_packed_state(state: u32) -> Self {
        let up = has_mask(state, UP_TRAFFIC_MASK);
        let down = has_mask(state, DOWN_TRAFFIC_MASK);

        let direction = match (up, down) {
            (true, true) => Direction::Both,
            (true, false) => Direction::Up,
            _ => Direction::Down,
        };

        let unit = if has_mask(state, UNIT_SWITCH_MASK) {
            UnitMode::Bytes
        } else {
            UnitMode::Bits
        };

        Self {
            interval_ms: u64::from((state & REFRESH_PERIOD_MASK) >> 16),
            direction,
            unit,
            meter_enabled: has_mask(state, METER_ENABLED_MASK),
            text_enabled: has_mask(state, TEXT_ENABLED_MASK) || up || down,
            ..Self::default()
        }
    }
}
