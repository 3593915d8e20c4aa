//! Formatting utilities for traffic rates
//!
//! Rates can be shown in bits per second (decimal prefixes, `k` = 1000) or in
//! bytes per second (binary prefixes, `k` = 1024). Values keep at most one
//! fraction digit and a trailing `.0` is dropped.

use serde::{Deserialize, Serialize};

/// Unit used when rendering a rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitMode {
    /// Bits per second, scaled by 1000
    #[default]
    Bits,
    /// Bytes per second, scaled by 1024
    Bytes,
}

impl UnitMode {
    /// Multiplier between two consecutive prefixes
    pub fn kilo(self) -> f64 {
        match self {
            UnitMode::Bits => 1000.0,
            UnitMode::Bytes => 1024.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnitMode::Bits => "b/s",
            UnitMode::Bytes => "B/s",
        }
    }

    /// Converts a byte count into this unit's base quantity
    pub fn scale_bytes(self, bytes: u64) -> f64 {
        match self {
            UnitMode::Bits => bytes as f64 * 8.0,
            UnitMode::Bytes => bytes as f64,
        }
    }
}

/// Formats a value with at most one fraction digit, dropping a trailing `.0`
///
/// # Examples
///
/// ```
/// use kaipo_meter::display::formatting::format_decimal;
///
/// assert_eq!(format_decimal(12.0), "12");
/// assert_eq!(format_decimal(12.54), "12.5");
/// assert_eq!(format_decimal(0.04), "0");
/// ```
pub fn format_decimal(value: f64) -> String {
    let formatted = format!("{:.1}", value);
    match formatted.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => formatted,
    }
}

/// Formats a rate given in bytes per second
///
/// # Examples
///
/// ```
/// use kaipo_meter::display::formatting::{format_rate, UnitMode};
///
/// assert_eq!(format_rate(100, UnitMode::Bits), "800b/s");
/// assert_eq!(format_rate(800, UnitMode::Bits), "6.4kb/s");
/// assert_eq!(format_rate(12_800, UnitMode::Bytes), "12.5kB/s");
/// assert_eq!(format_rate(3 * 1024 * 1024, UnitMode::Bytes), "3MB/s");
/// ```
pub fn format_rate(bytes_per_sec: u64, unit: UnitMode) -> String {
    let value = unit.scale_bytes(bytes_per_sec);
    let kilo = unit.kilo();
    let mega = kilo * kilo;
    let giga = mega * kilo;
    let symbol = unit.symbol();

    if value < kilo {
        format!("{}{}", format_decimal(value), symbol)
    } else if value < mega {
        format!("{}k{}", format_decimal(value / kilo), symbol)
    } else if value < giga {
        format!("{}M{}", format_decimal(value / mega), symbol)
    } else {
        format!("{}G{}", format_decimal(value / giga), symbol)
    }
}

/// Formats byte values with appropriate units (B, KB, MB, GB, TB)
///
/// # Examples
///
/// ```
/// use kaipo_meter::display::formatting::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit_index = 0;
    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit_index])
    }
}
