//! Throughput text rendering
//!
//! Turns a per-tick [`TrafficReport`] into the up/down text shown next to the
//! meter, honouring the unit mode and the auto-hide threshold.

use crate::collectors::sample::{Direction, TrafficReport};
use crate::display::formatting::{UnitMode, format_rate};
use crate::settings::MonitorSettings;

const KILOBYTE: u64 = 1024;

/// Whether the text should be hidden for this report
///
/// With auto-hide enabled, the text is hidden when every displayed
/// direction's rate is at or below `threshold_kb` KiB/s.
pub fn should_hide(report: &TrafficReport, direction: Direction, threshold_kb: Option<u64>) -> bool {
    let Some(threshold_kb) = threshold_kb else {
        return false;
    };

    let down_kb = report.download.rate_bytes_per_sec / KILOBYTE;
    let up_kb = report.upload.rate_bytes_per_sec / KILOBYTE;

    match direction {
        Direction::Both => down_kb <= threshold_kb && up_kb <= threshold_kb,
        Direction::Down => down_kb <= threshold_kb,
        Direction::Up => up_kb <= threshold_kb,
    }
}

/// Renders the up/down throughput text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputText {
    pub direction: Direction,
    pub unit: UnitMode,
    /// Auto-hide threshold in KiB/s, `None` when auto-hide is off
    pub auto_hide_threshold_kb: Option<u64>,
}

impl ThroughputText {
    pub fn new(direction: Direction, unit: UnitMode) -> Self {
        Self {
            direction,
            unit,
            auto_hide_threshold_kb: None,
        }
    }

    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            direction: settings.direction,
            unit: settings.unit,
            auto_hide_threshold_kb: settings.auto_hide_threshold(),
        }
    }

    /// Renders the text, `None` when it should be hidden
    ///
    /// The upload line comes first; both lines are separated by a newline
    /// when both directions are shown.
    pub fn render(&self, report: &TrafficReport) -> Option<String> {
        if should_hide(report, self.direction, self.auto_hide_threshold_kb) {
            return None;
        }

        let mut output = String::new();
        if self.direction.includes_up() {
            output.push_str(&format_rate(report.upload.rate_bytes_per_sec, self.unit));
        }
        if self.direction == Direction::Both {
            output.push('\n');
        }
        if self.direction.includes_down() {
            output.push_str(&format_rate(report.download.rate_bytes_per_sec, self.unit));
        }
        Some(output)
    }

    /// Single-line form of [`ThroughputText::render`] with direction arrows
    pub fn render_inline(&self, report: &TrafficReport) -> Option<String> {
        if should_hide(report, self.direction, self.auto_hide_threshold_kb) {
            return None;
        }

        let mut parts = Vec::with_capacity(2);
        if self.direction.includes_up() {
            parts.push(format!("↑ {}", format_rate(report.upload.rate_bytes_per_sec, self.unit)));
        }
        if self.direction.includes_down() {
            parts.push(format!("↓ {}", format_rate(report.download.rate_bytes_per_sec, self.unit)));
        }
        Some(parts.join("  "))
    }
}
