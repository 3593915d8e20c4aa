//! Channel-backed observer
//!
//! Forwards monitor callbacks into a tokio unbounded channel so async
//! consumers (the CLI loops, the dashboard) can `recv().await` them instead
//! of running inside the polling task.

use log::trace;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::collectors::sample::TrafficReport;
use crate::monitor::quantizer::Level;
use crate::monitor::registry::LevelObserver;

/// One callback from the monitor
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Level(Level),
    Report(TrafficReport),
}

#[derive(Debug)]
pub struct ChannelObserver {
    sender: UnboundedSender<MonitorEvent>,
    forward_reports: bool,
}

impl ChannelObserver {
    /// Creates an observer that forwards level changes and per-tick reports
    pub fn new() -> (Self, UnboundedReceiver<MonitorEvent>) {
        Self::build(true)
    }

    /// Creates an observer that forwards level changes only
    pub fn levels_only() -> (Self, UnboundedReceiver<MonitorEvent>) {
        Self::build(false)
    }

    fn build(forward_reports: bool) -> (Self, UnboundedReceiver<MonitorEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                forward_reports,
            },
            receiver,
        )
    }

    fn forward(&self, event: MonitorEvent) {
        if self.sender.send(event).is_err() {
            trace!("Monitor event dropped - receiver closed");
        }
    }
}

impl LevelObserver for ChannelObserver {
    fn on_level_changed(&self, level: Level) {
        self.forward(MonitorEvent::Level(level));
    }

    fn on_report(&self, report: &TrafficReport) {
        if self.forward_reports {
            self.forward(MonitorEvent::Report(report.clone()));
        }
    }
}
