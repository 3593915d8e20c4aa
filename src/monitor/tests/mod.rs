//! Test module organization for the traffic monitor
//!
//! Shared fixtures live here; the monitor runs on a current-thread runtime
//! that is never driven, so the polling task never fires and every cycle is
//! triggered explicitly with `tick_now`.

pub mod lifecycle_tests;

use std::sync::{Arc, Mutex};
use tokio::runtime::{Builder, Runtime};

use crate::collectors::sample::TrafficReport;
use crate::collectors::sampler::{ManualClock, ManualCounterSource, RateSampler};
use crate::monitor::quantizer::Level;
use crate::monitor::registry::{LevelObserver, ObserverRef};
use crate::monitor::traffic_monitor::TrafficMonitor;
use crate::settings::MonitorSettings;

pub struct Fixture {
    pub monitor: TrafficMonitor,
    pub source: Arc<ManualCounterSource>,
    pub clock: Arc<ManualClock>,
    // Declared last so it drops after the monitor
    _runtime: Runtime,
}

impl Fixture {
    pub fn new(settings: MonitorSettings) -> Self {
        Self::with_source(settings, ManualCounterSource::new(0, 0))
    }

    pub fn with_source(settings: MonitorSettings, source: ManualCounterSource) -> Self {
        let runtime = Builder::new_current_thread().enable_all().build().unwrap();
        let source = Arc::new(source);
        let clock = Arc::new(ManualClock::new(0));
        let sampler = RateSampler::new(source.clone(), clock.clone());
        let monitor = TrafficMonitor::with_runtime(runtime.handle().clone(), sampler, &settings)
            .unwrap();

        Self {
            monitor,
            source,
            clock,
            _runtime: runtime,
        }
    }
}

pub fn settings_with_thresholds(thresholds: &[u64]) -> MonitorSettings {
    MonitorSettings {
        thresholds: thresholds.to_vec(),
        ..MonitorSettings::default()
    }
}

/// Observer that records every callback
#[derive(Default)]
pub struct Recorder {
    levels: Mutex<Vec<Level>>,
    reports: Mutex<Vec<TrafficReport>>,
}

impl Recorder {
    pub fn shared() -> Arc<Recorder> {
        Arc::new(Recorder::default())
    }

    pub fn levels(&self) -> Vec<Level> {
        self.levels.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<TrafficReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl LevelObserver for Recorder {
    fn on_level_changed(&self, level: Level) {
        self.levels.lock().unwrap().push(level);
    }

    fn on_report(&self, report: &TrafficReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

pub fn as_observer(recorder: &Arc<Recorder>) -> ObserverRef {
    recorder.clone()
}
