//! Traffic level monitor
//!
//! The monitor owns the polling loop, the last sample, the current level and
//! the observer set. It runs only while at least one observer is registered:
//! the first registration takes a baseline sample and spawns the polling task,
//! removing the last observer aborts it.

use log::{debug, info, trace};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::collectors::sample::{Direction, Measurement, Sample, TrafficReport};
use crate::collectors::sampler::RateSampler;
use crate::settings::MonitorSettings;
use crate::monitor::errors::MonitorError;
use crate::monitor::quantizer::{Level, LevelQuantizer};
use crate::monitor::registry::{ObserverRef, ObserverRegistry, deliver_level, deliver_report};

/// Result of one polling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The monitor is stopped, or the tick belongs to a cancelled polling task
    Idle,
    /// Less than a full second elapsed since the last sample
    Skipped,
    /// A rate was measured but the level did not change
    Unchanged(Level),
    /// The level changed and `notified` observers were told
    Changed {
        from: Level,
        to: Level,
        notified: usize,
    },
}

#[derive(Debug)]
struct MonitorState {
    running: bool,
    /// Bumped on every start; a polling task only acts on its own epoch
    epoch: u64,
    last_sample: Sample,
    current_level: Level,
    /// Bumped on every committed level change
    level_seq: u64,
    observers: ObserverRegistry,
    ticker: Option<JoinHandle<()>>,
    tick_count: u64,
}

#[derive(Debug)]
struct MonitorInner {
    sampler: RateSampler,
    quantizer: LevelQuantizer,
    direction: Direction,
    interval: Duration,
    runtime: Handle,
    state: Mutex<MonitorState>,
    /// Serializes fan-out; holds the sequence of the last delivered change.
    /// Never acquired while `state` is held.
    delivery: Mutex<u64>,
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
    }
}

/// Shared handle to a traffic monitor
///
/// Cloning is cheap; every clone drives the same state. Construct one at
/// startup and hand clones to whatever needs to register observers.
#[derive(Debug, Clone)]
pub struct TrafficMonitor {
    inner: Arc<MonitorInner>,
}

impl TrafficMonitor {
    /// Creates a monitor on the tokio runtime of the calling context
    pub fn new(sampler: RateSampler, settings: &MonitorSettings) -> Result<Self, MonitorError> {
        let runtime = Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        Self::with_runtime(runtime, sampler, settings)
    }

    /// Creates a monitor whose polling task is spawned on `runtime`
    ///
    /// Registration may then happen from any thread, including threads that
    /// are not part of the runtime.
    pub fn with_runtime(
        runtime: Handle,
        sampler: RateSampler,
        settings: &MonitorSettings,
    ) -> Result<Self, MonitorError> {
        let quantizer = settings.quantizer()?;
        let interval = settings.effective_interval();

        debug!(
            "Creating traffic monitor (interval={}ms, direction={:?}, levels={}, sampler={:?})",
            interval.as_millis(),
            settings.direction,
            quantizer.level_count(),
            sampler
        );

        Ok(Self {
            inner: Arc::new(MonitorInner {
                sampler,
                quantizer,
                direction: settings.direction,
                interval,
                runtime,
                state: Mutex::new(MonitorState {
                    running: false,
                    epoch: 0,
                    last_sample: Sample::default(),
                    current_level: Level::ZERO,
                    level_seq: 0,
                    observers: ObserverRegistry::new(),
                    ticker: None,
                    tick_count: 0,
                }),
                delivery: Mutex::new(0),
            }),
        })
    }

    /// Registers an observer, starting the polling loop for the first one
    ///
    /// Returns `false` if the observer was already registered.
    pub fn add_observer(&self, observer: ObserverRef) -> bool {
        let mut state = self.inner.lock_state();
        let added = state.observers.register(observer);

        if !state.running && !state.observers.is_empty() {
            self.start_locked(&mut state);
        }

        trace!(
            "Observer registration (added={}, observers={})",
            added,
            state.observers.count()
        );
        added
    }

    /// Unregisters an observer, stopping the polling loop once none remain
    ///
    /// Returns `false` if the observer was not registered.
    pub fn remove_observer(&self, observer: &ObserverRef) -> bool {
        let mut state = self.inner.lock_state();
        let removed = state.observers.unregister(observer);

        if state.running && state.observers.is_empty() {
            Self::stop_locked(&mut state);
        }

        trace!(
            "Observer removal (removed={}, observers={})",
            removed,
            state.observers.count()
        );
        removed
    }

    /// Runs one polling cycle immediately, outside the regular schedule
    ///
    /// Must not be called from inside an observer callback.
    pub fn tick_now(&self) -> TickOutcome {
        self.inner.run_tick(None)
    }

    pub fn current_level(&self) -> Level {
        self.inner.lock_state().current_level
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_state().running
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock_state().observers.count()
    }

    pub fn last_sample(&self) -> Sample {
        self.inner.lock_state().last_sample
    }

    /// Number of polling cycles that reached the sampling step
    pub fn tick_count(&self) -> u64 {
        self.inner.lock_state().tick_count
    }

    pub fn thresholds(&self) -> &[u64] {
        self.inner.quantizer.thresholds()
    }

    pub fn quantizer(&self) -> &LevelQuantizer {
        &self.inner.quantizer
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn direction(&self) -> Direction {
        self.inner.direction
    }

    fn start_locked(&self, state: &mut MonitorState) {
        state.running = true;
        state.epoch += 1;
        state.last_sample = self.inner.sampler.sample_or(&state.last_sample);
        state.current_level = Level::ZERO;
        state.ticker = Some(self.spawn_ticker(state.epoch));

        info!(
            "Start traffic monitor (epoch={}, interval={}ms, baseline={}ms)",
            state.epoch,
            self.inner.interval.as_millis(),
            state.last_sample.timestamp_ms
        );
    }

    fn stop_locked(state: &mut MonitorState) {
        state.running = false;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        info!(
            "Stop traffic monitor (epoch={}, ticks={})",
            state.epoch, state.tick_count
        );
    }

    fn spawn_ticker(&self, epoch: u64) -> JoinHandle<()> {
        let inner: Weak<MonitorInner> = Arc::downgrade(&self.inner);
        let period = self.inner.interval;

        self.inner.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if inner.run_tick(Some(epoch)) == TickOutcome::Idle {
                    trace!("Polling task for epoch {} exiting", epoch);
                    break;
                }
            }
        })
    }
}

impl MonitorInner {
    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery(&self) -> MutexGuard<'_, u64> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_tick(&self, epoch: Option<u64>) -> TickOutcome {
        let mut state = self.lock_state();
        if !state.running || epoch.is_some_and(|epoch| epoch != state.epoch) {
            return TickOutcome::Idle;
        }
        state.tick_count += 1;

        let previous = state.last_sample;
        let current = self.sampler.sample_or(&previous);

        let Some(measurement) = Measurement::between(&previous, &current, self.direction) else {
            trace!(
                "Tick #{} skipped: {}ms since last sample",
                state.tick_count,
                current.timestamp_ms.saturating_sub(previous.timestamp_ms)
            );
            return TickOutcome::Skipped;
        };
        state.last_sample = current;

        let level = self.quantizer.quantize(measurement.rate_bytes_per_sec);
        debug!(
            "Tick #{}: delay={}s, speed={} kb/s (level {})",
            state.tick_count,
            measurement.delta_seconds,
            measurement.rate_bytes_per_sec / 1024,
            level
        );

        let from = state.current_level;
        let changed = level != from;
        if changed {
            state.current_level = level;
            state.level_seq += 1;
        }
        let seq = state.level_seq;
        let observers = state.observers.snapshot();
        drop(state);

        let mut delivered = self.lock_delivery();
        if let Some(report) = TrafficReport::between(&previous, &current, level) {
            deliver_report(&observers, &report);
        }

        if !changed {
            return TickOutcome::Unchanged(level);
        }

        // A concurrent cycle committed and delivered a newer level first
        if seq <= *delivered {
            debug!(
                "Level change {} -> {} superseded by change #{}, not delivered",
                from, level, *delivered
            );
            return TickOutcome::Changed {
                from,
                to: level,
                notified: 0,
            };
        }
        *delivered = seq;

        deliver_level(&observers, level);
        drop(delivered);
        debug!(
            "Level changed {} -> {}, notified {} observers",
            from,
            level,
            observers.len()
        );
        TickOutcome::Changed {
            from,
            to: level,
            notified: observers.len(),
        }
    }
}
