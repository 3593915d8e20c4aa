//! Counter and clock sampling
//!
//! The sampler pairs a cumulative byte counter source with a monotonic clock
//! and turns one read of each into a [`Sample`]. It keeps no state of its own.

use log::{trace, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::collectors::sample::Sample;

/// Aggregate traffic counters since boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterReading {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl CounterReading {
    pub fn new(rx_bytes: u64, tx_bytes: u64) -> Self {
        Self { rx_bytes, tx_bytes }
    }
}

/// A source of device-wide cumulative byte counters
pub trait CounterSource: Send + Sync {
    /// Reads the current totals, `None` if the counters are unavailable
    fn read_totals(&self) -> Option<CounterReading>;

    /// Short name used in log messages
    fn name(&self) -> &str;
}

/// A monotonic millisecond clock
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since the clock was created, backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to, for deterministic replay
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct ManualCounterState {
    reading: Option<CounterReading>,
    rx_step: u64,
    tx_step: u64,
}

/// A counter source driven by the caller, for deterministic replay
///
/// Every read returns the current totals and then advances them by the
/// configured per-read step.
#[derive(Debug)]
pub struct ManualCounterSource {
    state: Mutex<ManualCounterState>,
    reads: AtomicU64,
}

impl Default for ManualCounterSource {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl ManualCounterSource {
    pub fn new(rx_bytes: u64, tx_bytes: u64) -> Self {
        Self {
            state: Mutex::new(ManualCounterState {
                reading: Some(CounterReading::new(rx_bytes, tx_bytes)),
                rx_step: 0,
                tx_step: 0,
            }),
            reads: AtomicU64::new(0),
        }
    }

    /// Grows the counters by a fixed amount after every read
    pub fn with_step(self, rx_step: u64, tx_step: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.rx_step = rx_step;
            state.tx_step = tx_step;
        }
        self
    }

    pub fn set_totals(&self, rx_bytes: u64, tx_bytes: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.reading = Some(CounterReading::new(rx_bytes, tx_bytes));
    }

    pub fn add(&self, rx_bytes: u64, tx_bytes: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = state.reading.unwrap_or_default();
        state.reading = Some(CounterReading::new(
            current.rx_bytes.saturating_add(rx_bytes),
            current.tx_bytes.saturating_add(tx_bytes),
        ));
    }

    /// Makes subsequent reads report the counters as unavailable
    pub fn set_unavailable(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.reading = None;
    }

    /// Number of reads served so far
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CounterSource for ManualCounterSource {
    fn read_totals(&self) -> Option<CounterReading> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = state.reading?;
        state.reading = Some(CounterReading::new(
            current.rx_bytes.saturating_add(state.rx_step),
            current.tx_bytes.saturating_add(state.tx_step),
        ));
        Some(current)
    }

    fn name(&self) -> &str {
        "manual"
    }
}

/// Reads counters and clock together
#[derive(Clone)]
pub struct RateSampler {
    source: Arc<dyn CounterSource>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateSampler")
            .field("source", &self.source.name())
            .finish()
    }
}

impl RateSampler {
    pub fn new(source: Arc<dyn CounterSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Takes a sample, reporting zero counters when the source is unavailable
    pub fn sample(&self) -> Sample {
        self.sample_with_fallback(CounterReading::default())
    }

    /// Takes a sample, reusing `previous`'s totals when the source is unavailable
    ///
    /// The resulting delta against `previous` is zero, so the tick reads as
    /// zero traffic and the next good read does not produce a spike.
    pub fn sample_or(&self, previous: &Sample) -> Sample {
        self.sample_with_fallback(CounterReading::new(previous.rx_bytes, previous.tx_bytes))
    }

    fn sample_with_fallback(&self, fallback: CounterReading) -> Sample {
        let timestamp_ms = self.clock.now_ms();
        let reading = match self.source.read_totals() {
            Some(reading) => reading,
            None => {
                warn!(
                    "Counter source '{}' unavailable at {}ms - reporting zero traffic for this tick",
                    self.source.name(),
                    timestamp_ms
                );
                fallback
            }
        };

        trace!(
            "Sampled '{}' at {}ms: rx={} bytes, tx={} bytes",
            self.source.name(),
            timestamp_ms,
            reading.rx_bytes,
            reading.tx_bytes
        );

        Sample::new(reading.rx_bytes, reading.tx_bytes, timestamp_ms)
    }
}
