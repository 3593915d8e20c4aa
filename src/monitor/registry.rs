//! Observer registry
//!
//! Holds the subscribers of a traffic monitor. The registry itself is not
//! synchronized: the monitor keeps it inside its state mutex so registration
//! and the tick share one critical section.

use log::trace;
use std::sync::Arc;

use crate::collectors::sample::TrafficReport;
use crate::monitor::quantizer::Level;

/// A consumer of traffic level changes
pub trait LevelObserver: Send + Sync {
    /// Called once per level change with the new level
    fn on_level_changed(&self, level: Level);

    /// Called with the raw deltas of every tick that produced a measurement
    fn on_report(&self, _report: &TrafficReport) {}
}

/// Shared observer handle; identity is the pointed-to allocation
pub type ObserverRef = Arc<dyn LevelObserver>;

fn same_observer(a: &ObserverRef, b: &ObserverRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<ObserverRef>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("count", &self.observers.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer; returns `false` if it was already registered
    pub fn register(&mut self, observer: ObserverRef) -> bool {
        if self.contains(&observer) {
            trace!("Observer already registered - ignoring duplicate registration");
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Removes an observer; returns `false` if it was not registered
    pub fn unregister(&mut self, observer: &ObserverRef) -> bool {
        let before = self.observers.len();
        self.observers.retain(|existing| !same_observer(existing, observer));
        before != self.observers.len()
    }

    pub fn contains(&self, observer: &ObserverRef) -> bool {
        self.observers
            .iter()
            .any(|existing| same_observer(existing, observer))
    }

    pub fn count(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Copies the current observer set for delivery outside the lock
    pub fn snapshot(&self) -> Vec<ObserverRef> {
        self.observers.clone()
    }

    /// Delivers `level` to every observer currently registered
    pub fn notify_all(&self, level: Level) {
        deliver_level(&self.snapshot(), level);
    }
}

/// Fans a level change out to a snapshot of observers
pub fn deliver_level(observers: &[ObserverRef], level: Level) {
    for observer in observers {
        observer.on_level_changed(level);
    }
}

/// Fans a per-tick report out to a snapshot of observers
pub fn deliver_report(observers: &[ObserverRef], report: &TrafficReport) {
    for observer in observers {
        observer.on_report(report);
    }
}
