//! Observer gating
//!
//! A consumer should only be registered with the monitor while it is attached
//! to the display, enabled in settings, and the device has connectivity. The
//! gate tracks those three signals and registers or unregisters its observer
//! whenever one of them changes.

use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::monitor::registry::ObserverRef;
use crate::monitor::traffic_monitor::TrafficMonitor;

#[derive(Debug, Default, Clone, Copy)]
struct GateState {
    attached: bool,
    enabled: bool,
    connected: bool,
}

pub struct ObserverGate {
    monitor: TrafficMonitor,
    observer: ObserverRef,
    state: Mutex<GateState>,
}

impl std::fmt::Debug for ObserverGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverGate")
            .field("state", &*self.lock_state())
            .finish()
    }
}

impl ObserverGate {
    /// Creates a detached, disconnected gate for `observer`
    pub fn new(monitor: TrafficMonitor, observer: ObserverRef, enabled: bool) -> Self {
        Self {
            monitor,
            observer,
            state: Mutex::new(GateState {
                attached: false,
                enabled,
                connected: false,
            }),
        }
    }

    pub fn attach(&self) -> bool {
        self.update(|state| state.attached = true)
    }

    pub fn detach(&self) -> bool {
        self.update(|state| state.attached = false)
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.update(|state| state.enabled = enabled)
    }

    pub fn set_connected(&self, connected: bool) -> bool {
        self.update(|state| state.connected = connected)
    }

    /// Whether the consumer should be shown (enabled and connected)
    pub fn is_visible(&self) -> bool {
        let state = self.lock_state();
        state.enabled && state.connected
    }

    /// Whether the observer is currently registered with the monitor
    pub fn is_registered(&self) -> bool {
        let state = self.lock_state();
        state.attached && state.enabled && state.connected
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a signal change and reconciles the registration
    ///
    /// Returns the resulting visibility. Registration is idempotent on the
    /// monitor side, so repeating a signal is harmless.
    fn update(&self, change: impl FnOnce(&mut GateState)) -> bool {
        let mut state = self.lock_state();
        change(&mut state);

        let visible = state.enabled && state.connected;
        if visible && state.attached {
            self.monitor.add_observer(self.observer.clone());
        } else {
            self.monitor.remove_observer(&self.observer);
        }

        debug!(
            "Observer gate updated (attached={}, enabled={}, connected={}, visible={})",
            state.attached, state.enabled, state.connected, visible
        );
        visible
    }
}

impl Drop for ObserverGate {
    fn drop(&mut self) {
        self.monitor.remove_observer(&self.observer);
    }
}
