use log::{debug, trace, warn};
use std::sync::{Mutex, PoisonError};
use sysinfo::Networks;

use super::is_loopback_name;
use crate::collectors::sampler::{CounterReading, CounterSource};

/// Aggregate counters from sysinfo's network list
///
/// `Networks` needs `&mut self` to refresh, so it sits behind a mutex to keep
/// the source shareable.
pub struct SysinfoCounterSource {
    networks: Mutex<Networks>,
}

impl std::fmt::Debug for SysinfoCounterSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoCounterSource").finish_non_exhaustive()
    }
}

impl Default for SysinfoCounterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCounterSource {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl CounterSource for SysinfoCounterSource {
    fn read_totals(&self) -> Option<CounterReading> {
        let mut networks = self.networks.lock().unwrap_or_else(PoisonError::into_inner);
        // refresh(true) also drops interfaces that disappeared
        networks.refresh(true);

        if networks.is_empty() {
            warn!("No network interfaces reported by sysinfo");
            return None;
        }

        let mut total = CounterReading::default();
        for (name, data) in networks.iter() {
            if is_loopback_name(name) {
                trace!("Skipping loopback interface '{}'", name);
                continue;
            }
            total.rx_bytes = total.rx_bytes.saturating_add(data.total_received());
            total.tx_bytes = total.tx_bytes.saturating_add(data.total_transmitted());
        }

        debug!(
            "sysinfo totals across {} interfaces: rx={} bytes, tx={} bytes",
            networks.len(),
            total.rx_bytes,
            total.tx_bytes
        );
        Some(total)
    }

    fn name(&self) -> &str {
        "sysinfo"
    }
}
