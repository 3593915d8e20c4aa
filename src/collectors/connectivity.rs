//! Connectivity detection
//!
//! The device counts as connected when at least one non-loopback interface
//! has an address assigned.

use log::{debug, warn};

/// Answers whether the device currently has network connectivity
pub trait ConnectivityProbe: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Probe backed by the host's interface address list
#[derive(Debug, Default, Clone, Copy)]
pub struct InterfaceAddressProbe;

impl ConnectivityProbe for InterfaceAddressProbe {
    fn is_connected(&self) -> bool {
        match if_addrs::get_if_addrs() {
            Ok(interfaces) => {
                let connected: Vec<&str> = interfaces
                    .iter()
                    .filter(|interface| !interface.is_loopback())
                    .map(|interface| interface.name.as_str())
                    .collect();
                debug!(
                    "Connectivity probe: {} addressed non-loopback interfaces ({})",
                    connected.len(),
                    connected.join(", ")
                );
                !connected.is_empty()
            }
            Err(e) => {
                warn!("Failed to list interface addresses - assuming disconnected: {}", e);
                false
            }
        }
    }
}

/// Probe with a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl ConnectivityProbe for StaticProbe {
    fn is_connected(&self) -> bool {
        self.0
    }
}
