//! Platform counter sources
//!
//! Linux reads `/proc/net/dev` directly. Every other platform, and Linux
//! hosts without procfs, use the sysinfo-backed portable source.

use log::info;
use std::sync::Arc;

use crate::collectors::sampler::CounterSource;

/// Linux `/proc/net/dev` reader
#[cfg(target_os = "linux")]
pub mod linux;

/// sysinfo-backed source for any platform
pub mod portable;

pub use portable::SysinfoCounterSource;

/// Whether an interface name denotes a loopback device
pub fn is_loopback_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name == "lo" || name == "lo0" || name.contains("loopback")
}

/// Picks the best counter source for the current host
pub fn default_counter_source() -> Arc<dyn CounterSource> {
    #[cfg(target_os = "linux")]
    {
        let source = linux::ProcNetDevSource::new();
        if source.is_available() {
            info!("Using /proc/net/dev counter source");
            return Arc::new(source);
        }
    }

    info!("Using sysinfo counter source");
    Arc::new(SysinfoCounterSource::new())
}
