use log::{trace, warn};
use std::fs;
use std::path::PathBuf;

use super::is_loopback_name;
use crate::collectors::sampler::{CounterReading, CounterSource};
use crate::monitor::errors::MonitorError;

const PROC_NET_DEV: &str = "/proc/net/dev";

/// Aggregate counters read from `/proc/net/dev`
#[derive(Debug, Clone)]
pub struct ProcNetDevSource {
    path: PathBuf,
}

impl Default for ProcNetDevSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcNetDevSource {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(PROC_NET_DEV),
        }
    }

    /// Reads from an alternative file with the same layout
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether the counters file can be read on this host
    pub fn is_available(&self) -> bool {
        fs::metadata(&self.path).is_ok()
    }

    fn read(&self) -> Result<CounterReading, MonitorError> {
        let content = fs::read_to_string(&self.path)?;
        parse_proc_net_dev(&content)
    }
}

impl CounterSource for ProcNetDevSource {
    fn read_totals(&self) -> Option<CounterReading> {
        match self.read() {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        "proc-net-dev"
    }
}

/// Sums the receive and transmit byte columns of every non-loopback interface
///
/// Each data line looks like `  eth0: <rx bytes> <7 rx fields> <tx bytes> ...`.
/// The two header lines have no `:` before the counters and are skipped.
pub fn parse_proc_net_dev(content: &str) -> Result<CounterReading, MonitorError> {
    let mut total = CounterReading::default();
    let mut interfaces = 0;

    for line in content.lines() {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || name.contains('|') {
            continue;
        }

        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 9 {
            return Err(MonitorError::CounterFormat {
                origin: PROC_NET_DEV.to_string(),
                reason: format!("interface '{}' has {} counter fields, expected 16", name, fields.len()),
            });
        }

        let parse = |value: &str| {
            value.parse::<u64>().map_err(|e| MonitorError::CounterFormat {
                origin: PROC_NET_DEV.to_string(),
                reason: format!("invalid counter '{}' for interface '{}': {}", value, name, e),
            })
        };
        let rx_bytes = parse(fields[0])?;
        let tx_bytes = parse(fields[8])?;

        if is_loopback_name(name) {
            trace!("Skipping loopback interface '{}'", name);
            continue;
        }

        total.rx_bytes = total.rx_bytes.saturating_add(rx_bytes);
        total.tx_bytes = total.tx_bytes.saturating_add(tx_bytes);
        interfaces += 1;
    }

    trace!(
        "Parsed {} interfaces from {}: rx={} bytes, tx={} bytes",
        interfaces, PROC_NET_DEV, total.rx_bytes, total.tx_bytes
    );
    Ok(total)
}
