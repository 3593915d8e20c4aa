//! Command handlers for `watch`, `status` and `levels`

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use kaipo_meter::collectors::{
    ConnectivityProbe, Direction, InterfaceAddressProbe, Measurement, MonotonicClock, RateSampler,
    TrafficReport, default_counter_source,
};
use kaipo_meter::display::{ThroughputText, format_bytes, format_rate};
use kaipo_meter::monitor::errors::log_error_event;
use kaipo_meter::monitor::{
    ChannelObserver, Level, MonitorEvent, ObserverGate, ObserverRef, TrafficMonitor,
};
use kaipo_meter::settings::MonitorSettings;

use crate::cli::commands::SettingsArgs;

/// How often `watch` re-checks connectivity and re-reads its settings file
const RECHECK_INTERVAL: Duration = Duration::from_secs(5);

const MIN_MEASUREMENT_SECS: u64 = 1;
const MAX_MEASUREMENT_SECS: u64 = 60;

/// Builds the sampler over the best counter source for this host
pub fn system_sampler() -> RateSampler {
    RateSampler::new(default_counter_source(), Arc::new(MonotonicClock::new()))
}

/// Creates the monitor over the host's counters, logging construction failures
pub fn system_monitor(settings: &MonitorSettings, context: &str) -> Result<TrafficMonitor> {
    TrafficMonitor::new(system_sampler(), settings)
        .inspect_err(|e| log_error_event(e, context))
        .context("Failed to create traffic monitor")
}

/// What a re-read of the settings means for a running watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReloadPlan {
    /// Whether any consumer (meter or text) is still enabled
    enabled: bool,
    /// Interval, thresholds or direction changed, so the monitor is rebuilt
    rebuild_monitor: bool,
}

fn plan_reload(current: &MonitorSettings, reloaded: &MonitorSettings) -> ReloadPlan {
    ReloadPlan {
        enabled: reloaded.meter_enabled || reloaded.text_enabled,
        rebuild_monitor: current.effective_interval() != reloaded.effective_interval()
            || current.thresholds != reloaded.thresholds
            || current.direction != reloaded.direction,
    }
}

fn resolve_watch_settings(args: &SettingsArgs, text: bool) -> Result<MonitorSettings> {
    let mut settings = args.resolve()?;
    if text {
        settings.text_enabled = true;
    }
    Ok(settings)
}

/// Runs the monitor until Ctrl-C, printing level changes and optionally text
///
/// With a settings file, the file is re-read alongside the connectivity
/// check: enabling or disabling both consumers gates the observer, display
/// settings apply on the next tick and monitor settings rebuild the monitor.
pub async fn handle_watch(args: &SettingsArgs, text: bool) -> Result<()> {
    let mut settings = resolve_watch_settings(args, text)?;
    let enabled = settings.meter_enabled || settings.text_enabled;
    if !enabled && args.config.is_none() {
        warn!("Both the meter and the throughput text are disabled - nothing to watch");
        println!("Nothing to watch: meter_enabled and text_enabled are both false.");
        return Ok(());
    }

    let mut monitor = system_monitor(&settings, "watch")?;
    let mut quantizer = monitor.quantizer().clone();
    let mut renderer = ThroughputText::from_settings(&settings);

    let (observer, mut events) = ChannelObserver::new();
    let observer: ObserverRef = Arc::new(observer);
    let mut gate = ObserverGate::new(monitor.clone(), observer.clone(), enabled);
    let probe = InterfaceAddressProbe;

    info!(
        "Watching traffic (interval={}ms, direction={:?}, text={})",
        monitor.interval().as_millis(),
        monitor.direction(),
        settings.text_enabled
    );
    println!(
        "Watching {} traffic every {}ms (levels 0-{}). Press Ctrl-C to stop.",
        direction_label(monitor.direction()),
        monitor.interval().as_millis(),
        quantizer.max_level()
    );
    if !enabled {
        println!("Meter and text are disabled - waiting for the settings file to enable one.");
    }

    gate.attach();
    let mut connected = probe.is_connected();
    gate.set_connected(connected);
    if !connected {
        println!("No network connectivity - waiting for an interface to come up.");
    }

    let mut recheck = tokio::time::interval(RECHECK_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut previous = Level::ZERO;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Ctrl-C received - stopping watch");
                break;
            }
            _ = recheck.tick() => {
                let now_connected = probe.is_connected();
                gate.set_connected(now_connected);
                if now_connected != connected {
                    info!("Connectivity changed: connected={}", now_connected);
                    println!(
                        "{} {}",
                        timestamp(),
                        if now_connected { "connected - monitoring resumed" } else { "disconnected - monitoring paused" }
                    );
                    connected = now_connected;
                }

                if args.config.is_none() {
                    continue;
                }
                let reloaded = match resolve_watch_settings(args, text) {
                    Ok(reloaded) => reloaded,
                    Err(e) => {
                        warn!("Keeping current settings: {:#}", e);
                        continue;
                    }
                };
                if reloaded == settings {
                    continue;
                }

                let plan = plan_reload(&settings, &reloaded);
                info!("Settings changed (enabled={}, rebuild_monitor={})", plan.enabled, plan.rebuild_monitor);
                if plan.rebuild_monitor {
                    match system_monitor(&reloaded, "watch reload") {
                        Ok(rebuilt) => {
                            gate.detach();
                            monitor = rebuilt;
                            quantizer = monitor.quantizer().clone();
                            gate = ObserverGate::new(monitor.clone(), observer.clone(), plan.enabled);
                            gate.set_connected(connected);
                            gate.attach();
                            previous = Level::ZERO;
                            println!(
                                "{} settings reloaded - watching {} traffic every {}ms",
                                timestamp(),
                                direction_label(monitor.direction()),
                                monitor.interval().as_millis()
                            );
                        }
                        Err(e) => {
                            warn!("Keeping current settings: {:#}", e);
                            continue;
                        }
                    }
                } else {
                    gate.set_enabled(plan.enabled);
                }
                renderer = ThroughputText::from_settings(&reloaded);
                settings = reloaded;
            }
            Some(event) = events.recv() => match event {
                MonitorEvent::Level(level) => {
                    if settings.meter_enabled {
                        let floor = quantizer.lower_bound(level).unwrap_or(0);
                        println!(
                            "{} level {} -> {} (>= {})",
                            timestamp(),
                            previous,
                            level,
                            format_rate(floor, settings.unit)
                        );
                    }
                    previous = level;
                }
                MonitorEvent::Report(report) => {
                    if !settings.text_enabled {
                        continue;
                    }
                    if let Some(line) = renderer.render_inline(&report) {
                        println!("{} {}", timestamp(), line);
                    }
                }
            },
        }
    }

    gate.detach();
    debug!("Watch finished after {} ticks", monitor.tick_count());
    Ok(())
}

/// Serialized form of a one-shot measurement
#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    source: &'a str,
    direction: Direction,
    measurement_seconds: u64,
    total_received_bytes: u64,
    total_sent_bytes: u64,
    max_level: Level,
    report: TrafficReport,
}

/// Measures throughput once between two samples
pub async fn handle_status(
    settings: MonitorSettings,
    measurement_duration: u64,
    json: bool,
) -> Result<()> {
    let seconds = measurement_duration.clamp(MIN_MEASUREMENT_SECS, MAX_MEASUREMENT_SECS);
    if seconds != measurement_duration {
        warn!(
            "Measurement duration {}s outside {}..={}s - using {}s",
            measurement_duration, MIN_MEASUREMENT_SECS, MAX_MEASUREMENT_SECS, seconds
        );
    }

    let quantizer = settings.quantizer().context("Invalid threshold table")?;
    let sampler = system_sampler();

    let first = sampler.sample();
    debug!("Status baseline: {:?}", first);
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    let second = sampler.sample_or(&first);
    debug!("Status second sample: {:?}", second);

    let measured = Measurement::between(&first, &second, settings.direction)
        .context("Samples were taken less than one second apart")?;
    let level = quantizer.quantize(measured.rate_bytes_per_sec);
    let report = TrafficReport::between(&first, &second, level)
        .context("Samples were taken less than one second apart")?;

    if json {
        let status = StatusReport {
            source: sampler.source_name(),
            direction: settings.direction,
            measurement_seconds: seconds,
            total_received_bytes: second.rx_bytes,
            total_sent_bytes: second.tx_bytes,
            max_level: quantizer.max_level(),
            report,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?
        );
        return Ok(());
    }

    println!("Traffic Status");
    println!("==============");
    println!("Source:      {}", sampler.source_name());
    println!("Measured:    {}s", seconds);
    println!(
        "Download:    {}",
        format_rate(report.download.rate_bytes_per_sec, settings.unit)
    );
    println!(
        "Upload:      {}",
        format_rate(report.upload.rate_bytes_per_sec, settings.unit)
    );
    println!(
        "Level:       {} / {} ({})",
        level,
        quantizer.max_level(),
        direction_label(settings.direction)
    );
    println!(
        "Totals:      ↓ {} ↑ {}",
        format_bytes(second.rx_bytes),
        format_bytes(second.tx_bytes)
    );

    Ok(())
}

/// Prints the threshold table with the lower bound of every level
pub fn handle_levels(settings: &MonitorSettings) -> Result<()> {
    let quantizer = settings.quantizer().context("Invalid threshold table")?;

    println!("Level  From");
    println!("-----  ----");
    println!("{:>5}  idle", Level::ZERO.value());
    for (index, threshold) in quantizer.thresholds().iter().enumerate() {
        println!(
            "{:>5}  {} ({} B/s)",
            index + 1,
            format_rate(*threshold, settings.unit),
            threshold
        );
    }

    Ok(())
}

fn timestamp() -> String {
    Local::now().format("[%H:%M:%S]").to_string()
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Down => "download",
        Direction::Up => "upload",
        Direction::Both => "download + upload",
    }
}
