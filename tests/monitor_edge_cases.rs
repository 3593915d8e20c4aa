use kaipo_meter::collectors::{
    ConnectivityProbe, Direction, ManualClock, ManualCounterSource, Measurement, RateSampler,
    Sample, StaticProbe,
};
use kaipo_meter::display::{ThroughputText, UnitMode};
use kaipo_meter::monitor::{
    ChannelObserver, Level, LevelObserver, LevelQuantizer, MonitorError, MonitorEvent, ObserverGate,
    ObserverRef, TickOutcome, TrafficMonitor, quantize,
};
use kaipo_meter::settings::MonitorSettings;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test edge cases and error conditions in the traffic monitor

struct Counter {
    calls: AtomicUsize,
}

impl LevelObserver for Counter {
    fn on_level_changed(&self, _level: Level) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_quantize_is_monotonic_over_default_table() {
    let quantizer = LevelQuantizer::default();
    let mut previous = Level::ZERO;
    for rate in (0..2_000_000u64).step_by(997) {
        let level = quantizer.quantize(rate);
        assert!(level >= previous, "Level must not drop as the rate grows ({})", rate);
        assert!(level <= quantizer.max_level());
        previous = level;
    }
    assert_eq!(quantize(0, quantizer.thresholds()), Level::ZERO);
    assert_eq!(quantizer.quantize(u64::MAX), quantizer.max_level());
}

#[test]
fn test_invalid_threshold_tables_are_rejected() {
    assert!(matches!(
        LevelQuantizer::new(vec![]),
        Err(MonitorError::InvalidThresholds { .. })
    ));
    assert!(matches!(
        LevelQuantizer::new(vec![10, 10]),
        Err(MonitorError::InvalidThresholds { .. })
    ));
    assert!(matches!(
        LevelQuantizer::new(vec![100, 50]),
        Err(MonitorError::InvalidThresholds { .. })
    ));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let sampler = RateSampler::new(
        Arc::new(ManualCounterSource::default()),
        Arc::new(ManualClock::new(0)),
    );
    let settings = MonitorSettings {
        thresholds: vec![5, 1],
        ..MonitorSettings::default()
    };
    assert!(TrafficMonitor::with_runtime(runtime.handle().clone(), sampler, &settings).is_err());
}

#[test]
fn test_counter_wrap_reads_as_zero_rate() {
    let previous = Sample::new(1_000_000, 0, 10_000);
    let current = Sample::new(500_000, 0, 12_000);
    let measurement =
        Measurement::between(&previous, &current, Direction::Down).expect("two seconds apart");
    assert_eq!(measurement.delta_bytes, 0);
    assert_eq!(measurement.rate_bytes_per_sec, 0);
}

#[test]
fn test_clock_going_backwards_is_skipped() {
    let previous = Sample::new(0, 0, 5_000);
    let current = Sample::new(1_000, 0, 4_000);
    assert!(Measurement::between(&previous, &current, Direction::Down).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_monitor_stops_polling_and_releases_observers() {
    let source = Arc::new(ManualCounterSource::new(0, 0).with_step(10_000, 0));
    let sampler = RateSampler::new(source.clone(), Arc::new(ManualClock::new(0)));
    let monitor = TrafficMonitor::new(sampler, &MonitorSettings::default()).unwrap();

    let (observer, mut events) = ChannelObserver::new();
    monitor.add_observer(Arc::new(observer));
    drop(monitor);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.read_count(), 1, "Only the baseline may have been read");
    assert!(events.recv().await.is_none(), "Observer should be released");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_registration_from_many_threads() {
    let source = Arc::new(ManualCounterSource::new(0, 0));
    let sampler = RateSampler::new(source, Arc::new(ManualClock::new(0)));
    let monitor = TrafficMonitor::new(sampler, &MonitorSettings::default()).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let monitor = monitor.clone();
            std::thread::spawn(move || {
                let observer: ObserverRef = Arc::new(Counter {
                    calls: AtomicUsize::new(0),
                });
                for _ in 0..200 {
                    assert!(monitor.add_observer(observer.clone()));
                    assert!(monitor.remove_observer(&observer));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("registration thread panicked");
    }

    assert_eq!(monitor.observer_count(), 0);
    assert!(!monitor.is_running());
    assert_eq!(monitor.tick_now(), TickOutcome::Idle);
}

#[test]
fn test_gate_follows_connectivity_probe() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let sampler = RateSampler::new(
        Arc::new(ManualCounterSource::default()),
        Arc::new(ManualClock::new(0)),
    );
    let monitor =
        TrafficMonitor::with_runtime(runtime.handle().clone(), sampler, &MonitorSettings::default())
            .unwrap();
    let counter = Arc::new(Counter {
        calls: AtomicUsize::new(0),
    });
    let gate = ObserverGate::new(monitor.clone(), counter, true);
    gate.attach();

    for probe in [StaticProbe(false), StaticProbe(true), StaticProbe(false)] {
        let visible = gate.set_connected(probe.is_connected());
        assert_eq!(visible, probe.is_connected());
        assert_eq!(monitor.is_running(), probe.is_connected());
    }
}

#[test]
fn test_settings_file_drives_monitor() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        "interval_ms = 1000\nthresholds = [1, 5120, 25600]\ndirection = \"both\"\nunit = \"bytes\""
    )
    .unwrap();

    let settings = MonitorSettings::load(Some(file.path())).unwrap();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let source = Arc::new(ManualCounterSource::new(0, 0));
    let clock = Arc::new(ManualClock::new(0));
    let sampler = RateSampler::new(source.clone(), clock.clone());
    let monitor = TrafficMonitor::with_runtime(runtime.handle().clone(), sampler, &settings).unwrap();

    assert_eq!(monitor.interval(), Duration::from_millis(1_000));
    assert_eq!(monitor.thresholds(), &[1, 5120, 25600]);

    let (observer, mut events) = ChannelObserver::new();
    monitor.add_observer(Arc::new(observer));
    source.add(6_000, 6_000);
    clock.advance(1_000);
    assert_eq!(
        monitor.tick_now(),
        TickOutcome::Changed {
            from: Level::ZERO,
            to: Level::new(2),
            notified: 1,
        }
    );

    let text = ThroughputText::from_settings(&settings);
    match events.try_recv().unwrap() {
        MonitorEvent::Report(report) => {
            assert_eq!(text.unit, UnitMode::Bytes);
            assert_eq!(text.render(&report).as_deref(), Some("5.9kB/s\n5.9kB/s"));
        }
        other => panic!("Expected a report, got {:?}", other),
    }
}

#[test]
fn test_packed_state_decodes_into_monitor_settings() {
    // meter + text + up + down, byte units, 1500ms
    let state = (1500u32 << 16) | 0xF;
    let settings = MonitorSettings::from_packed_state(state);
    assert!(settings.meter_enabled);
    assert!(settings.text_enabled);
    assert_eq!(settings.direction, Direction::Both);
    assert_eq!(settings.unit, UnitMode::Bytes);
    assert_eq!(settings.effective_interval(), Duration::from_millis(1_500));
}
