//! Tests for starting and stopping the monitor through observer registration

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::collectors::sample::Sample;
    use crate::collectors::sampler::{ManualClock, ManualCounterSource, RateSampler};
    use crate::monitor::errors::MonitorError;
    use crate::monitor::gate::ObserverGate;
    use crate::monitor::quantizer::Level;
    use crate::monitor::tests::{Fixture, Recorder, as_observer};
    use crate::monitor::traffic_monitor::{TickOutcome, TrafficMonitor};
    use crate::settings::MonitorSettings;

    #[test]
    fn test_idle_until_first_observer() {
        let fixture = Fixture::new(MonitorSettings::default());

        assert!(!fixture.monitor.is_running());
        assert_eq!(fixture.monitor.observer_count(), 0);
        assert_eq!(fixture.source.read_count(), 0);
        assert_eq!(fixture.monitor.tick_now(), TickOutcome::Idle);
        assert_eq!(fixture.source.read_count(), 0);
    }

    #[test]
    fn test_first_observer_takes_baseline() {
        let fixture =
            Fixture::with_source(MonitorSettings::default(), ManualCounterSource::new(4_000, 900));
        fixture.clock.set(12_000);

        let recorder = Recorder::shared();
        assert!(fixture.monitor.add_observer(as_observer(&recorder)));

        assert!(fixture.monitor.is_running());
        assert_eq!(fixture.source.read_count(), 1);
        assert_eq!(fixture.monitor.last_sample(), Sample::new(4_000, 900, 12_000));
        assert_eq!(fixture.monitor.current_level(), Level::ZERO);
        assert!(recorder.levels().is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let fixture = Fixture::new(MonitorSettings::default());
        let recorder = Recorder::shared();

        assert!(fixture.monitor.add_observer(as_observer(&recorder)));
        assert!(!fixture.monitor.add_observer(as_observer(&recorder)));

        assert_eq!(fixture.monitor.observer_count(), 1);
        assert_eq!(fixture.source.read_count(), 1);
    }

    #[test]
    fn test_second_observer_does_not_restart() {
        let fixture = Fixture::new(MonitorSettings::default());
        let first = Recorder::shared();
        let second = Recorder::shared();

        fixture.monitor.add_observer(as_observer(&first));
        fixture.clock.advance(700);
        fixture.monitor.add_observer(as_observer(&second));

        assert_eq!(fixture.monitor.observer_count(), 2);
        assert_eq!(fixture.source.read_count(), 1);
        assert_eq!(fixture.monitor.last_sample().timestamp_ms, 0);
    }

    #[test]
    fn test_removing_last_observer_stops() {
        let fixture = Fixture::new(MonitorSettings::default());
        let first = Recorder::shared();
        let second = Recorder::shared();

        fixture.monitor.add_observer(as_observer(&first));
        fixture.monitor.add_observer(as_observer(&second));

        assert!(fixture.monitor.remove_observer(&as_observer(&first)));
        assert!(fixture.monitor.is_running());

        assert!(fixture.monitor.remove_observer(&as_observer(&second)));
        assert!(!fixture.monitor.is_running());

        let reads = fixture.source.read_count();
        fixture.clock.advance(5_000);
        assert_eq!(fixture.monitor.tick_now(), TickOutcome::Idle);
        assert_eq!(fixture.source.read_count(), reads);
    }

    #[test]
    fn test_remove_unknown_observer() {
        let fixture = Fixture::new(MonitorSettings::default());
        let registered = Recorder::shared();
        let stranger = Recorder::shared();

        fixture.monitor.add_observer(as_observer(&registered));
        assert!(!fixture.monitor.remove_observer(&as_observer(&stranger)));
        assert!(fixture.monitor.is_running());
        assert_eq!(fixture.monitor.observer_count(), 1);
    }

    #[test]
    fn test_restart_takes_fresh_baseline_and_resets_level() {
        let fixture = Fixture::new(MonitorSettings::default());
        let recorder = Recorder::shared();

        fixture.monitor.add_observer(as_observer(&recorder));
        fixture.source.add(60_000, 0);
        fixture.clock.advance(2_000);
        assert!(matches!(
            fixture.monitor.tick_now(),
            TickOutcome::Changed { .. }
        ));
        assert_ne!(fixture.monitor.current_level(), Level::ZERO);

        fixture.monitor.remove_observer(&as_observer(&recorder));
        fixture.source.add(1_000_000, 0);
        fixture.clock.advance(60_000);

        fixture.monitor.add_observer(as_observer(&recorder));
        assert_eq!(fixture.monitor.current_level(), Level::ZERO);
        assert_eq!(
            fixture.monitor.last_sample(),
            Sample::new(1_060_000, 0, 62_000)
        );

        // Traffic from the stopped period is not attributed to the new run
        fixture.clock.advance(2_000);
        assert_eq!(
            fixture.monitor.tick_now(),
            TickOutcome::Unchanged(Level::ZERO)
        );
    }

    #[test]
    fn test_gate_registers_only_when_attached_enabled_and_connected() {
        let fixture = Fixture::new(MonitorSettings::default());
        let recorder = Recorder::shared();
        let gate = ObserverGate::new(fixture.monitor.clone(), as_observer(&recorder), true);

        assert!(!gate.attach());
        assert!(!gate.is_registered());
        assert!(!fixture.monitor.is_running());

        assert!(gate.set_connected(true));
        assert!(gate.is_registered());
        assert!(fixture.monitor.is_running());

        assert!(!gate.set_enabled(false));
        assert!(!gate.is_registered());
        assert!(!fixture.monitor.is_running());

        assert!(gate.set_enabled(true));
        assert!(fixture.monitor.is_running());

        assert!(gate.detach());
        assert!(!fixture.monitor.is_running());
        assert!(gate.is_visible());
    }

    #[test]
    fn test_gate_repeated_signal_is_harmless() {
        let fixture = Fixture::new(MonitorSettings::default());
        let recorder = Recorder::shared();
        let gate = ObserverGate::new(fixture.monitor.clone(), as_observer(&recorder), true);

        gate.attach();
        gate.set_connected(true);
        gate.set_connected(true);
        gate.attach();

        assert_eq!(fixture.monitor.observer_count(), 1);
        assert_eq!(fixture.source.read_count(), 1);
    }

    #[test]
    fn test_dropping_gate_unregisters() {
        let fixture = Fixture::new(MonitorSettings::default());
        let recorder = Recorder::shared();
        {
            let gate = ObserverGate::new(fixture.monitor.clone(), as_observer(&recorder), true);
            gate.attach();
            gate.set_connected(true);
            assert!(fixture.monitor.is_running());
        }
        assert_eq!(fixture.monitor.observer_count(), 0);
        assert!(!fixture.monitor.is_running());
    }

    #[test]
    fn test_registration_from_foreign_thread() {
        let fixture = Fixture::new(MonitorSettings::default());
        let monitor = fixture.monitor.clone();
        let recorder = Recorder::shared();
        let observer = as_observer(&recorder);

        std::thread::spawn(move || monitor.add_observer(observer))
            .join()
            .unwrap();

        assert!(fixture.monitor.is_running());
        assert_eq!(fixture.monitor.observer_count(), 1);
    }

    #[test]
    fn test_monitor_without_runtime() {
        let source = Arc::new(ManualCounterSource::new(0, 0));
        let clock = Arc::new(ManualClock::new(0));
        let sampler = RateSampler::new(source, clock);

        let result = TrafficMonitor::new(sampler, &MonitorSettings::default());
        assert!(matches!(result, Err(MonitorError::NoRuntime)));
    }
}
