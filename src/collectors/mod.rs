//! Counter collection
//!
//! - `sample`: samples, per-direction measurements and per-tick reports
//! - `sampler`: counter source and clock traits, and the sampler pairing them
//! - `platform`: system counter sources
//! - `connectivity`: whether the device has a usable network

pub mod connectivity;
pub mod platform;
pub mod sample;
pub mod sampler;

pub use connectivity::{ConnectivityProbe, InterfaceAddressProbe, StaticProbe};
pub use platform::{SysinfoCounterSource, default_counter_source};
pub use sample::{Direction, Measurement, Sample, TrafficReport};
pub use sampler::{
    Clock, CounterReading, CounterSource, ManualClock, ManualCounterSource, MonotonicClock,
    RateSampler,
};
