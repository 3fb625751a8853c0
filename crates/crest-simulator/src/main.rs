//! Desktop harness for the crest-rs sampling and detection core.
//!
//! Feeds a synthetic analog waveform through the real [`SamplingEngine`] so
//! the detector policies can be exercised without hardware. The waveform
//! sweeps across both thresholds, so every policy shows its behavior within
//! a few seconds.
//!
//! Usage: `crest-simulator [every|latched|indicator]` (default `latched`).

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use log::info;

use crest_core::{
    DetectionPolicy, Detector, DetectorConfig, NotificationSink, Reading, SampleSource,
    SamplingConfig, SamplingEngine, SinkEvent, Thresholds,
};

/// Samples requested per conversion cycle.
const SAMPLES_PER_CYCLE: usize = 10;

/// Interval between conversion cycles.
const CYCLE_INTERVAL: Duration = Duration::from_millis(150);

/// Synthetic analog source: a slow sine centered in the 10-bit range that
/// periodically rises above the upper threshold and dips below the lower
/// one.
struct WaveSource {
    elapsed_secs: f64,
}

impl WaveSource {
    fn new() -> Self {
        Self { elapsed_secs: 0.0 }
    }
}

impl SampleSource for WaveSource {
    type Error = Infallible;

    async fn start_cycle(&mut self, buf: &mut [Reading]) -> Result<usize, Self::Error> {
        let dt = CYCLE_INTERVAL.as_secs_f64() / buf.len() as f64;
        for slot in buf.iter_mut() {
            self.elapsed_secs += dt;
            let t = self.elapsed_secs;
            // 50..=550: sweeps across both default thresholds (100/512).
            let value = 300.0 + 250.0 * (t / 2.0).sin() + 10.0 * (t * 7.0).cos();
            *slot = value.clamp(0.0, 1023.0) as Reading;
        }
        Ok(buf.len())
    }
}

/// Sink that logs what a device would do: notifications as they happen,
/// indicator state only on transitions.
struct ConsoleSink {
    indicator_on: bool,
}

impl ConsoleSink {
    fn new() -> Self {
        Self { indicator_on: false }
    }
}

impl NotificationSink for ConsoleSink {
    type Error = Infallible;

    fn emit(&mut self, event: SinkEvent) -> Result<(), Self::Error> {
        match event {
            SinkEvent::Crossing(payload) => info!("NOTIF {payload}"),
            SinkEvent::Indicator(on) => {
                if on != self.indicator_on {
                    self.indicator_on = on;
                    info!("indicator {}", if on { "ON" } else { "OFF" });
                }
            }
        }
        Ok(())
    }
}

fn policy_from_args() -> DetectionPolicy {
    match std::env::args().nth(1).as_deref() {
        Some("every") => DetectionPolicy::EveryCrossing,
        Some("indicator") => DetectionPolicy::Indicator,
        Some("latched") | None => DetectionPolicy::Latched,
        Some(other) => {
            eprintln!("unknown policy {other:?}, expected every|latched|indicator");
            std::process::exit(2);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let policy = policy_from_args();
    let detector = Detector::new(DetectorConfig {
        policy,
        thresholds: Thresholds::DEFAULT,
    })
    .expect("default thresholds are valid");

    info!(
        "policy {:?}, thresholds {:?}, {} samples every {:?}",
        policy,
        detector.thresholds(),
        SAMPLES_PER_CYCLE,
        CYCLE_INTERVAL
    );

    let mut engine = SamplingEngine::<_, _, SAMPLES_PER_CYCLE>::new(
        WaveSource::new(),
        detector,
        ConsoleSink::new(),
        &SamplingConfig {
            interval_ms: CYCLE_INTERVAL.as_millis() as u64,
            samples_per_cycle: SAMPLES_PER_CYCLE,
        },
    );

    // The engine's own ticker needs an embassy time driver, so the host
    // schedules cycles with a plain sleep instead.
    loop {
        futures::executor::block_on(engine.run_cycle()).expect("synthetic cycle cannot fail");
        thread::sleep(CYCLE_INTERVAL);
    }
}
