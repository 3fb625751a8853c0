//! Periodic sampling engine: scheduler, conversion cycle, dispatch.
//!
//! A [`SamplingEngine`] ties the three collaborators together: each tick of
//! its internal ticker it runs one conversion cycle against the
//! [`SampleSource`], feeds every reading through the [`Detector`] in arrival
//! order, and hands any resulting event to the [`NotificationSink`]. All
//! state is owned by the engine; nothing is shared or static.

use core::convert::Infallible;
use core::fmt::Debug;
use core::future::Future;

use embassy_time::{Duration, Instant, Ticker};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::config::SamplingConfig;
use crate::detector::Detector;
use crate::sink::{NotificationSink, SinkEvent};

/// One analog sample. Signed to admit differential converters; a 10-bit
/// single-ended converter yields 0..=1023.
pub type Reading = i16;

/// Abstraction over the analog conversion peripheral.
///
/// The channel binding and timing/resolution setup happen when the concrete
/// source is constructed; a source that fails to initialize is a fatal
/// configuration error and never reaches the engine.
pub trait SampleSource {
    type Error;

    /// Run one conversion cycle, filling `buf` and returning the number of
    /// readings produced.
    ///
    /// Peripherals that need one trigger per sample rather than a
    /// free-running burst perform that pumping internally, one conversion
    /// per buffer slot.
    fn start_cycle(
        &mut self,
        buf: &mut [Reading],
    ) -> impl Future<Output = Result<usize, Self::Error>>;
}

/// Engine failure. Both variants are fatal: steady-state driver errors are
/// treated exactly like initialization errors, with no retry path.
#[derive(Error, Debug)]
pub enum EngineError<S: Debug, K: Debug> {
    #[error("sample source fault: {0:?}")]
    Source(S),
    #[error("notification sink fault: {0:?}")]
    Sink(K),
}

/// Timer-driven sampling and detection core.
///
/// `N` is the conversion buffer capacity; `config.samples_per_cycle` selects
/// how much of it each cycle actually uses (clamped to `N`).
pub struct SamplingEngine<S, K, const N: usize> {
    source: S,
    detector: Detector,
    sink: K,
    interval: Duration,
    samples_per_cycle: usize,
}

impl<S, K, const N: usize> SamplingEngine<S, K, N>
where
    S: SampleSource,
    S::Error: Debug,
    K: NotificationSink,
    K::Error: Debug,
{
    pub fn new(source: S, detector: Detector, sink: K, config: &SamplingConfig) -> Self {
        Self {
            source,
            detector,
            sink,
            interval: Duration::from_millis(config.interval_ms),
            samples_per_cycle: config.samples_per_cycle.clamp(1, N),
        }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Feed a batch of readings through the detector and dispatch the
    /// resulting events.
    ///
    /// This is the synchronous heart of a conversion cycle, split out so
    /// hosts and tests can drive the core without a timer or a real
    /// conversion peripheral.
    pub fn process(&mut self, readings: &[Reading]) -> Result<(), EngineError<S::Error, K::Error>> {
        for &reading in readings {
            debug!("adc: {reading}");
            if let Some(event) = self.detector.evaluate(reading) {
                if let SinkEvent::Crossing(payload) = event {
                    info!("threshold crossing, notifying with {payload}");
                }
                self.sink.emit(event).map_err(EngineError::Sink)?;
            }
        }
        Ok(())
    }

    /// Run one conversion cycle: acquire up to `samples_per_cycle` readings
    /// and process them. The buffer lives and dies within the cycle.
    pub async fn run_cycle(&mut self) -> Result<(), EngineError<S::Error, K::Error>> {
        let mut buf = [0 as Reading; N];
        let requested = self.samples_per_cycle;
        let filled = self
            .source
            .start_cycle(&mut buf[..requested])
            .await
            .map_err(EngineError::Source)?;
        debug_assert!(filled <= requested);
        self.process(&buf[..filled.min(requested)])
    }

    /// Run forever at the configured interval.
    ///
    /// Each tick runs exactly one conversion cycle to completion before the
    /// next can start; the interval is assumed to exceed the worst-case
    /// cycle time, and an overrun is logged rather than recovered. Any
    /// source or sink error aborts the loop and is fatal to the caller.
    pub async fn run(&mut self) -> Result<Infallible, EngineError<S::Error, K::Error>> {
        let mut ticker = Ticker::every(self.interval);
        loop {
            ticker.next().await;
            let started = Instant::now();
            self.run_cycle().await?;
            let elapsed = started.elapsed();
            if elapsed > self.interval {
                warn!(
                    "conversion cycle took {}ms, longer than the {}ms period",
                    elapsed.as_millis(),
                    self.interval.as_millis()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetectionPolicy, DetectorConfig, Thresholds};
    use heapless::Vec;

    /// Sink that records every event it is handed.
    #[derive(Default)]
    struct RecordingSink {
        events: Vec<SinkEvent, 32>,
    }

    impl NotificationSink for RecordingSink {
        type Error = Infallible;

        fn emit(&mut self, event: SinkEvent) -> Result<(), Self::Error> {
            self.events.push(event).unwrap();
            Ok(())
        }
    }

    /// Source that is never polled; `process` is driven directly.
    struct UnusedSource;

    impl SampleSource for UnusedSource {
        type Error = Infallible;

        async fn start_cycle(&mut self, _buf: &mut [Reading]) -> Result<usize, Self::Error> {
            Ok(0)
        }
    }

    fn engine(policy: DetectionPolicy) -> SamplingEngine<UnusedSource, RecordingSink, 10> {
        let detector = Detector::new(DetectorConfig {
            policy,
            thresholds: Thresholds::DEFAULT,
        })
        .unwrap();
        SamplingEngine::new(
            UnusedSource,
            detector,
            RecordingSink::default(),
            &SamplingConfig {
                interval_ms: 150,
                samples_per_cycle: 10,
            },
        )
    }

    #[test]
    fn latched_cycle_notifies_once_per_excursion() {
        let mut engine = engine(DetectionPolicy::Latched);
        engine
            .process(&[0, 0, 0, 0, 0, 600, 600, 50, 600, 0])
            .unwrap();
        assert_eq!(
            engine.sink.events.as_slice(),
            &[SinkEvent::Crossing(600), SinkEvent::Crossing(600)]
        );
        // The second excursion's payload is the last one recorded.
        assert_eq!(engine.detector().last_notified(), Some(600));
    }

    #[test]
    fn latch_carries_across_cycles() {
        let mut engine = engine(DetectionPolicy::Latched);
        engine.process(&[600]).unwrap();
        engine.process(&[600]).unwrap();
        // Still within one excursion: the second cycle must stay quiet.
        assert_eq!(engine.sink.events.len(), 1);

        engine.process(&[50]).unwrap();
        engine.process(&[600]).unwrap();
        assert_eq!(engine.sink.events.len(), 2);
    }

    #[test]
    fn every_crossing_cycle_floods_at_sample_rate() {
        let mut engine = engine(DetectionPolicy::EveryCrossing);
        engine.process(&[600, 600, 600]).unwrap();
        assert_eq!(engine.sink.events.len(), 3);
    }

    #[test]
    fn indicator_cycle_emits_per_sample() {
        let mut engine = engine(DetectionPolicy::Indicator);
        engine.process(&[600, 0, 513, 512]).unwrap();
        assert_eq!(
            engine.sink.events.as_slice(),
            &[
                SinkEvent::Indicator(true),
                SinkEvent::Indicator(false),
                SinkEvent::Indicator(true),
                SinkEvent::Indicator(false),
            ]
        );
    }

    #[test]
    fn samples_per_cycle_is_clamped_to_buffer_capacity() {
        let detector = Detector::new(DetectorConfig::default()).unwrap();
        let engine: SamplingEngine<UnusedSource, RecordingSink, 4> = SamplingEngine::new(
            UnusedSource,
            detector,
            RecordingSink::default(),
            &SamplingConfig {
                interval_ms: 150,
                samples_per_cycle: 100,
            },
        );
        assert_eq!(engine.samples_per_cycle, 4);
    }
}
