//! Threshold-crossing detection.
//!
//! The detector consumes readings one at a time, in arrival order, and
//! decides whether each one warrants a sink event. Its only persistent state
//! is the `triggered` latch used by [`DetectionPolicy::Latched`]: once a
//! notification has been sent for an excursion above the upper threshold,
//! further elevated readings are suppressed until the signal falls below the
//! lower threshold. The dual-threshold band debounces noise hovering near a
//! single cutoff.

use log::trace;

use crate::config::{DetectionPolicy, DetectorConfig, InvalidThresholds, Thresholds};
use crate::sampling::Reading;
use crate::sink::SinkEvent;

/// Evaluates readings against a threshold band under a configured policy.
///
/// One instance is owned by the sampling engine and lives for the process
/// lifetime; it is the single writer of its own state.
#[derive(Debug, Clone)]
pub struct Detector {
    policy: DetectionPolicy,
    thresholds: Thresholds,
    /// Latch: the current excursion above `upper` has already notified.
    triggered: bool,
    /// Payload of the most recent notification, overwritten each time.
    last_notified: Option<Reading>,
}

impl Detector {
    /// Build a detector from validated configuration.
    ///
    /// Fails if the threshold band is inverted; callers treat this as a
    /// fatal configuration error.
    pub fn new(config: DetectorConfig) -> Result<Self, InvalidThresholds> {
        config.thresholds.validate()?;
        Ok(Self {
            policy: config.policy,
            thresholds: config.thresholds,
            triggered: false,
            last_notified: None,
        })
    }

    pub fn policy(&self) -> DetectionPolicy {
        self.policy
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Whether the latch is currently set.
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Payload of the most recent notification, if any was ever emitted.
    pub fn last_notified(&self) -> Option<Reading> {
        self.last_notified
    }

    /// Evaluate one reading and return the sink event it produces, if any.
    ///
    /// Comparisons are strict on both edges: a reading equal to `upper`
    /// never triggers and a reading equal to `lower` never re-arms. When a
    /// buffer holds several qualifying readings, later evaluations overwrite
    /// the transient state of earlier ones, so the last qualifying reading
    /// in the buffer determines the final payload.
    pub fn evaluate(&mut self, reading: Reading) -> Option<SinkEvent> {
        let Thresholds { lower, upper } = self.thresholds;
        match self.policy {
            DetectionPolicy::EveryCrossing => {
                (reading > upper).then(|| self.notify(reading))
            }
            DetectionPolicy::Latched => {
                if reading > upper {
                    if self.triggered {
                        // Already notified for this excursion.
                        None
                    } else {
                        self.triggered = true;
                        Some(self.notify(reading))
                    }
                } else if reading < lower {
                    // Re-arm. Idempotent when already un-triggered.
                    if self.triggered {
                        trace!("signal fell below {lower}, re-armed");
                    }
                    self.triggered = false;
                    None
                } else {
                    // In-band: expected steady state, no transition.
                    None
                }
            }
            DetectionPolicy::Indicator => Some(SinkEvent::Indicator(reading > upper)),
        }
    }

    fn notify(&mut self, reading: Reading) -> SinkEvent {
        self.last_notified = Some(reading);
        SinkEvent::Crossing(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    fn detector(policy: DetectionPolicy) -> Detector {
        Detector::new(DetectorConfig {
            policy,
            thresholds: Thresholds::DEFAULT,
        })
        .unwrap()
    }

    fn crossings(detector: &mut Detector, readings: &[Reading]) -> Vec<Reading, 16> {
        readings
            .iter()
            .filter_map(|&r| match detector.evaluate(r) {
                Some(SinkEvent::Crossing(payload)) => Some(payload),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn inverted_band_is_rejected() {
        let config = DetectorConfig {
            policy: DetectionPolicy::Latched,
            thresholds: Thresholds { lower: 512, upper: 100 },
        };
        assert!(Detector::new(config).is_err());
    }

    #[test]
    fn every_crossing_notifies_per_elevated_reading() {
        let mut d = detector(DetectionPolicy::EveryCrossing);
        let emitted = crossings(&mut d, &[600, 600, 300, 513, 512, 0]);
        // One notification per reading above 512, including consecutive ones.
        assert_eq!(emitted.as_slice(), &[600, 600, 513]);
    }

    #[test]
    fn latched_suppresses_repeats_within_one_excursion() {
        let mut d = detector(DetectionPolicy::Latched);
        let emitted = crossings(&mut d, &[600, 600, 600]);
        assert_eq!(emitted.as_slice(), &[600]);
        assert!(d.is_triggered());
    }

    #[test]
    fn latched_rearms_after_drop_below_lower() {
        let mut d = detector(DetectionPolicy::Latched);
        let emitted = crossings(&mut d, &[600, 50, 600]);
        assert_eq!(emitted.as_slice(), &[600, 600]);
    }

    #[test]
    fn equality_at_either_threshold_is_not_a_transition() {
        let mut d = detector(DetectionPolicy::Latched);
        // Exactly upper never triggers.
        assert_eq!(d.evaluate(512), None);
        assert!(!d.is_triggered());

        // Trigger, then exactly lower does not re-arm...
        assert_eq!(d.evaluate(600), Some(SinkEvent::Crossing(600)));
        assert_eq!(d.evaluate(100), None);
        assert!(d.is_triggered());
        // ...but one below does.
        assert_eq!(d.evaluate(99), None);
        assert!(!d.is_triggered());
    }

    #[test]
    fn rearm_is_idempotent() {
        let mut d = detector(DetectionPolicy::Latched);
        assert!(!d.is_triggered());
        for _ in 0..3 {
            assert_eq!(d.evaluate(0), None);
            assert!(!d.is_triggered());
        }
    }

    #[test]
    fn in_band_readings_leave_state_untouched() {
        let mut d = detector(DetectionPolicy::Latched);
        assert_eq!(d.evaluate(600), Some(SinkEvent::Crossing(600)));
        assert_eq!(d.evaluate(300), None);
        assert!(d.is_triggered(), "in-band reading must not re-arm");
    }

    #[test]
    fn last_qualifying_reading_wins_within_a_buffer() {
        let mut d = detector(DetectionPolicy::EveryCrossing);
        let emitted = crossings(&mut d, &[520, 700, 650]);
        assert_eq!(emitted.last(), Some(&650));
        assert_eq!(d.last_notified(), Some(650));
    }

    #[test]
    fn indicator_tracks_instantaneous_comparison() {
        let mut d = detector(DetectionPolicy::Indicator);
        assert_eq!(d.evaluate(600), Some(SinkEvent::Indicator(true)));
        assert_eq!(d.evaluate(512), Some(SinkEvent::Indicator(false)));
        assert_eq!(d.evaluate(0), Some(SinkEvent::Indicator(false)));
        assert_eq!(d.evaluate(513), Some(SinkEvent::Indicator(true)));
        // No latching under the indicator policy.
        assert!(!d.is_triggered());
    }

    #[test]
    fn ten_sample_cycle_end_to_end() {
        let mut d = detector(DetectionPolicy::Latched);
        let buffer = [0, 0, 0, 0, 0, 600, 600, 50, 600, 0];
        let mut emitted_at = Vec::<(usize, Reading), 16>::new();
        for (index, &reading) in buffer.iter().enumerate() {
            if let Some(SinkEvent::Crossing(payload)) = d.evaluate(reading) {
                emitted_at.push((index, payload)).unwrap();
            }
        }
        // Index 6 is suppressed (already triggered); index 9 is below lower
        // and only re-arms.
        assert_eq!(emitted_at.as_slice(), &[(5, 600), (8, 600)]);
    }
}
