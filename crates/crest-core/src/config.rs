//! Configuration for the sampling engine, detector, and radio identity.
//!
//! Everything in here is fixed at initialization; nothing is mutated at
//! runtime. Radio values are passed through to the wireless stack unchanged.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::sampling::Reading;

/// Periodic sampling schedule.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Interval between conversion cycles, in milliseconds.
    ///
    /// Must exceed the worst-case time of one conversion cycle; the engine
    /// logs a warning when a cycle overruns it.
    pub interval_ms: u64,
    /// Number of conversions requested per cycle.
    ///
    /// Deployments run this at 1 (lowest latency) or 10 (one notification
    /// decision per batch, last qualifying sample wins).
    pub samples_per_cycle: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 150,
            samples_per_cycle: 1,
        }
    }
}

/// How the detector reacts to readings crossing the upper threshold.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionPolicy {
    /// Notify on every reading above the upper threshold. No state is kept,
    /// so a signal that stays elevated notifies at the full sampling rate.
    EveryCrossing,
    /// Notify once per excursion above the upper threshold; the detector
    /// re-arms only after the signal falls below the lower threshold.
    #[default]
    Latched,
    /// Drive a binary indicator from the instantaneous comparison,
    /// sample by sample. Never notifies.
    Indicator,
}

/// Invalid threshold pair: hysteresis requires `lower < upper`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid thresholds: lower ({lower}) must be below upper ({upper})")]
pub struct InvalidThresholds {
    pub lower: Reading,
    pub upper: Reading,
}

/// The hysteresis band. Comparisons are strict: a reading equal to `upper`
/// does not trigger, a reading equal to `lower` does not re-arm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub lower: Reading,
    pub upper: Reading,
}

impl Thresholds {
    /// Default band for a 10-bit converter (readings 0..=1023).
    pub const DEFAULT: Self = Self {
        lower: 100,
        upper: 512,
    };

    pub fn new(lower: Reading, upper: Reading) -> Result<Self, InvalidThresholds> {
        let thresholds = Self { lower, upper };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Check the `lower < upper` invariant.
    pub fn validate(&self) -> Result<(), InvalidThresholds> {
        if self.lower < self.upper {
            Ok(())
        } else {
            Err(InvalidThresholds {
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Detector configuration: policy plus the threshold band it evaluates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectorConfig {
    pub policy: DetectionPolicy,
    pub thresholds: Thresholds,
}

/// Identity and timing handed to the wireless stack.
///
/// The core does not interpret any of these values; they are forwarded to
/// the BLE host verbatim (advertising payload, GAP name, connection
/// parameter bounds).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct RadioConfig<'a> {
    /// GAP device name, used in advertisements if there is room.
    pub device_name: &'a str,
    /// 128-bit primary service UUID, big-endian.
    pub service_uuid: [u8; 16],
    /// 16-bit UUID of the level characteristic.
    pub characteristic_uuid: u16,
    /// Advertising interval, milliseconds.
    pub adv_interval_ms: u32,
    /// Connection interval bounds requested from the central, milliseconds.
    pub min_conn_interval_ms: u32,
    pub max_conn_interval_ms: u32,
}

impl RadioConfig<'static> {
    /// e35c8bac-a062-4e3f-856d-2cfa87f2f171
    pub const LEVEL_SERVICE_UUID: [u8; 16] = [
        0xe3, 0x5c, 0x8b, 0xac, 0xa0, 0x62, 0x4e, 0x3f, 0x85, 0x6d, 0x2c, 0xfa, 0x87, 0xf2, 0xf1,
        0x71,
    ];

    pub const DEFAULT: Self = Self {
        device_name: "crest",
        service_uuid: Self::LEVEL_SERVICE_UUID,
        characteristic_uuid: 0x8910,
        adv_interval_ms: 500,
        min_conn_interval_ms: 500,
        max_conn_interval_ms: 1000,
    };
}

impl Default for RadioConfig<'static> {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_require_lower_below_upper() {
        assert!(Thresholds::new(100, 512).is_ok());
        assert_eq!(
            Thresholds::new(512, 100),
            Err(InvalidThresholds {
                lower: 512,
                upper: 100
            })
        );
        // A degenerate band leaves no hysteresis window.
        assert!(Thresholds::new(512, 512).is_err());
    }

    #[test]
    fn default_band_matches_ten_bit_converter() {
        let t = Thresholds::default();
        assert_eq!(t.lower, 100);
        assert_eq!(t.upper, 512);
        assert!(t.validate().is_ok());
    }
}
