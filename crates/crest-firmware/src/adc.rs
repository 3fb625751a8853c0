//! Oneshot ADC sample source.
//!
//! Binds one analog input channel with device-default timing and resolution
//! and pumps the converter manually, one trigger per requested sample.

use crest_core::{Reading, SampleSource};
use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO4};
use thiserror_no_std::Error;

/// Conversion fault during a cycle. Treated as fatal by the engine, same as
/// an initialization failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcFault {
    #[error("analog conversion failed")]
    Conversion,
}

/// Analog input on GPIO4 via ADC1.
pub struct AdcSampleSource<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO4<'d>, ADC1<'d>>,
}

impl<'d> AdcSampleSource<'d> {
    /// Bind the converter to its input channel with default attenuation.
    pub fn new(adc: ADC1<'d>, input: GPIO4<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(input, Attenuation::_11dB);
        let adc = Adc::new(adc, config);
        Self { adc, pin }
    }
}

impl SampleSource for AdcSampleSource<'_> {
    type Error = AdcFault;

    async fn start_cycle(&mut self, buf: &mut [Reading]) -> Result<usize, Self::Error> {
        for slot in buf.iter_mut() {
            // One manual trigger per sample; the converter does not
            // free-run.
            let raw: u16 = loop {
                match self.adc.read_oneshot(&mut self.pin) {
                    Ok(value) => break value,
                    Err(nb::Error::WouldBlock) => embassy_futures::yield_now().await,
                    Err(nb::Error::Other(())) => return Err(AdcFault::Conversion),
                }
            };
            *slot = raw as Reading;
        }
        Ok(buf.len())
    }
}
