//! ESP32-S3 hardware adapters for crest-rs
//!
//! This crate contains the hardware-specific code that cannot compile on
//! desktop targets: the oneshot ADC sample source and the BLE GATT server
//! that delivers threshold-crossing notifications to subscribers.

#![no_std]

pub mod adc;
pub mod ble;
