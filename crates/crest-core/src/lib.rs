//! Hardware-independent core library for crest-rs
//!
//! This crate contains all platform-agnostic logic for the crest analog
//! threshold notifier: the periodic sampling engine, the threshold-crossing
//! detector, notification sink abstractions, and configuration types.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3)
//! and desktop hosts (for the simulator and tests).

#![no_std]

pub mod config;
pub mod detector;
pub mod sampling;
pub mod sink;

pub use config::{
    DetectionPolicy, DetectorConfig, InvalidThresholds, RadioConfig, SamplingConfig, Thresholds,
};
pub use detector::Detector;
pub use sampling::{EngineError, Reading, SampleSource, SamplingEngine};
pub use sink::{
    IndicatorSink, NotificationSink, NotifyReceiver, NotifySender, NotifySignal, SinkEvent,
    notify_pair,
};
