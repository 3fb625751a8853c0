//! Notification sinks: where detector decisions go.
//!
//! A sink is a single-method capability. The detector does not know whether
//! its events end up on a GPIO pin, in a BLE characteristic, or in a log
//! line; the engine dispatches to whichever sink it was built with.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::OutputPin;

use crate::sampling::Reading;

/// One detector decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    /// A qualifying threshold crossing, carrying the reading that caused it.
    Crossing(Reading),
    /// The instantaneous above-threshold state (indicator policy).
    Indicator(bool),
}

/// Destination for detector events.
pub trait NotificationSink {
    type Error;

    /// Deliver one event. Called from the sampling context; must not block.
    fn emit(&mut self, event: SinkEvent) -> Result<(), Self::Error>;
}

/// Local binary indicator (typically an LED) driven by an output pin.
///
/// Indicator events set the pin directly; crossing events latch it high, so
/// the sink remains usable under the notifying policies.
pub struct IndicatorSink<P> {
    pin: P,
}

impl<P: OutputPin> IndicatorSink<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: OutputPin> NotificationSink for IndicatorSink<P> {
    type Error = P::Error;

    fn emit(&mut self, event: SinkEvent) -> Result<(), Self::Error> {
        match event {
            SinkEvent::Indicator(true) | SinkEvent::Crossing(_) => self.pin.set_high(),
            SinkEvent::Indicator(false) => self.pin.set_low(),
        }
    }
}

/// Shared value record between the sampling context and the wireless task.
///
/// A `Signal` holds at most one pending value and overwrites it on each new
/// notification, which is exactly the payload contract: only the latest
/// crossing matters. Single writer (the sampling context), single reader
/// (the wireless task).
pub type NotifySignal = Signal<CriticalSectionRawMutex, Reading>;

/// Split a static [`NotifySignal`] into its sending and receiving halves.
pub fn notify_pair(signal: &'static NotifySignal) -> (NotifySender, NotifyReceiver) {
    (NotifySender { signal }, NotifyReceiver { signal })
}

/// Remote-event sink: records the payload and wakes the wireless task.
///
/// Whether the value actually reaches a subscriber is up to the wireless
/// stack; from this side the request is fire-and-forget, and emitting with
/// no connected subscriber is a silent no-op.
pub struct NotifySender {
    signal: &'static NotifySignal,
}

impl NotificationSink for NotifySender {
    type Error = core::convert::Infallible;

    fn emit(&mut self, event: SinkEvent) -> Result<(), Self::Error> {
        let value = match event {
            SinkEvent::Crossing(reading) => reading,
            // Indicator state maps onto the same 16-bit record as 0/1.
            SinkEvent::Indicator(on) => Reading::from(on),
        };
        self.signal.signal(value);
        Ok(())
    }
}

/// Receiving half owned by the wireless task.
pub struct NotifyReceiver {
    signal: &'static NotifySignal,
}

impl NotifyReceiver {
    /// Wait for the next notification payload.
    pub async fn next(&self) -> Reading {
        self.signal.wait().await
    }

    /// Take a pending payload without waiting, if one exists.
    pub fn try_next(&self) -> Option<Reading> {
        self.signal.try_take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct FakePin {
        high: bool,
    }

    impl embedded_hal::digital::ErrorType for FakePin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    #[test]
    fn indicator_sink_follows_indicator_events() {
        let mut sink = IndicatorSink::new(FakePin::default());
        sink.emit(SinkEvent::Indicator(true)).unwrap();
        assert!(sink.pin.high);
        sink.emit(SinkEvent::Indicator(false)).unwrap();
        assert!(!sink.pin.high);
    }

    #[test]
    fn indicator_sink_latches_high_on_crossing() {
        let mut sink = IndicatorSink::new(FakePin::default());
        sink.emit(SinkEvent::Crossing(600)).unwrap();
        assert!(sink.pin.high);
    }

    #[test]
    fn notify_sender_overwrites_pending_payload() {
        static SIGNAL: NotifySignal = Signal::new();
        let (mut sender, receiver) = notify_pair(&SIGNAL);

        sender.emit(SinkEvent::Crossing(600)).unwrap();
        sender.emit(SinkEvent::Crossing(700)).unwrap();

        // Only the latest value survives; the record is overwritten on each
        // new notification.
        assert_eq!(receiver.try_next(), Some(700));
        assert_eq!(receiver.try_next(), None);
    }

    #[test]
    fn indicator_events_map_to_binary_payloads() {
        static SIGNAL: NotifySignal = Signal::new();
        let (mut sender, receiver) = notify_pair(&SIGNAL);

        sender.emit(SinkEvent::Indicator(true)).unwrap();
        assert_eq!(receiver.try_next(), Some(1));
        sender.emit(SinkEvent::Indicator(false)).unwrap();
        assert_eq!(receiver.try_next(), Some(0));
    }
}
