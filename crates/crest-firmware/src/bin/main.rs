#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use embassy_executor::Spawner;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use log::info;

use crest_core::{
    DetectionPolicy, Detector, DetectorConfig, IndicatorSink, NotifySignal, RadioConfig,
    SamplingConfig, SamplingEngine, Thresholds, notify_pair,
};
use crest_firmware::adc::AdcSampleSource;
use crest_firmware::ble;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

/// Conversion buffer capacity. Deployments run 1 (lowest latency) or 10.
const SAMPLES_PER_CYCLE: usize = 1;

/// Detection behavior for this build. `Indicator` turns the device into a
/// standalone LED comparator and skips radio bring-up entirely.
const POLICY: DetectionPolicy = DetectionPolicy::Latched;

/// Shared value record between the sampling context and the BLE task.
static NOTIFICATIONS: NotifySignal = NotifySignal::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("[INIT]: start");

    let sampling = SamplingConfig {
        interval_ms: 150,
        samples_per_cycle: SAMPLES_PER_CYCLE,
    };
    let detector = Detector::new(DetectorConfig {
        policy: POLICY,
        thresholds: Thresholds::DEFAULT,
    })
    .expect("threshold configuration is invalid");
    let source = AdcSampleSource::new(peripherals.ADC1, peripherals.GPIO4);

    if matches!(POLICY, DetectionPolicy::Indicator) {
        // Local indicator build: the LED tracks the comparison directly.
        let led = Output::new(peripherals.GPIO21, Level::Low, OutputConfig::default());
        let mut engine = SamplingEngine::<_, _, SAMPLES_PER_CYCLE>::new(
            source,
            detector,
            IndicatorSink::new(led),
            &sampling,
        );
        info!("[INIT]: finish");
        let err = engine.run().await.unwrap_err();
        panic!("sampling engine fault: {err}");
    }

    // Remote build: bring up the radio and hand the receiving half of the
    // notify channel to the BLE task.
    let radio_init = esp_radio::init().expect("Failed to initialize BLE controller");
    let transport = esp_radio::ble::controller::BleConnector::new(&radio_init, peripherals.BT);
    let controller = ble::BleController::new(transport);

    let (sender, receiver) = notify_pair(&NOTIFICATIONS);
    spawner
        .spawn(ble::ble_task(controller, RadioConfig::DEFAULT, receiver))
        .expect("failed to spawn BLE task");

    let mut engine =
        SamplingEngine::<_, _, SAMPLES_PER_CYCLE>::new(source, detector, sender, &sampling);
    info!("[INIT]: finish");

    // The executor idles between timer ticks; the engine only returns on a
    // fatal driver error.
    let err = engine.run().await.unwrap_err();
    panic!("sampling engine fault: {err}");
}
