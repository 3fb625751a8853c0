//! BLE GATT server: the remote notification sink.
//!
//! Exposes one service with a single 16-bit level characteristic and
//! forwards payloads from the core's notify channel to whichever central is
//! connected and subscribed. The stack owns delivery; an unsubscribed
//! central simply means the notify request goes nowhere, which is the
//! intended contract.

use crest_core::{RadioConfig, Reading};
use crest_core::sink::NotifyReceiver;
use embassy_futures::join::join;
use embassy_futures::select::select;
use embassy_time::Duration;
use esp_radio::ble::controller::BleConnector;
use log::{info, warn};
use trouble_host::prelude::*;

/// Max concurrent connections. One central at a time is plenty here.
const CONNECTIONS_MAX: usize = 1;
/// L2CAP channels: ATT plus one signaling channel.
const L2CAP_CHANNELS_MAX: usize = 2;
/// HCI command slots for the external controller.
const HCI_SLOTS: usize = 20;

/// Concrete controller type for the ESP32 radio.
pub type BleController = ExternalController<BleConnector<'static>, HCI_SLOTS>;

#[gatt_server]
struct LevelServer {
    level_service: LevelService,
}

/// e35c8bac-a062-4e3f-856d-2cfa87f2f171
#[gatt_service(uuid = "e35c8bac-a062-4e3f-856d-2cfa87f2f171")]
struct LevelService {
    /// Payload of the most recent threshold crossing (uuid16 0x8910).
    #[characteristic(uuid = "00008910-0000-1000-8000-00805f9b34fb", read, notify)]
    level: u16,
}

#[embassy_executor::task]
pub async fn ble_task(
    controller: BleController,
    config: RadioConfig<'static>,
    notifications: NotifyReceiver,
) {
    run(controller, config, notifications).await;
}

/// Bring up the BLE host and serve forever.
///
/// Advertising restarts after every disconnect; a controller-level failure
/// to advertise is fatal.
pub async fn run<C: Controller>(
    controller: C,
    config: RadioConfig<'static>,
    notifications: NotifyReceiver,
) {
    let address = Address::random([0x42, 0x5a, 0xe3, 0x1e, 0x83, 0xe7]);
    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();
    let stack = trouble_host::new(controller, &mut resources).set_random_address(address);
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let server = LevelServer::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: config.device_name,
        appearance: &appearance::sensor::GENERIC_SENSOR,
    }))
    .expect("GATT attribute table is invalid");

    info!("BLE host ready, advertising as {}", config.device_name);

    join(runner.run(), async {
        loop {
            match advertise(&config, &mut peripheral, &server).await {
                Ok(conn) => {
                    request_connection_params(&stack, &conn, &config).await;
                    // Serve reads and forward notifications until the
                    // central goes away, then advertise again.
                    select(
                        gatt_events(&conn),
                        forward_notifications(&server, &conn, &notifications),
                    )
                    .await;
                }
                Err(e) => panic!("BLE advertising failed: {e:?}"),
            }
        }
    })
    .await;
}

/// Advertise the configured name and wait for a central to connect.
async fn advertise<'values, 'server, C: Controller>(
    config: &RadioConfig<'static>,
    peripheral: &mut Peripheral<'values, C, DefaultPacketPool>,
    server: &'server LevelServer<'values>,
) -> Result<GattConnection<'values, 'server, DefaultPacketPool>, BleHostError<C::Error>> {
    let mut adv_data = [0; 31];
    let len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::CompleteLocalName(config.device_name.as_bytes()),
        ],
        &mut adv_data[..],
    )?;

    let mut params = AdvertisementParameters::default();
    params.interval_min = Duration::from_millis(u64::from(config.adv_interval_ms));
    params.interval_max = params.interval_min;

    let advertiser = peripheral
        .advertise(
            &params,
            Advertisement::ConnectableScannableUndirected {
                adv_data: &adv_data[..len],
                scan_data: &[],
            },
        )
        .await?;
    let conn = advertiser.accept().await?.with_attribute_server(server)?;
    info!("central connected");
    Ok(conn)
}

/// Ask the central for the configured connection interval bounds.
///
/// The central is free to ignore the request; the values are forwarded
/// unchanged.
async fn request_connection_params<'a, C: Controller, P: PacketPool>(
    stack: &Stack<'a, C, P>,
    conn: &GattConnection<'_, '_, P>,
    config: &RadioConfig<'static>,
) {
    let params = ConnectParams {
        min_connection_interval: Duration::from_millis(u64::from(config.min_conn_interval_ms)),
        max_connection_interval: Duration::from_millis(u64::from(config.max_conn_interval_ms)),
        ..Default::default()
    };
    if let Err(e) = conn.raw().update_connection_params(stack, &params).await {
        warn!("connection parameter update rejected: {e:?}");
    }
}

/// Serve GATT requests until the central disconnects.
async fn gatt_events<P: PacketPool>(conn: &GattConnection<'_, '_, P>) {
    loop {
        match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => {
                info!("central disconnected: {reason:?}");
                break;
            }
            GattConnectionEvent::Gatt { event } => {
                // Reads of the level characteristic are answered from the
                // attribute table as-is.
                match event.accept() {
                    Ok(reply) => reply.send().await,
                    Err(e) => warn!("GATT event rejected: {e:?}"),
                }
            }
            _ => {}
        }
    }
}

/// Forward each payload from the sampling context to the subscriber.
async fn forward_notifications<P: PacketPool>(
    server: &LevelServer<'_>,
    conn: &GattConnection<'_, '_, P>,
    notifications: &NotifyReceiver,
) {
    let level = &server.level_service.level;
    loop {
        let payload: Reading = notifications.next().await;
        // Failure here means nobody is subscribed; by contract that is a
        // silent no-op, not an error.
        if level.notify(conn, &(payload as u16)).await.is_err() {
            log::debug!("notify skipped, no subscriber");
        }
    }
}
