//! adp-firmware - FSR dance pad firmware for the nRF52840.
//!
//! Task layout:
//!
//! - `usb_task`: runs the USB device stack (enumeration, control pipe,
//!   feature reports through the request handler)
//! - `output_task`: applies output reports arriving on the OUT endpoint
//! - `input_task`: samples the sensors and sends one input report per poll
//! - `storage_task`: writes the configuration to flash after changes settle
//!
//! All of them share one [`ReportEngine`] behind a critical-section mutex.

#![no_std]
#![no_main]

mod sensors;
mod storage;
mod usb;

use core::cell::RefCell;

use adp_pad::{config, PadConfig, ReportEngine, FIRMWARE_VARIANT};
use defmt::info;
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::config::HfclkSource;
use embassy_nrf::nvmc::Nvmc;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Ticker};
use embassy_usb::UsbDevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use sensors::{SensorBank, SensorPins, CHANNELS};
use storage::ConfigStore;
use usb::hid_device::{self, PadReader, PadWriter, UsbDriver};
use usb::SharedEngine;

/// How often the storage task checks for settled changes.
const STORAGE_CHECK_INTERVAL_MS: u64 = 100;

type Flash = BlockingAsync<Nvmc<'static>>;

static ENGINE: StaticCell<SharedEngine> = StaticCell::new();

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, UsbDriver>) -> ! {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn output_task(reader: PadReader, engine: &'static SharedEngine) -> ! {
    hid_device::run_output_reader(reader, engine).await
}

#[embassy_executor::task]
async fn input_task(
    mut sensors: SensorBank,
    mut writer: PadWriter,
    engine: &'static SharedEngine,
) -> ! {
    info!("Input task started");
    let mut readings = [0u16; CHANNELS];
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(config::USB_HID_POLL_MS)));
    loop {
        sensors.sample(&mut readings).await;
        hid_device::send_input_report(&mut writer, engine, &readings).await;
        ticker.next().await;
    }
}

#[embassy_executor::task]
async fn storage_task(mut store: ConfigStore<Flash>, engine: &'static SharedEngine) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(STORAGE_CHECK_INTERVAL_MS));
    loop {
        ticker.next().await;
        store.sync(engine).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // USB requires the external high-frequency crystal.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(nrf_config);

    info!(
        "adp-firmware {=u8}.{=u8}: {=u8} sensors, {=u8} buttons, {=u8} LEDs",
        config::FIRMWARE_VERSION_MAJOR,
        config::FIRMWARE_VERSION_MINOR,
        config::SENSOR_COUNT,
        config::BUTTON_COUNT,
        config::LED_COUNT
    );

    let mut store = ConfigStore::new(BlockingAsync::new(Nvmc::new(p.NVMC)));
    let pad_config = match store.load(&FIRMWARE_VARIANT).await {
        Some(pad_config) => pad_config,
        None => {
            info!("Using factory configuration");
            PadConfig::defaults(&FIRMWARE_VARIANT)
        }
    };
    let engine: &'static SharedEngine = ENGINE.init(Mutex::new(RefCell::new(
        ReportEngine::new(FIRMWARE_VARIANT, pad_config),
    )));

    let sensors = SensorBank::new(
        p.SAADC,
        SensorPins {
            p0_02: p.P0_02,
            p0_03: p.P0_03,
            p0_04: p.P0_04,
            p0_05: p.P0_05,
            p0_28: p.P0_28,
            p0_29: p.P0_29,
            p0_30: p.P0_30,
            p0_31: p.P0_31,
        },
    )
    .await;

    let usb = hid_device::init(p.USBD, engine);

    spawner.must_spawn(usb_task(usb.device));
    spawner.must_spawn(output_task(usb.reader, engine));
    spawner.must_spawn(input_task(sensors, usb.writer, engine));
    spawner.must_spawn(storage_task(store, engine));
}
