//! FSR sampling through the nRF52840 SAADC.
//!
//! Each panel sensor is a force-sensitive resistor in a divider feeding one
//! analog input. The SAADC scans all channels in one conversion; results are
//! 12-bit and clamped into the protocol's sensor range.

use adp_pad::config::SENSOR_COUNT;
use adp_pad::protocol::SENSOR_VALUE_MAX;
use defmt::info;
use embassy_nrf::saadc::{self, ChannelConfig, Config, Resolution, Saadc};
use embassy_nrf::{bind_interrupts, peripherals};

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
});

pub const CHANNELS: usize = SENSOR_COUNT as usize;

const _: () = assert!(CHANNELS == 8, "one analog input per sensor");

/// Analog inputs wired to the sensors, in sensor order.
pub struct SensorPins {
    pub p0_02: peripherals::P0_02,
    pub p0_03: peripherals::P0_03,
    pub p0_04: peripherals::P0_04,
    pub p0_05: peripherals::P0_05,
    pub p0_28: peripherals::P0_28,
    pub p0_29: peripherals::P0_29,
    pub p0_30: peripherals::P0_30,
    pub p0_31: peripherals::P0_31,
}

pub struct SensorBank {
    saadc: Saadc<'static, CHANNELS>,
}

impl SensorBank {
    /// Configure the SAADC for all sensor channels and calibrate it.
    pub async fn new(saadc: peripherals::SAADC, pins: SensorPins) -> Self {
        let mut config = Config::default();
        config.resolution = Resolution::_12BIT;

        let channels = [
            ChannelConfig::single_ended(pins.p0_02),
            ChannelConfig::single_ended(pins.p0_03),
            ChannelConfig::single_ended(pins.p0_04),
            ChannelConfig::single_ended(pins.p0_05),
            ChannelConfig::single_ended(pins.p0_28),
            ChannelConfig::single_ended(pins.p0_29),
            ChannelConfig::single_ended(pins.p0_30),
            ChannelConfig::single_ended(pins.p0_31),
        ];
        let saadc = Saadc::new(saadc, Irqs, config, channels);
        saadc.calibrate().await;
        info!("SAADC ready: {=usize} sensor channels", CHANNELS);

        Self { saadc }
    }

    /// Sample every sensor once.
    pub async fn sample(&mut self, out: &mut [u16; CHANNELS]) {
        let mut raw = [0i16; CHANNELS];
        self.saadc.sample(&mut raw).await;
        for (value, sample) in out.iter_mut().zip(raw) {
            *value = to_sensor_value(sample);
        }
    }
}

/// Single-ended samples can dip slightly below zero from offset error.
fn to_sensor_value(sample: i16) -> u16 {
    sample.clamp(0, SENSOR_VALUE_MAX as i16) as u16
}
