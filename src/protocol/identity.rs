//! Identity report: protocol version, firmware version, hardware variant
//! and device name.
//!
//! Layout (41 bytes):
//! ```text
//! Byte 0:     Protocol major
//! Byte 1:     Protocol minor
//! Byte 2:     Firmware major
//! Byte 3:     Firmware minor
//! Byte 4:     Sensor count      (<= 12)
//! Byte 5:     Button count      (<= 16)
//! Byte 6:     Flags             (bit 0 = addressable lights present)
//! Byte 7:     LED count
//! Byte 8:     Name length
//! Byte 9-40:  Name (UTF-8, zero padded)
//! ```

use super::name::{decode_name, encode_name};
use super::{DeviceName, MAX_BUTTONS, MAX_NAME_LEN, MAX_SENSORS};

/// Identity report size in bytes.
pub const IDENTITY_REPORT_SIZE: usize = 9 + MAX_NAME_LEN;

const FLAG_HAS_LIGHTS: u8 = 0x01;

/// What the hardware actually has. Everything beyond these counts is
/// carried on the wire but ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadVariant {
    pub sensor_count: u8,
    pub button_count: u8,
    pub led_count: u8,
    pub has_lights: bool,
}

impl PadVariant {
    /// Clamp counts to what the wire format can carry.
    pub const fn new(sensor_count: u8, button_count: u8, led_count: u8) -> Self {
        let sensor_count = if sensor_count as usize > MAX_SENSORS {
            MAX_SENSORS as u8
        } else {
            sensor_count
        };
        let button_count = if button_count as usize > MAX_BUTTONS {
            MAX_BUTTONS as u8
        } else {
            button_count
        };
        Self {
            sensor_count,
            button_count,
            led_count,
            has_lights: led_count > 0,
        }
    }

    pub fn sensors(&self) -> usize {
        self.sensor_count as usize
    }

    pub fn buttons(&self) -> usize {
        self.button_count as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub variant: PadVariant,
    pub name: DeviceName,
}

impl Identity {
    /// Parse an identity payload. Counts above the wire limits are rejected.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < IDENTITY_REPORT_SIZE {
            return None;
        }
        if data[4] as usize > MAX_SENSORS || data[5] as usize > MAX_BUTTONS {
            return None;
        }
        let name = decode_name(&data[8..IDENTITY_REPORT_SIZE])?;
        Some(Self {
            protocol_major: data[0],
            protocol_minor: data[1],
            firmware_major: data[2],
            firmware_minor: data[3],
            variant: PadVariant {
                sensor_count: data[4],
                button_count: data[5],
                has_lights: data[6] & FLAG_HAS_LIGHTS != 0,
                led_count: data[7],
            },
            name,
        })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < IDENTITY_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.protocol_major;
        buf[1] = self.protocol_minor;
        buf[2] = self.firmware_major;
        buf[3] = self.firmware_minor;
        buf[4] = self.variant.sensor_count;
        buf[5] = self.variant.button_count;
        buf[6] = if self.variant.has_lights {
            FLAG_HAS_LIGHTS
        } else {
            0
        };
        buf[7] = self.variant.led_count;
        encode_name(&self.name, &mut buf[8..IDENTITY_REPORT_SIZE]);
        IDENTITY_REPORT_SIZE
    }
}
