//! Input report: live button and sensor snapshot, sent every poll tick.
//!
//! Layout (26 bytes):
//! ```text
//! Byte 0-1:   Pressed logical buttons (u16 LE bitfield, bit n = button n)
//! Byte 2-25:  12 sensor readings (u16 LE each, 12-bit ADC counts)
//! ```

use super::{read_u16_le, write_u16_le, MAX_BUTTONS, MAX_SENSORS};

/// Input report size in bytes.
pub const INPUT_REPORT_SIZE: usize = 2 + 2 * MAX_SENSORS;

/// Point-in-time button/sensor snapshot.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputReport {
    /// Pressed logical buttons bitfield.
    pub buttons: u16,
    /// Raw sensor readings, unused channels are 0.
    pub sensors: [u16; MAX_SENSORS],
}

impl InputReport {
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < INPUT_REPORT_SIZE {
            return None;
        }
        let mut sensors = [0u16; MAX_SENSORS];
        for (i, value) in sensors.iter_mut().enumerate() {
            *value = read_u16_le(data, 2 + 2 * i);
        }
        Some(Self {
            buttons: read_u16_le(data, 0),
            sensors,
        })
    }

    /// Serialise into a byte slice for USB HID transmission.
    /// Returns the number of bytes written (0 if `buf` is too small).
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < INPUT_REPORT_SIZE {
            return 0;
        }
        write_u16_le(buf, 0, self.buttons);
        for (i, value) in self.sensors.iter().enumerate() {
            write_u16_le(buf, 2 + 2 * i, *value);
        }
        INPUT_REPORT_SIZE
    }

    pub fn is_pressed(&self, button: usize) -> bool {
        button < MAX_BUTTONS && self.buttons & (1 << button) != 0
    }
}
