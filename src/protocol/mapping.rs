//! Mapping report: input channel (sensor) to logical button.
//!
//! Layout (12 bytes):
//! ```text
//! Byte n:  Logical button driven by sensor n (0xFF = unmapped)
//! ```
//!
//! Several sensors may drive the same button; a button is pressed while any
//! of its sensors is.

use super::{PadVariant, MAX_SENSORS};
use crate::error::ValidationError;

/// Mapping report size in bytes.
pub const MAPPING_REPORT_SIZE: usize = MAX_SENSORS;

/// Marker for a sensor that drives no button.
pub const UNMAPPED: u8 = 0xFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingTable {
    pub buttons: [u8; MAX_SENSORS],
}

impl Default for MappingTable {
    fn default() -> Self {
        Self {
            buttons: [UNMAPPED; MAX_SENSORS],
        }
    }
}

impl MappingTable {
    /// Spread the present sensors evenly over the present buttons
    /// (sensor pairs per panel on the stock pad).
    pub fn spread(variant: &PadVariant) -> Self {
        let mut table = Self::default();
        let (sensors, buttons) = (variant.sensors(), variant.buttons());
        if buttons == 0 {
            return table;
        }
        let per_button = sensors.div_ceil(buttons).max(1);
        for (sensor, slot) in table.buttons[..sensors].iter_mut().enumerate() {
            *slot = (sensor / per_button) as u8;
        }
        table
    }

    pub fn button_for(&self, sensor: usize) -> Option<u8> {
        match self.buttons.get(sensor) {
            Some(&UNMAPPED) | None => None,
            Some(&button) => Some(button),
        }
    }

    pub fn validate(&self, variant: &PadVariant) -> Result<(), ValidationError> {
        for (sensor, &button) in self.buttons.iter().enumerate() {
            if button == UNMAPPED {
                continue;
            }
            if sensor >= variant.sensors() {
                return Err(ValidationError::SensorNotPresent {
                    sensor: sensor as u8,
                });
            }
            if button >= variant.button_count {
                return Err(ValidationError::ButtonOutOfRange {
                    sensor: sensor as u8,
                    button,
                });
            }
        }
        Ok(())
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < MAPPING_REPORT_SIZE {
            return None;
        }
        let mut buttons = [UNMAPPED; MAX_SENSORS];
        buttons.copy_from_slice(&data[..MAPPING_REPORT_SIZE]);
        Some(Self { buttons })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < MAPPING_REPORT_SIZE {
            return 0;
        }
        buf[..MAPPING_REPORT_SIZE].copy_from_slice(&self.buttons);
        MAPPING_REPORT_SIZE
    }
}
