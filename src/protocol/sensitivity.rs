//! Sensitivity report: per-sensor press thresholds.
//!
//! Layout (24 bytes):
//! ```text
//! Byte 2n..2n+1:  Threshold of sensor n (u16 LE, 12-bit ADC counts)
//! ```
//!
//! A sensor reads as pressed once its value reaches the threshold and is
//! released when it drops below `threshold - threshold / 16`.

use super::{read_u16_le, write_u16_le, PadVariant, MAX_SENSORS, SENSOR_VALUE_MAX};
use crate::error::ValidationError;

/// Sensitivity report size in bytes.
pub const SENSITIVITY_REPORT_SIZE: usize = 2 * MAX_SENSORS;

/// Smallest threshold accepted for a present sensor.
pub const THRESHOLD_MIN: u16 = 1;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensitivityTable {
    /// Press threshold per sensor channel. Channels the pad lacks are 0.
    pub thresholds: [u16; MAX_SENSORS],
}

impl SensitivityTable {
    /// Same threshold on every present sensor.
    pub fn uniform(variant: &PadVariant, threshold: u16) -> Self {
        let mut thresholds = [0u16; MAX_SENSORS];
        thresholds[..variant.sensors()].fill(threshold);
        Self { thresholds }
    }

    pub fn validate(&self, variant: &PadVariant) -> Result<(), ValidationError> {
        for (sensor, &value) in self.thresholds.iter().enumerate() {
            if sensor < variant.sensors() {
                if !(THRESHOLD_MIN..=SENSOR_VALUE_MAX).contains(&value) {
                    return Err(ValidationError::ThresholdOutOfRange {
                        sensor: sensor as u8,
                        value,
                    });
                }
            } else if value != 0 {
                return Err(ValidationError::SensorNotPresent {
                    sensor: sensor as u8,
                });
            }
        }
        Ok(())
    }

    /// Reading below which a pressed sensor is released.
    pub fn release_threshold(&self, sensor: usize) -> u16 {
        let threshold = self.thresholds[sensor];
        threshold - threshold / 16
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < SENSITIVITY_REPORT_SIZE {
            return None;
        }
        let mut thresholds = [0u16; MAX_SENSORS];
        for (i, value) in thresholds.iter_mut().enumerate() {
            *value = read_u16_le(data, 2 * i);
        }
        Some(Self { thresholds })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < SENSITIVITY_REPORT_SIZE {
            return 0;
        }
        for (i, value) in self.thresholds.iter().enumerate() {
            write_u16_le(buf, 2 * i, *value);
        }
        SENSITIVITY_REPORT_SIZE
    }
}
