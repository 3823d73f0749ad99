//! Error types shared by the firmware engine and the host model.
//!
//! We avoid `alloc` - all variants carry only fixed-size data, so the same
//! types work inside USB callbacks and on the host. Implements
//! `defmt::Format` for on-target logging when the `defmt` feature is on.

use thiserror::Error;

/// A configuration value violates a domain constraint.
///
/// Raised by host write operations before any transport I/O, and by the
/// firmware when a well-sized payload carries out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// Threshold of an active sensor outside the supported range.
    #[error("sensor {sensor}: threshold {value} outside 1..=4095")]
    ThresholdOutOfRange { sensor: u8, value: u16 },

    /// A channel the hardware does not have carries a non-default value.
    #[error("sensor {sensor} is not present on this pad")]
    SensorNotPresent { sensor: u8 },

    /// Mapping references a logical button the pad does not expose.
    #[error("sensor {sensor}: button {button} does not exist")]
    ButtonOutOfRange { sensor: u8, button: u8 },

    /// Lights configuration sent to a pad without lights.
    #[error("pad has no lights")]
    LightsUnsupported,

    /// Unknown lights mode code.
    #[error("unknown lights mode {0}")]
    UnknownLightsMode(u8),

    #[error("device name is empty")]
    NameEmpty,

    #[error("device name is {len} bytes, limit is 32")]
    NameTooLong { len: usize },

    /// Name is not UTF-8 or contains control characters.
    #[error("device name contains invalid characters")]
    NameInvalid,

    #[error("unknown command {0}")]
    UnknownCommand(u8),
}

/// An incoming feature/output report the engine refused to apply.
///
/// Firmware-internal: the write is dropped and state is left untouched.
/// The transport has no side channel, so this never reaches the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MalformedReport {
    #[error("unknown report id {0:#04x}")]
    UnknownReportId(u8),

    /// Report exists but cannot be written (input, identity).
    #[error("report id {0:#04x} is read-only")]
    ReadOnly(u8),

    #[error("report id {report_id:#04x}: expected {expected} bytes, got {actual}")]
    Length {
        report_id: u8,
        expected: usize,
        actual: usize,
    },

    /// Payload decoded but failed domain validation.
    #[error("report id {report_id:#04x}: {reason}")]
    Invalid {
        report_id: u8,
        reason: ValidationError,
    },
}
