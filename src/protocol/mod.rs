//! Dance pad HID report set.
//!
//! Every report has a fixed-width little-endian layout keyed by its report
//! identifier. Layouts are versioned by identifier value: adding a field
//! means allocating a new identifier, never growing an existing report.
//!
//! ```text
//! ID    Report        Direction                       Payload
//! 0x01  INPUT         input                           26 bytes
//! 0x02  IDENTITY      feature read                    41 bytes
//! 0x03  SENSITIVITY   feature read/write, output      24 bytes
//! 0x04  MAPPING       feature read/write, output      12 bytes
//! 0x05  LIGHTS        feature read/write, output      53 bytes
//! 0x06  NAME          feature read/write, output      33 bytes
//! 0x07  COMMAND       feature write, output            1 byte
//! ```
//!
//! Payload sizes exclude the leading report-ID byte.

pub mod command;
pub mod descriptor;
pub mod identity;
pub mod input;
pub mod lights;
pub mod mapping;
pub mod name;
pub mod sensitivity;


pub use command::Command;
pub use identity::{Identity, PadVariant};
pub use input::InputReport;
pub use lights::{LightsConfig, LightsMode, Rgb};
pub use mapping::MappingTable;
pub use name::DeviceName;
pub use sensitivity::SensitivityTable;

/// Protocol major version. A host only talks to pads with the same major.
pub const PROTOCOL_VERSION_MAJOR: u8 = 1;
pub const PROTOCOL_VERSION_MINOR: u8 = 0;

/// Sensor channels carried on the wire (hardware may use fewer).
pub const MAX_SENSORS: usize = 12;

/// Logical buttons carried on the wire (hardware may use fewer).
pub const MAX_BUTTONS: usize = 16;

/// Device name capacity in UTF-8 bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Largest sensor reading / threshold (12-bit ADC scale).
pub const SENSOR_VALUE_MAX: u16 = 4095;

/// Largest payload of any report, for sizing transfer buffers.
pub const MAX_PAYLOAD_SIZE: usize = lights::LIGHTS_REPORT_SIZE;

/// Report identifiers. Stable within a protocol major version.
pub mod report_id {
    pub const INPUT: u8 = 0x01;
    pub const IDENTITY: u8 = 0x02;
    pub const SENSITIVITY: u8 = 0x03;
    pub const MAPPING: u8 = 0x04;
    pub const LIGHTS: u8 = 0x05;
    pub const NAME: u8 = 0x06;
    pub const COMMAND: u8 = 0x07;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportKind {
    Input,
    Identity,
    Sensitivity,
    Mapping,
    Lights,
    Name,
    Command,
}

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        ReportKind::Input,
        ReportKind::Identity,
        ReportKind::Sensitivity,
        ReportKind::Mapping,
        ReportKind::Lights,
        ReportKind::Name,
        ReportKind::Command,
    ];

    pub fn from_id(report_id: u8) -> Option<Self> {
        match report_id {
            report_id::INPUT => Some(ReportKind::Input),
            report_id::IDENTITY => Some(ReportKind::Identity),
            report_id::SENSITIVITY => Some(ReportKind::Sensitivity),
            report_id::MAPPING => Some(ReportKind::Mapping),
            report_id::LIGHTS => Some(ReportKind::Lights),
            report_id::NAME => Some(ReportKind::Name),
            report_id::COMMAND => Some(ReportKind::Command),
            _ => None,
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            ReportKind::Input => report_id::INPUT,
            ReportKind::Identity => report_id::IDENTITY,
            ReportKind::Sensitivity => report_id::SENSITIVITY,
            ReportKind::Mapping => report_id::MAPPING,
            ReportKind::Lights => report_id::LIGHTS,
            ReportKind::Name => report_id::NAME,
            ReportKind::Command => report_id::COMMAND,
        }
    }

    /// Fixed payload size in bytes (report-ID byte excluded).
    pub const fn payload_len(self) -> usize {
        match self {
            ReportKind::Input => input::INPUT_REPORT_SIZE,
            ReportKind::Identity => identity::IDENTITY_REPORT_SIZE,
            ReportKind::Sensitivity => sensitivity::SENSITIVITY_REPORT_SIZE,
            ReportKind::Mapping => mapping::MAPPING_REPORT_SIZE,
            ReportKind::Lights => lights::LIGHTS_REPORT_SIZE,
            ReportKind::Name => name::NAME_REPORT_SIZE,
            ReportKind::Command => command::COMMAND_REPORT_SIZE,
        }
    }

    /// Can the host write this report (feature SET_REPORT or output)?
    pub const fn is_writable(self) -> bool {
        !matches!(self, ReportKind::Input | ReportKind::Identity)
    }

    /// Can the host read this report with a feature GET_REPORT?
    pub const fn is_readable(self) -> bool {
        !matches!(self, ReportKind::Command)
    }
}

/// Drop a leading report-ID byte if the transport left it in place.
///
/// Some USB stacks hand SET_REPORT data over verbatim (ID first), others
/// strip it. The ID is only removed when the remaining length matches the
/// report's fixed payload size, so a payload whose first data byte happens to
/// equal the ID is left alone.
pub fn strip_report_id(report_id: u8, data: &[u8]) -> &[u8] {
    let Some(kind) = ReportKind::from_id(report_id) else {
        return data;
    };
    match data.split_first() {
        Some((&first, rest)) if first == report_id && rest.len() == kind.payload_len() => rest,
        _ => data,
    }
}

pub(crate) fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub(crate) fn write_u16_le(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}
