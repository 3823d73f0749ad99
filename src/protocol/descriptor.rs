//! USB HID report descriptor for the pad, plus a small item walker used to
//! check the descriptor against the codec sizes.
//!
//! ## Collections
//!
//! - Joystick (Generic Desktop): report 0x01, 16 buttons followed by 12
//!   vendor-defined 16-bit sensor readings. Games see a plain joystick.
//! - Vendor-defined 0xFF00: every configuration report as opaque bytes,
//!   declared both as Feature and (for writable reports) as Output.
//!
//! ## Walker limitations
//!
//! Only what the size check needs is tracked:
//! - Report ID, Report Size and Report Count globals
//! - Input/Output/Feature main items
//! - Push/Pop, long items and local usages are ignored

use heapless::Vec;

use super::command::COMMAND_REPORT_SIZE;
use super::identity::IDENTITY_REPORT_SIZE;
use super::lights::LIGHTS_REPORT_SIZE;
use super::mapping::MAPPING_REPORT_SIZE;
use super::name::NAME_REPORT_SIZE;
use super::sensitivity::SENSITIVITY_REPORT_SIZE;
use super::{report_id, MAX_BUTTONS, MAX_SENSORS};

/// Report descriptor presented during enumeration.
pub const PAD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x04, // Usage (Joystick)
    0xA1, 0x01, // Collection (Application)
    0x85, report_id::INPUT, //   Report ID (Input)
    //
    //   - Logical buttons (16 bits) -
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, MAX_BUTTONS as u8, //   Usage Maximum (Button 16)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, MAX_BUTTONS as u8, //   Report Count (16)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Sensor readings (12 x u16) -
    0x06, 0x00, 0xFF, //   Usage Page (Vendor Defined 0xFF00)
    0x09, 0x01, //   Usage (Sensor Reading)
    0x15, 0x00, //   Logical Minimum (0)
    0x27, 0xFF, 0xFF, 0x00, 0x00, //   Logical Maximum (65535)
    0x75, 0x10, //   Report Size (16)
    0x95, MAX_SENSORS as u8, //   Report Count (12)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0xC0, // End Collection
    //
    0x06, 0x00, 0xFF, // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x02, // Usage (Configuration)
    0xA1, 0x01, // Collection (Application)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    //
    //   - Identity (read only) -
    0x85, report_id::IDENTITY, //   Report ID
    0x09, 0x10, //   Usage (Identity)
    0x95, IDENTITY_REPORT_SIZE as u8, //   Report Count
    0xB1, 0x03, //   Feature (Constant, Variable, Absolute)
    //
    //   - Sensitivity -
    0x85, report_id::SENSITIVITY, //   Report ID
    0x09, 0x11, //   Usage (Sensitivity)
    0x95, SENSITIVITY_REPORT_SIZE as u8, //   Report Count
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0x09, 0x11, //   Usage (Sensitivity)
    0x95, SENSITIVITY_REPORT_SIZE as u8, //   Report Count
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    //   - Mapping -
    0x85, report_id::MAPPING, //   Report ID
    0x09, 0x12, //   Usage (Mapping)
    0x95, MAPPING_REPORT_SIZE as u8, //   Report Count
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0x09, 0x12, //   Usage (Mapping)
    0x95, MAPPING_REPORT_SIZE as u8, //   Report Count
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    //   - Lights -
    0x85, report_id::LIGHTS, //   Report ID
    0x09, 0x13, //   Usage (Lights)
    0x95, LIGHTS_REPORT_SIZE as u8, //   Report Count
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0x09, 0x13, //   Usage (Lights)
    0x95, LIGHTS_REPORT_SIZE as u8, //   Report Count
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    //   - Name -
    0x85, report_id::NAME, //   Report ID
    0x09, 0x14, //   Usage (Name)
    0x95, NAME_REPORT_SIZE as u8, //   Report Count
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0x09, 0x14, //   Usage (Name)
    0x95, NAME_REPORT_SIZE as u8, //   Report Count
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    //
    //   - Command -
    0x85, report_id::COMMAND, //   Report ID
    0x09, 0x15, //   Usage (Command)
    0x95, COMMAND_REPORT_SIZE as u8, //   Report Count
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    0x09, 0x15, //   Usage (Command)
    0x95, COMMAND_REPORT_SIZE as u8, //   Report Count
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0xC0, // End Collection
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input,
    Output,
    Feature,
}

/// Total size of one report as declared by a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeclaredReport {
    pub direction: Direction,
    pub report_id: u8,
    pub bits: u32,
}

/// All reports declared by a descriptor, sizes summed per (direction, id).
#[derive(Clone, Debug, Default)]
pub struct DeclaredReports {
    reports: Vec<DeclaredReport, 24>,
}

impl DeclaredReports {
    /// Walk a report descriptor. Returns `None` if it declares more reports
    /// than we track or ends mid-item.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut declared = Self::default();

        // Parser state.
        let mut report_id: u8 = 0;
        let mut report_size: u32 = 0;
        let mut report_count: u32 = 0;

        let mut i = 0;
        while i < data.len() {
            let prefix = data[i];
            let tag = (prefix >> 4) & 0x0F;
            let item_type = (prefix >> 2) & 0x03;
            let size = match prefix & 0x03 {
                0 => 0,
                1 => 1,
                2 => 2,
                _ => 4,
            };

            if i + 1 + size > data.len() {
                return None;
            }

            let value: u32 = match size {
                0 => 0,
                1 => data[i + 1] as u32,
                2 => u16::from_le_bytes([data[i + 1], data[i + 2]]) as u32,
                _ => u32::from_le_bytes([data[i + 1], data[i + 2], data[i + 3], data[i + 4]]),
            };

            match item_type {
                // Main items
                0 => {
                    let direction = match tag {
                        0x08 => Some(Direction::Input),
                        0x09 => Some(Direction::Output),
                        0x0B => Some(Direction::Feature),
                        _ => None,
                    };
                    if let Some(direction) = direction {
                        declared.add(direction, report_id, report_size * report_count)?;
                    }
                }
                // Global items
                1 => match tag {
                    0x07 => report_size = value,
                    0x08 => report_id = value as u8,
                    0x09 => report_count = value,
                    _ => {}
                },
                _ => {}
            }

            i += 1 + size;
        }

        Some(declared)
    }

    fn add(&mut self, direction: Direction, report_id: u8, bits: u32) -> Option<()> {
        if let Some(existing) = self
            .reports
            .iter_mut()
            .find(|r| r.direction == direction && r.report_id == report_id)
        {
            existing.bits += bits;
            return Some(());
        }
        self.reports
            .push(DeclaredReport {
                direction,
                report_id,
                bits,
            })
            .ok()
    }

    /// Declared payload size in whole bytes.
    pub fn size_bytes(&self, direction: Direction, report_id: u8) -> Option<usize> {
        self.reports
            .iter()
            .find(|r| r.direction == direction && r.report_id == report_id)
            .map(|r| r.bits.div_ceil(8) as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclaredReport> {
        self.reports.iter()
    }
}
