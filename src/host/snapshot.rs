//! Host-side cached view of the pad, and the per-tick change set.

use bitflags::bitflags;

use crate::protocol::{
    DeviceName, Identity, InputReport, LightsConfig, MappingTable, PadVariant, SensitivityTable,
};

bitflags! {
    /// What differs between two consecutive [`HostSnapshot`]s.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ChangeFlags: u32 {
        /// A pad appeared, disappeared or was swapped for different hardware.
        const DEVICE       = 1 << 0;
        const NAME         = 1 << 1;
        const SENSITIVITY  = 1 << 2;
        const MAPPING      = 1 << 3;
        const LIGHTS       = 1 << 4;
        const POLLING_RATE = 1 << 5;
        /// Latest input report (sensor readings or buttons) differs.
        const INPUT        = 1 << 6;
    }
}

/// Identity and configuration of the attached pad as last read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PadSnapshot {
    pub identity: Identity,
    pub sensitivity: SensitivityTable,
    pub mapping: MappingTable,
    /// Most recent input report, default until the first one arrives.
    pub input: InputReport,
}

impl PadSnapshot {
    pub fn name(&self) -> &DeviceName {
        &self.identity.name
    }

    pub fn variant(&self) -> &PadVariant {
        &self.identity.variant
    }

    /// `(major, minor)`.
    pub fn firmware_version(&self) -> (u8, u8) {
        (self.identity.firmware_major, self.identity.firmware_minor)
    }

    fn same_hardware(&self, other: &PadSnapshot) -> bool {
        self.identity.variant == other.identity.variant
            && self.firmware_version() == other.firmware_version()
            && self.identity.protocol_major == other.identity.protocol_major
            && self.identity.protocol_minor == other.identity.protocol_minor
    }
}

/// Lights state of a pad that has lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightsSnapshot {
    pub led_count: u8,
    pub config: LightsConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostSnapshot {
    pub pad: Option<PadSnapshot>,
    pub lights: Option<LightsSnapshot>,
    /// Input reports per second, 0 when unknown or absent.
    pub polling_rate: u32,
}

impl HostSnapshot {
    /// Flags for every field that differs from `self` to `next`.
    pub fn diff(&self, next: &HostSnapshot) -> ChangeFlags {
        let mut flags = ChangeFlags::empty();

        match (&self.pad, &next.pad) {
            (None, None) => {}
            (Some(prev), Some(cur)) => {
                if !prev.same_hardware(cur) {
                    flags |= ChangeFlags::DEVICE;
                }
            }
            _ => flags |= ChangeFlags::DEVICE,
        }

        let (prev, cur) = (self.pad.as_ref(), next.pad.as_ref());
        if prev.map(|p| p.name()) != cur.map(|p| p.name()) {
            flags |= ChangeFlags::NAME;
        }
        if prev.map(|p| &p.sensitivity) != cur.map(|p| &p.sensitivity) {
            flags |= ChangeFlags::SENSITIVITY;
        }
        if prev.map(|p| &p.mapping) != cur.map(|p| &p.mapping) {
            flags |= ChangeFlags::MAPPING;
        }
        if prev.map(|p| &p.input) != cur.map(|p| &p.input) {
            flags |= ChangeFlags::INPUT;
        }

        if self.lights != next.lights {
            flags |= ChangeFlags::LIGHTS;
        }
        if self.polling_rate != next.polling_rate {
            flags |= ChangeFlags::POLLING_RATE;
        }
        flags
    }
}
