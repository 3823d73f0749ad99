//! Lights report: addressable LED configuration (lights variants only).
//!
//! Layout (53 bytes):
//! ```text
//! Byte 0:     Mode (0 = off, 1 = static, 2 = reactive)
//! Byte 1:     Brightness (0-255)
//! Byte 2-4:   Idle colour (R, G, B)
//! Byte 5-52:  Pressed colour per logical button, 16 x (R, G, B)
//! ```

use super::MAX_BUTTONS;
use crate::error::ValidationError;

/// Lights report size in bytes.
pub const LIGHTS_REPORT_SIZE: usize = 5 + 3 * MAX_BUTTONS;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightsMode {
    /// All LEDs dark.
    Off,
    /// Idle colour everywhere, pressed colour on held panels.
    #[default]
    Static,
    /// Dark until pressed.
    Reactive,
}

impl TryFrom<u8> for LightsMode {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(LightsMode::Off),
            1 => Ok(LightsMode::Static),
            2 => Ok(LightsMode::Reactive),
            other => Err(ValidationError::UnknownLightsMode(other)),
        }
    }
}

impl From<LightsMode> for u8 {
    fn from(mode: LightsMode) -> u8 {
        match mode {
            LightsMode::Off => 0,
            LightsMode::Static => 1,
            LightsMode::Reactive => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightsConfig {
    pub mode: LightsMode,
    pub brightness: u8,
    pub idle: Rgb,
    pub pressed: [Rgb; MAX_BUTTONS],
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            mode: LightsMode::Static,
            brightness: 128,
            idle: Rgb::new(0, 0, 32),
            pressed: [Rgb::new(255, 255, 255); MAX_BUTTONS],
        }
    }
}

impl LightsConfig {
    /// Parse a lights payload. `None` on short input or an unknown mode.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < LIGHTS_REPORT_SIZE {
            return None;
        }
        let mode = LightsMode::try_from(data[0]).ok()?;
        let mut pressed = [Rgb::default(); MAX_BUTTONS];
        for (i, colour) in pressed.iter_mut().enumerate() {
            let at = 5 + 3 * i;
            *colour = Rgb::new(data[at], data[at + 1], data[at + 2]);
        }
        Some(Self {
            mode,
            brightness: data[1],
            idle: Rgb::new(data[2], data[3], data[4]),
            pressed,
        })
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < LIGHTS_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.mode.into();
        buf[1] = self.brightness;
        buf[2..5].copy_from_slice(&[self.idle.r, self.idle.g, self.idle.b]);
        for (i, colour) in self.pressed.iter().enumerate() {
            let at = 5 + 3 * i;
            buf[at..at + 3].copy_from_slice(&[colour.r, colour.g, colour.b]);
        }
        LIGHTS_REPORT_SIZE
    }
}
