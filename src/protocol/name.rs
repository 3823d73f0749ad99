//! Device name report.
//!
//! Layout (33 bytes):
//! ```text
//! Byte 0:     Name length in bytes (<= 32)
//! Byte 1-32:  Name (UTF-8, zero padded)
//! ```

use core::fmt;

use heapless::String;

use super::MAX_NAME_LEN;
use crate::error::ValidationError;

/// Name report size in bytes.
pub const NAME_REPORT_SIZE: usize = 1 + MAX_NAME_LEN;

/// User-visible pad name, shown by the host once connected.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceName(String<MAX_NAME_LEN>);

impl DeviceName {
    /// Build a validated name.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let mut inner = String::new();
        inner
            .push_str(name)
            .map_err(|_| ValidationError::NameTooLong { len: name.len() })?;
        let name = Self(inner);
        name.validate()?;
        Ok(name)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            return Err(ValidationError::NameEmpty);
        }
        if self.0.chars().any(char::is_control) {
            return Err(ValidationError::NameInvalid);
        }
        Ok(())
    }

    /// Parse a name payload. Only the layout is checked here, not
    /// [`DeviceName::validate`].
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < NAME_REPORT_SIZE {
            return None;
        }
        decode_name(&data[..NAME_REPORT_SIZE])
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < NAME_REPORT_SIZE {
            return 0;
        }
        encode_name(self, &mut buf[..NAME_REPORT_SIZE]);
        NAME_REPORT_SIZE
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode `[len][bytes; 32]`.
pub(crate) fn decode_name(field: &[u8]) -> Option<DeviceName> {
    let len = *field.first()? as usize;
    if len > MAX_NAME_LEN || field.len() < 1 + len {
        return None;
    }
    let text = core::str::from_utf8(&field[1..1 + len]).ok()?;
    let mut inner = String::new();
    inner.push_str(text).ok()?;
    Some(DeviceName(inner))
}

/// Encode `[len][bytes; 32]`, zero padding the tail.
pub(crate) fn encode_name(name: &DeviceName, field: &mut [u8]) {
    let bytes = name.as_str().as_bytes();
    field.fill(0);
    field[0] = bytes.len() as u8;
    field[1..1 + bytes.len()].copy_from_slice(bytes);
}
