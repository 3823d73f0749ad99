//! Command report: one-shot device actions.
//!
//! Layout (1 byte):
//! ```text
//! Byte 0:  Command code (0x01 = factory reset)
//! ```

use crate::error::ValidationError;

/// Command report size in bytes.
pub const COMMAND_REPORT_SIZE: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Restore the variant's default configuration.
    FactoryReset,
}

impl Command {
    pub const fn code(self) -> u8 {
        match self {
            Command::FactoryReset => 0x01,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ValidationError> {
        match data.first() {
            Some(0x01) => Ok(Command::FactoryReset),
            Some(&other) => Err(ValidationError::UnknownCommand(other)),
            None => Err(ValidationError::UnknownCommand(0)),
        }
    }

    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < COMMAND_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.code();
        COMMAND_REPORT_SIZE
    }
}
