//! Host-side error types.

use thiserror::Error;

use crate::error::ValidationError;

/// The pad could not be reached, or answered with something unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No pad is attached; nothing was sent.
    #[error("no pad attached")]
    NotAttached,

    /// The pad went away during the operation.
    #[error("pad disconnected")]
    Disconnected,

    #[error("transport did not respond within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// A previous operation timed out and is still stuck in the transport.
    #[error("transport busy with a stalled request")]
    Busy,

    /// The pad speaks a protocol major version we cannot decode.
    #[error("unsupported protocol version {major}")]
    UnsupportedProtocol { major: u8 },

    #[error("report id {report_id:#04x}: {reason}")]
    InvalidResponse {
        report_id: u8,
        reason: &'static str,
    },

    #[error("USB I/O error: {0}")]
    Io(String),
}

/// Error returned by [`DeviceModel`](super::DeviceModel) write operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Rejected locally; no transport I/O was attempted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl DeviceError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DeviceError::Validation(_))
    }
}
