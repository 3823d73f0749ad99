//! Host-side device model.
//!
//! ```text
//!  presentation (adp-tool)
//!        |  update() / current_pad() / write_*()
//!        v
//!  DeviceModel ── HostSnapshot, ChangeFlags, PollingRateMeter
//!        |  HidTransport
//!        v
//!  TimeoutTransport ── worker thread, per-call timeout
//!        |
//!        v
//!  HidApiTransport (USB)  |  LoopbackTransport (SimulatedPad)
//! ```
//!
//! Only the model touches the transport. Everything above it works on
//! snapshots and typed write operations.

pub mod clock;
pub mod error;
pub mod loopback;
pub mod model;
pub mod snapshot;
pub mod timeout;
pub mod transport;
#[cfg(feature = "hidapi")]
pub mod usb;

pub use clock::{Clock, ManualClock, PollingRateMeter, SystemClock};
pub use error::{DeviceError, TransportError};
pub use loopback::{LoopbackTransport, SimulatedPad};
pub use model::{DeviceModel, DeviceModelConfig, WritePath};
pub use snapshot::{ChangeFlags, HostSnapshot, LightsSnapshot, PadSnapshot};
pub use timeout::{TimeoutConfig, TimeoutTransport};
pub use transport::HidTransport;
#[cfg(feature = "hidapi")]
pub use usb::HidApiTransport;
