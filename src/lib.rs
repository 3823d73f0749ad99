//! Library interface for adp-pad.
//!
//! The protocol codecs and the firmware [`engine`] are `no_std` and shared by
//! both sides of the USB cable. With the `host` feature (on by default) the
//! [`host`] module adds the PC-side device model that polls a pad, keeps
//! snapshots of its configuration and pushes edits back.
//!
//! Usage: `cargo test` runs everything that needs no hardware.
//!
//! Note: the firmware binary (`src/main.rs`, feature `embedded`) is
//! `#![no_std]`/`#![no_main]` and drives [`engine::ReportEngine`] from its
//! USB callbacks.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;

#[cfg(feature = "host")]
pub mod host;

pub use engine::{Applied, PadConfig, PadState, ReportEngine};
pub use error::{MalformedReport, ValidationError};
pub use protocol::{PadVariant, ReportKind};

/// Hardware variant this firmware build targets.
pub const FIRMWARE_VARIANT: PadVariant =
    PadVariant::new(config::SENSOR_COUNT, config::BUTTON_COUNT, config::LED_COUNT);

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - wire-level behaviour across protocol and engine
// ═══════════════════════════════════════════════════════════════════════════
