//! USB Device subsystem - presents the pad to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. The pad is a single HID interface carrying every report
//! of the pad protocol:
//!
//! - Interrupt IN: input reports (sensor values + buttons), once per poll
//! - Interrupt OUT: configuration writes sent as output reports
//! - Control pipe: GET_REPORT / SET_REPORT for feature reports
//!
//! All three paths go through the one shared [`ReportEngine`].
//!
//! [`ReportEngine`]: adp_pad::ReportEngine

pub mod hid_device;

use core::cell::RefCell;

use adp_pad::ReportEngine;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Engine shared between the USB callbacks, the sampling loop and storage.
///
/// Every access is a short critical section, so an input report is never
/// built from a half-applied configuration write.
pub type SharedEngine = Mutex<CriticalSectionRawMutex, RefCell<ReportEngine>>;

/// Run `f` with exclusive access to the engine.
pub fn with_engine<R>(engine: &SharedEngine, f: impl FnOnce(&mut ReportEngine) -> R) -> R {
    engine.lock(|cell| f(&mut cell.borrow_mut()))
}
