//! Application-wide constants and compile-time configuration.
//!
//! USB identity, timing parameters, flash layout and the hardware variant
//! live here so they can be tuned in one place. Wire-format limits belong to
//! [`crate::protocol`].

// USB

/// USB VID/PID - "pid.codes" open-source VID with the pad's allocated PID.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0xB196;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "DDR-EXP";
pub const USB_PRODUCT: &str = "FSR Mini pad";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms). 1 ms = 1000 Hz.
pub const USB_HID_POLL_MS: u8 = 1;

/// Upper bound for a single input report send (ms).
pub const INPUT_REPORT_SEND_TIMEOUT_MS: u64 = 200;

// Firmware version reported in the identity report

pub const FIRMWARE_VERSION_MAJOR: u8 = 1;
pub const FIRMWARE_VERSION_MINOR: u8 = 2;

// Hardware variant (FSR mini pad: 4 panels, 2 sensors each)

/// Number of FSR channels wired to the SAADC.
pub const SENSOR_COUNT: u8 = 8;

/// Number of logical buttons exposed on the joystick collection.
pub const BUTTON_COUNT: u8 = 4;

/// Addressable LEDs on the board (0 = no lights).
pub const LED_COUNT: u8 = 0;

/// Default press threshold applied on factory reset (12-bit ADC counts).
pub const DEFAULT_THRESHOLD: u16 = 400;

// Host polling

/// Host update tick (ms).
pub const HOST_POLL_INTERVAL_MS: u64 = 10;

/// Bound for a single host transport operation (ms).
pub const HOST_TRANSPORT_TIMEOUT_MS: u64 = 200;

/// Window over which the host measures the input report rate (ms).
pub const POLLING_RATE_WINDOW_MS: u64 = 1000;

/// Hard cap on input reports drained per host tick. Every queued report up
/// to the cap is read and all but the newest discarded; the cap only stops
/// a device that floods faster than the host can read.
pub const MAX_INPUT_REPORTS_PER_TICK: usize = 4096;

/// Interval between USB enumerations while no pad is attached (ms).
pub const HOST_RESCAN_INTERVAL_MS: u64 = 500;

// Configuration storage

/// Delay between the last configuration change and the flash write (ms).
pub const CONFIG_SAVE_DELAY_MS: u64 = 1000;

/// Flash page index where configuration storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for configuration storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
