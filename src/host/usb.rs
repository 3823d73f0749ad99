//! Real USB access through `hidapi`.
//!
//! The pad exposes two top-level collections. Some platforms (Windows) give
//! each collection its own device path, others (Linux hidraw) one path for
//! the whole interface, so both handles are resolved independently:
//!
//! - configuration handle: the vendor collection (usage page 0xFF00),
//!   falling back to the first matching path
//! - input handle: the joystick collection, if it has a separate path
//!
//! hidapi frames every report with its report-ID byte in front; this module
//! adds and strips it so the [`HidTransport`] payloads stay ID-free.

use std::ffi::CString;
use std::time::{Duration, Instant};

use hidapi::{HidApi, HidDevice, HidError};
use tracing::{debug, info, warn};

use super::error::TransportError;
use super::transport::HidTransport;
use crate::config::{HOST_RESCAN_INTERVAL_MS, USB_PID, USB_VID};
use crate::protocol::{report_id, MAX_PAYLOAD_SIZE};

const USAGE_PAGE_GENERIC_DESKTOP: u16 = 0x01;
const USAGE_JOYSTICK: u16 = 0x04;
const USAGE_PAGE_VENDOR: u16 = 0xFF00;

fn io(err: HidError) -> TransportError {
    TransportError::Io(err.to_string())
}

struct OpenPad {
    config: HidDevice,
    input: Option<HidDevice>,
}

impl OpenPad {
    fn input(&self) -> &HidDevice {
        self.input.as_ref().unwrap_or(&self.config)
    }
}

pub struct HidApiTransport {
    api: HidApi,
    vendor_id: u16,
    product_id: u16,
    rescan_interval: Duration,
    last_scan: Option<Instant>,
    pad: Option<OpenPad>,
}

impl HidApiTransport {
    /// Transport for the pad's own VID/PID.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_ids(USB_VID, USB_PID)
    }

    pub fn with_ids(vendor_id: u16, product_id: u16) -> Result<Self, TransportError> {
        let api = HidApi::new().map_err(io)?;
        Ok(Self {
            api,
            vendor_id,
            product_id,
            rescan_interval: Duration::from_millis(HOST_RESCAN_INTERVAL_MS),
            last_scan: None,
            pad: None,
        })
    }

    fn scan_due(&self) -> bool {
        self.last_scan
            .map_or(true, |at| at.elapsed() >= self.rescan_interval)
    }

    /// Enumerate and open the pad. `Ok(false)` when it is not plugged in.
    fn open(&mut self) -> Result<bool, TransportError> {
        self.last_scan = Some(Instant::now());
        self.api.refresh_devices().map_err(io)?;

        let mut config_path: Option<CString> = None;
        let mut input_path: Option<CString> = None;
        let mut first_path: Option<CString> = None;
        for info in self.api.device_list() {
            if info.vendor_id() != self.vendor_id || info.product_id() != self.product_id {
                continue;
            }
            let path = info.path().to_owned();
            if first_path.is_none() {
                first_path = Some(path.clone());
            }
            match (info.usage_page(), info.usage()) {
                (USAGE_PAGE_VENDOR, _) if config_path.is_none() => config_path = Some(path),
                (USAGE_PAGE_GENERIC_DESKTOP, USAGE_JOYSTICK) if input_path.is_none() => {
                    input_path = Some(path)
                }
                _ => {}
            }
        }

        let Some(config_path) = config_path.or(first_path) else {
            return Ok(false);
        };
        let config = self.api.open_path(&config_path).map_err(io)?;

        let input = match input_path.filter(|path| *path != config_path) {
            Some(path) => match self.api.open_path(&path) {
                Ok(device) => Some(device),
                Err(err) => {
                    warn!(%err, "joystick collection not readable, using config handle");
                    None
                }
            },
            None => None,
        };

        info!(
            vid = format_args!("{:04x}", self.vendor_id),
            pid = format_args!("{:04x}", self.product_id),
            split = input.is_some(),
            "pad opened"
        );
        self.pad = Some(OpenPad { config, input });
        Ok(true)
    }

    fn pad(&self) -> Result<&OpenPad, TransportError> {
        self.pad.as_ref().ok_or(TransportError::Disconnected)
    }

    fn framed(report_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(1 + payload.len());
        data.push(report_id);
        data.extend_from_slice(payload);
        data
    }
}

impl HidTransport for HidApiTransport {
    fn poll_presence(&mut self) -> Result<bool, TransportError> {
        if self.pad.is_some() {
            return Ok(true);
        }
        if !self.scan_due() {
            return Ok(false);
        }
        self.open()
    }

    fn get_feature_report(
        &mut self,
        report_id: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        let mut data = [0u8; 1 + MAX_PAYLOAD_SIZE];
        data[0] = report_id;
        let read = self.pad()?.config.get_feature_report(&mut data).map_err(io)?;
        if read <= 1 {
            return Ok(0);
        }
        let len = (read - 1).min(buf.len());
        buf[..len].copy_from_slice(&data[1..1 + len]);
        Ok(len)
    }

    fn send_feature_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        let data = Self::framed(report_id, payload);
        self.pad()?.config.send_feature_report(&data).map_err(io)
    }

    fn send_output_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        let data = Self::framed(report_id, payload);
        let written = self.pad()?.config.write(&data).map_err(io)?;
        if written < data.len() {
            return Err(TransportError::Io(format!(
                "short output write: {written} of {} bytes",
                data.len()
            )));
        }
        Ok(())
    }

    fn read_input_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        let device = self.pad()?.input();
        let mut data = [0u8; 1 + MAX_PAYLOAD_SIZE];
        loop {
            let read = device.read_timeout(&mut data, 0).map_err(io)?;
            if read == 0 {
                return Ok(None);
            }
            if data[0] != report_id::INPUT {
                debug!(report_id = data[0], "skipping non-input report");
                continue;
            }
            let len = (read - 1).min(buf.len());
            buf[..len].copy_from_slice(&data[1..1 + len]);
            return Ok(Some(len));
        }
    }

    fn close(&mut self) {
        if self.pad.take().is_some() {
            debug!("pad handle closed");
            self.last_scan = None;
        }
    }
}
