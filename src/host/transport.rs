//! Transport seam between the device model and a USB HID stack.
//!
//! All payloads crossing this trait have the report-ID byte removed; the
//! identifier travels as a separate argument. Implementations add or strip
//! it as their stack requires.

use super::error::TransportError;

pub trait HidTransport {
    /// Is a pad currently reachable? Implementations may (re)open the device
    /// here. An error is treated like "absent" by the model.
    fn poll_presence(&mut self) -> Result<bool, TransportError>;

    /// Feature GET_REPORT. Returns the payload length, 0 when the pad does
    /// not support the report.
    fn get_feature_report(
        &mut self,
        report_id: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError>;

    /// Feature SET_REPORT.
    fn send_feature_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError>;

    /// Interrupt OUT report.
    fn send_output_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError>;

    /// Next queued input report payload, without blocking. `Ok(None)` when
    /// nothing is pending.
    fn read_input_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError>;

    /// Release the device handle. The next `poll_presence` may reopen it.
    fn close(&mut self);
}

impl<T: HidTransport + ?Sized> HidTransport for Box<T> {
    fn poll_presence(&mut self) -> Result<bool, TransportError> {
        (**self).poll_presence()
    }

    fn get_feature_report(
        &mut self,
        report_id: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        (**self).get_feature_report(report_id, buf)
    }

    fn send_feature_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        (**self).send_feature_report(report_id, payload)
    }

    fn send_output_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        (**self).send_output_report(report_id, payload)
    }

    fn read_input_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        (**self).read_input_report(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
