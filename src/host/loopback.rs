//! In-process pad: a [`ReportEngine`] behind the [`HidTransport`] seam.
//!
//! [`SimulatedPad`] is the "device" end (plug/unplug, sensor feed, fault
//! injection) and [`LoopbackTransport`] is what the device model talks to.
//! Both share one engine, so whatever the model writes is exactly what a
//! real pad would have applied.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use super::error::TransportError;
use super::transport::HidTransport;
use crate::engine::{PadState, ReportEngine};
use crate::protocol::input::INPUT_REPORT_SIZE;
use crate::protocol::PadVariant;

/// Input reports buffered before the oldest are dropped.
const INPUT_QUEUE_DEPTH: usize = 1024;

struct Inner {
    engine: ReportEngine,
    attached: bool,
    failing: bool,
    stalled: bool,
    inputs: VecDeque<[u8; INPUT_REPORT_SIZE]>,
    writes: usize,
}

/// Handle to a simulated pad. Clones control the same pad.
#[derive(Clone)]
pub struct SimulatedPad {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedPad {
    /// An attached pad with factory configuration.
    pub fn new(variant: PadVariant) -> Self {
        Self::with_engine(ReportEngine::with_defaults(variant))
    }

    pub fn with_engine(engine: ReportEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                engine,
                attached: true,
                failing: false,
                stalled: false,
                inputs: VecDeque::new(),
                writes: 0,
            })),
        }
    }

    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport { pad: self.clone() }
    }

    pub fn attach(&self) {
        self.inner.lock().attached = true;
    }

    /// Unplug. Queued input reports are lost.
    pub fn detach(&self) {
        let mut inner = self.inner.lock();
        inner.attached = false;
        inner.inputs.clear();
    }

    /// Every transport call fails with an I/O error while set.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    /// Every transport call blocks while set.
    pub fn set_stalled(&self, stalled: bool) {
        self.inner.lock().stalled = stalled;
    }

    pub fn set_sensors(&self, readings: &[u16]) {
        self.inner.lock().engine.update_sensors(readings);
    }

    /// Queue `count` input reports built from the current state, as the
    /// firmware does once per USB poll.
    pub fn tick(&self, count: usize) {
        let mut inner = self.inner.lock();
        if !inner.attached {
            return;
        }
        for _ in 0..count {
            let mut report = [0u8; INPUT_REPORT_SIZE];
            inner.engine.build_input_report(&mut report);
            if inner.inputs.len() == INPUT_QUEUE_DEPTH {
                inner.inputs.pop_front();
            }
            inner.inputs.push_back(report);
        }
    }

    /// Copy of the authoritative state.
    pub fn state(&self) -> PadState {
        self.inner.lock().engine.state().clone()
    }

    /// Configuration writes received so far, applied or not.
    pub fn writes(&self) -> usize {
        self.inner.lock().writes
    }

    pub fn take_dirty(&self) -> bool {
        self.inner.lock().engine.take_dirty()
    }

    fn wait_while_stalled(&self) {
        while self.inner.lock().stalled {
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Run `op` against a reachable pad.
    fn with_attached<R>(
        &self,
        op: impl FnOnce(&mut Inner) -> Result<R, TransportError>,
    ) -> Result<R, TransportError> {
        self.wait_while_stalled();
        let mut inner = self.inner.lock();
        if inner.failing {
            return Err(TransportError::Io("injected failure".into()));
        }
        if !inner.attached {
            return Err(TransportError::Disconnected);
        }
        op(&mut *inner)
    }

    fn write(&self, report_id: u8, payload: &[u8], output: bool) -> Result<(), TransportError> {
        self.with_attached(|inner| {
            inner.writes += 1;
            let result = if output {
                inner.engine.handle_output_report(report_id, payload)
            } else {
                inner.engine.handle_feature_write(report_id, payload)
            };
            // Firmware acknowledges malformed writes; only the state tells.
            if let Err(err) = result {
                debug!(%err, "simulated pad dropped write");
            }
            Ok(())
        })
    }
}

/// Transport end of a [`SimulatedPad`].
pub struct LoopbackTransport {
    pad: SimulatedPad,
}

impl HidTransport for LoopbackTransport {
    fn poll_presence(&mut self) -> Result<bool, TransportError> {
        self.pad.wait_while_stalled();
        let inner = self.pad.inner.lock();
        if inner.failing {
            return Err(TransportError::Io("injected failure".into()));
        }
        Ok(inner.attached)
    }

    fn get_feature_report(
        &mut self,
        report_id: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        self.pad
            .with_attached(|inner| Ok(inner.engine.handle_feature_read(report_id, buf)))
    }

    fn send_feature_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        self.pad.write(report_id, payload, false)
    }

    fn send_output_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        self.pad.write(report_id, payload, true)
    }

    fn read_input_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        self.pad.with_attached(|inner| {
            Ok(inner.inputs.pop_front().map(|report| {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                len
            }))
        })
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{report_id, MAX_PAYLOAD_SIZE};

    #[test]
    fn detached_pad_refuses_io() {
        let pad = SimulatedPad::new(PadVariant::new(8, 4, 0));
        let mut transport = pad.transport();
        assert_eq!(transport.poll_presence(), Ok(true));

        pad.detach();
        assert_eq!(transport.poll_presence(), Ok(false));
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        assert_eq!(
            transport.get_feature_report(report_id::IDENTITY, &mut buf),
            Err(TransportError::Disconnected)
        );
    }

    #[test]
    fn ticks_queue_input_reports() {
        let pad = SimulatedPad::new(PadVariant::new(8, 4, 0));
        let mut transport = pad.transport();
        pad.set_sensors(&[4095; 8]);
        pad.tick(3);

        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        for _ in 0..3 {
            assert_eq!(
                transport.read_input_report(&mut buf),
                Ok(Some(INPUT_REPORT_SIZE))
            );
            assert_eq!(&buf[..2], &[0x0F, 0x00]);
        }
        assert_eq!(transport.read_input_report(&mut buf), Ok(None));
    }

    #[test]
    fn malformed_write_is_acknowledged_but_not_applied() {
        let pad = SimulatedPad::new(PadVariant::new(8, 4, 0));
        let mut transport = pad.transport();
        let before = pad.state();

        assert_eq!(
            transport.send_output_report(report_id::SENSITIVITY, &[1, 2, 3]),
            Ok(())
        );
        assert_eq!(pad.writes(), 1);
        assert_eq!(pad.state(), before);
        assert!(!pad.take_dirty());
    }

    #[test]
    fn injected_failure_surfaces_as_io() {
        let pad = SimulatedPad::new(PadVariant::new(8, 4, 0));
        let mut transport = pad.transport();
        pad.set_failing(true);
        assert!(matches!(
            transport.poll_presence(),
            Err(TransportError::Io(_))
        ));
    }
}
