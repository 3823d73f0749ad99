//! Bounded-time wrapper around any [`HidTransport`].
//!
//! The wrapped transport lives on a dedicated worker thread. Each call is
//! shipped over a channel and the caller waits at most the configured
//! timeout for the reply. A call that overruns keeps running on the worker;
//! until it finishes every new call fails fast with
//! [`TransportError::Busy`], so a wedged USB stack can never block the
//! polling loop for longer than one timeout.

use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, warn};

use super::error::TransportError;
use super::transport::HidTransport;
use crate::config::HOST_TRANSPORT_TIMEOUT_MS;
use crate::protocol::MAX_PAYLOAD_SIZE;

type Job = Box<dyn FnOnce(&mut dyn HidTransport) + Send>;

/// Per-operation time limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Presence polls, feature reads and input reads.
    pub read: Duration,
    /// Feature and output report writes.
    pub write: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read: Duration::from_millis(HOST_TRANSPORT_TIMEOUT_MS),
            write: Duration::from_millis(HOST_TRANSPORT_TIMEOUT_MS),
        }
    }
}

pub struct TimeoutTransport {
    jobs: Sender<Job>,
    timeouts: TimeoutConfig,
    /// Completion signal of the call that last timed out. Disconnects once
    /// that call returns.
    stalled: Option<Receiver<()>>,
}

impl TimeoutTransport {
    /// Start the worker thread and build the transport on it.
    ///
    /// `make` runs on the worker, so the transport itself does not need to
    /// be `Send`.
    pub fn spawn<T, F>(timeouts: TimeoutConfig, make: F) -> Result<Self, TransportError>
    where
        T: HidTransport + 'static,
        F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    {
        let (jobs_tx, jobs_rx) = channel::unbounded::<Job>();
        let (ready_tx, ready_rx) = channel::bounded(1);

        thread::Builder::new()
            .name("adp-transport".into())
            .spawn(move || {
                let mut transport = match make() {
                    Ok(transport) => {
                        let _ = ready_tx.send(Ok(()));
                        transport
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                for job in jobs_rx.iter() {
                    job(&mut transport);
                }
                transport.close();
                debug!("transport worker stopped");
            })
            .map_err(|e| TransportError::Io(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| TransportError::Io("transport worker exited during start-up".into()))??;

        Ok(Self {
            jobs: jobs_tx,
            timeouts,
            stalled: None,
        })
    }

    pub fn timeouts(&self) -> TimeoutConfig {
        self.timeouts
    }

    fn call<R, F>(&mut self, timeout: Duration, op: F) -> Result<R, TransportError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn HidTransport) -> Result<R, TransportError> + Send + 'static,
    {
        if let Some(stalled) = &self.stalled {
            match stalled.try_recv() {
                Err(TryRecvError::Empty) => return Err(TransportError::Busy),
                Ok(()) | Err(TryRecvError::Disconnected) => {
                    debug!("stalled transport call completed");
                    self.stalled = None;
                }
            }
        }

        let (reply_tx, reply_rx) = channel::bounded(1);
        let (done_tx, done_rx) = channel::bounded::<()>(1);
        let job: Job = Box::new(move |transport| {
            let _ = reply_tx.send(op(transport));
            drop(done_tx);
        });
        self.jobs
            .send(job)
            .map_err(|_| TransportError::Disconnected)?;

        match reply_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(timeout_ms, "transport call timed out");
                self.stalled = Some(done_rx);
                Err(TransportError::Timeout { timeout_ms })
            }
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

impl HidTransport for TimeoutTransport {
    fn poll_presence(&mut self) -> Result<bool, TransportError> {
        self.call(self.timeouts.read, |t| t.poll_presence())
    }

    fn get_feature_report(
        &mut self,
        report_id: u8,
        buf: &mut [u8],
    ) -> Result<usize, TransportError> {
        let data = self.call(self.timeouts.read, move |t| {
            let mut scratch = [0u8; MAX_PAYLOAD_SIZE];
            let len = t.get_feature_report(report_id, &mut scratch)?;
            Ok(scratch[..len.min(MAX_PAYLOAD_SIZE)].to_vec())
        })?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn send_feature_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        let payload = payload.to_vec();
        self.call(self.timeouts.write, move |t| {
            t.send_feature_report(report_id, &payload)
        })
    }

    fn send_output_report(&mut self, report_id: u8, payload: &[u8]) -> Result<(), TransportError> {
        let payload = payload.to_vec();
        self.call(self.timeouts.write, move |t| {
            t.send_output_report(report_id, &payload)
        })
    }

    fn read_input_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        let data = self.call(self.timeouts.read, |t| {
            let mut scratch = [0u8; MAX_PAYLOAD_SIZE];
            Ok(t
                .read_input_report(&mut scratch)?
                .map(|len| scratch[..len.min(MAX_PAYLOAD_SIZE)].to_vec()))
        })?;
        Ok(data.map(|data| {
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            len
        }))
    }

    fn close(&mut self) {
        // Best effort: a stalled worker will close once it drains.
        if let Err(err) = self.call(self.timeouts.write, |t| {
            t.close();
            Ok(())
        }) {
            debug!(%err, "close skipped");
        }
    }
}
