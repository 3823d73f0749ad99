//! Host device model: polls the transport, keeps [`HostSnapshot`] in sync
//! with the pad and pushes configuration edits back.
//!
//! ## Update tick
//!
//! 1. Presence check (may reopen the device).
//! 2. Feature reads: identity, sensitivity, mapping, lights (lights variants).
//! 3. Drain queued input reports, keep the newest, feed the rate meter.
//! 4. Diff against the previous snapshot, then replace it in one assignment.
//!
//! Any transport error, undecodable reply or unknown protocol major in steps
//! 1-3 makes the tick count as "absent": the handle is closed and the pad is
//! reported gone, so a flaky cable degrades instead of stopping the loop.
//!
//! Writes never touch the snapshot. The next `update()` is the only thing
//! that can show the new value.

use tracing::{debug, info, warn};

use super::clock::{Clock, PollingRateMeter, SystemClock};
use super::error::{DeviceError, TransportError};
use super::snapshot::{ChangeFlags, HostSnapshot, LightsSnapshot, PadSnapshot};
use super::transport::HidTransport;
use crate::config::MAX_INPUT_REPORTS_PER_TICK;
use crate::error::ValidationError;
use crate::protocol::{
    Command, DeviceName, Identity, InputReport, LightsConfig, MappingTable, PadVariant,
    ReportKind, SensitivityTable, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION_MAJOR,
};

/// How configuration writes reach the pad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WritePath {
    /// Feature SET_REPORT on the control pipe.
    #[default]
    Feature,
    /// Interrupt OUT reports, for stacks without SET_REPORT.
    Output,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceModelConfig {
    pub write_path: WritePath,
    /// Input reports drained per tick at most.
    pub max_input_reports_per_tick: usize,
}

impl Default for DeviceModelConfig {
    fn default() -> Self {
        Self {
            write_path: WritePath::Feature,
            max_input_reports_per_tick: MAX_INPUT_REPORTS_PER_TICK,
        }
    }
}

/// One model per pad. `update()` and the write operations take `&mut self`,
/// so callers sharing a model across threads must put it behind a mutex.
pub struct DeviceModel<T: HidTransport, C: Clock = SystemClock> {
    transport: T,
    clock: C,
    config: DeviceModelConfig,
    snapshot: HostSnapshot,
    meter: PollingRateMeter,
    /// Error of the previous tick, to log each distinct failure once.
    last_error: Option<TransportError>,
}

impl<T: HidTransport> DeviceModel<T> {
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock::new(), DeviceModelConfig::default())
    }
}

impl<T: HidTransport, C: Clock> DeviceModel<T, C> {
    pub fn with_clock(transport: T, clock: C, config: DeviceModelConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            snapshot: HostSnapshot::default(),
            meter: PollingRateMeter::default(),
            last_error: None,
        }
    }

    /// Poll the pad once and report what changed since the previous call.
    pub fn update(&mut self) -> ChangeFlags {
        let next = match self.poll() {
            Ok(next) => {
                self.last_error = None;
                next
            }
            Err(err) => {
                if self.last_error.as_ref() != Some(&err) {
                    warn!(%err, "pad unavailable");
                } else {
                    debug!(%err, "pad still unavailable");
                }
                // Close even when this handle never produced a snapshot.
                self.transport.close();
                self.last_error = Some(err);
                self.meter.reset();
                HostSnapshot::default()
            }
        };

        let flags = self.snapshot.diff(&next);
        if flags.contains(ChangeFlags::DEVICE) {
            match &next.pad {
                Some(pad) => info!(name = %pad.name(), "connected to pad"),
                None => info!("pad detached"),
            }
        }
        self.snapshot = next;
        flags
    }

    fn poll(&mut self) -> Result<HostSnapshot, TransportError> {
        if !self.transport.poll_presence()? {
            self.transport.close();
            self.meter.reset();
            return Ok(HostSnapshot::default());
        }

        let identity = self.read(ReportKind::Identity, Identity::from_bytes)?;
        if identity.protocol_major != PROTOCOL_VERSION_MAJOR {
            return Err(TransportError::UnsupportedProtocol {
                major: identity.protocol_major,
            });
        }
        let sensitivity = self.read(ReportKind::Sensitivity, SensitivityTable::from_bytes)?;
        let mapping = self.read(ReportKind::Mapping, MappingTable::from_bytes)?;
        let lights = self.read_lights(&identity.variant)?;

        if self.snapshot.pad.is_none() {
            self.meter.reset();
        }
        let input = self.drain_input()?;

        let previous_input = self.snapshot.pad.as_ref().map(|pad| pad.input);
        Ok(HostSnapshot {
            pad: Some(PadSnapshot {
                identity,
                sensitivity,
                mapping,
                input: input.or(previous_input).unwrap_or_default(),
            }),
            lights,
            polling_rate: self.meter.rate(),
        })
    }

    /// Feature read of a fixed-size report.
    fn read<R>(
        &mut self,
        kind: ReportKind,
        decode: impl FnOnce(&[u8]) -> Option<R>,
    ) -> Result<R, TransportError> {
        let report_id = kind.id();
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = self.transport.get_feature_report(report_id, &mut buf)?;
        if len != kind.payload_len() {
            return Err(TransportError::InvalidResponse {
                report_id,
                reason: "unexpected length",
            });
        }
        decode(&buf[..len]).ok_or(TransportError::InvalidResponse {
            report_id,
            reason: "undecodable payload",
        })
    }

    /// An empty lights read means "no lights", not an error.
    fn read_lights(
        &mut self,
        variant: &PadVariant,
    ) -> Result<Option<LightsSnapshot>, TransportError> {
        if !variant.has_lights {
            return Ok(None);
        }
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = self
            .transport
            .get_feature_report(ReportKind::Lights.id(), &mut buf)?;
        if len == 0 {
            return Ok(None);
        }
        let config = LightsConfig::from_bytes(&buf[..len]).ok_or(TransportError::InvalidResponse {
            report_id: ReportKind::Lights.id(),
            reason: "undecodable payload",
        })?;
        Ok(Some(LightsSnapshot {
            led_count: variant.led_count,
            config,
        }))
    }

    /// Newest queued input report, if any arrived since the last tick.
    fn drain_input(&mut self) -> Result<Option<InputReport>, TransportError> {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let mut latest = None;
        let mut received = 0;
        while received < self.config.max_input_reports_per_tick {
            let Some(len) = self.transport.read_input_report(&mut buf)? else {
                break;
            };
            received += 1;
            match InputReport::from_bytes(&buf[..len]) {
                Some(report) => latest = Some(report),
                None => debug!(len, "short input report ignored"),
            }
        }
        self.meter.record(received, self.clock.now_ms());
        Ok(latest)
    }

    /// Snapshot of the attached pad as of the last `update()`.
    pub fn current_pad(&self) -> Option<&PadSnapshot> {
        self.snapshot.pad.as_ref()
    }

    /// `None` when absent or when the pad has no lights.
    pub fn current_lights(&self) -> Option<&LightsSnapshot> {
        self.snapshot.lights.as_ref()
    }

    /// Observed input reports per second, 0 when unknown or absent.
    pub fn polling_rate(&self) -> u32 {
        self.snapshot.polling_rate
    }

    pub fn snapshot(&self) -> &HostSnapshot {
        &self.snapshot
    }

    pub fn is_attached(&self) -> bool {
        self.snapshot.pad.is_some()
    }

    pub fn write_sensitivity(&mut self, table: &SensitivityTable) -> Result<(), DeviceError> {
        let variant = self.attached_variant()?;
        table.validate(&variant)?;
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = table.serialize(&mut buf);
        self.send(ReportKind::Sensitivity, &buf[..len])
    }

    pub fn write_mapping(&mut self, table: &MappingTable) -> Result<(), DeviceError> {
        let variant = self.attached_variant()?;
        table.validate(&variant)?;
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = table.serialize(&mut buf);
        self.send(ReportKind::Mapping, &buf[..len])
    }

    pub fn write_lights(&mut self, lights: &LightsConfig) -> Result<(), DeviceError> {
        let variant = self.attached_variant()?;
        if !variant.has_lights {
            return Err(ValidationError::LightsUnsupported.into());
        }
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = lights.serialize(&mut buf);
        self.send(ReportKind::Lights, &buf[..len])
    }

    pub fn write_name(&mut self, name: &str) -> Result<(), DeviceError> {
        self.attached_variant()?;
        let name = DeviceName::new(name)?;
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = name.serialize(&mut buf);
        self.send(ReportKind::Name, &buf[..len])
    }

    /// Ask the pad to restore its factory configuration.
    pub fn factory_reset(&mut self) -> Result<(), DeviceError> {
        self.attached_variant()?;
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let len = Command::FactoryReset.serialize(&mut buf);
        self.send(ReportKind::Command, &buf[..len])
    }

    fn attached_variant(&self) -> Result<PadVariant, TransportError> {
        self.snapshot
            .pad
            .as_ref()
            .map(|pad| pad.identity.variant)
            .ok_or(TransportError::NotAttached)
    }

    fn send(&mut self, kind: ReportKind, payload: &[u8]) -> Result<(), DeviceError> {
        let result = match self.config.write_path {
            WritePath::Feature => self.transport.send_feature_report(kind.id(), payload),
            WritePath::Output => self.transport.send_output_report(kind.id(), payload),
        };
        match &result {
            Ok(()) => debug!(report = ?kind, len = payload.len(), "report sent"),
            Err(err) => warn!(report = ?kind, %err, "report write failed"),
        }
        result.map_err(DeviceError::from)
    }
}
