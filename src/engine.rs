//! Firmware report engine.
//!
//! Owns the authoritative [`PadState`] and translates between it and wire
//! bytes. The free functions are pure over the state so they can be driven
//! without USB hardware; [`ReportEngine`] wraps them for the firmware and
//! tracks whether the configuration needs persisting.
//!
//! Every write decodes and validates the complete payload before touching the
//! state, then replaces the whole slice in one assignment. A rejected write
//! leaves the state bit-for-bit unchanged.

use crate::config;
use crate::error::{MalformedReport, ValidationError};
use crate::protocol::lights::LIGHTS_REPORT_SIZE;
use crate::protocol::mapping::MAPPING_REPORT_SIZE;
use crate::protocol::name::NAME_REPORT_SIZE;
use crate::protocol::sensitivity::SENSITIVITY_REPORT_SIZE;
use crate::protocol::{
    Command, DeviceName, Identity, InputReport, LightsConfig, MappingTable, PadVariant,
    ReportKind, SensitivityTable, MAX_SENSORS, PROTOCOL_VERSION_MAJOR, PROTOCOL_VERSION_MINOR,
};

/// Persistent configuration: everything the host can edit.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadConfig {
    pub sensitivity: SensitivityTable,
    pub mapping: MappingTable,
    pub lights: LightsConfig,
    pub name: DeviceName,
}

/// Storage blob format version. Bump when the blob layout changes.
const STORED_FORMAT_VERSION: u8 = 1;

impl PadConfig {
    /// Serialized size of the storage blob.
    pub const STORED_SIZE: usize = 1
        + SENSITIVITY_REPORT_SIZE
        + MAPPING_REPORT_SIZE
        + LIGHTS_REPORT_SIZE
        + NAME_REPORT_SIZE;

    /// Factory configuration for a hardware variant.
    pub fn defaults(variant: &PadVariant) -> Self {
        let mut name = DeviceName::default();
        if let Ok(product) = DeviceName::new(config::USB_PRODUCT) {
            name = product;
        }
        Self {
            sensitivity: SensitivityTable::uniform(variant, config::DEFAULT_THRESHOLD),
            mapping: MappingTable::spread(variant),
            lights: LightsConfig::default(),
            name,
        }
    }

    pub fn validate(&self, variant: &PadVariant) -> Result<(), ValidationError> {
        self.sensitivity.validate(variant)?;
        self.mapping.validate(variant)?;
        self.name.validate()
    }

    /// Serialise for flash storage: `[version][sensitivity][mapping][lights][name]`.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < Self::STORED_SIZE {
            return 0;
        }
        buf[0] = STORED_FORMAT_VERSION;
        let mut offset = 1;
        offset += self.sensitivity.serialize(&mut buf[offset..]);
        offset += self.mapping.serialize(&mut buf[offset..]);
        offset += self.lights.serialize(&mut buf[offset..]);
        offset += self.name.serialize(&mut buf[offset..]);
        offset
    }

    /// Restore from flash. `None` for foreign versions or anything that does
    /// not validate against `variant` (the caller falls back to defaults).
    pub fn from_stored(data: &[u8], variant: &PadVariant) -> Option<Self> {
        if data.len() < Self::STORED_SIZE || data[0] != STORED_FORMAT_VERSION {
            return None;
        }
        let mut offset = 1;
        let sensitivity = SensitivityTable::from_bytes(&data[offset..])?;
        offset += SENSITIVITY_REPORT_SIZE;
        let mapping = MappingTable::from_bytes(&data[offset..])?;
        offset += MAPPING_REPORT_SIZE;
        let lights = LightsConfig::from_bytes(&data[offset..])?;
        offset += LIGHTS_REPORT_SIZE;
        let name = DeviceName::from_bytes(&data[offset..])?;

        let restored = Self {
            sensitivity,
            mapping,
            lights,
            name,
        };
        restored.validate(variant).ok()?;
        Some(restored)
    }
}

/// Live sensor state, refreshed every sampling tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LiveState {
    pub sensors: [u16; MAX_SENSORS],
    /// Sensors currently past their threshold (bit n = sensor n).
    pub pressed_sensors: u16,
    /// Logical buttons currently held (bit n = button n).
    pub buttons: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadState {
    pub variant: PadVariant,
    pub config: PadConfig,
    pub live: LiveState,
}

impl PadState {
    pub fn new(variant: PadVariant, config: PadConfig) -> Self {
        Self {
            variant,
            config,
            live: LiveState::default(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            protocol_major: PROTOCOL_VERSION_MAJOR,
            protocol_minor: PROTOCOL_VERSION_MINOR,
            firmware_major: config::FIRMWARE_VERSION_MAJOR,
            firmware_minor: config::FIRMWARE_VERSION_MINOR,
            variant: self.variant,
            name: self.config.name.clone(),
        }
    }

    pub fn input_report(&self) -> InputReport {
        InputReport {
            buttons: self.live.buttons,
            sensors: self.live.sensors,
        }
    }

    /// Feed fresh readings. Channels beyond the variant's sensor count are
    /// forced to 0; missing readings count as 0.
    pub fn update_sensors(&mut self, readings: &[u16]) {
        let mut sensors = [0u16; MAX_SENSORS];
        for (i, slot) in sensors.iter_mut().take(self.variant.sensors()).enumerate() {
            *slot = readings.get(i).copied().unwrap_or(0);
        }
        self.live.sensors = sensors;
        self.refresh_buttons();
    }

    /// Re-derive pressed sensors and buttons from the current readings,
    /// thresholds and mapping.
    fn refresh_buttons(&mut self) {
        let sensitivity = &self.config.sensitivity;
        let mut pressed_sensors = 0u16;
        let mut buttons = 0u16;

        for sensor in 0..self.variant.sensors() {
            let value = self.live.sensors[sensor];
            let was_pressed = self.live.pressed_sensors & (1 << sensor) != 0;
            let pressed = if was_pressed {
                value >= sensitivity.release_threshold(sensor)
            } else {
                value >= sensitivity.thresholds[sensor]
            };
            if !pressed {
                continue;
            }
            pressed_sensors |= 1 << sensor;
            if let Some(button) = self.config.mapping.button_for(sensor) {
                if button < self.variant.button_count {
                    buttons |= 1 << button;
                }
            }
        }

        self.live.pressed_sensors = pressed_sensors;
        self.live.buttons = buttons;
    }
}

/// Which slice of [`PadState`] a successful write replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Applied {
    Sensitivity,
    Mapping,
    Lights,
    Name,
    FactoryReset,
}

/// Serialise the live input report. Returns bytes written.
pub fn build_input_report(state: &PadState, buf: &mut [u8]) -> usize {
    state.input_report().serialize(buf)
}

/// Serialise the configuration slice for a feature GET_REPORT.
///
/// Returns 0 ("unsupported") for unknown identifiers, reports that are not
/// feature-readable, and the lights report on hardware without lights.
pub fn read_feature(state: &PadState, report_id: u8, buf: &mut [u8]) -> usize {
    let Some(kind) = ReportKind::from_id(report_id) else {
        return 0;
    };
    match kind {
        ReportKind::Identity => state.identity().serialize(buf),
        ReportKind::Sensitivity => state.config.sensitivity.serialize(buf),
        ReportKind::Mapping => state.config.mapping.serialize(buf),
        ReportKind::Lights if state.variant.has_lights => state.config.lights.serialize(buf),
        ReportKind::Name => state.config.name.serialize(buf),
        ReportKind::Lights | ReportKind::Input | ReportKind::Command => 0,
    }
}

/// Apply a feature SET_REPORT or output report payload (report-ID byte
/// already stripped).
pub fn apply_report(
    state: &mut PadState,
    report_id: u8,
    data: &[u8],
) -> Result<Applied, MalformedReport> {
    let kind = ReportKind::from_id(report_id).ok_or(MalformedReport::UnknownReportId(report_id))?;
    if !kind.is_writable() {
        return Err(MalformedReport::ReadOnly(report_id));
    }

    let invalid = |reason| MalformedReport::Invalid { report_id, reason };
    let length = MalformedReport::Length {
        report_id,
        expected: kind.payload_len(),
        actual: data.len(),
    };
    if data.len() != kind.payload_len() {
        return Err(length);
    }

    let variant = state.variant;
    match kind {
        ReportKind::Sensitivity => {
            let table = SensitivityTable::from_bytes(data).ok_or(length)?;
            table.validate(&variant).map_err(invalid)?;
            state.config.sensitivity = table;
            state.refresh_buttons();
            Ok(Applied::Sensitivity)
        }
        ReportKind::Mapping => {
            let table = MappingTable::from_bytes(data).ok_or(length)?;
            table.validate(&variant).map_err(invalid)?;
            state.config.mapping = table;
            state.refresh_buttons();
            Ok(Applied::Mapping)
        }
        ReportKind::Lights => {
            if !variant.has_lights {
                return Err(invalid(ValidationError::LightsUnsupported));
            }
            let lights = LightsConfig::from_bytes(data)
                .ok_or(invalid(ValidationError::UnknownLightsMode(data[0])))?;
            state.config.lights = lights;
            Ok(Applied::Lights)
        }
        ReportKind::Name => {
            let name = DeviceName::from_bytes(data).ok_or(invalid(ValidationError::NameInvalid))?;
            name.validate().map_err(invalid)?;
            state.config.name = name;
            Ok(Applied::Name)
        }
        ReportKind::Command => match Command::from_bytes(data).map_err(invalid)? {
            Command::FactoryReset => {
                state.config = PadConfig::defaults(&variant);
                state.refresh_buttons();
                Ok(Applied::FactoryReset)
            }
        },
        ReportKind::Input | ReportKind::Identity => Err(MalformedReport::ReadOnly(report_id)),
    }
}

/// Report engine instance owned by the firmware's USB layer.
///
/// One engine per pad; callers hand it to USB callbacks by reference rather
/// than reaching for a global.
pub struct ReportEngine {
    state: PadState,
    dirty: bool,
}

impl ReportEngine {
    pub fn new(variant: PadVariant, config: PadConfig) -> Self {
        Self {
            state: PadState::new(variant, config),
            dirty: false,
        }
    }

    /// Engine with the variant's factory configuration.
    pub fn with_defaults(variant: PadVariant) -> Self {
        Self::new(variant, PadConfig::defaults(&variant))
    }

    pub fn state(&self) -> &PadState {
        &self.state
    }

    pub fn update_sensors(&mut self, readings: &[u16]) {
        self.state.update_sensors(readings);
    }

    pub fn build_input_report(&self, buf: &mut [u8]) -> usize {
        build_input_report(&self.state, buf)
    }

    pub fn handle_feature_read(&self, report_id: u8, buf: &mut [u8]) -> usize {
        read_feature(&self.state, report_id, buf)
    }

    pub fn handle_feature_write(
        &mut self,
        report_id: u8,
        data: &[u8],
    ) -> Result<Applied, MalformedReport> {
        let applied = apply_report(&mut self.state, report_id, data)?;
        self.dirty = true;
        Ok(applied)
    }

    /// Output reports mirror the feature identifiers and layouts.
    pub fn handle_output_report(
        &mut self,
        report_id: u8,
        data: &[u8],
    ) -> Result<Applied, MalformedReport> {
        self.handle_feature_write(report_id, data)
    }

    /// Returns `true` once per batch of applied writes.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mapping::UNMAPPED;
    use crate::protocol::{report_id, MAX_PAYLOAD_SIZE};

    fn stock_variant() -> PadVariant {
        PadVariant::new(8, 4, 0)
    }

    fn lights_variant() -> PadVariant {
        PadVariant::new(12, 16, 24)
    }

    #[test]
    fn defaults_validate_for_every_variant() {
        for variant in [stock_variant(), lights_variant(), PadVariant::new(0, 0, 0)] {
            let config = PadConfig::defaults(&variant);
            assert_eq!(config.validate(&variant), Ok(()));
        }
    }

    #[test]
    fn default_mapping_pairs_sensors_per_panel() {
        let mapping = MappingTable::spread(&stock_variant());
        assert_eq!(&mapping.buttons[..8], &[0, 0, 1, 1, 2, 2, 3, 3]);
        assert!(mapping.buttons[8..].iter().all(|&b| b == UNMAPPED));
    }

    #[test]
    fn sensor_press_and_release_with_hysteresis() {
        let mut engine = ReportEngine::with_defaults(stock_variant());
        // Threshold 400, release below 375.
        engine.update_sensors(&[400, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(engine.state().live.buttons, 0b0001);

        engine.update_sensors(&[380, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(engine.state().live.buttons, 0b0001);

        engine.update_sensors(&[374, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(engine.state().live.buttons, 0);

        engine.update_sensors(&[380, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(engine.state().live.buttons, 0);
    }

    #[test]
    fn extra_readings_are_ignored() {
        let mut engine = ReportEngine::with_defaults(PadVariant::new(2, 1, 0));
        engine.update_sensors(&[1000, 1000, 1000, 1000]);
        let live = engine.state().live;
        assert_eq!(live.sensors[..3], [1000, 1000, 0]);
        assert_eq!(live.pressed_sensors, 0b11);
    }

    #[test]
    fn feature_read_unknown_id_is_empty() {
        let engine = ReportEngine::with_defaults(stock_variant());
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        assert_eq!(engine.handle_feature_read(0x42, &mut buf), 0);
        assert_eq!(engine.handle_feature_read(report_id::COMMAND, &mut buf), 0);
        assert_eq!(engine.handle_feature_read(report_id::INPUT, &mut buf), 0);
    }

    #[test]
    fn feature_read_lights_empty_without_lights() {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let engine = ReportEngine::with_defaults(stock_variant());
        assert_eq!(engine.handle_feature_read(report_id::LIGHTS, &mut buf), 0);

        let engine = ReportEngine::with_defaults(lights_variant());
        assert_eq!(
            engine.handle_feature_read(report_id::LIGHTS, &mut buf),
            LIGHTS_REPORT_SIZE
        );
    }

    #[test]
    fn feature_read_small_buffer_is_empty() {
        let engine = ReportEngine::with_defaults(stock_variant());
        let mut buf = [0u8; 4];
        assert_eq!(engine.handle_feature_read(report_id::IDENTITY, &mut buf), 0);
    }

    #[test]
    fn sensitivity_write_applies_and_marks_dirty() {
        let variant = stock_variant();
        let mut engine = ReportEngine::with_defaults(variant);
        let table = SensitivityTable::uniform(&variant, 900);
        let mut buf = [0u8; SENSITIVITY_REPORT_SIZE];
        table.serialize(&mut buf);

        let applied = engine.handle_feature_write(report_id::SENSITIVITY, &buf);
        assert_eq!(applied, Ok(Applied::Sensitivity));
        assert_eq!(engine.state().config.sensitivity, table);
        assert!(engine.take_dirty());
        assert!(!engine.take_dirty());
    }

    #[test]
    fn write_with_wrong_length_is_dropped() {
        let mut engine = ReportEngine::with_defaults(stock_variant());
        let before = engine.state().clone();

        let result = engine.handle_feature_write(report_id::MAPPING, &[0u8; 11]);
        assert_eq!(
            result,
            Err(MalformedReport::Length {
                report_id: report_id::MAPPING,
                expected: 12,
                actual: 11,
            })
        );
        assert_eq!(engine.state(), &before);
        assert!(!engine.take_dirty());
    }

    #[test]
    fn write_with_invalid_values_is_dropped() {
        let mut engine = ReportEngine::with_defaults(stock_variant());
        let before = engine.state().clone();

        let mut mapping = [UNMAPPED; MAPPING_REPORT_SIZE];
        mapping[0] = 7; // only 4 buttons
        let result = engine.handle_output_report(report_id::MAPPING, &mapping);
        assert_eq!(
            result,
            Err(MalformedReport::Invalid {
                report_id: report_id::MAPPING,
                reason: ValidationError::ButtonOutOfRange {
                    sensor: 0,
                    button: 7
                },
            })
        );
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn read_only_and_unknown_writes_rejected() {
        let mut engine = ReportEngine::with_defaults(stock_variant());
        assert_eq!(
            engine.handle_feature_write(report_id::IDENTITY, &[0u8; 41]),
            Err(MalformedReport::ReadOnly(report_id::IDENTITY))
        );
        assert_eq!(
            engine.handle_feature_write(0x30, &[0u8; 4]),
            Err(MalformedReport::UnknownReportId(0x30))
        );
    }

    #[test]
    fn lights_write_rejected_without_lights() {
        let mut engine = ReportEngine::with_defaults(stock_variant());
        let mut buf = [0u8; LIGHTS_REPORT_SIZE];
        LightsConfig::default().serialize(&mut buf);
        assert_eq!(
            engine.handle_feature_write(report_id::LIGHTS, &buf),
            Err(MalformedReport::Invalid {
                report_id: report_id::LIGHTS,
                reason: ValidationError::LightsUnsupported,
            })
        );
    }

    #[test]
    fn mapping_change_reroutes_held_sensor() {
        let variant = stock_variant();
        let mut engine = ReportEngine::with_defaults(variant);
        engine.update_sensors(&[2000, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(engine.state().live.buttons, 0b0001);

        let mut mapping = MappingTable::spread(&variant);
        mapping.buttons[0] = 3;
        let mut buf = [0u8; MAPPING_REPORT_SIZE];
        mapping.serialize(&mut buf);
        engine
            .handle_feature_write(report_id::MAPPING, &buf)
            .expect("mapping applies");
        assert_eq!(engine.state().live.buttons, 0b1000);
    }

    #[test]
    fn factory_reset_restores_defaults() {
        let variant = stock_variant();
        let mut engine = ReportEngine::with_defaults(variant);
        let mut buf = [0u8; NAME_REPORT_SIZE];
        DeviceName::new("Left pad").unwrap().serialize(&mut buf);
        engine.handle_feature_write(report_id::NAME, &buf).unwrap();
        assert_eq!(engine.state().config.name.as_str(), "Left pad");

        let applied = engine.handle_output_report(report_id::COMMAND, &[0x01]);
        assert_eq!(applied, Ok(Applied::FactoryReset));
        assert_eq!(engine.state().config, PadConfig::defaults(&variant));
    }

    #[test]
    fn stored_config_round_trip() {
        let variant = lights_variant();
        let mut config = PadConfig::defaults(&variant);
        config.sensitivity.thresholds[3] = 1234;
        config.name = DeviceName::new("Arcade P2").unwrap();

        let mut blob = [0u8; PadConfig::STORED_SIZE];
        assert_eq!(config.serialize(&mut blob), PadConfig::STORED_SIZE);
        assert_eq!(PadConfig::from_stored(&blob, &variant), Some(config));
    }

    #[test]
    fn stored_config_rejects_foreign_blobs() {
        let variant = stock_variant();
        let mut blob = [0u8; PadConfig::STORED_SIZE];
        PadConfig::defaults(&variant).serialize(&mut blob);

        let mut wrong_version = blob;
        wrong_version[0] = 9;
        assert_eq!(PadConfig::from_stored(&wrong_version, &variant), None);

        // Written by a 12-sensor build, read back on an 8-sensor board.
        let mut wide = [0u8; PadConfig::STORED_SIZE];
        PadConfig::defaults(&lights_variant()).serialize(&mut wide);
        assert_eq!(PadConfig::from_stored(&wide, &variant), None);

        assert_eq!(PadConfig::from_stored(&blob[..10], &variant), None);
    }
}
