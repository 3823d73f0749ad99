//! Integration tests: host device model against the report engine.
//!
//! Every test drives a `DeviceModel` over a loopback transport into a
//! `SimulatedPad`, so both ends of the protocol run unmodified.

use std::thread;
use std::time::{Duration, Instant};

use adp_pad::error::MalformedReport;
use adp_pad::host::{
    ChangeFlags, DeviceError, DeviceModel, DeviceModelConfig, HidTransport, LoopbackTransport,
    ManualClock, SimulatedPad, TimeoutConfig, TimeoutTransport, TransportError, WritePath,
};
use adp_pad::protocol::mapping::UNMAPPED;
use adp_pad::protocol::{
    report_id, LightsConfig, LightsMode, MappingTable, PadVariant, Rgb, SensitivityTable,
    MAX_SENSORS, SENSOR_VALUE_MAX,
};
use adp_pad::{PadConfig, ReportEngine, ReportKind, ValidationError};
use proptest::prelude::*;

fn stock() -> PadVariant {
    PadVariant::new(8, 4, 0)
}

fn lit() -> PadVariant {
    PadVariant::new(4, 4, 4)
}

fn attached(variant: PadVariant) -> (SimulatedPad, DeviceModel<LoopbackTransport, ManualClock>) {
    attached_with(variant, DeviceModelConfig::default())
}

fn attached_with(
    variant: PadVariant,
    config: DeviceModelConfig,
) -> (SimulatedPad, DeviceModel<LoopbackTransport, ManualClock>) {
    let pad = SimulatedPad::new(variant);
    let mut model = DeviceModel::with_clock(pad.transport(), ManualClock::new(), config);
    let flags = model.update();
    assert!(flags.contains(ChangeFlags::DEVICE));
    (pad, model)
}

/// Flags ignoring the live input stream.
fn config_changes(model: &mut DeviceModel<LoopbackTransport, ManualClock>) -> ChangeFlags {
    model.update() - ChangeFlags::INPUT - ChangeFlags::POLLING_RATE
}

// ═══════════════════════════════════════════════════════════════════
// Discovery and presence
// ═══════════════════════════════════════════════════════════════════

#[test]
fn first_update_reports_everything_the_pad_has() {
    let pad = SimulatedPad::new(stock());
    let mut model =
        DeviceModel::with_clock(pad.transport(), ManualClock::new(), DeviceModelConfig::default());

    let flags = model.update();
    assert!(flags.contains(
        ChangeFlags::DEVICE | ChangeFlags::NAME | ChangeFlags::SENSITIVITY | ChangeFlags::MAPPING
    ));
    assert!(!flags.contains(ChangeFlags::LIGHTS));

    let snapshot = model.current_pad().expect("pad attached");
    let state = pad.state();
    assert_eq!(snapshot.identity, state.identity());
    assert_eq!(snapshot.sensitivity, state.config.sensitivity);
    assert_eq!(snapshot.mapping, state.config.mapping);
    assert!(model.current_lights().is_none());
}

#[test]
fn detach_and_reattach_cycle() {
    let (pad, mut model) = attached(stock());

    pad.detach();
    let flags = model.update();
    assert!(flags.contains(ChangeFlags::DEVICE));
    assert!(model.current_pad().is_none());
    assert_eq!(model.polling_rate(), 0);
    assert_eq!(model.update(), ChangeFlags::empty());

    pad.attach();
    let flags = model.update();
    assert!(flags.contains(ChangeFlags::DEVICE | ChangeFlags::NAME));
    assert_eq!(model.current_pad().map(|p| p.identity.clone()), Some(pad.state().identity()));
}

#[test]
fn steady_state_reports_no_changes() {
    let (_pad, mut model) = attached(stock());
    for _ in 0..5 {
        assert_eq!(config_changes(&mut model), ChangeFlags::empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Configuration writes
// ═══════════════════════════════════════════════════════════════════

#[test]
fn name_write_is_visible_after_next_update() {
    let (pad, mut model) = attached(stock());

    model.write_name("Left pad").expect("write");
    assert_ne!(model.current_pad().map(|p| p.name().as_str()), Some("Left pad"));

    assert_eq!(config_changes(&mut model), ChangeFlags::NAME);
    assert_eq!(model.current_pad().map(|p| p.name().as_str()), Some("Left pad"));
    assert!(pad.take_dirty());
}

#[test]
fn mapping_write_is_idempotent() {
    let (pad, mut model) = attached(stock());
    let mut mapping = MappingTable::spread(&stock());
    mapping.buttons[0] = 3;
    mapping.buttons[7] = UNMAPPED;

    model.write_mapping(&mapping).expect("first write");
    assert_eq!(config_changes(&mut model), ChangeFlags::MAPPING);

    model.write_mapping(&mapping).expect("second write");
    assert_eq!(config_changes(&mut model), ChangeFlags::empty());
    assert_eq!(pad.state().config.mapping, mapping);
    assert_eq!(pad.writes(), 2);
}

#[test]
fn invalid_writes_never_reach_the_pad() {
    let (pad, mut model) = attached(stock());

    let mut table = SensitivityTable::uniform(&stock(), 400);
    table.thresholds[2] = 0;
    assert!(matches!(
        model.write_sensitivity(&table),
        Err(DeviceError::Validation(ValidationError::ThresholdOutOfRange { sensor: 2, value: 0 }))
    ));

    let mut mapping = MappingTable::spread(&stock());
    mapping.buttons[1] = 4;
    assert!(matches!(
        model.write_mapping(&mapping),
        Err(DeviceError::Validation(ValidationError::ButtonOutOfRange { sensor: 1, button: 4 }))
    ));

    assert!(matches!(
        model.write_name(""),
        Err(DeviceError::Validation(ValidationError::NameEmpty))
    ));
    assert!(matches!(
        model.write_lights(&LightsConfig::default()),
        Err(DeviceError::Validation(ValidationError::LightsUnsupported))
    ));

    assert_eq!(pad.writes(), 0);
    assert_eq!(config_changes(&mut model), ChangeFlags::empty());
}

#[test]
fn writes_without_a_pad_are_rejected() {
    let pad = SimulatedPad::new(stock());
    pad.detach();
    let mut model =
        DeviceModel::with_clock(pad.transport(), ManualClock::new(), DeviceModelConfig::default());
    model.update();

    assert!(matches!(
        model.write_name("Nope"),
        Err(DeviceError::Transport(TransportError::NotAttached))
    ));
    assert!(matches!(
        model.factory_reset(),
        Err(DeviceError::Transport(TransportError::NotAttached))
    ));
    assert_eq!(pad.writes(), 0);
}

#[test]
fn output_report_path_applies_like_feature_path() {
    let config = DeviceModelConfig {
        write_path: WritePath::Output,
        ..DeviceModelConfig::default()
    };
    let (pad, mut model) = attached_with(stock(), config);

    let table = SensitivityTable::uniform(&stock(), 1200);
    model.write_sensitivity(&table).expect("write");
    assert_eq!(config_changes(&mut model), ChangeFlags::SENSITIVITY);
    assert_eq!(pad.state().config.sensitivity, table);
}

#[test]
fn lights_round_trip_on_a_lit_pad() {
    let (pad, mut model) = attached(lit());
    assert!(model.current_lights().is_some());

    let mut lights = LightsConfig::default();
    lights.mode = LightsMode::Reactive;
    lights.brightness = 255;
    lights.pressed[1] = Rgb::new(255, 0, 0);
    model.write_lights(&lights).expect("write");

    assert_eq!(config_changes(&mut model), ChangeFlags::LIGHTS);
    let snapshot = model.current_lights().expect("lights");
    assert_eq!(snapshot.led_count, 4);
    assert_eq!(snapshot.config, lights);
    assert_eq!(pad.state().config.lights, lights);
}

#[test]
fn factory_reset_restores_defaults_everywhere() {
    let (pad, mut model) = attached(stock());
    model.write_name("Custom").expect("name");
    model
        .write_sensitivity(&SensitivityTable::uniform(&stock(), 2000))
        .expect("sensitivity");
    model.update();

    model.factory_reset().expect("reset");
    let flags = config_changes(&mut model);
    assert_eq!(flags, ChangeFlags::NAME | ChangeFlags::SENSITIVITY);

    let defaults = PadConfig::defaults(&stock());
    assert_eq!(pad.state().config, defaults);
    let snapshot = model.current_pad().expect("pad");
    assert_eq!(snapshot.sensitivity, defaults.sensitivity);
    assert_eq!(snapshot.name(), &defaults.name);
}

// ═══════════════════════════════════════════════════════════════════
// Input stream
// ═══════════════════════════════════════════════════════════════════

#[test]
fn input_values_survive_the_trip_at_range_boundaries() {
    let (pad, mut model) = attached(stock());
    let readings = [0, SENSOR_VALUE_MAX, 1, 4094, 400, 399, 0, SENSOR_VALUE_MAX];
    pad.set_sensors(&readings);
    pad.tick(1);

    let flags = model.update();
    assert!(flags.contains(ChangeFlags::INPUT));
    let input = model.current_pad().expect("pad").input;
    assert_eq!(&input.sensors[..8], &readings);
    assert!(input.sensors[8..].iter().all(|&v| v == 0));

    // Default spread mapping: sensors 0-1 -> button 0, 2-3 -> 1, 4-5 -> 2, 6-7 -> 3.
    assert!(input.is_pressed(0));
    assert!(input.is_pressed(1));
    assert!(input.is_pressed(2));
    assert!(input.is_pressed(3));
}

#[test]
fn release_needs_reading_below_hysteresis_band() {
    let (pad, mut model) = attached(stock());
    let mut readings = [0u16; 8];

    readings[0] = 400;
    pad.set_sensors(&readings);
    pad.tick(1);
    model.update();
    assert!(model.current_pad().expect("pad").input.is_pressed(0));

    // 400 - 400/16 = 375: still held at 375, released at 374.
    readings[0] = 375;
    pad.set_sensors(&readings);
    pad.tick(1);
    model.update();
    assert!(model.current_pad().expect("pad").input.is_pressed(0));

    readings[0] = 374;
    pad.set_sensors(&readings);
    pad.tick(1);
    model.update();
    assert!(!model.current_pad().expect("pad").input.is_pressed(0));
}

#[test]
fn polling_rate_follows_report_cadence() {
    let clock = ManualClock::new();
    let pad = SimulatedPad::new(stock());
    let mut model =
        DeviceModel::with_clock(pad.transport(), clock.clone(), DeviceModelConfig::default());
    model.update();

    for _ in 0..100 {
        pad.tick(10);
        clock.advance(10);
        model.update();
    }
    assert_eq!(model.polling_rate(), 1000);
}

// ═══════════════════════════════════════════════════════════════════
// Persistence
// ═══════════════════════════════════════════════════════════════════

#[test]
fn configuration_survives_a_power_cycle() {
    let (pad, mut model) = attached(stock());
    model.write_name("Stage 2").expect("name");
    let mut mapping = MappingTable::default();
    mapping.buttons[4] = 0;
    model.write_mapping(&mapping).expect("mapping");

    let mut blob = [0u8; PadConfig::STORED_SIZE];
    let len = pad.state().config.serialize(&mut blob);
    assert_eq!(len, PadConfig::STORED_SIZE);

    let restored = PadConfig::from_stored(&blob, &stock()).expect("stored config");
    let rebooted = SimulatedPad::with_engine(ReportEngine::new(stock(), restored));
    let mut model = DeviceModel::with_clock(
        rebooted.transport(),
        ManualClock::new(),
        DeviceModelConfig::default(),
    );
    model.update();

    let snapshot = model.current_pad().expect("pad");
    assert_eq!(snapshot.name().as_str(), "Stage 2");
    assert_eq!(snapshot.mapping, mapping);
}

// ═══════════════════════════════════════════════════════════════════
// Stalled transport
// ═══════════════════════════════════════════════════════════════════

#[test]
fn stalled_pad_is_bounded_by_the_transport_timeout() {
    let pad = SimulatedPad::new(stock());
    let device = pad.clone();
    let timeouts = TimeoutConfig {
        read: Duration::from_millis(100),
        write: Duration::from_millis(100),
    };
    let transport =
        TimeoutTransport::spawn(timeouts, move || Ok(device.transport())).expect("spawn");
    let mut model = DeviceModel::new(transport);
    model.update();
    assert!(model.is_attached());

    pad.set_stalled(true);
    let started = Instant::now();
    let result = model.write_name("Stuck");
    assert!(matches!(
        result,
        Err(DeviceError::Transport(TransportError::Timeout { timeout_ms: 100 }))
    ));
    assert!(started.elapsed() < Duration::from_secs(1));

    // Further calls fail fast while the stalled one is outstanding.
    let started = Instant::now();
    let flags = model.update();
    assert!(flags.contains(ChangeFlags::DEVICE));
    assert!(!model.is_attached());
    assert!(started.elapsed() < Duration::from_secs(1));

    pad.set_stalled(false);
    let deadline = Instant::now() + Duration::from_secs(2);
    while !model.is_attached() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
        model.update();
    }
    assert!(model.is_attached());
}

// ═══════════════════════════════════════════════════════════════════
// Properties
// ═══════════════════════════════════════════════════════════════════

fn stock_thresholds() -> impl Strategy<Value = SensitivityTable> {
    prop::collection::vec(1u16..=SENSOR_VALUE_MAX, 8).prop_map(|values| {
        let mut thresholds = [0u16; MAX_SENSORS];
        thresholds[..8].copy_from_slice(&values);
        SensitivityTable { thresholds }
    })
}

/// A writable report paired with any payload length except its own.
fn writable_with_wrong_length() -> impl Strategy<Value = (ReportKind, usize)> {
    let writable: Vec<ReportKind> = ReportKind::ALL
        .into_iter()
        .filter(|kind| kind.is_writable())
        .collect();
    (prop::sample::select(writable), 0usize..64)
        .prop_filter("exact length", |(kind, len)| *len != kind.payload_len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_valid_sensitivity_reads_back_identically(table in stock_thresholds()) {
        let (pad, mut model) = attached(stock());
        model.write_sensitivity(&table).expect("write");
        model.update();

        prop_assert_eq!(model.current_pad().map(|p| p.sensitivity), Some(table));
        prop_assert_eq!(pad.state().config.sensitivity, table);
    }

    #[test]
    fn wrong_length_writes_change_nothing(
        (kind, len) in writable_with_wrong_length(),
        fill in any::<u8>(),
    ) {
        let (pad, mut model) = attached(lit());
        let before = pad.state();
        let payload = vec![fill; len];

        let mut raw = pad.transport();
        prop_assert_eq!(raw.send_feature_report(kind.id(), &payload), Ok(()));
        prop_assert_eq!(raw.send_output_report(kind.id(), &payload), Ok(()));

        prop_assert_eq!(pad.state(), before);
        prop_assert!(!pad.take_dirty());
        prop_assert_eq!(config_changes(&mut model), ChangeFlags::empty());
    }

    #[test]
    fn writes_to_read_only_reports_are_refused(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut engine = ReportEngine::with_defaults(stock());
        let before = engine.state().clone();

        prop_assert_eq!(
            engine.handle_feature_write(report_id::IDENTITY, &payload),
            Err(MalformedReport::ReadOnly(report_id::IDENTITY))
        );
        prop_assert_eq!(
            engine.handle_output_report(report_id::INPUT, &payload),
            Err(MalformedReport::ReadOnly(report_id::INPUT))
        );
        prop_assert_eq!(engine.state(), &before);
        prop_assert!(!engine.take_dirty());
    }
}
