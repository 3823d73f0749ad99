//! adp-tool - monitor and configure an FSR dance pad over USB HID.
//!
//! Every editing command does one update, the write, then a confirming
//! update, and only reports success when the pad reads back the new value.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use adp_pad::config::{HOST_POLL_INTERVAL_MS, HOST_RESCAN_INTERVAL_MS};
use adp_pad::host::{
    ChangeFlags, DeviceModel, DeviceModelConfig, HidApiTransport, PadSnapshot, SimulatedPad,
    SystemClock, TimeoutConfig, TimeoutTransport, WritePath,
};
use adp_pad::protocol::mapping::UNMAPPED;
use adp_pad::protocol::{LightsConfig, LightsMode, Rgb, SensitivityTable};
use adp_pad::{PadConfig, FIRMWARE_VARIANT};

type Model = DeviceModel<TimeoutTransport, SystemClock>;

#[derive(Parser)]
#[command(name = "adp-tool", version, about = "FSR dance pad monitor and configuration tool")]
struct Cli {
    /// Talk to an in-process simulated pad instead of USB
    #[arg(long, global = true)]
    simulate: bool,

    /// Send configuration as output reports instead of feature reports
    #[arg(long, global = true)]
    output_reports: bool,

    /// Update interval in milliseconds
    #[arg(long, global = true, default_value_t = HOST_POLL_INTERVAL_MS)]
    interval_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the pad: connection, polling rate, configuration changes
    Monitor {
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Print identity and configuration once
    Info,
    /// Rename the pad
    SetName { name: String },
    /// Set the press threshold of one sensor, or of all sensors
    SetThreshold {
        /// Sensor index (0-based); all present sensors when omitted
        #[arg(long)]
        sensor: Option<usize>,
        /// Threshold in ADC counts (1-4095)
        value: u16,
    },
    /// Map a sensor to a logical button
    Map {
        /// Sensor index (0-based)
        sensor: usize,
        /// Button index (0-based) or "none"
        #[arg(value_parser = parse_button)]
        button: u8,
    },
    /// Change the lights configuration (lights variants only)
    Lights {
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long)]
        brightness: Option<u8>,
        /// Idle colour as RRGGBB hex
        #[arg(long, value_parser = parse_rgb)]
        idle: Option<Rgb>,
    },
    /// Restore factory configuration
    FactoryReset,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Off,
    Static,
    Reactive,
}

impl From<ModeArg> for LightsMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Off => LightsMode::Off,
            ModeArg::Static => LightsMode::Static,
            ModeArg::Reactive => LightsMode::Reactive,
        }
    }
}

fn parse_button(s: &str) -> Result<u8, String> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(UNMAPPED);
    }
    s.parse::<u8>()
        .map_err(|e| format!("invalid button '{s}': {e}"))
}

fn parse_rgb(s: &str) -> Result<Rgb, String> {
    let s = s.trim_start_matches('#');
    if s.len() != 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("expected RRGGBB, got '{s}'"));
    }
    let value = u32::from_str_radix(s, 16).map_err(|e| format!("invalid colour '{s}': {e}"))?;
    Ok(Rgb::new((value >> 16) as u8, (value >> 8) as u8, value as u8))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut model = open_model(&cli)?;
    let interval = Duration::from_millis(cli.interval_ms.max(1));

    match cli.command {
        Commands::Monitor { duration } => {
            monitor(&mut model, interval, duration.map(Duration::from_secs));
            Ok(())
        }
        Commands::Info => {
            let pad = connect(&mut model, interval)?;
            print_pad(&pad, &model);
            Ok(())
        }
        Commands::SetName { name } => {
            connect(&mut model, interval)?;
            model.write_name(&name)?;
            confirm(&mut model, "name", |pad| pad.name().as_str() == name)
        }
        Commands::SetThreshold { sensor, value } => {
            let pad = connect(&mut model, interval)?;
            let variant = *pad.variant();
            let table = match sensor {
                None => SensitivityTable::uniform(&variant, value),
                Some(sensor) => {
                    if sensor >= variant.sensors() {
                        bail!("sensor {sensor} does not exist (pad has {})", variant.sensors());
                    }
                    let mut table = pad.sensitivity;
                    table.thresholds[sensor] = value;
                    table
                }
            };
            model.write_sensitivity(&table)?;
            confirm(&mut model, "sensitivity", |pad| pad.sensitivity == table)
        }
        Commands::Map { sensor, button } => {
            let pad = connect(&mut model, interval)?;
            let mut table = pad.mapping;
            let slot = table
                .buttons
                .get_mut(sensor)
                .with_context(|| format!("sensor {sensor} does not exist"))?;
            *slot = button;
            model.write_mapping(&table)?;
            confirm(&mut model, "mapping", |pad| pad.mapping == table)
        }
        Commands::Lights {
            mode,
            brightness,
            idle,
        } => {
            connect(&mut model, interval)?;
            let mut lights = model
                .current_lights()
                .map(|l| l.config)
                .unwrap_or_else(LightsConfig::default);
            if let Some(mode) = mode {
                lights.mode = mode.into();
            }
            if let Some(brightness) = brightness {
                lights.brightness = brightness;
            }
            if let Some(idle) = idle {
                lights.idle = idle;
            }
            model.write_lights(&lights)?;
            model.update();
            if model.current_lights().map(|l| l.config) != Some(lights) {
                bail!("pad did not apply the lights configuration");
            }
            println!("lights updated");
            Ok(())
        }
        Commands::FactoryReset => {
            let pad = connect(&mut model, interval)?;
            let defaults = PadConfig::defaults(pad.variant());
            model.factory_reset()?;
            confirm(&mut model, "factory reset", |pad| {
                pad.sensitivity == defaults.sensitivity
                    && pad.mapping == defaults.mapping
                    && *pad.name() == defaults.name
            })
        }
    }
}

fn open_model(cli: &Cli) -> Result<Model> {
    let timeouts = TimeoutConfig::default();
    let transport = if cli.simulate {
        let pad = SimulatedPad::new(FIRMWARE_VARIANT);
        spawn_sensor_feed(pad.clone());
        TimeoutTransport::spawn(timeouts, move || Ok(pad.transport()))
    } else {
        TimeoutTransport::spawn(timeouts, HidApiTransport::new)
    }
    .context("failed to start USB transport")?;

    let config = DeviceModelConfig {
        write_path: if cli.output_reports {
            WritePath::Output
        } else {
            WritePath::Feature
        },
        ..Default::default()
    };
    Ok(DeviceModel::with_clock(transport, SystemClock::new(), config))
}

/// Drive the simulated pad like a player stepping around the panels.
fn spawn_sensor_feed(pad: SimulatedPad) {
    thread::spawn(move || {
        let sensors = FIRMWARE_VARIANT.sensors();
        let mut readings = vec![0u16; sensors];
        for step in 0u64.. {
            let active = ((step / 400) as usize * 2) % sensors.max(1);
            for (i, value) in readings.iter_mut().enumerate() {
                *value = if i / 2 == active / 2 { 1800 } else { 60 };
            }
            pad.set_sensors(&readings);
            pad.tick(1);
            thread::sleep(Duration::from_millis(1));
        }
    });
}

/// Update until a pad shows up, for at most a few rescan intervals.
fn connect(model: &mut Model, interval: Duration) -> Result<PadSnapshot> {
    let deadline = Instant::now() + Duration::from_millis(HOST_RESCAN_INTERVAL_MS * 3);
    loop {
        model.update();
        if let Some(pad) = model.current_pad() {
            info!("Connected to: {}", pad.name());
            return Ok(pad.clone());
        }
        if Instant::now() >= deadline {
            bail!("no pad connected");
        }
        thread::sleep(interval);
    }
}

fn confirm(model: &mut Model, what: &str, applied: impl Fn(&PadSnapshot) -> bool) -> Result<()> {
    model.update();
    match model.current_pad() {
        Some(pad) if applied(pad) => {
            println!("{what} updated");
            Ok(())
        }
        Some(_) => bail!("pad did not apply the {what} change"),
        None => bail!("pad disconnected before the {what} change was confirmed"),
    }
}

fn monitor(model: &mut Model, interval: Duration, duration: Option<Duration>) {
    let start = Instant::now();
    let mut next_tick = start;
    let mut last_buttons = None;

    if model.current_pad().is_none() {
        println!("Waiting for pad...");
    }

    while duration.map_or(true, |limit| start.elapsed() < limit) {
        let changes = model.update();

        if changes.intersects(ChangeFlags::DEVICE | ChangeFlags::NAME) {
            match model.current_pad() {
                Some(pad) => println!("Connected to: {}", pad.name()),
                None => println!("No pad connected"),
            }
        }
        if changes.contains(ChangeFlags::POLLING_RATE) {
            println!("{}Hz", model.polling_rate());
        }
        for (name, _) in changes.difference(ChangeFlags::INPUT).iter_names() {
            info!(change = name, "pad state changed");
        }

        let buttons = model.current_pad().map(|pad| pad.input.buttons);
        if buttons != last_buttons {
            if let Some(buttons) = buttons {
                let held: Vec<String> = (0..16u16)
                    .filter(|&b| buttons & (1 << b) != 0)
                    .map(|b| b.to_string())
                    .collect();
                println!("buttons: [{}]", held.join(" "));
            }
            last_buttons = buttons;
        }

        next_tick += interval;
        match next_tick.checked_duration_since(Instant::now()) {
            Some(wait) => thread::sleep(wait),
            None => {
                debug!("update overran its interval");
                next_tick = Instant::now();
            }
        }
    }
}

fn print_pad(pad: &PadSnapshot, model: &Model) {
    let identity = &pad.identity;
    let variant = pad.variant();
    let (fw_major, fw_minor) = pad.firmware_version();
    println!("Name:      {}", pad.name());
    println!("Firmware:  {fw_major}.{fw_minor}");
    println!(
        "Protocol:  {}.{}",
        identity.protocol_major, identity.protocol_minor
    );
    println!(
        "Hardware:  {} sensors, {} buttons, {} LEDs",
        variant.sensor_count, variant.button_count, variant.led_count
    );

    println!("Sensor  Threshold  Button");
    for sensor in 0..variant.sensors() {
        let button = pad
            .mapping
            .button_for(sensor)
            .map_or_else(|| "-".to_string(), |b| b.to_string());
        println!(
            "{sensor:>6}  {:>9}  {button:>6}",
            pad.sensitivity.thresholds[sensor]
        );
    }

    if let Some(lights) = model.current_lights() {
        let idle = lights.config.idle;
        println!(
            "Lights:    {:?}, brightness {}, idle #{:02X}{:02X}{:02X}",
            lights.config.mode, lights.config.brightness, idle.r, idle.g, idle.b
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adp_pad::protocol::MappingTable;

    #[test]
    fn button_argument() {
        assert_eq!(parse_button("none"), Ok(UNMAPPED));
        assert_eq!(parse_button("3"), Ok(3));
        assert!(parse_button("x").is_err());
    }

    #[test]
    fn colour_argument() {
        assert_eq!(parse_rgb("#FF8000"), Ok(Rgb::new(0xFF, 0x80, 0x00)));
        assert_eq!(parse_rgb("000010"), Ok(Rgb::new(0, 0, 0x10)));
        assert!(parse_rgb("FFF").is_err());
        assert!(parse_rgb("+12345").is_err());
        assert!(parse_rgb("#-1234F").is_err());
        assert!(parse_rgb("00GG00").is_err());
    }

    #[test]
    fn mapping_table_from_cli_edit() {
        let mut table = MappingTable::spread(&FIRMWARE_VARIANT);
        table.buttons[0] = parse_button("none").unwrap();
        assert_eq!(table.button_for(0), None);
    }
}
