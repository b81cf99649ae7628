//! Set the absorption or float charge voltage on a Multi/Quattro.
//!
//! Writes persist to EEPROM as well as the live RAM copy, so they survive
//! power cycles. After writing, the setting is read back and printed so you
//! can see what the device actually accepted.

use anyhow::Context;
use clap::{Parser, ValueEnum};

use victron_winmon::multi::{Multi, MultiConfig};
use victron_winmon::port::{self, Mk3Port};

#[derive(Parser)]
#[command(about = "Set a charge voltage setting on a Multi/Quattro")]
struct Args {
    /// Serial port of the MK3-USB adapter. Prompts interactively when
    /// omitted.
    #[arg(short, long)]
    port: Option<String>,

    /// Which voltage setting to write.
    #[arg(value_enum)]
    setting: VoltageSetting,

    /// Target voltage in volts, e.g. 55.8.
    voltage: f32,

    /// Log TX/RX frames.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VoltageSetting {
    /// Absorption voltage (setting ID 2).
    Absorption,
    /// Float voltage (setting ID 3).
    Float,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // The device stores voltages in 0.01 V steps, so u16 tops out at 655.35 V;
    // anything close to that is a typo for this hardware anyway.
    anyhow::ensure!(
        args.voltage > 0.0 && args.voltage < 100.0,
        "voltage {} out of range",
        args.voltage
    );
    let voltage_mv = (f64::from(args.voltage) * 1000.0).round() as u32;

    let path = resolve_port(args.port)?;
    println!("Connecting to MK3-USB on {path} at {} baud...", port::BAUD_RATE);
    let port = port::open(&path).with_context(|| format!("could not open {path}"))?;

    let config = MultiConfig {
        trace_io: args.verbose,
        ..MultiConfig::default()
    };
    let mut multi: Multi<Mk3Port> = Multi::with_config(port, config);
    multi.set_address()?;

    let label = match args.setting {
        VoltageSetting::Absorption => "absorption",
        VoltageSetting::Float => "float",
    };
    println!("Setting {label} voltage to {:.2}V...", args.voltage);
    match args.setting {
        VoltageSetting::Absorption => multi.set_absorption_voltage_mv(voltage_mv)?,
        VoltageSetting::Float => multi.set_float_voltage_mv(voltage_mv)?,
    }

    let readback_mv = match args.setting {
        VoltageSetting::Absorption => multi.get_absorption_voltage_mv(),
        VoltageSetting::Float => multi.get_float_voltage_mv(),
    };
    match readback_mv {
        Ok(mv) => println!("Device reports {label} voltage is now {:.2}V", mv as f64 / 1000.0),
        Err(e) => println!("Write acknowledged, but read-back failed: {e}"),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn resolve_port(arg: Option<String>) -> anyhow::Result<String> {
    if let Some(path) = arg {
        return Ok(path);
    }
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
    anyhow::ensure!(!ports.is_empty(), "no serial ports found");
    let names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();
    Ok(inquire::Select::new("Select the MK3-USB serial port:", names).prompt()?)
}
