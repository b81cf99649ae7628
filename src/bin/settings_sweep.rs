//! Discover all supported Multi/Quattro settings by sweeping IDs 0-255.
//!
//! Uses `ReadSetting` for current values and `GetSettingInfo` for metadata.
//! The metadata payload layout is unresolved, so it is reported as raw hex;
//! collecting more samples of it is half the point of this tool.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use victron_winmon::multi::{Multi, MultiConfig};
use victron_winmon::port::{self, Mk3Port};
use victron_winmon::sweep::{self, SweepKind, SweepOptions, SweepOutcome, UNSUPPORTED_SENTINEL};

#[derive(Parser)]
#[command(about = "Discover supported setting IDs on a Multi/Quattro")]
struct Args {
    /// Serial port of the MK3-USB adapter. Prompts interactively when
    /// omitted.
    port: Option<String>,

    /// Save the results to a CSV file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the per-setting GetSettingInfo metadata fetch.
    #[arg(long)]
    no_info: bool,

    /// Log TX/RX frames.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let path = resolve_port(args.port)?;
    println!("Connecting to MK3-USB on {path} at {} baud...", port::BAUD_RATE);
    let port = port::open(&path).with_context(|| format!("could not open {path}"))?;

    let config = MultiConfig {
        trace_io: args.verbose,
        ..MultiConfig::default()
    };
    let mut multi: Multi<Mk3Port> = Multi::with_config(port, config);
    multi.set_address()?;

    println!("Sweeping setting IDs 0-255...");
    println!();

    let options = SweepOptions {
        fetch_info: !args.no_info,
        ..SweepOptions::default()
    };
    let report = sweep::sweep(&mut multi, SweepKind::Settings, &options)?;

    let unsupported = report.unsupported_ids();
    let failed = report.no_response_ids();
    println!("\nScan complete.");
    println!("  Supported settings:   {}", report.supported_count());
    println!("  Unsupported (0xFFFF): {}", unsupported.len());
    println!("  No response:          {}", failed.len());

    print_table(&report);

    println!(
        "\nUnsupported IDs (returned 0xFFFF): {:?}{}",
        &unsupported[..unsupported.len().min(20)],
        if unsupported.len() > 20 { "..." } else { "" }
    );
    if !failed.is_empty() {
        println!(
            "No response IDs: {:?}{}",
            &failed[..failed.len().min(20)],
            if failed.len() > 20 { "..." } else { "" }
        );
    }

    if let Some(csv_path) = args.output {
        write_csv(&report, &csv_path)?;
        println!("\nResults saved to {}", csv_path.display());
    }

    println!("Done.");
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

fn print_table(report: &sweep::SweepReport) {
    println!();
    println!("{}", "=".repeat(95));
    println!(
        "{:>4}  {:<25}  {:>8}  {:>8}  {}",
        "ID", "Name", "Value", "Hex", "GetSettingInfo Payload"
    );
    println!("{}", "─".repeat(95));

    for (id, outcome) in &report.outcomes {
        let SweepOutcome::Supported { values, name, info } = outcome else {
            continue;
        };
        let value = values[values.len() - 1];
        let name = name.unwrap_or("");
        let info_hex = info.as_deref().map(hex::encode).unwrap_or_default();
        println!("{id:>4}  {name:<25}  {value:>8}  0x{value:04X}  {info_hex}");
    }

    println!("{}", "─".repeat(95));
}

fn write_csv(report: &sweep::SweepReport, path: &PathBuf) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    writer.write_record([
        "setting_id",
        "name",
        "value_dec",
        "value_hex",
        "setting_info_hex",
    ])?;

    for (id, outcome) in &report.outcomes {
        let row: [String; 5] = match outcome {
            SweepOutcome::Supported { values, name, info } => {
                let value = values[values.len() - 1];
                [
                    id.to_string(),
                    name.unwrap_or("").to_string(),
                    value.to_string(),
                    format!("0x{value:04X}"),
                    info.as_deref().map(hex::encode).unwrap_or_default(),
                ]
            }
            SweepOutcome::Unsupported => [
                id.to_string(),
                String::new(),
                UNSUPPORTED_SENTINEL.to_string(),
                "0xFFFF".to_string(),
                "unsupported".to_string(),
            ],
            SweepOutcome::NoResponse => [
                id.to_string(),
                String::new(),
                String::new(),
                String::new(),
                "no_response".to_string(),
            ],
        };
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
