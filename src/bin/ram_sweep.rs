//! Discover all supported Multi/Quattro RAM variables by sweeping IDs 0-255.
//!
//! RAM variables hold live/runtime data (voltage, current, state, etc.) as
//! opposed to settings, which hold persisted configuration. Reading each
//! variable several times (`-n 5`) helps spot the live-changing ones.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use victron_winmon::interpret;
use victron_winmon::multi::{Multi, MultiConfig};
use victron_winmon::port::{self, Mk3Port};
use victron_winmon::sweep::{self, SweepKind, SweepOptions, SweepOutcome, UNSUPPORTED_SENTINEL};

#[derive(Parser)]
#[command(about = "Discover supported RAM variable IDs on a Multi/Quattro")]
struct Args {
    /// Serial port of the MK3-USB adapter. Prompts interactively when
    /// omitted.
    port: Option<String>,

    /// Read each variable this many times to spot live-changing values.
    #[arg(short = 'n', long = "reads", default_value_t = 1)]
    reads: usize,

    /// Save the results to a CSV file.
    #[arg(short, long)]
    output: Option<PathBuf>,

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

    println!("Sweeping RAM var IDs 0-255 ({} read(s) per var)...", args.reads);
    println!();

    let options = SweepOptions {
        reads_per_id: args.reads,
        ..SweepOptions::default()
    };
    let report = sweep::sweep(&mut multi, SweepKind::RamVars, &options)?;

    let unsupported = report.unsupported_ids();
    let failed = report.no_response_ids();
    println!("\nScan complete.");
    println!("  Supported RAM vars:   {}", report.supported_count());
    println!("  Unsupported (0xFFFF): {}", unsupported.len());
    println!("  No response:          {}", failed.len());

    let multi_read = args.reads > 1;
    print_table(&report, multi_read);

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
        write_csv(&report, &csv_path, multi_read)?;
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

fn guesses_for(value: u16) -> String {
    interpret::guess(value)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn print_table(report: &sweep::SweepReport, multi_read: bool) {
    println!();
    if multi_read {
        println!("{}", "=".repeat(110));
        println!(
            "{:>4}  {:<22}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}  {:>5}  Guesses",
            "ID", "Name", "Latest", "Hex", "Signed", "Min", "Max", "Δ"
        );
        println!("{}", "─".repeat(110));
    } else {
        println!("{}", "=".repeat(95));
        println!(
            "{:>4}  {:<22}  {:>8}  {:>8}  {:>8}  Guesses",
            "ID", "Name", "Value", "Hex", "Signed"
        );
        println!("{}", "─".repeat(95));
    }

    let mut changing: Vec<(u8, &str, &[u16])> = Vec::new();
    for (id, outcome) in &report.outcomes {
        let SweepOutcome::Supported { values, name, .. } = outcome else {
            continue;
        };
        let latest = values[values.len() - 1];
        let signed = latest as i16;
        let name = name.unwrap_or("");
        let guesses = guesses_for(latest);

        if multi_read {
            let min = values.iter().copied().min().unwrap_or(latest);
            let max = values.iter().copied().max().unwrap_or(latest);
            let delta = max - min;
            let changed = if delta > 0 { "***" } else { "" };
            if delta > 0 {
                changing.push((*id, name, values));
            }
            println!(
                "{id:>4}  {name:<22}  {latest:>8}  0x{latest:04X}  {signed:>8}  {min:>8}  {max:>8}  {delta:>4}{changed}  {guesses}"
            );
        } else {
            println!("{id:>4}  {name:<22}  {latest:>8}  0x{latest:04X}  {signed:>8}  {guesses}");
        }
    }

    println!("{}", "─".repeat(if multi_read { 110 } else { 95 }));

    if multi_read && !changing.is_empty() {
        println!(
            "\n{} var(s) changed between reads (marked with ***):",
            changing.len()
        );
        for (id, name, values) in changing {
            let label = if name.is_empty() {
                format!("var {id}")
            } else {
                name.to_string()
            };
            println!("  ID {id} ({label}): {values:?}");
        }
    }
}

fn write_csv(
    report: &sweep::SweepReport,
    path: &PathBuf,
    multi_read: bool,
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("could not create {}", path.display()))?;

    if multi_read {
        writer.write_record([
            "var_id", "name", "latest_dec", "latest_hex", "signed", "min", "max", "delta",
            "guesses", "all_reads",
        ])?;
    } else {
        writer.write_record(["var_id", "name", "value_dec", "value_hex", "signed", "guesses"])?;
    }

    let width = if multi_read { 10 } else { 6 };
    for (id, outcome) in &report.outcomes {
        let row: Vec<String> = match outcome {
            SweepOutcome::Supported { values, name, .. } => {
                let latest = values[values.len() - 1];
                let signed = latest as i16;
                let mut row = vec![
                    id.to_string(),
                    name.unwrap_or("").to_string(),
                    latest.to_string(),
                    format!("0x{latest:04X}"),
                    signed.to_string(),
                ];
                if multi_read {
                    let min = values.iter().copied().min().unwrap_or(latest);
                    let max = values.iter().copied().max().unwrap_or(latest);
                    row.push(min.to_string());
                    row.push(max.to_string());
                    row.push((max - min).to_string());
                    row.push(guesses_for(latest));
                    row.push(
                        values
                            .iter()
                            .map(u16::to_string)
                            .collect::<Vec<_>>()
                            .join("|"),
                    );
                } else {
                    row.push(guesses_for(latest));
                }
                row
            }
            SweepOutcome::Unsupported => {
                let mut row = vec![
                    id.to_string(),
                    String::new(),
                    UNSUPPORTED_SENTINEL.to_string(),
                    "0xFFFF".to_string(),
                    String::new(),
                    "unsupported".to_string(),
                ];
                row.resize(width, String::new());
                row
            }
            SweepOutcome::NoResponse => {
                let mut row = vec![
                    id.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    "no_response".to_string(),
                ];
                row.resize(width, String::new());
                row
            }
        };
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
