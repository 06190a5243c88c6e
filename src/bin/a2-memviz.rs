//! a2-memviz CLI
//!
//! Reports how a 6502 binary uses memory: zero page, soft switches, code
//! and data regions, and the most referenced code.

use a2_disasm::access::{export_csv, export_html, render_report};
use a2_disasm::{load_binary, parse_address, AccessAnalyzer, Address, DEFAULT_LOAD_ADDRESS};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Memory-access analyzer for Apple II binaries.
///
/// Traces from `--entry` when given, otherwise sweeps the whole binary.
#[derive(Parser, Debug)]
#[command(name = "a2-memviz")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input binary
    file: PathBuf,

    /// Load address ($0800, 0x0800 or 0800)
    #[arg(value_parser = parse_addr)]
    load_address: Option<Address>,

    /// Trace control flow from this address
    #[arg(short, long, value_parser = parse_addr)]
    entry: Option<Address>,

    /// Also write a per-address CSV export
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also write a self-contained HTML heatmap
    #[arg(long)]
    html: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_addr(s: &str) -> std::result::Result<Address, String> {
    parse_address(s).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging if verbose
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("a2_disasm=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let load_address = args.load_address.unwrap_or(DEFAULT_LOAD_ADDRESS);
    let binary = load_binary(&args.file, load_address)
        .with_context(|| format!("loading {}", args.file.display()))?;

    let analyzer = match args.entry {
        Some(entry) => AccessAnalyzer::analyze_flow(&binary, entry),
        None => AccessAnalyzer::analyze_linear(&binary),
    };

    let name = args
        .file
        .file_name()
        .map_or_else(|| args.file.display().to_string(), |n| n.to_string_lossy().into_owned());
    print!("{}", render_report(&analyzer, &name));

    if let Some(ref path) = args.csv {
        export_csv(&analyzer, path).with_context(|| format!("writing {}", path.display()))?;
        println!("\nCSV exported to {}", path.display());
    }

    if let Some(ref path) = args.html {
        export_html(&analyzer, path, &name)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("HTML heatmap exported to {}", path.display());
    }
    Ok(())
}
