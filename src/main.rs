//! a2-disasm CLI
//!
//! Command-line disassembler for raw Apple II 6502 binaries.

use a2_disasm::{
    analyze, load_binary, parse_address, Address, AnalysisOptions, DisassemblyRenderer,
    JsonFormatter, ListingFormatter, TextFormatter, DEFAULT_LOAD_ADDRESS,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

/// Control-flow-aware 6502 disassembler.
///
/// Traces execution from the entry points, renders reachable bytes as
/// instructions and everything else as strings, pointer tables or raw
/// bytes, and flags self-modifying code.
#[derive(Parser, Debug)]
#[command(name = "a2-disasm")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input binary
    file: PathBuf,

    /// Load address ($0800, 0x0800 or 0800)
    #[arg(value_parser = parse_addr)]
    load_address: Option<Address>,

    /// Entry point to trace from (repeatable; defaults to the load address)
    #[arg(short, long = "entry", value_parser = parse_addr)]
    entries: Vec<Address>,

    /// Decode every byte sequentially instead of tracing flow
    #[arg(short, long)]
    linear: bool,

    /// Skip self-modifying-code detection
    #[arg(long)]
    no_smc: bool,

    /// Do not add labels found only by the linear scan
    #[arg(long)]
    no_harvest: bool,

    /// Minimum string length
    #[arg(long, default_value = "4")]
    min_string: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Write the listing to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Assembler-style listing
    Text,
    /// JSON listing
    Json,
}

fn parse_addr(s: &str) -> std::result::Result<Address, String> {
    parse_address(s).map_err(|e| e.to_string())
}

impl Args {
    fn options(&self) -> AnalysisOptions {
        let mut options = if self.linear {
            AnalysisOptions::linear()
        } else {
            AnalysisOptions::new()
        };
        for &entry in &self.entries {
            options = options.with_entry(entry);
        }
        if self.no_smc {
            options = options.without_smc();
        }
        options.harvest_linear_labels = !self.no_harvest;
        options.with_min_string_len(self.min_string)
    }
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
    let analysis = analyze(&binary, &args.options())?;

    let mut renderer = DisassemblyRenderer::new(&analysis);
    if let Some(name) = args.file.file_name() {
        renderer = renderer.with_file_name(name.to_string_lossy());
    }
    let listing = renderer.render();

    let text = match args.format {
        OutputFormat::Text => TextFormatter::new().format_listing(&listing),
        OutputFormat::Json => {
            let mut json = JsonFormatter::new().format_listing(&listing);
            json.push('\n');
            json
        }
    };

    match &args.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2_disasm::AnalysisMode;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["a2-disasm", "game.bin"]).unwrap();
        assert_eq!(args.load_address, None);
        assert!(args.entries.is_empty());
        assert!(!args.verbose);
        assert!(matches!(args.format, OutputFormat::Text));
    }

    #[test]
    fn test_addresses() {
        let args = Args::try_parse_from([
            "a2-disasm", "game.bin", "$4000", "--entry", "0x4010", "-e", "4020",
        ])
        .unwrap();
        assert_eq!(args.load_address, Some(0x4000));
        assert_eq!(args.entries, vec![0x4010, 0x4020]);
        assert_eq!(args.options().entry_points, vec![0x4010, 0x4020]);
    }

    #[test]
    fn test_bad_address() {
        assert!(Args::try_parse_from(["a2-disasm", "game.bin", "$XYZ"]).is_err());
    }

    #[test]
    fn test_options_from_flags() {
        let args = Args::try_parse_from([
            "a2-disasm",
            "game.bin",
            "--linear",
            "--no-harvest",
            "--min-string",
            "6",
            "-f",
            "json",
        ])
        .unwrap();
        let options = args.options();
        assert_eq!(options.mode, AnalysisMode::Linear);
        assert!(!options.harvest_linear_labels);
        assert_eq!(options.min_string_len, 6);
        assert!(matches!(args.format, OutputFormat::Json));

        let args = Args::try_parse_from(["a2-disasm", "game.bin", "--no-smc"]).unwrap();
        assert!(!args.options().detect_smc);
    }
}
