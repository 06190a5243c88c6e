//! a2-disasm - Control-flow-aware 6502 disassembler for Apple II binaries
//!
//! This library turns a raw 6502 machine-code buffer and its load address
//! into an annotated assembly listing. Instead of decoding every byte as
//! an instruction, it traces control flow from the entry points and only
//! treats reachable bytes as code; everything else is rendered as data
//! (strings, pointer tables or raw bytes).
//!
//! # Features
//!
//! - **Flow tracing**: work-list exploration of branches, calls and jumps
//!   with first-visitor-wins instruction boundaries
//! - **Linear sweep**: a classification-free mode, also used to harvest
//!   labels for code only reachable through indirect jumps
//! - **Self-modifying code**: stores whose target ended up as code are
//!   confirmed after the trace and annotated on both ends
//! - **Data regions**: high-bit and plain ASCII strings, little-endian
//!   pointer tables, raw byte chunks
//! - **Apple II annotations**: soft-switch names on absolute operands
//! - **Memory-access analysis**: per-address read/write/execute tallies
//!   built on the same traversal, with text, CSV and HTML heatmap output
//!
//! # Quick Start
//!
//! ```rust
//! use a2_disasm::{disassemble_bytes, AnalysisOptions, ListingFormatter, TextFormatter};
//!
//! // LDA #$05; STA $C000; JMP $0800
//! let bytes = [0xA9, 0x05, 0x8D, 0x00, 0xC0, 0x4C, 0x00, 0x08];
//! let listing = disassemble_bytes(&bytes, 0x0800, &AnalysisOptions::new())?;
//! assert_eq!(listing.summary.code_bytes, 8);
//! print!("{}", TextFormatter::new().format_listing(&listing));
//! # Ok::<(), a2_disasm::DisasmError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]

pub mod access;
pub mod analysis;
pub mod architectures;
pub mod data;
pub mod decoder;
pub mod error;
pub mod formatter;
pub mod operand;
pub mod types;

pub use access::AccessAnalyzer;
pub use analysis::{analyze, Analysis, FlowTracer, InstructionSink, LabelMap, LinearScanner};
pub use decoder::{decode, Instruction};
pub use error::{DisasmError, Result};
pub use formatter::{
    DisassemblyRenderer, JsonFormatter, Line, Listing, ListingFormatter, TextFormatter,
};
pub use types::{
    parse_address, Address, AnalysisMode, AnalysisOptions, Binary, ByteClass, Classification,
    SmcFindings, TargetSets, DEFAULT_LOAD_ADDRESS,
};

use std::path::Path;

/// Read a file into a [`Binary`] loaded at `load_address`.
///
/// # Errors
///
/// * [`DisasmError::Io`] if the file cannot be read
/// * [`DisasmError::EmptyBinary`] or [`DisasmError::AddressSpaceOverflow`]
///   if the contents do not form a valid binary
pub fn load_binary<P: AsRef<Path>>(path: P, load_address: Address) -> Result<Binary> {
    let bytes = std::fs::read(path)?;
    Binary::new(bytes, load_address)
}

/// Disassemble a byte buffer.
///
/// # Errors
///
/// Fails when the buffer is not a valid [`Binary`] or the options are
/// rejected by [`analyze`].
pub fn disassemble_bytes(
    bytes: &[u8],
    load_address: Address,
    options: &AnalysisOptions,
) -> Result<Listing> {
    let binary = Binary::new(bytes, load_address)?;
    let analysis = analyze(&binary, options)?;
    Ok(DisassemblyRenderer::new(&analysis).render())
}

/// Disassemble a file, naming it in the listing header.
///
/// # Errors
///
/// Same as [`load_binary`] and [`disassemble_bytes`].
///
/// # Example
///
/// ```rust,no_run
/// use a2_disasm::{disassemble_file, AnalysisOptions};
///
/// let listing = disassemble_file("GAME.BIN", 0x4000, &AnalysisOptions::new())?;
/// println!("{} code bytes", listing.summary.code_bytes);
/// # Ok::<(), a2_disasm::DisasmError>(())
/// ```
pub fn disassemble_file<P: AsRef<Path>>(
    path: P,
    load_address: Address,
    options: &AnalysisOptions,
) -> Result<Listing> {
    let path = path.as_ref();
    let binary = load_binary(path, load_address)?;
    let analysis = analyze(&binary, options)?;
    let mut renderer = DisassemblyRenderer::new(&analysis);
    if let Some(name) = path.file_name() {
        renderer = renderer.with_file_name(name.to_string_lossy());
    }
    Ok(renderer.render())
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
