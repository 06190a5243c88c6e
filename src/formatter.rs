//! Listing construction and output formatters.
//!
//! [`DisassemblyRenderer`] turns an [`Analysis`] into a structured
//! [`Listing`]: a summary, a string index, equates for labels that no
//! rendered line starts at, and the body lines. [`ListingFormatter`]
//! implementations turn that structure into text.

use crate::analysis::{Analysis, LinearScanner, SweepItem};
use crate::data::{DataItem, DataRegionAnalyzer, StringRun};
use crate::decoder::{self, Instruction};
use crate::error::Result;
use crate::operand::OperandFormatter;
use crate::types::{Address, AnalysisMode, ByteClass, Span};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

/// Totals shown at the top of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Input file name, if known
    pub file: Option<String>,
    /// Address of the first byte
    pub load_address: Address,
    /// Length in bytes
    pub length: usize,
    /// Address of the last byte
    pub end_address: Address,
    /// Walk used
    pub mode: AnalysisMode,
    /// Entry points seeded (flow mode)
    pub entry_points: Vec<Address>,
    /// Bytes rendered as instructions
    pub code_bytes: usize,
    /// Bytes rendered as data
    pub data_bytes: usize,
    /// Strings in the index
    pub strings_found: usize,
    /// Pointer tables rendered
    pub pointer_tables: usize,
    /// Distinct code addresses modified at run time
    pub smc_sites: usize,
    /// Labels allocated
    pub labels: usize,
    /// Entries rejected for overlapping an earlier instruction
    pub ambiguous_entries: Vec<Address>,
}

/// One entry of the string index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringEntry {
    /// Address of the first byte
    pub address: Address,
    /// Text with bit 7 stripped
    pub text: String,
    /// Stored with bit 7 set
    pub high_bit: bool,
}

impl From<&StringRun> for StringEntry {
    fn from(run: &StringRun) -> Self {
        Self {
            address: run.address,
            text: run.text.clone(),
            high_bit: run.high_bit,
        }
    }
}

/// `name = $ADDR` for a label not defined by the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Equate {
    /// Label name
    pub name: String,
    /// Labelled address
    pub address: Address,
}

/// One line of the listing body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Line {
    /// Label definition preceding the line at its address
    Label {
        /// Label name
        name: String,
    },
    /// A decoded instruction
    Instruction {
        /// Address of the opcode
        address: Address,
        /// Encoded bytes
        #[serde(serialize_with = "hex_bytes")]
        bytes: Vec<u8>,
        /// Mnemonic
        mnemonic: String,
        /// Rendered operand
        operand: String,
        /// Trailing comments
        annotations: Vec<String>,
    },
    /// A text run
    String {
        /// Address of the first byte
        address: Address,
        /// Raw bytes
        #[serde(serialize_with = "hex_bytes")]
        bytes: Vec<u8>,
        /// Decoded text
        text: String,
        /// Stored with bit 7 set
        high_bit: bool,
    },
    /// A run of address words
    PointerTable {
        /// Address of the first byte
        address: Address,
        /// Raw bytes
        #[serde(serialize_with = "hex_bytes")]
        bytes: Vec<u8>,
        /// Rendered entries
        entries: Vec<String>,
    },
    /// Raw bytes
    Bytes {
        /// Address of the first byte
        address: Address,
        /// The bytes
        #[serde(serialize_with = "hex_bytes")]
        bytes: Vec<u8>,
        /// Trailing comments
        annotations: Vec<String>,
    },
}

impl Line {
    /// Address the line starts at. Label lines have none.
    pub fn address(&self) -> Option<Address> {
        match self {
            Line::Label { .. } => None,
            Line::Instruction { address, .. }
            | Line::String { address, .. }
            | Line::PointerTable { address, .. }
            | Line::Bytes { address, .. } => Some(*address),
        }
    }

    /// Bytes covered by the line.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Line::Label { .. } => &[],
            Line::Instruction { bytes, .. }
            | Line::String { bytes, .. }
            | Line::PointerTable { bytes, .. }
            | Line::Bytes { bytes, .. } => bytes.as_slice(),
        }
    }

    /// Whether this is an instruction line.
    pub fn is_instruction(&self) -> bool {
        matches!(self, Line::Instruction { .. })
    }
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode_upper(bytes))
}

/// A rendered disassembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    /// Header totals
    pub summary: Summary,
    /// String index
    pub strings: Vec<StringEntry>,
    /// Labels defined outside the body
    pub equates: Vec<Equate>,
    /// Body
    pub lines: Vec<Line>,
}

impl Listing {
    /// Serialise to JSON.
    ///
    /// # Errors
    ///
    /// [`DisasmError::Serialization`](crate::DisasmError::Serialization) if
    /// serde fails.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Builds a [`Listing`] from an analysis.
#[derive(Debug, Clone)]
pub struct DisassemblyRenderer<'a> {
    analysis: &'a Analysis<'a>,
    file_name: Option<String>,
}

impl<'a> DisassemblyRenderer<'a> {
    /// Renderer over `analysis`.
    pub fn new(analysis: &'a Analysis<'a>) -> Self {
        Self {
            analysis,
            file_name: None,
        }
    }

    /// Name the input file in the header.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Build the listing.
    pub fn render(&self) -> Listing {
        let mut lines = Vec::new();
        let mut strings = Vec::new();
        match self.analysis.mode() {
            AnalysisMode::Flow => self.render_flow(&mut lines, &mut strings),
            AnalysisMode::Linear => self.render_linear(&mut lines, &mut strings),
        }

        let starts: BTreeSet<Address> = lines.iter().filter_map(Line::address).collect();
        let equates = self
            .analysis
            .labels
            .iter()
            .filter(|l| !starts.contains(&l.address))
            .map(|l| Equate {
                name: l.name.clone(),
                address: l.address,
            })
            .collect();

        let binary = self.analysis.binary;
        let code_bytes = lines
            .iter()
            .filter(|l| l.is_instruction())
            .map(|l| l.bytes().len())
            .sum();
        let summary = Summary {
            file: self.file_name.clone(),
            load_address: binary.load_address(),
            length: binary.len(),
            end_address: binary.last_address(),
            mode: self.analysis.mode(),
            entry_points: self.analysis.entries.clone(),
            code_bytes,
            data_bytes: binary.len() - code_bytes,
            strings_found: strings.len(),
            pointer_tables: lines
                .iter()
                .filter(|l| matches!(l, Line::PointerTable { .. }))
                .count(),
            smc_sites: self.analysis.smc.site_count(),
            labels: self.analysis.labels.len(),
            ambiguous_entries: self.analysis.conflicts.iter().copied().collect(),
        };

        Listing {
            summary,
            strings,
            equates,
            lines,
        }
    }

    fn render_flow(&self, out: &mut Vec<Line>, strings: &mut Vec<StringEntry>) {
        let analysis = self.analysis;
        let data = DataRegionAnalyzer::new(analysis.binary, &analysis.options);
        for span in analysis.classification.spans() {
            match span.class {
                ByteClass::Code => self.render_code_span(span, out),
                ByteClass::Data => {
                    let region =
                        data.analyze(span.start, span.len, |addr| analysis.labels.contains(addr));
                    strings.extend(region.strings.iter().map(StringEntry::from));
                    for item in region.items {
                        self.push_label(item.address(), out);
                        out.push(self.data_line(item));
                    }
                }
            }
        }
    }

    fn render_code_span(&self, span: Span, out: &mut Vec<Line>) {
        let binary = self.analysis.binary;
        let mut addr = u32::from(span.start);
        while addr < span.end() {
            let pc = addr as Address;
            self.push_label(pc, out);
            match decoder::decode_at(binary, pc).filter(|i| !i.is_truncated()) {
                Some(insn) => {
                    addr += u32::from(insn.size);
                    out.push(self.instruction_line(&insn));
                }
                None => {
                    addr += 1;
                    out.push(Line::Bytes {
                        address: pc,
                        bytes: binary.byte_at(pc).into_iter().collect(),
                        annotations: Vec::new(),
                    });
                }
            }
        }
    }

    fn render_linear(&self, out: &mut Vec<Line>, strings: &mut Vec<StringEntry>) {
        let binary = self.analysis.binary;
        for item in LinearScanner::new(binary).sweep() {
            self.push_label(item.address(), out);
            let line = match item {
                SweepItem::Instruction(insn) => self.instruction_line(&insn),
                SweepItem::Unknown { address, value } => Line::Bytes {
                    address,
                    bytes: vec![value],
                    annotations: Vec::new(),
                },
                SweepItem::Truncated(insn) => Line::Bytes {
                    address: insn.address,
                    bytes: vec![insn.opcode],
                    annotations: vec![format!("truncated {}", insn.mnemonic)],
                },
            };
            out.push(line);
        }

        let data = DataRegionAnalyzer::new(binary, &self.analysis.options);
        strings.extend(
            data.find_strings(binary.bytes(), binary.load_address())
                .iter()
                .map(StringEntry::from),
        );
    }

    fn push_label(&self, addr: Address, out: &mut Vec<Line>) {
        if let Some(label) = self.analysis.labels.get(addr) {
            out.push(Line::Label {
                name: label.name.clone(),
            });
        }
    }

    fn instruction_line(&self, insn: &Instruction) -> Line {
        let analysis = self.analysis;
        let operand = OperandFormatter::new(&analysis.labels).format(insn);

        let mut annotations = Vec::new();
        if let Some(hw) = operand.annotation {
            annotations.push(hw.to_string());
        }
        for target in analysis.smc.targets_of(insn.address) {
            annotations.push(format!("writes to code at ${target:04X}"));
        }
        for offset in 0..u16::from(insn.size) {
            let addr = insn.address.wrapping_add(offset);
            let writers = analysis.smc.writers_of(addr);
            if writers.is_empty() {
                continue;
            }
            let by = join_addresses(&writers);
            if offset == 0 {
                annotations.push(format!("modified at runtime by {by}"));
            } else {
                annotations.push(format!("modified at runtime (${addr:04X}) by {by}"));
            }
        }
        let last = insn.address.saturating_add(u16::from(insn.size) - 1);
        for conflict in analysis.conflicts.range(insn.address..=last) {
            annotations.push(format!("ambiguous entry at ${conflict:04X}"));
        }

        Line::Instruction {
            address: insn.address,
            bytes: insn.raw.clone(),
            mnemonic: insn.mnemonic.to_string(),
            operand: operand.text,
            annotations,
        }
    }

    fn data_line(&self, item: DataItem) -> Line {
        let binary = self.analysis.binary;
        let raw = |addr: Address, len: usize| -> Vec<u8> {
            binary
                .slice_from(addr)
                .map(|s| s[..len.min(s.len())].to_vec())
                .unwrap_or_default()
        };
        match item {
            DataItem::String(run) => Line::String {
                address: run.address,
                bytes: raw(run.address, run.len),
                text: run.text,
                high_bit: run.high_bit,
            },
            DataItem::PointerTable(table) => Line::PointerTable {
                address: table.address,
                bytes: raw(table.address, table.len()),
                entries: table
                    .entries
                    .iter()
                    .map(|&e| match self.analysis.labels.name(e) {
                        Some(name) => name.to_string(),
                        None => format!("${e:04X}"),
                    })
                    .collect(),
            },
            DataItem::Bytes { address, bytes } => Line::Bytes {
                address,
                bytes,
                annotations: Vec::new(),
            },
        }
    }
}

fn join_addresses(addrs: &[Address]) -> String {
    addrs
        .iter()
        .map(|a| format!("${a:04X}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Trait for turning a [`Listing`] into output text.
///
/// Implementors render each part; the default
/// [`format_listing`](Self::format_listing) joins the parts with blank
/// lines.
pub trait ListingFormatter {
    /// Format the header totals.
    fn format_summary(&self, summary: &Summary) -> Option<String>;

    /// Format the string index.
    fn format_strings(&self, strings: &[StringEntry]) -> Option<String>;

    /// Format the equates block.
    fn format_equates(&self, equates: &[Equate]) -> Option<String>;

    /// Format the body.
    fn format_lines(&self, lines: &[Line]) -> Option<String>;

    /// Format the complete listing.
    fn format_listing(&self, listing: &Listing) -> String {
        let parts: Vec<String> = [
            self.format_summary(&listing.summary),
            self.format_strings(&listing.strings),
            self.format_equates(&listing.equates),
            self.format_lines(&listing.lines),
        ]
        .into_iter()
        .flatten()
        .collect();
        parts.join("\n")
    }
}

/// Assembler-style text output.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Emit the header, string index and equates
    pub show_header: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self { show_header: true }
    }
}

impl TextFormatter {
    /// Formatter with the header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter emitting the body only.
    pub fn body_only() -> Self {
        Self { show_header: false }
    }

    /// Render one body line.
    pub fn format_line(&self, line: &Line) -> String {
        const NONE: &[String] = &[];
        let (address, bytes, text, annotations) = match line {
            Line::Label { name } => return format!("{name}:"),
            Line::Instruction {
                address,
                bytes,
                mnemonic,
                operand,
                annotations,
            } => {
                let text = if operand.is_empty() {
                    mnemonic.clone()
                } else {
                    format!("{mnemonic} {operand}")
                };
                (*address, bytes, text, annotations.as_slice())
            }
            Line::String {
                address,
                bytes,
                text,
                high_bit,
            } => {
                let directive = if *high_bit { ".HIASCII" } else { ".ASCII" };
                let text = format!("{directive} \"{}\"", escape(text));
                (*address, bytes, text, NONE)
            }
            Line::PointerTable {
                address,
                bytes,
                entries,
            } => (*address, bytes, format!(".WORD {}", entries.join(", ")), NONE),
            Line::Bytes {
                address,
                bytes,
                annotations,
            } => {
                let values: Vec<String> = bytes.iter().map(|b| format!("${b:02X}")).collect();
                let text = format!(".BYTE {}", values.join(","));
                (*address, bytes, text, annotations.as_slice())
            }
        };

        let mut s = format!("${address:04X} : {:<11} : {text}", hex_column(bytes));
        if !annotations.is_empty() {
            s.push_str(&format!(" ; {}", annotations.join("; ")));
        }
        s
    }
}

impl ListingFormatter for TextFormatter {
    fn format_summary(&self, summary: &Summary) -> Option<String> {
        if !self.show_header {
            return None;
        }
        let mut s = String::new();
        if let Some(ref file) = summary.file {
            s.push_str(&format!("; Disassembly of {file}\n"));
        }
        s.push_str(&format!("; Load address: ${:04X}\n", summary.load_address));
        s.push_str(&format!("; Length: {0} bytes (${0:04X})\n", summary.length));
        s.push_str(&format!("; End address: ${:04X}\n", summary.end_address));
        s.push_str(&format!("; Mode: {}\n", summary.mode));
        if !summary.entry_points.is_empty() {
            s.push_str(&format!("; Entry points: {}\n", join_addresses(&summary.entry_points)));
        }
        s.push_str(&format!("; Code bytes: {}\n", summary.code_bytes));
        s.push_str(&format!("; Data bytes: {}\n", summary.data_bytes));
        s.push_str(&format!("; Strings found: {}\n", summary.strings_found));
        s.push_str(&format!("; Pointer tables: {}\n", summary.pointer_tables));
        s.push_str(&format!("; SMC sites: {}\n", summary.smc_sites));
        if !summary.ambiguous_entries.is_empty() {
            s.push_str(&format!(
                "; Ambiguous entries: {}\n",
                join_addresses(&summary.ambiguous_entries)
            ));
        }
        Some(s)
    }

    fn format_strings(&self, strings: &[StringEntry]) -> Option<String> {
        if !self.show_header || strings.is_empty() {
            return None;
        }
        let mut s = String::from("; Strings found:\n");
        for entry in strings {
            s.push_str(&format!(";   ${:04X}: \"{}\"\n", entry.address, escape(&entry.text)));
        }
        Some(s)
    }

    fn format_equates(&self, equates: &[Equate]) -> Option<String> {
        if !self.show_header || equates.is_empty() {
            return None;
        }
        let width = equates.iter().map(|e| e.name.len()).max().unwrap_or(0);
        let mut s = String::new();
        for eq in equates {
            s.push_str(&format!("{:<width$} = ${:04X}\n", eq.name, eq.address));
        }
        Some(s)
    }

    fn format_lines(&self, lines: &[Line]) -> Option<String> {
        let mut s = String::new();
        for line in lines {
            if matches!(line, Line::Label { .. }) && !s.is_empty() {
                s.push('\n');
            }
            s.push_str(&self.format_line(line));
            s.push('\n');
        }
        Some(s)
    }
}

/// JSON output of the whole listing.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Pretty-printing JSON formatter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-line JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ListingFormatter for JsonFormatter {
    fn format_summary(&self, _summary: &Summary) -> Option<String> {
        None // Handled in format_listing
    }

    fn format_strings(&self, _strings: &[StringEntry]) -> Option<String> {
        None // Handled in format_listing
    }

    fn format_equates(&self, _equates: &[Equate]) -> Option<String> {
        None // Handled in format_listing
    }

    fn format_lines(&self, _lines: &[Line]) -> Option<String> {
        None // Handled in format_listing
    }

    fn format_listing(&self, listing: &Listing) -> String {
        listing
            .to_json(self.pretty)
            .unwrap_or_else(|_| "{}".to_string())
    }
}

/// Hex dump column: up to three bytes, then an ellipsis.
fn hex_column(bytes: &[u8]) -> String {
    let mut s = bytes
        .iter()
        .take(3)
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    if bytes.len() > 3 {
        s.push_str(" ..");
    }
    s
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::types::{AnalysisOptions, Binary};
    use pretty_assertions::assert_eq;

    fn listing(bytes: &[u8], load: Address, options: &AnalysisOptions) -> Listing {
        let binary = Binary::new(bytes.to_vec(), load).unwrap();
        let analysis = analyze(&binary, options).unwrap();
        DisassemblyRenderer::new(&analysis).render()
    }

    fn body(listing: &Listing) -> String {
        TextFormatter::body_only().format_listing(listing)
    }

    #[test]
    fn test_straight_line_listing() {
        let l = listing(
            &[0xA9, 0x05, 0x8D, 0x00, 0xC0, 0x4C, 0x00, 0x08],
            0x0800,
            &AnalysisOptions::new(),
        );
        let expected = "\
jmp_0800:
$0800 : A9 05       : LDA #$05
$0802 : 8D 00 C0    : STA $C000 ; KEYBOARD
$0805 : 4C 00 08    : JMP jmp_0800
";
        assert_eq!(body(&l), expected);
        assert_eq!(l.summary.code_bytes, 8);
        assert_eq!(l.summary.data_bytes, 0);
        assert!(l.equates.is_empty());
    }

    #[test]
    fn test_unreached_entry_renders_data() {
        let l = listing(&[0xEA, 0x60], 0x0800, &AnalysisOptions::new().with_entry(0x2000));
        assert_eq!(body(&l), "$0800 : EA 60       : .BYTE $EA,$60\n");
        assert_eq!(l.summary.code_bytes, 0);
        assert_eq!(l.summary.data_bytes, 2);
    }

    #[test]
    fn test_header() {
        let binary = Binary::new(vec![0x60], 0x0800).unwrap();
        let analysis = analyze(&binary, &AnalysisOptions::new()).unwrap();
        let l = DisassemblyRenderer::new(&analysis)
            .with_file_name("HELLO.BIN")
            .render();
        let text = TextFormatter::new().format_listing(&l);
        assert!(text.starts_with("; Disassembly of HELLO.BIN\n; Load address: $0800\n"));
        assert!(text.contains("; Length: 1 bytes ($0001)\n"));
        assert!(text.contains("; End address: $0800\n"));
        assert!(text.contains("; Mode: flow\n; Entry points: $0800\n"));
        assert!(text.contains("; SMC sites: 0\n"));
        assert!(text.ends_with("$0800 : 60          : RTS\n"));
    }

    #[test]
    fn test_smc_annotations() {
        // $0800 LDA #$60
        // $0802 STA $0809
        // $0805 JMP $0808
        // $0808 LDA #$00
        // $080A RTS
        let l = listing(
            &[0xA9, 0x60, 0x8D, 0x09, 0x08, 0x4C, 0x08, 0x08, 0xA9, 0x00, 0x60],
            0x0800,
            &AnalysisOptions::new(),
        );
        let text = body(&l);
        assert!(text.contains(
            "$0802 : 8D 09 08    : STA $0809 ; writes to code at $0809\n"
        ));
        assert!(text.contains(
            "$0808 : A9 00       : LDA #$00 ; modified at runtime ($0809) by $0802\n"
        ));
        assert_eq!(l.summary.smc_sites, 1);

        let quiet = listing(
            &[0xA9, 0x60, 0x8D, 0x09, 0x08, 0x4C, 0x08, 0x08, 0xA9, 0x00, 0x60],
            0x0800,
            &AnalysisOptions::new().without_smc(),
        );
        assert!(!body(&quiet).contains("modified at runtime"));
    }

    #[test]
    fn test_data_region_lines() {
        let mut bytes = vec![0x60]; // RTS
        bytes.extend([0xC8, 0xC5, 0xCC, 0xCC, 0xCF]); // "HELLO", high bit
        bytes.extend([0x00, 0x08, 0x0B, 0x08, 0x0D, 0x08]); // three words
        bytes.extend([0xFF, 0x00]);
        let l = listing(&bytes, 0x0800, &AnalysisOptions::new());
        let expected = "\
$0800 : 60          : RTS
$0801 : C8 C5 CC .. : .HIASCII \"HELLO\"
$0806 : 00 08 0B .. : .WORD $0800, $080B, $080D
$080C : FF 00       : .BYTE $FF,$00
";
        assert_eq!(body(&l), expected);
        assert_eq!(l.strings.len(), 1);
        assert!(l.strings[0].high_bit);
        assert_eq!(l.summary.pointer_tables, 1);
    }

    #[test]
    fn test_equates_for_external_targets() {
        // JSR $FDED; RTS
        let l = listing(&[0x20, 0xED, 0xFD, 0x60], 0x0800, &AnalysisOptions::new());
        assert_eq!(
            l.equates,
            vec![Equate {
                name: "sub_FDED".to_string(),
                address: 0xFDED
            }]
        );
        let text = TextFormatter::new().format_listing(&l);
        assert!(text.contains("sub_FDED = $FDED\n"));
        assert!(text.contains("$0800 : 20 ED FD    : JSR sub_FDED\n"));
    }

    #[test]
    fn test_ambiguous_entry_annotation() {
        let options = AnalysisOptions::new().with_entry(0x1000).with_entry(0x1001);
        let l = listing(&[0xAD, 0xEA, 0x60, 0x60], 0x1000, &options);
        let text = body(&l);
        assert!(text.contains("LDA $60EA ; ambiguous entry at $1001\n"));
        assert_eq!(l.summary.ambiguous_entries, vec![0x1001]);
    }

    #[test]
    fn test_linear_listing() {
        let l = listing(&[0xA9, 0x05, 0x02, 0x4C, 0x00], 0x0800, &AnalysisOptions::linear());
        let expected = "\
$0800 : A9 05       : LDA #$05
$0802 : 02          : .BYTE $02
$0803 : 4C          : .BYTE $4C ; truncated JMP
$0804 : 00          : BRK
";
        assert_eq!(body(&l), expected);
        assert_eq!(l.summary.mode, AnalysisMode::Linear);
        assert!(l.summary.entry_points.is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let bytes: Vec<u8> = (0..=255u8).rev().collect();
        let a = listing(&bytes, 0x2000, &AnalysisOptions::new());
        let b = listing(&bytes, 0x2000, &AnalysisOptions::new());
        assert_eq!(a, b);
        let covered: usize = a.lines.iter().map(|l| l.bytes().len()).sum();
        assert_eq!(covered, bytes.len());
    }

    #[test]
    fn test_json_output() {
        let l = listing(&[0x20, 0xED, 0xFD, 0x60], 0x0800, &AnalysisOptions::new());
        let json = JsonFormatter::new().format_listing(&l);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["code_bytes"], 4);
        assert_eq!(value["summary"]["mode"], "flow");
        assert_eq!(value["lines"][0]["kind"], "instruction");
        assert_eq!(value["lines"][0]["bytes"], "20EDFD");
        assert_eq!(value["lines"][0]["operand"], "sub_FDED");
        assert_eq!(value["equates"][0]["name"], "sub_FDED");

        let compact = JsonFormatter::compact().format_listing(&l);
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_escape_quotes() {
        let line = Line::String {
            address: 0x0900,
            bytes: b"SAY \"HI\"".to_vec(),
            text: "SAY \"HI\"".to_string(),
            high_bit: false,
        };
        assert_eq!(
            TextFormatter::new().format_line(&line),
            "$0900 : 53 41 59 .. : .ASCII \"SAY \\\"HI\\\"\""
        );
    }
}
