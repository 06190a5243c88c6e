//! Core types for the disassembler.
//!
//! This module defines the data model shared by every analysis pass: the
//! immutable [`Binary`] under analysis, the per-byte [`Classification`],
//! the transfer and reference [`TargetSets`], self-modifying-code findings
//! and the [`AnalysisOptions`] that drive a pass.

use crate::error::{DisasmError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A 16-bit CPU address.
pub type Address = u16;

/// Size of the flat CPU address space.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// Load address assumed when none is given.
pub const DEFAULT_LOAD_ADDRESS: Address = 0x0800;

/// An immutable byte buffer loaded at a fixed address.
///
/// Covers `[load_address, end_address)`. Construction guarantees the
/// buffer is non-empty and fits below `$10000`, so every offset maps to
/// exactly one address without wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    bytes: Vec<u8>,
    load_address: Address,
}

impl Binary {
    /// Create a binary from raw bytes and the address of its first byte.
    ///
    /// # Errors
    ///
    /// * [`DisasmError::EmptyBinary`] if `bytes` is empty
    /// * [`DisasmError::AddressSpaceOverflow`] if the buffer would run past `$FFFF`
    pub fn new(bytes: impl Into<Vec<u8>>, load_address: Address) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DisasmError::EmptyBinary);
        }
        if usize::from(load_address) + bytes.len() > ADDRESS_SPACE {
            return Err(DisasmError::AddressSpaceOverflow {
                load_address,
                length: bytes.len(),
            });
        }
        Ok(Self {
            bytes,
            load_address,
        })
    }

    /// Address of the first byte.
    pub fn load_address(&self) -> Address {
        self.load_address
    }

    /// One past the address of the last byte (may be `0x10000`).
    pub fn end_address(&self) -> u32 {
        u32::from(self.load_address) + self.bytes.len() as u32
    }

    /// Address of the last byte.
    pub fn last_address(&self) -> Address {
        self.address_at(self.bytes.len() - 1)
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether `addr` names a byte of this binary.
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.load_address && u32::from(addr) < self.end_address()
    }

    /// Offset of `addr` into the buffer, if it lies inside.
    pub fn offset_of(&self, addr: Address) -> Option<usize> {
        self.contains(addr)
            .then(|| usize::from(addr - self.load_address))
    }

    /// Address of the byte at `offset`. `offset` must be in bounds.
    pub fn address_at(&self, offset: usize) -> Address {
        debug_assert!(offset < self.bytes.len());
        (usize::from(self.load_address) + offset) as Address
    }

    /// Byte stored at `addr`.
    pub fn byte_at(&self, addr: Address) -> Option<u8> {
        self.offset_of(addr).map(|off| self.bytes[off])
    }

    /// Bytes from `addr` to the end of the buffer.
    pub fn slice_from(&self, addr: Address) -> Option<&[u8]> {
        self.offset_of(addr).map(|off| &self.bytes[off..])
    }

    /// Every address of the binary in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        (0..self.bytes.len()).map(move |off| self.address_at(off))
    }
}

/// Classification tag of a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteClass {
    /// Part of an instruction reached by control flow.
    Code,
    /// Anything else.
    Data,
}

impl fmt::Display for ByteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteClass::Code => write!(f, "CODE"),
            ByteClass::Data => write!(f, "DATA"),
        }
    }
}

/// One [`ByteClass`] per address of a binary.
///
/// Starts out all DATA. Only the flow tracer flips bytes to CODE and
/// nothing ever flips them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    base: Address,
    tags: Vec<ByteClass>,
}

impl Classification {
    /// All-DATA classification covering `binary`.
    pub fn new(binary: &Binary) -> Self {
        Self {
            base: binary.load_address(),
            tags: vec![ByteClass::Data; binary.len()],
        }
    }

    fn index(&self, addr: Address) -> Option<usize> {
        let idx = usize::from(addr.checked_sub(self.base)?);
        (idx < self.tags.len()).then_some(idx)
    }

    /// Tag of `addr`, or `None` outside the binary.
    pub fn get(&self, addr: Address) -> Option<ByteClass> {
        self.index(addr).map(|idx| self.tags[idx])
    }

    /// Whether `addr` is CODE. Addresses outside the binary are not.
    pub fn is_code(&self, addr: Address) -> bool {
        self.get(addr) == Some(ByteClass::Code)
    }

    /// Mark `size` bytes starting at `addr` as CODE.
    pub(crate) fn mark_code(&mut self, addr: Address, size: u8) {
        for i in 0..u16::from(size) {
            if let Some(idx) = self.index(addr.wrapping_add(i)) {
                self.tags[idx] = ByteClass::Code;
            }
        }
    }

    /// Number of classified bytes.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether nothing is classified.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of CODE bytes.
    pub fn code_bytes(&self) -> usize {
        self.tags.iter().filter(|t| **t == ByteClass::Code).count()
    }

    /// Number of DATA bytes.
    pub fn data_bytes(&self) -> usize {
        self.tags.len() - self.code_bytes()
    }

    /// `(address, tag)` pairs in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, ByteClass)> + '_ {
        self.tags
            .iter()
            .enumerate()
            .map(move |(i, t)| ((usize::from(self.base) + i) as Address, *t))
    }

    /// Maximal runs of equally-tagged addresses.
    pub fn spans(&self) -> Vec<Span> {
        let mut spans: Vec<Span> = Vec::new();
        for (addr, class) in self.iter() {
            match spans.last_mut() {
                Some(span) if span.class == class => span.len += 1,
                _ => spans.push(Span {
                    start: addr,
                    len: 1,
                    class,
                }),
            }
        }
        spans
    }
}

/// A maximal run of bytes sharing one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// First address of the run
    pub start: Address,
    /// Length in bytes
    pub len: usize,
    /// Shared tag
    pub class: ByteClass,
}

impl Span {
    /// One past the last address of the run.
    pub fn end(&self) -> u32 {
        u32::from(self.start) + self.len as u32
    }
}

/// Addresses collected while tracing, one set per kind of reference.
///
/// An address may sit in several sets at once; label allocation resolves
/// which name it gets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSets {
    /// Targets of `JSR`
    pub subroutine_targets: BTreeSet<Address>,
    /// Targets of `JMP abs`
    pub jump_targets: BTreeSet<Address>,
    /// Targets of conditional branches
    pub branch_targets: BTreeSet<Address>,
    /// In-range memory operands that are read or modified
    pub data_refs: BTreeSet<Address>,
}

impl TargetSets {
    /// Empty sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether all four sets are empty.
    pub fn is_empty(&self) -> bool {
        self.subroutine_targets.is_empty()
            && self.jump_targets.is_empty()
            && self.branch_targets.is_empty()
            && self.data_refs.is_empty()
    }

    /// Union the transfer targets of `other` that lie inside `binary`.
    ///
    /// `data_refs` is left alone: only the tracer produces those.
    pub fn absorb_transfers_within(&mut self, other: &TargetSets, binary: &Binary) {
        let inside = |addr: &&Address| binary.contains(**addr);
        self.subroutine_targets
            .extend(other.subroutine_targets.iter().filter(inside));
        self.jump_targets
            .extend(other.jump_targets.iter().filter(inside));
        self.branch_targets
            .extend(other.branch_targets.iter().filter(inside));
    }
}

/// A store recorded during tracing: `writer` writes to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SmcRecord {
    /// Address of the writing instruction
    pub writer: Address,
    /// Address written to
    pub target: Address,
}

/// Confirmed self-modifying-code sites.
///
/// Writers and targets relate many-to-many; the pairs are kept as a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmcFindings {
    records: BTreeSet<SmcRecord>,
}

impl SmcFindings {
    /// Keep the records whose target is CODE in the final classification.
    pub fn confirm<'a>(
        candidates: impl IntoIterator<Item = &'a SmcRecord>,
        classification: &Classification,
    ) -> Self {
        Self {
            records: candidates
                .into_iter()
                .filter(|r| classification.is_code(r.target))
                .copied()
                .collect(),
        }
    }

    /// Whether any site was confirmed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Confirmed `(writer, target)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &SmcRecord> {
        self.records.iter()
    }

    /// Number of distinct modified code addresses.
    pub fn site_count(&self) -> usize {
        self.targets().len()
    }

    /// Distinct modified code addresses.
    pub fn targets(&self) -> BTreeSet<Address> {
        self.records.iter().map(|r| r.target).collect()
    }

    /// Code addresses modified by the instruction at `writer`.
    pub fn targets_of(&self, writer: Address) -> Vec<Address> {
        self.records
            .iter()
            .filter(|r| r.writer == writer)
            .map(|r| r.target)
            .collect()
    }

    /// Instructions that modify the code byte at `target`.
    pub fn writers_of(&self, target: Address) -> Vec<Address> {
        self.records
            .iter()
            .filter(|r| r.target == target)
            .map(|r| r.writer)
            .collect()
    }
}

/// How the binary is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Trace control flow from the entry points and classify CODE/DATA.
    #[default]
    Flow,
    /// Treat every byte as a potential instruction start.
    Linear,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Flow => write!(f, "flow"),
            AnalysisMode::Linear => write!(f, "linear"),
        }
    }
}

/// Options for an analysis pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Flow tracing or linear sweep
    pub mode: AnalysisMode,
    /// Extra entry points; empty means just the load address
    pub entry_points: Vec<Address>,
    /// Confirm and annotate self-modifying code
    pub detect_smc: bool,
    /// Name in-range addresses only found by the linear scanner
    pub harvest_linear_labels: bool,
    /// Shortest text run reported as a string
    pub min_string_len: usize,
    /// Fewest consecutive words reported as a pointer table
    pub min_pointer_entries: usize,
    /// Most bytes per raw data line
    pub raw_chunk_len: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOptions {
    /// Flow tracing from the load address with SMC detection on.
    pub fn new() -> Self {
        Self {
            mode: AnalysisMode::Flow,
            entry_points: Vec::new(),
            detect_smc: true,
            harvest_linear_labels: true,
            min_string_len: 4,
            min_pointer_entries: 3,
            raw_chunk_len: 16,
        }
    }

    /// Linear sweep with no classification.
    pub fn linear() -> Self {
        Self {
            mode: AnalysisMode::Linear,
            detect_smc: false,
            ..Self::new()
        }
    }

    /// Add an entry point.
    #[must_use]
    pub fn with_entry(mut self, addr: Address) -> Self {
        if !self.entry_points.contains(&addr) {
            self.entry_points.push(addr);
        }
        self
    }

    /// Set the minimum string length.
    #[must_use]
    pub fn with_min_string_len(mut self, len: usize) -> Self {
        self.min_string_len = len;
        self
    }

    /// Disable SMC detection.
    #[must_use]
    pub fn without_smc(mut self) -> Self {
        self.detect_smc = false;
        self
    }

    /// Entry points to seed the tracer with for `binary`.
    pub fn entries_for(&self, binary: &Binary) -> Vec<Address> {
        if self.entry_points.is_empty() {
            vec![binary.load_address()]
        } else {
            self.entry_points.clone()
        }
    }

    /// Check that the numeric knobs make sense.
    ///
    /// # Errors
    ///
    /// [`DisasmError::ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("min_string_len", self.min_string_len),
            ("min_pointer_entries", self.min_pointer_entries),
            ("raw_chunk_len", self.raw_chunk_len),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(DisasmError::ConfigError {
                    message: format!("{name} must be at least 1"),
                });
            }
        }
        Ok(())
    }
}

/// Parse an address written as `$4000`, `0x4000` or bare hex `4000`.
///
/// # Errors
///
/// [`DisasmError::InvalidAddress`] if the text is not a hex number that
/// fits in 16 bits.
pub fn parse_address(input: &str) -> Result<Address> {
    let s = input.trim();
    let digits = s
        .strip_prefix('$')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|_| DisasmError::InvalidAddress {
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_bounds() {
        let bin = Binary::new(vec![0xEA; 4], 0x0800).unwrap();
        assert_eq!(bin.end_address(), 0x0804);
        assert_eq!(bin.last_address(), 0x0803);
        assert!(bin.contains(0x0800));
        assert!(bin.contains(0x0803));
        assert!(!bin.contains(0x0804));
        assert!(!bin.contains(0x07FF));
        assert_eq!(bin.offset_of(0x0802), Some(2));
        assert_eq!(bin.byte_at(0x0804), None);
    }

    #[test]
    fn test_binary_top_of_memory() {
        let bin = Binary::new(vec![0; 0x100], 0xFF00).unwrap();
        assert_eq!(bin.end_address(), 0x1_0000);
        assert!(bin.contains(0xFFFF));
        assert_eq!(bin.last_address(), 0xFFFF);
    }

    #[test]
    fn test_binary_rejects_empty_and_overflow() {
        assert!(matches!(
            Binary::new(Vec::new(), 0x0800),
            Err(DisasmError::EmptyBinary)
        ));
        assert!(matches!(
            Binary::new(vec![0; 0x101], 0xFF00),
            Err(DisasmError::AddressSpaceOverflow { .. })
        ));
    }

    #[test]
    fn test_classification_starts_as_data() {
        let bin = Binary::new(vec![0; 8], 0x1000).unwrap();
        let cls = Classification::new(&bin);
        assert_eq!(cls.len(), 8);
        assert_eq!(cls.data_bytes(), 8);
        assert!(cls.iter().all(|(_, t)| t == ByteClass::Data));
        assert_eq!(cls.get(0x0FFF), None);
    }

    #[test]
    fn test_classification_spans() {
        let bin = Binary::new(vec![0; 8], 0x1000).unwrap();
        let mut cls = Classification::new(&bin);
        cls.mark_code(0x1002, 3);
        let spans = cls.spans();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0], Span { start: 0x1000, len: 2, class: ByteClass::Data });
        assert_eq!(spans[1], Span { start: 0x1002, len: 3, class: ByteClass::Code });
        assert_eq!(spans[2].end(), 0x1008);
        assert_eq!(cls.code_bytes(), 3);
    }

    #[test]
    fn test_mark_code_clips_at_end() {
        let bin = Binary::new(vec![0; 2], 0x1000).unwrap();
        let mut cls = Classification::new(&bin);
        cls.mark_code(0x1001, 3);
        assert_eq!(cls.code_bytes(), 1);
    }

    #[test]
    fn test_smc_confirm_and_queries() {
        let bin = Binary::new(vec![0; 16], 0x1000).unwrap();
        let mut cls = Classification::new(&bin);
        cls.mark_code(0x1000, 4);
        let records = [
            SmcRecord { writer: 0x1000, target: 0x1002 },
            SmcRecord { writer: 0x1003, target: 0x1002 },
            SmcRecord { writer: 0x1003, target: 0x100A },
        ];
        let smc = SmcFindings::confirm(&records, &cls);
        assert_eq!(smc.site_count(), 1);
        assert_eq!(smc.writers_of(0x1002), vec![0x1000, 0x1003]);
        assert_eq!(smc.targets_of(0x1003), vec![0x1002]);
    }

    #[test]
    fn test_options() {
        let flow = AnalysisOptions::new();
        let linear = AnalysisOptions::linear();
        assert_eq!(flow.mode, AnalysisMode::Flow);
        assert_eq!(linear.mode, AnalysisMode::Linear);
        assert!(flow.detect_smc);
        assert_eq!(flow.min_string_len, 4);

        let bin = Binary::new(vec![0; 4], 0x2000).unwrap();
        assert_eq!(flow.entries_for(&bin), vec![0x2000]);
        let with = flow.with_entry(0x2002).with_entry(0x2002);
        assert_eq!(with.entries_for(&bin), vec![0x2002]);
    }

    #[test]
    fn test_options_validate() {
        assert!(AnalysisOptions::new().validate().is_ok());
        let bad = AnalysisOptions::new().with_min_string_len(0);
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("min_string_len"));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("$4000").unwrap(), 0x4000);
        assert_eq!(parse_address("0x57D7").unwrap(), 0x57D7);
        assert_eq!(parse_address("0800").unwrap(), 0x0800);
        assert_eq!(parse_address(" c000 ").unwrap(), 0xC000);
        assert!(parse_address("$10000").is_err());
        assert!(parse_address("xyz").is_err());
        assert!(parse_address("").is_err());
    }
}
