//! Memory-access analysis.
//!
//! Walks a binary with the same traversal the disassembler uses (the
//! [`FlowTracer`] from an entry point, or a sequential linear sweep) and
//! tallies, per address, how often it is read, written and executed and
//! which instructions reference it.
//!
//! Accesses are counted per static reference, not per dynamic execution:
//! a `LDA $C000` inside a loop counts once. `JSR` and `JMP abs` count as a
//! read of their target; a branch only records the referencing site.

pub mod report;

pub use report::{export_csv, export_html, render_html, render_report, write_csv};

use crate::analysis::{FlowTracer, InstructionSink, LinearScanner};
use crate::architectures::apple2;
use crate::architectures::mos6502::{AddressingMode, MemoryAccess};
use crate::decoder::Instruction;
use crate::types::{Address, Binary};
use bitflags::bitflags;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

bitflags! {
    /// Ways an address was touched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u8 {
        /// Read as data
        const READ = 0b001;
        /// Written as data
        const WRITE = 0b010;
        /// Part of an executed instruction
        const EXECUTE = 0b100;
    }
}

impl AccessFlags {
    /// `R`, `W`, `RW` or `-`.
    pub fn rw_str(self) -> &'static str {
        match (self.contains(Self::READ), self.contains(Self::WRITE)) {
            (true, true) => "RW",
            (true, false) => "R",
            (false, true) => "W",
            (false, false) => "-",
        }
    }
}

/// What a region of memory appears to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Executed
    Code,
    /// Read or written but never executed
    Data,
    /// Never referenced
    Unknown,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Code => write!(f, "code"),
            RegionKind::Data => write!(f, "data"),
            RegionKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Access tally for one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    /// Data reads
    pub read_count: u32,
    /// Data writes
    pub write_count: u32,
    /// Times the byte was part of a visited instruction
    pub exec_count: u32,
    /// Instructions that reference this address
    pub callers: BTreeSet<Address>,
}

impl AddressInfo {
    /// Reads, writes and executions combined.
    pub fn total(&self) -> u32 {
        self.read_count + self.write_count + self.exec_count
    }

    /// Summary flags.
    pub fn flags(&self) -> AccessFlags {
        let mut flags = AccessFlags::empty();
        flags.set(AccessFlags::READ, self.read_count > 0);
        flags.set(AccessFlags::WRITE, self.write_count > 0);
        flags.set(AccessFlags::EXECUTE, self.exec_count > 0);
        flags
    }

    /// Code if executed, data if only read or written.
    pub fn kind(&self) -> RegionKind {
        let flags = self.flags();
        if flags.contains(AccessFlags::EXECUTE) {
            RegionKind::Code
        } else if flags.intersects(AccessFlags::READ | AccessFlags::WRITE) {
            RegionKind::Data
        } else {
            RegionKind::Unknown
        }
    }

    /// Whether the address was read or written.
    pub fn is_data_accessed(&self) -> bool {
        self.read_count > 0 || self.write_count > 0
    }
}

/// A run of addresses of one [`RegionKind`], bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    /// First address
    pub start: Address,
    /// Last address
    pub end: Address,
    /// Shared kind
    pub kind: RegionKind,
}

impl Region {
    /// Size in bytes.
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// Always `false`: regions hold at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Addresses of the region.
    pub fn addresses(&self) -> impl Iterator<Item = Address> {
        self.start..=self.end
    }
}

/// Per-address access tallies for one binary.
#[derive(Debug, Clone)]
pub struct AccessAnalyzer<'a> {
    binary: &'a Binary,
    info: BTreeMap<Address, AddressInfo>,
    subroutines: BTreeSet<Address>,
    branch_targets: BTreeSet<Address>,
}

impl InstructionSink for AccessAnalyzer<'_> {
    fn visit(&mut self, insn: &Instruction) {
        self.record(insn);
    }
}

impl<'a> AccessAnalyzer<'a> {
    /// Empty tallies for `binary`.
    pub fn new(binary: &'a Binary) -> Self {
        Self {
            binary,
            info: BTreeMap::new(),
            subroutines: BTreeSet::new(),
            branch_targets: BTreeSet::new(),
        }
    }

    /// Tally the instructions reachable from `entry`.
    pub fn analyze_flow(binary: &'a Binary, entry: Address) -> Self {
        let mut analyzer = Self::new(binary);
        let mut tracer = FlowTracer::new(binary);
        tracer.add_entry(entry);
        tracer.trace_with(&mut analyzer);
        analyzer
    }

    /// Tally a front-to-back sweep of the whole binary.
    pub fn analyze_linear(binary: &'a Binary) -> Self {
        let mut analyzer = Self::new(binary);
        LinearScanner::new(binary).sweep_with(&mut analyzer);
        analyzer
    }

    /// Record one instruction.
    pub fn record(&mut self, insn: &Instruction) {
        let pc = insn.address;
        for offset in 0..u16::from(insn.size) {
            self.entry(pc.wrapping_add(offset)).exec_count += 1;
        }

        if let Some(target) = insn.transfer_target() {
            if insn.mnemonic.is_branch() {
                self.branch_targets.insert(target);
                self.entry(target).callers.insert(pc);
            } else {
                // JSR and JMP abs name their target as an absolute operand.
                if insn.mnemonic.is_call() {
                    self.subroutines.insert(target);
                } else {
                    self.branch_targets.insert(target);
                }
                self.read(target, pc);
            }
            return;
        }

        if let Some(ptr) = insn.pointer_operand() {
            self.read(ptr, pc);
            let zp_pointer = matches!(
                insn.mode,
                AddressingMode::IndexedIndirect | AddressingMode::IndirectIndexed
            );
            if zp_pointer && ptr < 0x100 {
                self.read((ptr + 1) & 0xFF, pc);
            }
        }

        if let Some(target) = insn.memory_operand() {
            match insn.mnemonic.memory_access() {
                MemoryAccess::Read => self.read(target, pc),
                MemoryAccess::Write => self.write(target, pc),
                MemoryAccess::ReadModifyWrite => {
                    self.read(target, pc);
                    self.write(target, pc);
                }
                MemoryAccess::None => {}
            }
        }
    }

    fn entry(&mut self, addr: Address) -> &mut AddressInfo {
        self.info.entry(addr).or_default()
    }

    fn read(&mut self, addr: Address, from: Address) {
        let info = self.entry(addr);
        info.read_count += 1;
        info.callers.insert(from);
    }

    fn write(&mut self, addr: Address, from: Address) {
        let info = self.entry(addr);
        info.write_count += 1;
        info.callers.insert(from);
    }

    /// The analysed binary.
    pub fn binary(&self) -> &Binary {
        self.binary
    }

    /// Tally for `addr`, if it was touched at all.
    pub fn info(&self, addr: Address) -> Option<&AddressInfo> {
        self.info.get(&addr)
    }

    /// Every touched address in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &AddressInfo)> {
        self.info.iter().map(|(a, i)| (*a, i))
    }

    /// `JSR` targets seen.
    pub fn subroutines(&self) -> &BTreeSet<Address> {
        &self.subroutines
    }

    /// Branch and `JMP` targets seen.
    pub fn branch_targets(&self) -> &BTreeSet<Address> {
        &self.branch_targets
    }

    fn kind_of(&self, addr: Address) -> RegionKind {
        self.info(addr).map_or(RegionKind::Unknown, AddressInfo::kind)
    }

    /// Contiguous regions of the binary's own address range.
    pub fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<Region> = Vec::new();
        for addr in self.binary.addresses() {
            let kind = self.kind_of(addr);
            match regions.last_mut() {
                Some(region) if region.kind == kind => region.end = addr,
                _ => regions.push(Region {
                    start: addr,
                    end: addr,
                    kind,
                }),
            }
        }
        regions
    }

    /// The `n` most executed addresses, ties broken by address.
    pub fn top_hot_code(&self, n: usize) -> Vec<(Address, &AddressInfo)> {
        let mut hot: Vec<_> = self.iter().filter(|(_, i)| i.exec_count > 0).collect();
        hot.sort_by(|a, b| b.1.exec_count.cmp(&a.1.exec_count).then(a.0.cmp(&b.0)));
        hot.truncate(n);
        hot
    }

    /// Zero-page cells that were read or written.
    pub fn zero_page_summary(&self) -> Vec<(Address, &AddressInfo)> {
        self.info
            .range(0x00..=0xFF)
            .filter(|(_, i)| i.is_data_accessed())
            .map(|(a, i)| (*a, i))
            .collect()
    }

    /// Soft switches that were read or written, with their names.
    pub fn io_summary(&self) -> Vec<(Address, &'static str, &AddressInfo)> {
        self.info
            .range(apple2::IO_PAGE_START..=apple2::IO_PAGE_END)
            .filter(|(_, i)| i.is_data_accessed())
            .map(|(a, i)| (*a, apple2::hardware_name(*a).unwrap_or("UNKNOWN_IO"), i))
            .collect()
    }
}
