//! Work-list driven control-flow tracer.
//!
//! The tracer explores the binary from its entry points one straight-line
//! block at a time. Blocks end at unconditional transfers, returns, unknown
//! opcodes, truncated instructions and already-visited addresses; every
//! branch, call and direct jump target discovered on the way is queued.
//! The graph is never materialised: state is an address-indexed
//! classification, a visited bitmap and a FIFO queue, so long call chains
//! cost queue slots rather than stack frames.
//!
//! An address is decoded at most once. The first block to reach it fixes
//! the instruction boundary there; a later decode that would start inside,
//! or run across, an instruction already placed is rejected and recorded
//! as a conflict instead of being reconciled.

use crate::decoder::{self, Instruction};
use crate::types::{Address, Binary, Classification, SmcFindings, SmcRecord, TargetSets};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, trace};

/// Receives every instruction the tracer accepts, in visit order.
///
/// This is the seam shared by the disassembler and the memory-access
/// analyzer: both walk the same traversal and only differ in what they
/// record per instruction.
pub trait InstructionSink {
    /// Called once per accepted instruction.
    fn visit(&mut self, insn: &Instruction);
}

impl<F: FnMut(&Instruction)> InstructionSink for F {
    fn visit(&mut self, insn: &Instruction) {
        self(insn);
    }
}

/// Everything a completed trace produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceResult {
    /// Final CODE/DATA tags
    pub classification: Classification,
    /// Transfer targets and data references
    pub targets: TargetSets,
    /// Candidate self-modifying writes (writer, target), deduplicated
    pub writes: BTreeSet<SmcRecord>,
    /// Addresses where an accepted instruction begins
    pub instruction_starts: BTreeSet<Address>,
    /// Entries rejected because they overlap an accepted instruction
    pub conflicts: BTreeSet<Address>,
}

impl TraceResult {
    /// Writes whose target ended up CODE.
    pub fn detect_smc(&self) -> SmcFindings {
        SmcFindings::confirm(&self.writes, &self.classification)
    }
}

/// Iterative flow tracer over one binary.
#[derive(Debug)]
pub struct FlowTracer<'a> {
    binary: &'a Binary,
    worklist: VecDeque<Address>,
    visited: Vec<bool>,
    starts: Vec<bool>,
    classification: Classification,
    targets: TargetSets,
    writes: BTreeSet<SmcRecord>,
    conflicts: BTreeSet<Address>,
}

impl<'a> FlowTracer<'a> {
    /// Create a tracer with an empty work-list.
    pub fn new(binary: &'a Binary) -> Self {
        Self {
            binary,
            worklist: VecDeque::new(),
            visited: vec![false; binary.len()],
            starts: vec![false; binary.len()],
            classification: Classification::new(binary),
            targets: TargetSets::new(),
            writes: BTreeSet::new(),
            conflicts: BTreeSet::new(),
        }
    }

    /// Queue `addr` for exploration.
    ///
    /// Returns `false` (and queues nothing) when `addr` lies outside the
    /// binary or has already been visited.
    pub fn add_entry(&mut self, addr: Address) -> bool {
        match self.binary.offset_of(addr) {
            Some(off) if !self.visited[off] => {
                self.worklist.push_back(addr);
                true
            }
            Some(_) => false,
            None => {
                debug!("dropping out-of-range entry ${addr:04X}");
                false
            }
        }
    }

    /// Drain the work-list.
    pub fn trace(&mut self) {
        self.trace_with(&mut |_: &Instruction| {});
    }

    /// Drain the work-list, handing each accepted instruction to `sink`.
    pub fn trace_with<S: InstructionSink>(&mut self, sink: &mut S) {
        while let Some(start) = self.worklist.pop_front() {
            trace!("tracing block at ${start:04X}");
            self.walk_block(start, sink);
        }
    }

    fn walk_block<S: InstructionSink>(&mut self, start: Address, sink: &mut S) {
        let mut pc = start;
        loop {
            let Some(off) = self.binary.offset_of(pc) else {
                break;
            };
            if self.visited[off] {
                break;
            }
            self.visited[off] = true;

            let Some(insn) = decoder::decode_at(self.binary, pc) else {
                break;
            };
            if insn.is_truncated() {
                break;
            }
            if self.overlaps_accepted(&insn) {
                debug!("decode at ${pc:04X} overlaps an earlier instruction, keeping the first");
                self.conflicts.insert(pc);
                break;
            }

            self.classification.mark_code(pc, insn.size);
            self.starts[off] = true;
            sink.visit(&insn);

            if !self.follow(&insn) {
                break;
            }
            match Address::try_from(insn.next_address()) {
                Ok(next) => pc = next,
                Err(_) => break,
            }
        }
    }

    /// Record what `insn` references. Returns whether the block continues.
    fn follow(&mut self, insn: &Instruction) -> bool {
        let mnemonic = insn.mnemonic;

        if mnemonic.is_branch() {
            if let Some(target) = insn.branch_target() {
                self.targets.branch_targets.insert(target);
                self.add_entry(target);
            }
            return true;
        }

        if mnemonic.is_call() {
            if let Some(target) = insn.transfer_target() {
                self.targets.subroutine_targets.insert(target);
                self.add_entry(target);
            }
            return true;
        }

        if mnemonic.is_jump() {
            if let Some(target) = insn.transfer_target() {
                self.targets.jump_targets.insert(target);
                self.add_entry(target);
            } else {
                if let Some(ptr) = insn.pointer_operand().filter(|p| self.binary.contains(*p)) {
                    self.targets.data_refs.insert(ptr);
                }
                debug!("indirect jump at ${:04X}, abandoning path", insn.address);
            }
            return false;
        }

        if mnemonic.ends_block() {
            return false;
        }

        self.record_memory(insn);
        true
    }

    fn record_memory(&mut self, insn: &Instruction) {
        let Some(addr) = insn.memory_operand().filter(|a| self.binary.contains(*a)) else {
            return;
        };
        let access = insn.mnemonic.memory_access();
        let absolute = insn.mode.is_absolute();

        if access.writes() {
            self.writes.insert(SmcRecord {
                writer: insn.address,
                target: addr,
            });
        }
        if access.reads() && absolute {
            self.targets.data_refs.insert(addr);
        }
    }

    fn overlaps_accepted(&self, insn: &Instruction) -> bool {
        (0..u16::from(insn.size)).any(|i| self.classification.is_code(insn.address.wrapping_add(i)))
    }

    /// Current classification.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Targets collected so far.
    pub fn targets(&self) -> &TargetSets {
        &self.targets
    }

    /// Candidate writes collected so far.
    pub fn writes(&self) -> &BTreeSet<SmcRecord> {
        &self.writes
    }

    /// Confirm candidate writes against the classification.
    ///
    /// Only meaningful once [`trace`](Self::trace) has drained the
    /// work-list: a write target may be reached as code by a block that is
    /// still queued.
    pub fn detect_smc(&self) -> SmcFindings {
        SmcFindings::confirm(&self.writes, &self.classification)
    }

    /// Consume the tracer.
    pub fn finish(self) -> TraceResult {
        let instruction_starts = self
            .starts
            .iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(off, _)| self.binary.address_at(off))
            .collect();
        TraceResult {
            classification: self.classification,
            targets: self.targets,
            writes: self.writes,
            instruction_starts,
            conflicts: self.conflicts,
        }
    }
}

/// Trace `binary` from `entries` and return the result.
pub fn trace_binary(binary: &Binary, entries: &[Address]) -> TraceResult {
    let mut tracer = FlowTracer::new(binary);
    for &entry in entries {
        tracer.add_entry(entry);
    }
    tracer.trace();
    tracer.finish()
}
