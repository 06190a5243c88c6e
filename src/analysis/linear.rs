//! Linear sweep over a binary.
//!
//! Two walks live here. [`LinearScanner::harvest`] decodes at every byte
//! offset independently, regardless of classification, and collects the
//! transfer targets each decode names. [`LinearScanner::sweep`] walks the
//! buffer front to back the way a simple disassembler does, skipping one
//! byte past anything that does not decode.

use crate::analysis::flow::InstructionSink;
use crate::decoder::{self, Instruction};
use crate::types::{Address, Binary, TargetSets};

/// One step of a sequential sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepItem {
    /// A fully decoded instruction
    Instruction(Instruction),
    /// A byte that is not a documented opcode
    Unknown {
        /// Address of the byte
        address: Address,
        /// The byte
        value: u8,
    },
    /// An opcode whose operand runs past the end of the buffer
    Truncated(Instruction),
}

impl SweepItem {
    /// Address the item starts at.
    pub fn address(&self) -> Address {
        match self {
            SweepItem::Instruction(insn) | SweepItem::Truncated(insn) => insn.address,
            SweepItem::Unknown { address, .. } => *address,
        }
    }
}

/// Classification-free scanner.
#[derive(Debug, Clone, Copy)]
pub struct LinearScanner<'a> {
    binary: &'a Binary,
}

impl<'a> LinearScanner<'a> {
    /// Scanner over `binary`.
    pub fn new(binary: &'a Binary) -> Self {
        Self { binary }
    }

    /// Transfer targets named by a decode at any offset.
    ///
    /// Targets are kept whether or not they fall inside the binary.
    /// `data_refs` stays empty.
    pub fn harvest(&self) -> TargetSets {
        let mut targets = TargetSets::new();
        for addr in self.binary.addresses() {
            let Some(insn) = decoder::decode_at(self.binary, addr) else {
                continue;
            };
            let Some(target) = insn.transfer_target() else {
                continue;
            };
            if insn.mnemonic.is_branch() {
                targets.branch_targets.insert(target);
            } else if insn.mnemonic.is_call() {
                targets.subroutine_targets.insert(target);
            } else {
                targets.jump_targets.insert(target);
            }
        }
        targets
    }

    /// Front-to-back walk.
    pub fn sweep(&self) -> Vec<SweepItem> {
        let mut items = Vec::new();
        let mut offset = 0;
        let bytes = self.binary.bytes();
        while offset < bytes.len() {
            let address = self.binary.address_at(offset);
            match decoder::decode(&bytes[offset..], address) {
                Some(insn) if insn.is_truncated() => {
                    items.push(SweepItem::Truncated(insn));
                    offset += 1;
                }
                Some(insn) => {
                    offset += usize::from(insn.size);
                    items.push(SweepItem::Instruction(insn));
                }
                None => {
                    items.push(SweepItem::Unknown {
                        address,
                        value: bytes[offset],
                    });
                    offset += 1;
                }
            }
        }
        items
    }

    /// Feed every decoded instruction of a sweep to `sink`.
    pub fn sweep_with<S: InstructionSink>(&self, sink: &mut S) {
        for item in self.sweep() {
            if let SweepItem::Instruction(insn) = item {
                sink.visit(&insn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(bytes: &[u8], load: Address) -> Binary {
        Binary::new(bytes.to_vec(), load).unwrap()
    }

    #[test]
    fn test_harvest_every_offset() {
        // LDA $0820 reads as AD 20 08; offset 1 decodes as JSR $xx08
        let b = bin(&[0xAD, 0x20, 0x08, 0x09, 0x60], 0x0800);
        let targets = LinearScanner::new(&b).harvest();
        assert!(targets.subroutine_targets.contains(&0x0908));
        assert!(targets.data_refs.is_empty());
    }

    #[test]
    fn test_harvest_keeps_out_of_range() {
        let b = bin(&[0x20, 0xED, 0xFD, 0x4C, 0x00, 0x08, 0xD0, 0xFE], 0x0800);
        let targets = LinearScanner::new(&b).harvest();
        assert!(targets.subroutine_targets.contains(&0xFDED));
        assert!(targets.jump_targets.contains(&0x0800));
        assert!(targets.branch_targets.contains(&0x0806));
    }

    #[test]
    fn test_sweep_sequence() {
        let b = bin(&[0xA9, 0x05, 0x02, 0xEA, 0x4C, 0x00], 0x0800);
        let items = LinearScanner::new(&b).sweep();
        let addrs: Vec<_> = items.iter().map(SweepItem::address).collect();
        assert_eq!(addrs, vec![0x0800, 0x0802, 0x0803, 0x0804, 0x0805]);
        assert!(matches!(items[1], SweepItem::Unknown { value: 0x02, .. }));
        assert!(matches!(items[3], SweepItem::Truncated(_)));
        assert!(matches!(items[4], SweepItem::Instruction(ref i) if i.mnemonic.as_str() == "BRK"));
    }

    #[test]
    fn test_sweep_with_sink() {
        let b = bin(&[0xEA, 0x02, 0x60], 0x0800);
        let mut seen = Vec::new();
        LinearScanner::new(&b).sweep_with(&mut |insn: &Instruction| seen.push(insn.address));
        assert_eq!(seen, vec![0x0800, 0x0802]);
    }
}
