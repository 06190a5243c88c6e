//! Instruction decoder.
//!
//! Turns an opcode byte and its trailing operand bytes into an
//! [`Instruction`]. A byte that is not a documented opcode decodes to
//! `None`; that is a classification outcome, not an error. An instruction
//! cut short by the end of the buffer decodes with a
//! [`Operand::Truncated`] placeholder instead of reading out of bounds.

use crate::architectures::mos6502::{self, AddressingMode, Mnemonic};
use crate::types::{Address, Binary};
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

/// Decoded operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Operand {
    /// Implied or accumulator mode
    None,
    /// One operand byte
    Byte(u8),
    /// Two operand bytes, little-endian
    Word(u16),
    /// The buffer ended before all operand bytes were available
    Truncated,
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Address of the opcode byte
    pub address: Address,
    /// The opcode byte
    pub opcode: u8,
    /// Instruction mnemonic
    pub mnemonic: Mnemonic,
    /// Operand encoding
    pub mode: AddressingMode,
    /// Encoded size in bytes
    pub size: u8,
    /// Operand value
    pub operand: Operand,
    /// Bytes actually present in the buffer (fewer than `size` if truncated)
    pub raw: Vec<u8>,
}

impl Instruction {
    /// Whether the buffer ended inside this instruction.
    pub fn is_truncated(&self) -> bool {
        self.operand == Operand::Truncated
    }

    /// Operand as a 16-bit value, if any.
    pub fn operand_value(&self) -> Option<u16> {
        match self.operand {
            Operand::Byte(b) => Some(u16::from(b)),
            Operand::Word(w) => Some(w),
            Operand::None | Operand::Truncated => None,
        }
    }

    /// Address of the byte following this instruction.
    pub fn next_address(&self) -> u32 {
        u32::from(self.address) + u32::from(self.size)
    }

    /// Whether `addr` is one of this instruction's bytes.
    pub fn covers(&self, addr: Address) -> bool {
        addr >= self.address && u32::from(addr) < self.next_address()
    }

    /// Target of a conditional branch.
    pub fn branch_target(&self) -> Option<Address> {
        match (self.mode, self.operand) {
            (AddressingMode::Relative, Operand::Byte(offset)) => {
                Some(relative_target(self.address, offset))
            }
            _ => None,
        }
    }

    /// Statically known control-transfer target: branch, `JSR` or `JMP abs`.
    pub fn transfer_target(&self) -> Option<Address> {
        if self.mnemonic.is_branch() {
            return self.branch_target();
        }
        match (self.mnemonic, self.mode, self.operand) {
            (Mnemonic::Jsr | Mnemonic::Jmp, AddressingMode::Absolute, Operand::Word(w)) => Some(w),
            _ => None,
        }
    }

    /// Directly addressed memory operand (zero-page or absolute, indexed or not).
    pub fn memory_operand(&self) -> Option<Address> {
        if self.mode.is_zero_page() || self.mode.is_absolute() {
            self.operand_value()
        } else {
            None
        }
    }

    /// Address of the pointer read by an indirect mode.
    pub fn pointer_operand(&self) -> Option<Address> {
        if self.mode.is_indirect() {
            self.operand_value()
        } else {
            None
        }
    }

    /// `JMP ($nnnn)`: the target is only known at run time.
    pub fn is_indirect_jump(&self) -> bool {
        self.mnemonic.is_jump() && self.mode == AddressingMode::Indirect
    }
}

/// Resolve a branch displacement.
///
/// The displacement is signed (`operand - 256` when `operand >= 128`) and
/// counts from the address after the 2-byte branch. Arithmetic wraps at
/// the top of the address space the way the CPU does.
pub fn relative_target(pc: Address, operand: u8) -> Address {
    let offset = i16::from(operand as i8);
    pc.wrapping_add(2).wrapping_add_signed(offset)
}

/// Decode the instruction whose opcode is `bytes[0]`, located at `address`.
///
/// Returns `None` for an empty slice or an unknown opcode.
pub fn decode(bytes: &[u8], address: Address) -> Option<Instruction> {
    let (&opcode, rest) = bytes.split_first()?;
    let info = mos6502::lookup(opcode)?;
    let needed = usize::from(info.size) - 1;

    let operand = if rest.len() < needed {
        Operand::Truncated
    } else {
        match needed {
            0 => Operand::None,
            1 => Operand::Byte(rest[0]),
            _ => Operand::Word(LittleEndian::read_u16(&rest[..2])),
        }
    };
    let present = 1 + needed.min(rest.len());

    Some(Instruction {
        address,
        opcode,
        mnemonic: info.mnemonic,
        mode: info.mode,
        size: info.size,
        operand,
        raw: bytes[..present].to_vec(),
    })
}

/// Decode the instruction starting at `addr` inside `binary`.
pub fn decode_at(binary: &Binary, addr: Address) -> Option<Instruction> {
    decode(binary.slice_from(addr)?, addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_immediate() {
        let insn = decode(&[0xA9, 0x05], 0x0800).unwrap();
        assert_eq!(insn.mnemonic, Mnemonic::Lda);
        assert_eq!(insn.mode, AddressingMode::Immediate);
        assert_eq!(insn.operand, Operand::Byte(0x05));
        assert_eq!(insn.raw, vec![0xA9, 0x05]);
        assert_eq!(insn.next_address(), 0x0802);
    }

    #[test]
    fn test_decode_absolute_little_endian() {
        let insn = decode(&[0x8D, 0x00, 0xC0, 0xFF], 0x0802).unwrap();
        assert_eq!(insn.mnemonic, Mnemonic::Sta);
        assert_eq!(insn.operand, Operand::Word(0xC000));
        assert_eq!(insn.memory_operand(), Some(0xC000));
        assert_eq!(insn.raw.len(), 3);
    }

    #[test]
    fn test_decode_unknown() {
        assert!(decode(&[0x02, 0x00], 0x1000).is_none());
        assert!(decode(&[], 0x1000).is_none());
    }

    #[test]
    fn test_decode_truncated() {
        let insn = decode(&[0x4C, 0x00], 0x1000).unwrap();
        assert!(insn.is_truncated());
        assert_eq!(insn.size, 3);
        assert_eq!(insn.raw, vec![0x4C, 0x00]);
        assert_eq!(insn.transfer_target(), None);
        assert_eq!(insn.operand_value(), None);
    }

    #[test]
    fn test_branch_self_loop() {
        // BNE $FE at $1000 branches to itself: pc + 2 - 2
        assert_eq!(relative_target(0x1000, 0xFE), 0x1000);
        let insn = decode(&[0xD0, 0xFE], 0x1000).unwrap();
        assert_eq!(insn.branch_target(), Some(0x1000));
        assert_eq!(insn.transfer_target(), Some(0x1000));
    }

    #[test]
    fn test_branch_offsets() {
        assert_eq!(relative_target(0x1000, 0x00), 0x1002);
        assert_eq!(relative_target(0x1000, 0x7F), 0x1081);
        assert_eq!(relative_target(0x1000, 0x80), 0x0F82);
        assert_eq!(relative_target(0xFFFE, 0x01), 0x0001);
    }

    #[test]
    fn test_transfer_targets() {
        let jsr = decode(&[0x20, 0xED, 0xFD], 0x0800).unwrap();
        assert_eq!(jsr.transfer_target(), Some(0xFDED));
        assert_eq!(jsr.memory_operand(), Some(0xFDED));

        let jmp_ind = decode(&[0x6C, 0x00, 0x03], 0x0800).unwrap();
        assert!(jmp_ind.is_indirect_jump());
        assert_eq!(jmp_ind.transfer_target(), None);
        assert_eq!(jmp_ind.pointer_operand(), Some(0x0300));
    }

    #[test]
    fn test_decode_at_binary() {
        let bin = Binary::new(vec![0xEA, 0x60], 0x0800).unwrap();
        assert_eq!(decode_at(&bin, 0x0801).unwrap().mnemonic, Mnemonic::Rts);
        assert!(decode_at(&bin, 0x0802).is_none());
    }

    #[test]
    fn test_covers() {
        let insn = decode(&[0xAD, 0x00, 0x09], 0x0800).unwrap();
        assert!(insn.covers(0x0800));
        assert!(insn.covers(0x0802));
        assert!(!insn.covers(0x0803));
    }
}
