//! MOS 6502 instruction set.
//!
//! The 6502 is an 8-bit little-endian CPU with a 16-bit address bus. Every
//! instruction is a single opcode byte followed by zero, one or two operand
//! bytes; the addressing mode fixes the operand width, so the encoded size
//! is known from the opcode alone.
//!
//! Only the 151 documented NMOS opcodes are recognised. The remaining 105
//! byte values (undocumented opcodes, `JAM`s and later CMOS additions) are
//! reported as unknown so that the bytes stay DATA.
//!
//! Key characteristics:
//! - **Relative branches**: 8 conditional branches with a signed 8-bit
//!   displacement measured from the address after the 2-byte instruction
//! - **Transfers**: `JSR abs` (returns), `JMP abs`, `JMP (abs)` (indirect,
//!   unresolvable statically)
//! - **Block terminators**: `RTS`, `RTI`, `BRK`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction mnemonics of the documented instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
}

/// How an instruction touches its memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryAccess {
    /// No data access (transfers, register ops, stack ops)
    None,
    /// Loads, arithmetic, logic, compares, `BIT`
    Read,
    /// `STA`, `STX`, `STY`
    Write,
    /// Shifts, rotates, `INC`, `DEC`
    ReadModifyWrite,
}

impl MemoryAccess {
    /// Whether the operand is read.
    pub const fn reads(self) -> bool {
        matches!(self, MemoryAccess::Read | MemoryAccess::ReadModifyWrite)
    }

    /// Whether the operand is written.
    pub const fn writes(self) -> bool {
        matches!(self, MemoryAccess::Write | MemoryAccess::ReadModifyWrite)
    }
}

impl Mnemonic {
    /// Upper-case assembler spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC",
            Mnemonic::And => "AND",
            Mnemonic::Asl => "ASL",
            Mnemonic::Bcc => "BCC",
            Mnemonic::Bcs => "BCS",
            Mnemonic::Beq => "BEQ",
            Mnemonic::Bit => "BIT",
            Mnemonic::Bmi => "BMI",
            Mnemonic::Bne => "BNE",
            Mnemonic::Bpl => "BPL",
            Mnemonic::Brk => "BRK",
            Mnemonic::Bvc => "BVC",
            Mnemonic::Bvs => "BVS",
            Mnemonic::Clc => "CLC",
            Mnemonic::Cld => "CLD",
            Mnemonic::Cli => "CLI",
            Mnemonic::Clv => "CLV",
            Mnemonic::Cmp => "CMP",
            Mnemonic::Cpx => "CPX",
            Mnemonic::Cpy => "CPY",
            Mnemonic::Dec => "DEC",
            Mnemonic::Dex => "DEX",
            Mnemonic::Dey => "DEY",
            Mnemonic::Eor => "EOR",
            Mnemonic::Inc => "INC",
            Mnemonic::Inx => "INX",
            Mnemonic::Iny => "INY",
            Mnemonic::Jmp => "JMP",
            Mnemonic::Jsr => "JSR",
            Mnemonic::Lda => "LDA",
            Mnemonic::Ldx => "LDX",
            Mnemonic::Ldy => "LDY",
            Mnemonic::Lsr => "LSR",
            Mnemonic::Nop => "NOP",
            Mnemonic::Ora => "ORA",
            Mnemonic::Pha => "PHA",
            Mnemonic::Php => "PHP",
            Mnemonic::Pla => "PLA",
            Mnemonic::Plp => "PLP",
            Mnemonic::Rol => "ROL",
            Mnemonic::Ror => "ROR",
            Mnemonic::Rti => "RTI",
            Mnemonic::Rts => "RTS",
            Mnemonic::Sbc => "SBC",
            Mnemonic::Sec => "SEC",
            Mnemonic::Sed => "SED",
            Mnemonic::Sei => "SEI",
            Mnemonic::Sta => "STA",
            Mnemonic::Stx => "STX",
            Mnemonic::Sty => "STY",
            Mnemonic::Tax => "TAX",
            Mnemonic::Tay => "TAY",
            Mnemonic::Tsx => "TSX",
            Mnemonic::Txa => "TXA",
            Mnemonic::Txs => "TXS",
            Mnemonic::Tya => "TYA",
        }
    }

    /// Conditional branch (always relative addressing).
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Mnemonic::Bcc
                | Mnemonic::Bcs
                | Mnemonic::Beq
                | Mnemonic::Bmi
                | Mnemonic::Bne
                | Mnemonic::Bpl
                | Mnemonic::Bvc
                | Mnemonic::Bvs
        )
    }

    /// Subroutine call.
    pub const fn is_call(self) -> bool {
        matches!(self, Mnemonic::Jsr)
    }

    /// Unconditional jump, direct or indirect.
    pub const fn is_jump(self) -> bool {
        matches!(self, Mnemonic::Jmp)
    }

    /// Return or break: control never falls through.
    pub const fn ends_block(self) -> bool {
        matches!(self, Mnemonic::Rts | Mnemonic::Rti | Mnemonic::Brk)
    }

    /// Access class of the memory operand.
    pub const fn memory_access(self) -> MemoryAccess {
        match self {
            Mnemonic::Adc
            | Mnemonic::And
            | Mnemonic::Bit
            | Mnemonic::Cmp
            | Mnemonic::Cpx
            | Mnemonic::Cpy
            | Mnemonic::Eor
            | Mnemonic::Lda
            | Mnemonic::Ldx
            | Mnemonic::Ldy
            | Mnemonic::Ora
            | Mnemonic::Sbc => MemoryAccess::Read,
            Mnemonic::Sta | Mnemonic::Stx | Mnemonic::Sty => MemoryAccess::Write,
            Mnemonic::Asl
            | Mnemonic::Dec
            | Mnemonic::Inc
            | Mnemonic::Lsr
            | Mnemonic::Rol
            | Mnemonic::Ror => MemoryAccess::ReadModifyWrite,
            _ => MemoryAccess::None,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operand encoding schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMode {
    /// No operand
    Implied,
    /// Operates on A
    Accumulator,
    /// `#$nn`
    Immediate,
    /// `$nn`
    ZeroPage,
    /// `$nn,X`
    ZeroPageX,
    /// `$nn,Y`
    ZeroPageY,
    /// `$nnnn`
    Absolute,
    /// `$nnnn,X`
    AbsoluteX,
    /// `$nnnn,Y`
    AbsoluteY,
    /// `($nnnn)`, `JMP` only
    Indirect,
    /// `($nn,X)`
    IndexedIndirect,
    /// `($nn),Y`
    IndirectIndexed,
    /// Signed 8-bit branch displacement
    Relative,
}

impl AddressingMode {
    /// Encoded instruction size including the opcode byte.
    pub const fn size(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndexedIndirect
            | AddressingMode::IndirectIndexed
            | AddressingMode::Relative => 2,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
        }
    }

    /// `ZeroPage`, `ZeroPageX` or `ZeroPageY`.
    pub const fn is_zero_page(self) -> bool {
        matches!(
            self,
            AddressingMode::ZeroPage | AddressingMode::ZeroPageX | AddressingMode::ZeroPageY
        )
    }

    /// `Absolute`, `AbsoluteX` or `AbsoluteY`.
    pub const fn is_absolute(self) -> bool {
        matches!(
            self,
            AddressingMode::Absolute | AddressingMode::AbsoluteX | AddressingMode::AbsoluteY
        )
    }

    /// Modes whose operand is the address of a pointer.
    pub const fn is_indirect(self) -> bool {
        matches!(
            self,
            AddressingMode::Indirect
                | AddressingMode::IndexedIndirect
                | AddressingMode::IndirectIndexed
        )
    }
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeInfo {
    /// The opcode byte
    pub opcode: u8,
    /// Instruction mnemonic
    pub mnemonic: Mnemonic,
    /// Operand encoding
    pub mode: AddressingMode,
    /// Encoded size in bytes (1-3)
    pub size: u8,
}

/// Number of documented opcodes.
pub const DOCUMENTED_OPCODE_COUNT: usize = 151;

const fn op(opcode: u8, mnemonic: Mnemonic, mode: AddressingMode) -> Option<OpcodeInfo> {
    Some(OpcodeInfo {
        opcode,
        mnemonic,
        mode,
        size: mode.size(),
    })
}

const fn describe(opcode: u8) -> Option<OpcodeInfo> {
    use AddressingMode::{
        Absolute as Abs, AbsoluteX as AbsX, AbsoluteY as AbsY, Accumulator as Acc,
        Immediate as Imm, Implied as Imp, IndexedIndirect as IndX, Indirect as Ind,
        IndirectIndexed as IndY, Relative as Rel, ZeroPage as Zp, ZeroPageX as ZpX,
        ZeroPageY as ZpY,
    };
    use Mnemonic::*;

    let o = opcode;
    match opcode {
        // ADC
        0x69 => op(o, Adc, Imm),
        0x65 => op(o, Adc, Zp),
        0x75 => op(o, Adc, ZpX),
        0x6D => op(o, Adc, Abs),
        0x7D => op(o, Adc, AbsX),
        0x79 => op(o, Adc, AbsY),
        0x61 => op(o, Adc, IndX),
        0x71 => op(o, Adc, IndY),

        // AND
        0x29 => op(o, And, Imm),
        0x25 => op(o, And, Zp),
        0x35 => op(o, And, ZpX),
        0x2D => op(o, And, Abs),
        0x3D => op(o, And, AbsX),
        0x39 => op(o, And, AbsY),
        0x21 => op(o, And, IndX),
        0x31 => op(o, And, IndY),

        // ASL
        0x0A => op(o, Asl, Acc),
        0x06 => op(o, Asl, Zp),
        0x16 => op(o, Asl, ZpX),
        0x0E => op(o, Asl, Abs),
        0x1E => op(o, Asl, AbsX),

        // Conditional branches
        0x90 => op(o, Bcc, Rel),
        0xB0 => op(o, Bcs, Rel),
        0xF0 => op(o, Beq, Rel),
        0x30 => op(o, Bmi, Rel),
        0xD0 => op(o, Bne, Rel),
        0x10 => op(o, Bpl, Rel),
        0x50 => op(o, Bvc, Rel),
        0x70 => op(o, Bvs, Rel),

        // BIT
        0x24 => op(o, Bit, Zp),
        0x2C => op(o, Bit, Abs),

        // BRK
        0x00 => op(o, Brk, Imp),

        // Flag clears
        0x18 => op(o, Clc, Imp),
        0xD8 => op(o, Cld, Imp),
        0x58 => op(o, Cli, Imp),
        0xB8 => op(o, Clv, Imp),

        // CMP
        0xC9 => op(o, Cmp, Imm),
        0xC5 => op(o, Cmp, Zp),
        0xD5 => op(o, Cmp, ZpX),
        0xCD => op(o, Cmp, Abs),
        0xDD => op(o, Cmp, AbsX),
        0xD9 => op(o, Cmp, AbsY),
        0xC1 => op(o, Cmp, IndX),
        0xD1 => op(o, Cmp, IndY),

        // CPX, CPY
        0xE0 => op(o, Cpx, Imm),
        0xE4 => op(o, Cpx, Zp),
        0xEC => op(o, Cpx, Abs),
        0xC0 => op(o, Cpy, Imm),
        0xC4 => op(o, Cpy, Zp),
        0xCC => op(o, Cpy, Abs),

        // DEC, DEX, DEY
        0xC6 => op(o, Dec, Zp),
        0xD6 => op(o, Dec, ZpX),
        0xCE => op(o, Dec, Abs),
        0xDE => op(o, Dec, AbsX),
        0xCA => op(o, Dex, Imp),
        0x88 => op(o, Dey, Imp),

        // EOR
        0x49 => op(o, Eor, Imm),
        0x45 => op(o, Eor, Zp),
        0x55 => op(o, Eor, ZpX),
        0x4D => op(o, Eor, Abs),
        0x5D => op(o, Eor, AbsX),
        0x59 => op(o, Eor, AbsY),
        0x41 => op(o, Eor, IndX),
        0x51 => op(o, Eor, IndY),

        // INC, INX, INY
        0xE6 => op(o, Inc, Zp),
        0xF6 => op(o, Inc, ZpX),
        0xEE => op(o, Inc, Abs),
        0xFE => op(o, Inc, AbsX),
        0xE8 => op(o, Inx, Imp),
        0xC8 => op(o, Iny, Imp),

        // JMP, JSR
        0x4C => op(o, Jmp, Abs),
        0x6C => op(o, Jmp, Ind),
        0x20 => op(o, Jsr, Abs),

        // LDA
        0xA9 => op(o, Lda, Imm),
        0xA5 => op(o, Lda, Zp),
        0xB5 => op(o, Lda, ZpX),
        0xAD => op(o, Lda, Abs),
        0xBD => op(o, Lda, AbsX),
        0xB9 => op(o, Lda, AbsY),
        0xA1 => op(o, Lda, IndX),
        0xB1 => op(o, Lda, IndY),

        // LDX
        0xA2 => op(o, Ldx, Imm),
        0xA6 => op(o, Ldx, Zp),
        0xB6 => op(o, Ldx, ZpY),
        0xAE => op(o, Ldx, Abs),
        0xBE => op(o, Ldx, AbsY),

        // LDY
        0xA0 => op(o, Ldy, Imm),
        0xA4 => op(o, Ldy, Zp),
        0xB4 => op(o, Ldy, ZpX),
        0xAC => op(o, Ldy, Abs),
        0xBC => op(o, Ldy, AbsX),

        // LSR
        0x4A => op(o, Lsr, Acc),
        0x46 => op(o, Lsr, Zp),
        0x56 => op(o, Lsr, ZpX),
        0x4E => op(o, Lsr, Abs),
        0x5E => op(o, Lsr, AbsX),

        // NOP
        0xEA => op(o, Nop, Imp),

        // ORA
        0x09 => op(o, Ora, Imm),
        0x05 => op(o, Ora, Zp),
        0x15 => op(o, Ora, ZpX),
        0x0D => op(o, Ora, Abs),
        0x1D => op(o, Ora, AbsX),
        0x19 => op(o, Ora, AbsY),
        0x01 => op(o, Ora, IndX),
        0x11 => op(o, Ora, IndY),

        // Stack
        0x48 => op(o, Pha, Imp),
        0x08 => op(o, Php, Imp),
        0x68 => op(o, Pla, Imp),
        0x28 => op(o, Plp, Imp),

        // ROL
        0x2A => op(o, Rol, Acc),
        0x26 => op(o, Rol, Zp),
        0x36 => op(o, Rol, ZpX),
        0x2E => op(o, Rol, Abs),
        0x3E => op(o, Rol, AbsX),

        // ROR
        0x6A => op(o, Ror, Acc),
        0x66 => op(o, Ror, Zp),
        0x76 => op(o, Ror, ZpX),
        0x6E => op(o, Ror, Abs),
        0x7E => op(o, Ror, AbsX),

        // Returns
        0x40 => op(o, Rti, Imp),
        0x60 => op(o, Rts, Imp),

        // SBC
        0xE9 => op(o, Sbc, Imm),
        0xE5 => op(o, Sbc, Zp),
        0xF5 => op(o, Sbc, ZpX),
        0xED => op(o, Sbc, Abs),
        0xFD => op(o, Sbc, AbsX),
        0xF9 => op(o, Sbc, AbsY),
        0xE1 => op(o, Sbc, IndX),
        0xF1 => op(o, Sbc, IndY),

        // Flag sets
        0x38 => op(o, Sec, Imp),
        0xF8 => op(o, Sed, Imp),
        0x78 => op(o, Sei, Imp),

        // STA
        0x85 => op(o, Sta, Zp),
        0x95 => op(o, Sta, ZpX),
        0x8D => op(o, Sta, Abs),
        0x9D => op(o, Sta, AbsX),
        0x99 => op(o, Sta, AbsY),
        0x81 => op(o, Sta, IndX),
        0x91 => op(o, Sta, IndY),

        // STX, STY
        0x86 => op(o, Stx, Zp),
        0x96 => op(o, Stx, ZpY),
        0x8E => op(o, Stx, Abs),
        0x84 => op(o, Sty, Zp),
        0x94 => op(o, Sty, ZpX),
        0x8C => op(o, Sty, Abs),

        // Register transfers
        0xAA => op(o, Tax, Imp),
        0xA8 => op(o, Tay, Imp),
        0xBA => op(o, Tsx, Imp),
        0x8A => op(o, Txa, Imp),
        0x9A => op(o, Txs, Imp),
        0x98 => op(o, Tya, Imp),

        _ => None,
    }
}

static OPCODES: [Option<OpcodeInfo>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = describe(i as u8);
        i += 1;
    }
    table
};

/// Look up an opcode byte. `None` means the byte is not a documented opcode.
pub fn lookup(opcode: u8) -> Option<&'static OpcodeInfo> {
    OPCODES[usize::from(opcode)].as_ref()
}

/// Every documented opcode in ascending byte order.
pub fn documented_opcodes() -> impl Iterator<Item = &'static OpcodeInfo> {
    OPCODES.iter().filter_map(Option::as_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_opcode_count() {
        assert_eq!(documented_opcodes().count(), DOCUMENTED_OPCODE_COUNT);
    }

    #[test]
    fn test_table_is_self_consistent() {
        for info in documented_opcodes() {
            assert_eq!(lookup(info.opcode), Some(info));
            assert_eq!(info.size, info.mode.size());
            assert!((1..=3).contains(&info.size));
        }
    }

    #[test]
    fn test_known_opcodes() {
        let lda = lookup(0xA9).unwrap();
        assert_eq!(lda.mnemonic, Mnemonic::Lda);
        assert_eq!(lda.mode, AddressingMode::Immediate);
        assert_eq!(lda.size, 2);

        let jmp = lookup(0x6C).unwrap();
        assert_eq!(jmp.mnemonic, Mnemonic::Jmp);
        assert_eq!(jmp.mode, AddressingMode::Indirect);
        assert_eq!(jmp.size, 3);

        assert_eq!(lookup(0x00).unwrap().mnemonic, Mnemonic::Brk);
    }

    #[test]
    fn test_unknown_opcodes() {
        // Undocumented NMOS opcodes and CMOS additions
        for byte in [0x02, 0x03, 0x1A, 0x80, 0x9C, 0xDA, 0xFF] {
            assert!(lookup(byte).is_none(), "${byte:02X} should be unknown");
        }
    }

    #[test]
    fn test_branches_are_relative() {
        for info in documented_opcodes() {
            assert_eq!(
                info.mnemonic.is_branch(),
                info.mode == AddressingMode::Relative,
                "{}",
                info.mnemonic
            );
        }
    }

    #[test]
    fn test_memory_access_classes() {
        assert_eq!(Mnemonic::Lda.memory_access(), MemoryAccess::Read);
        assert_eq!(Mnemonic::Sta.memory_access(), MemoryAccess::Write);
        assert_eq!(Mnemonic::Inc.memory_access(), MemoryAccess::ReadModifyWrite);
        assert_eq!(Mnemonic::Jmp.memory_access(), MemoryAccess::None);
        assert!(MemoryAccess::ReadModifyWrite.reads());
        assert!(MemoryAccess::ReadModifyWrite.writes());
        assert!(!MemoryAccess::Write.reads());
    }

    #[test]
    fn test_block_terminators() {
        assert!(Mnemonic::Rts.ends_block());
        assert!(Mnemonic::Rti.ends_block());
        assert!(Mnemonic::Brk.ends_block());
        assert!(!Mnemonic::Jsr.ends_block());
    }
}
