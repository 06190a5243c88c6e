//! Operand rendering.
//!
//! Renders an instruction's operand in conventional 6502 assembler
//! syntax, substituting label names for addresses and annotating absolute
//! operands that name an Apple II soft switch.

use crate::analysis::LabelMap;
use crate::architectures::apple2;
use crate::architectures::mos6502::AddressingMode;
use crate::decoder::{Instruction, Operand};
use crate::types::Address;

/// A rendered operand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormattedOperand {
    /// Operand text, empty for implied mode
    pub text: String,
    /// Hardware register name for absolute operands
    pub annotation: Option<&'static str>,
}

/// Renders operands against a label table.
#[derive(Debug, Clone, Copy)]
pub struct OperandFormatter<'a> {
    labels: &'a LabelMap,
}

impl<'a> OperandFormatter<'a> {
    /// Formatter substituting names from `labels`.
    pub fn new(labels: &'a LabelMap) -> Self {
        Self { labels }
    }

    /// Render the operand of `insn`.
    pub fn format(&self, insn: &Instruction) -> FormattedOperand {
        let value = match insn.operand {
            Operand::None => {
                let text = match insn.mode {
                    AddressingMode::Accumulator => "A".to_string(),
                    _ => String::new(),
                };
                return FormattedOperand { text, annotation: None };
            }
            Operand::Truncated => {
                let text = if insn.size == 3 { "$????" } else { "$??" };
                return FormattedOperand {
                    text: text.to_string(),
                    annotation: None,
                };
            }
            Operand::Byte(b) => u16::from(b),
            Operand::Word(w) => w,
        };

        let text = match insn.mode {
            AddressingMode::Immediate => format!("#${value:02X}"),
            AddressingMode::ZeroPage => self.zero_page(value),
            AddressingMode::ZeroPageX => format!("{},X", self.zero_page(value)),
            AddressingMode::ZeroPageY => format!("{},Y", self.zero_page(value)),
            AddressingMode::Absolute => self.absolute(value),
            AddressingMode::AbsoluteX => format!("{},X", self.absolute(value)),
            AddressingMode::AbsoluteY => format!("{},Y", self.absolute(value)),
            AddressingMode::Indirect => format!("({})", self.absolute(value)),
            AddressingMode::IndexedIndirect => format!("({},X)", self.zero_page(value)),
            AddressingMode::IndirectIndexed => format!("({}),Y", self.zero_page(value)),
            AddressingMode::Relative => match insn.branch_target() {
                Some(target) => self.absolute(target),
                None => format!("${value:02X}"),
            },
            AddressingMode::Implied | AddressingMode::Accumulator => String::new(),
        };

        let annotation = if insn.mode.is_absolute() {
            apple2::hardware_name(value)
        } else {
            None
        };

        FormattedOperand { text, annotation }
    }

    fn absolute(&self, addr: Address) -> String {
        match self.labels.name(addr) {
            Some(name) => name.to_string(),
            None => format!("${addr:04X}"),
        }
    }

    fn zero_page(&self, addr: Address) -> String {
        match self.labels.name(addr) {
            Some(name) => name.to_string(),
            None => format!("${addr:02X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::types::TargetSets;
    use pretty_assertions::assert_eq;

    fn render(bytes: &[u8], address: Address, labels: &LabelMap) -> FormattedOperand {
        OperandFormatter::new(labels).format(&decode(bytes, address).unwrap())
    }

    #[test]
    fn test_modes_without_labels() {
        let labels = LabelMap::default();
        let cases: &[(&[u8], &str)] = &[
            (&[0xEA], ""),
            (&[0x0A], "A"),
            (&[0xA9, 0x05], "#$05"),
            (&[0xA5, 0x24], "$24"),
            (&[0xB5, 0x24], "$24,X"),
            (&[0xB6, 0x24], "$24,Y"),
            (&[0xAD, 0x34, 0x12], "$1234"),
            (&[0xBD, 0x34, 0x12], "$1234,X"),
            (&[0xB9, 0x34, 0x12], "$1234,Y"),
            (&[0x6C, 0x00, 0x03], "($0300)"),
            (&[0xA1, 0x06], "($06,X)"),
            (&[0xB1, 0x06], "($06),Y"),
            (&[0xD0, 0xFE], "$0800"),
        ];
        for (bytes, expected) in cases {
            assert_eq!(render(bytes, 0x0800, &labels).text, *expected, "{bytes:02X?}");
        }
    }

    #[test]
    fn test_label_substitution() {
        let mut targets = TargetSets::new();
        targets.subroutine_targets.insert(0xFDED);
        targets.branch_targets.insert(0x0800);
        let labels = LabelMap::allocate(&targets);

        assert_eq!(render(&[0x20, 0xED, 0xFD], 0x0900, &labels).text, "sub_FDED");
        assert_eq!(render(&[0xD0, 0xFE], 0x0800, &labels).text, "loc_0800");
        assert_eq!(render(&[0xBD, 0x00, 0x08], 0x0900, &labels).text, "loc_0800,X");
    }

    #[test]
    fn test_hardware_annotation() {
        let labels = LabelMap::default();
        let sta = render(&[0x8D, 0x00, 0xC0], 0x0802, &labels);
        assert_eq!(sta.text, "$C000");
        assert_eq!(sta.annotation, Some("KEYBOARD"));

        let indexed = render(&[0xBD, 0x80, 0xC0], 0x0802, &labels);
        assert_eq!(indexed.text, "$C080,X");
        assert_eq!(indexed.annotation, Some("LCBANK2_RE"));

        let unnamed = render(&[0xAD, 0x8C, 0xC0], 0x0802, &labels);
        assert_eq!(unnamed.annotation, None);

        let spkr = render(&[0x2C, 0x30, 0xC0], 0x0802, &labels);
        assert_eq!(spkr.annotation, Some("SPKR"));

        // Zero-page operands are never hardware
        assert_eq!(render(&[0xA5, 0x00], 0x0802, &labels).annotation, None);
    }

    #[test]
    fn test_truncated_operand() {
        let labels = LabelMap::default();
        assert_eq!(render(&[0x4C, 0x00], 0x0800, &labels).text, "$????");
        assert_eq!(render(&[0xA9], 0x0800, &labels).text, "$??");
    }
}
