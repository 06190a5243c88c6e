//! Target-machine descriptions.
//!
//! [`mos6502`] holds the instruction set; [`apple2`] names the memory map
//! the binaries run against.

pub mod apple2;
pub mod mos6502;
