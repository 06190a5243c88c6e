//! Apple II memory map.
//!
//! The Apple II maps its I/O soft switches into page `$C0`: reading or
//! writing one of these addresses flips video modes, toggles the speaker,
//! polls the keyboard or drives the Disk II controller. Zero page holds
//! the monitor's and Applesoft's well-known pointers and scratch cells.
//!
//! These names are used for annotation only; they never influence
//! classification.

use crate::types::Address;

/// Start of the soft-switch page.
pub const IO_PAGE_START: Address = 0xC000;

/// End (inclusive) of the soft-switch page.
pub const IO_PAGE_END: Address = 0xC0FF;

/// Memory-mapped I/O addresses, sorted by address.
pub const HARDWARE_REGISTERS: &[(Address, &str)] = &[
    // Keyboard and IIe memory switches
    (0xC000, "KEYBOARD"),
    (0xC001, "80STOREON"),
    (0xC002, "RDMAINRAM"),
    (0xC003, "RDCARDRAM"),
    (0xC004, "WRMAINRAM"),
    (0xC005, "WRCARDRAM"),
    (0xC00C, "80COLOFF"),
    (0xC00D, "80COLON"),
    (0xC00E, "ALTCHAROFF"),
    (0xC00F, "ALTCHARON"),
    (0xC010, "KBDSTRB"),
    // Cassette and speaker
    (0xC020, "TAPEOUT"),
    (0xC030, "SPKR"),
    // Video soft switches
    (0xC050, "TXTCLR"),
    (0xC051, "TXTSET"),
    (0xC052, "MIXCLR"),
    (0xC053, "MIXSET"),
    (0xC054, "LOWSCR"),
    (0xC055, "HISCR"),
    (0xC056, "LORES"),
    (0xC057, "HIRES"),
    // Annunciators
    (0xC058, "AN0OFF"),
    (0xC059, "AN0ON"),
    (0xC05A, "AN1OFF"),
    (0xC05B, "AN1ON"),
    (0xC05C, "AN2OFF"),
    (0xC05D, "AN2ON"),
    (0xC05E, "AN3OFF"),
    (0xC05F, "AN3ON"),
    // Game I/O
    (0xC060, "TAPEIN"),
    (0xC061, "PB0"),
    (0xC062, "PB1"),
    (0xC063, "PB2"),
    (0xC064, "PADDL0"),
    (0xC065, "PADDL1"),
    (0xC066, "PADDL2"),
    (0xC067, "PADDL3"),
    (0xC070, "PTRIG"),
    // Language card
    (0xC080, "LCBANK2_RE"),
    (0xC081, "LCBANK2_RW"),
    (0xC082, "LCROM_ONLY"),
    (0xC083, "LCBANK2_RW2"),
    (0xC088, "LCBANK1_RE"),
    (0xC089, "LCBANK1_RW"),
    (0xC08A, "LCROM_ONLY1"),
    (0xC08B, "LCBANK1_RW2"),
    // Disk II controller in slot 6
    (0xC0E0, "DISK_PHASE0_OFF"),
    (0xC0E1, "DISK_PHASE0_ON"),
    (0xC0E2, "DISK_PHASE1_OFF"),
    (0xC0E3, "DISK_PHASE1_ON"),
    (0xC0E4, "DISK_PHASE2_OFF"),
    (0xC0E5, "DISK_PHASE2_ON"),
    (0xC0E6, "DISK_PHASE3_OFF"),
    (0xC0E7, "DISK_PHASE3_ON"),
    (0xC0E8, "DISK_MOTOR_OFF"),
    (0xC0E9, "DISK_MOTOR_ON"),
    (0xC0EA, "DISK_SEL_DRV1"),
    (0xC0EB, "DISK_SEL_DRV2"),
    (0xC0EC, "DISK_READ"),
    (0xC0ED, "DISK_WRITE"),
    (0xC0EE, "DISK_RDMODE"),
    (0xC0EF, "DISK_WRMODE"),
];

/// Well-known zero-page cells, sorted by address.
pub const ZERO_PAGE_NAMES: &[(u8, &str)] = &[
    (0x00, "LOMEM (BASIC)"),
    (0x01, "LOMEM+1"),
    (0x03, "HIMEM (BASIC)"),
    (0x04, "HIMEM+1"),
    (0x06, "LINNUM"),
    (0x07, "LINNUM+1"),
    (0x09, "TXTTAB"),
    (0x0A, "TXTTAB+1"),
    (0x20, "WNDLFT"),
    (0x21, "WNDWDTH"),
    (0x22, "WNDTOP"),
    (0x23, "WNDBTM"),
    (0x24, "CH (cursor H)"),
    (0x25, "CV (cursor V)"),
    (0x26, "BASL"),
    (0x27, "BASH"),
    (0x28, "BAS2L"),
    (0x29, "BAS2H"),
    (0x2B, "BOOTSLOT"),
    (0x30, "COLOR (lo-res)"),
    (0x33, "PROMPT"),
    (0x36, "CSWL"),
    (0x37, "CSWH"),
    (0x38, "KSWL"),
    (0x39, "KSWH"),
    (0x3C, "A1L"),
    (0x3D, "A1H"),
    (0x3E, "A2L"),
    (0x3F, "A2H"),
    (0x42, "A4L"),
    (0x43, "A4H"),
    (0x45, "ACC (monitor)"),
    (0x46, "XREG (monitor)"),
    (0x47, "YREG (monitor)"),
    (0x48, "STATUS (monitor)"),
    (0x4E, "RNDL"),
    (0x4F, "RNDH"),
];

/// Name of the soft switch at `addr`.
pub fn hardware_name(addr: Address) -> Option<&'static str> {
    HARDWARE_REGISTERS
        .binary_search_by_key(&addr, |(a, _)| *a)
        .ok()
        .map(|i| HARDWARE_REGISTERS[i].1)
}

/// Name of the zero-page cell at `addr`.
pub fn zero_page_name(addr: Address) -> Option<&'static str> {
    let zp = u8::try_from(addr).ok()?;
    ZERO_PAGE_NAMES
        .binary_search_by_key(&zp, |(a, _)| *a)
        .ok()
        .map(|i| ZERO_PAGE_NAMES[i].1)
}

/// Whether `addr` lies in the soft-switch page.
pub fn is_io(addr: Address) -> bool {
    (IO_PAGE_START..=IO_PAGE_END).contains(&addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sorted() {
        assert!(HARDWARE_REGISTERS.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(ZERO_PAGE_NAMES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_hardware_lookup() {
        assert_eq!(hardware_name(0xC000), Some("KEYBOARD"));
        assert_eq!(hardware_name(0xC030), Some("SPKR"));
        assert_eq!(hardware_name(0xC0EC), Some("DISK_READ"));
        assert_eq!(hardware_name(0xC0FF), None);
        assert_eq!(hardware_name(0x0800), None);
    }

    #[test]
    fn test_zero_page_lookup() {
        assert_eq!(zero_page_name(0x24), Some("CH (cursor H)"));
        assert_eq!(zero_page_name(0x02), None);
        assert_eq!(zero_page_name(0x0124), None);
    }

    #[test]
    fn test_io_page() {
        assert!(is_io(0xC000));
        assert!(is_io(0xC0FF));
        assert!(!is_io(0xC100));
    }
}
