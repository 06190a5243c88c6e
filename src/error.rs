//! Error types for the disassembler.
//!
//! Analysis itself never fails: unknown opcodes, truncated instructions and
//! unresolvable transfers all degrade to DATA. The errors defined here only
//! arise at the boundaries, when a binary is constructed, an address is
//! parsed, options are validated or output is written. Entry points
//! outside the binary are dropped, not reported.

use thiserror::Error;

/// Primary error type for the disassembler.
#[derive(Debug, Error)]
pub enum DisasmError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The binary contains no bytes.
    #[error("Empty binary: nothing to analyze")]
    EmptyBinary,

    /// The binary does not fit in the 64 KiB address space.
    #[error("Binary of {length} bytes loaded at ${load_address:04X} runs past $FFFF")]
    AddressSpaceOverflow { load_address: u16, length: usize },

    /// An address string could not be parsed.
    #[error("Invalid address: {input:?}")]
    InvalidAddress { input: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// JSON serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for disassembler operations.
pub type Result<T> = std::result::Result<T, DisasmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DisasmError::AddressSpaceOverflow {
            load_address: 0xFF00,
            length: 0x200,
        };
        let msg = err.to_string();
        assert!(msg.contains("$FF00"));
        assert!(msg.contains("512"));
    }

    #[test]
    fn test_invalid_address() {
        let err = DisasmError::InvalidAddress {
            input: "zz".to_string(),
        };
        assert!(err.to_string().contains("\"zz\""));
    }
}
