//! Error types for SCTE-35 section parsing.

use thiserror::Error;

/// Errors that can occur while parsing a splice info section.
///
/// None of these ever reach the packet path: the public decode entry point
/// converts every error into "no message" after logging it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Scte35Error {
    /// The bit cursor ran past the end of the payload.
    #[error("out of data: cursor at bit {bit}, buffer holds {total} bits")]
    OutOfData {
        /// Absolute bit position the read started at.
        bit: usize,
        /// Total number of bits in the buffer.
        total: usize,
    },

    /// A multi-bit read was requested with a width the result type cannot hold.
    #[error("bit width {0} exceeds read limit")]
    BitWidth(u32),

    /// The payload does not start with the SCTE-35 table id (0xFC).
    #[error("not an SCTE-35 section: table_id {0:#04x}")]
    NotScte35(u8),

    /// Only protocol version 0 is defined by the standard.
    #[error("unsupported SCTE-35 protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Encrypted sections are not decrypted.
    #[error("encrypted SCTE-35 section is not supported")]
    EncryptedPayload,
}
