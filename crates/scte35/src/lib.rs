//! SCTE-35 splice information section decoder
//!
//! This crate decodes SCTE-35 `splice_info_section` payloads carried as
//! private data in MPEG-TS streams into typed splice messages
//! (cue-out, cue-in, time signal, splice cancel). Fields are bit-packed,
//! not byte-aligned, so all parsing goes through a MSB-first [`BitReader`].
//!
//! Encoding new SCTE-35 sections and segmentation descriptors are out of
//! scope; encrypted sections are rejected rather than decrypted.

pub mod bits;
pub mod decoder;
pub mod error;

pub use bits::BitReader;
pub use decoder::{
    SCTE35_TABLE_ID, SpliceMessage, TICKS_PER_SECOND, WILDCARD_EVENT_ID, decode, decode_owned,
};
pub use error::Scte35Error;

/// Result type for SCTE-35 parsing operations
pub type Result<T> = std::result::Result<T, Scte35Error>;
