//! Splice info section decoding.
//!
//! Implements the subset of the `splice_info_section` grammar this pipeline
//! acts on: `splice_insert` (0x05) and `time_signal` (0x06). Every other
//! command type is skipped silently. Malformed input never propagates past
//! [`decode`]; the packet path must not crash on garbage payloads.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{Result, bits::BitReader, error::Scte35Error};

/// SCTE-35 table id.
pub const SCTE35_TABLE_ID: u8 = 0xFC;

/// 90 kHz clock rate used by all SCTE-35 time fields.
pub const TICKS_PER_SECOND: u64 = 90_000;

/// Reserved event id meaning "whichever cue is currently active".
///
/// Used by cue-in correlation when the closing signal carries no usable id.
/// Event ids are widened to `i64` so the full unsigned 32-bit range of
/// `splice_event_id` never aliases with this sentinel.
pub const WILDCARD_EVENT_ID: i64 = -1;

const SPLICE_INSERT: u8 = 0x05;
const TIME_SIGNAL: u8 = 0x06;

/// A decoded splice command, classified by its effect on the ad-break
/// lifecycle.
///
/// All time values are 90 kHz ticks with the section's `pts_adjustment`
/// already added. Wraparound at 2^33 is deliberately not handled; a stream
/// whose adjusted times cross the wrap point will mis-sort, matching the
/// behavior this decoder was ported from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceMessage {
    /// Ad break start (`splice_insert` with `out_of_network_indicator` set).
    CueOut {
        event_id: i64,
        splice_time: Option<u64>,
        break_duration: Option<u64>,
        immediate: bool,
    },
    /// Ad break end (`splice_insert` back into the network).
    CueIn {
        event_id: i64,
        splice_time: Option<u64>,
        immediate: bool,
    },
    /// `time_signal` command. Carries timing only; no lifecycle effect.
    TimeSignal { splice_time: Option<u64> },
    /// `splice_insert` with the cancel indicator set.
    SpliceInsertCancel { event_id: i64 },
}

impl SpliceMessage {
    /// The splice event id, where the variant carries one.
    pub fn event_id(&self) -> Option<i64> {
        match self {
            SpliceMessage::CueOut { event_id, .. }
            | SpliceMessage::CueIn { event_id, .. }
            | SpliceMessage::SpliceInsertCancel { event_id } => Some(*event_id),
            SpliceMessage::TimeSignal { .. } => None,
        }
    }
}

/// Decode a raw splice info section payload.
///
/// This is the soft boundary of the decoder: wrong table ids, unsupported
/// versions, encrypted sections, and truncated payloads are all logged and
/// collapsed into `None`. Unknown command types are `None` as well, by
/// design rather than by failure.
pub fn decode(payload: &[u8]) -> Option<SpliceMessage> {
    match parse(payload) {
        Ok(message) => message,
        Err(Scte35Error::NotScte35(table_id)) => {
            debug!(table_id, "not an SCTE-35 section");
            None
        }
        Err(err) => {
            warn!(error = %err, payload_len = payload.len(), "dropping undecodable SCTE-35 section");
            None
        }
    }
}

/// [`decode`] for an owned buffer handed off the demuxer.
pub fn decode_owned(payload: Bytes) -> Option<SpliceMessage> {
    decode(&payload)
}

fn parse(payload: &[u8]) -> Result<Option<SpliceMessage>> {
    let mut reader = BitReader::new(payload);

    let table_id = reader.read_bits(8)? as u8;
    if table_id != SCTE35_TABLE_ID {
        return Err(Scte35Error::NotScte35(table_id));
    }

    // section_syntax_indicator + private_indicator + reserved
    reader.skip_bits(4)?;
    // section_length is not used for bounds-checking; truncation surfaces as
    // OutOfData from the cursor instead.
    let _section_length = reader.read_bits(12)?;

    let protocol_version = reader.read_bits(8)? as u8;
    if protocol_version != 0 {
        return Err(Scte35Error::UnsupportedVersion(protocol_version));
    }

    let encrypted_packet = reader.read_bit()?;
    let _encryption_algorithm = reader.read_bits(6)?;
    if encrypted_packet {
        return Err(Scte35Error::EncryptedPayload);
    }

    let pts_adjustment = reader.read_bits_long(33)?;
    let _cw_index = reader.read_bits(8)?;
    let _tier = reader.read_bits(12)?;
    let splice_command_length = reader.read_bits(12)?;
    let splice_command_type = reader.read_bits(8)? as u8;

    match splice_command_type {
        SPLICE_INSERT => parse_splice_insert(&mut reader, pts_adjustment).map(Some),
        TIME_SIGNAL => parse_time_signal(&mut reader, pts_adjustment).map(Some),
        other => {
            debug!(command_type = other, "skipping unsupported splice command");
            reader.skip_bits(splice_command_length * 8)?;
            Ok(None)
        }
    }
}

fn parse_splice_insert(reader: &mut BitReader, pts_adjustment: u64) -> Result<SpliceMessage> {
    let event_id = i64::from(reader.read_bits(32)?);
    let cancel = reader.read_bit()?;
    reader.skip_bits(7)?;
    if cancel {
        return Ok(SpliceMessage::SpliceInsertCancel { event_id });
    }

    let out_of_network = reader.read_bit()?;
    let program_splice = reader.read_bit()?;
    let duration_flag = reader.read_bit()?;
    let immediate = reader.read_bit()?;
    reader.skip_bits(4)?;

    let mut splice_time = None;
    if program_splice && !immediate {
        splice_time = parse_splice_time(reader, pts_adjustment)?;
    }
    if !program_splice {
        // Component mode. Component-level splice times are only walked to
        // keep the cursor aligned; program-level signaling is all this
        // pipeline acts on.
        let component_count = reader.read_bits(8)?;
        for _ in 0..component_count {
            let _component_tag = reader.read_bits(8)?;
            if !immediate {
                parse_splice_time(reader, pts_adjustment)?;
            }
        }
    }

    let mut break_duration = None;
    if duration_flag {
        let _auto_return = reader.read_bit()?;
        reader.skip_bits(6)?;
        break_duration = Some(reader.read_bits_long(33)? + pts_adjustment);
    }

    // unique_program_id + avail_num + avails_expected
    reader.skip_bits(32)?;

    Ok(if out_of_network {
        SpliceMessage::CueOut {
            event_id,
            splice_time,
            break_duration,
            immediate,
        }
    } else {
        SpliceMessage::CueIn {
            event_id,
            splice_time,
            immediate,
        }
    })
}

fn parse_time_signal(reader: &mut BitReader, pts_adjustment: u64) -> Result<SpliceMessage> {
    let splice_time = parse_splice_time(reader, pts_adjustment)?;
    Ok(SpliceMessage::TimeSignal { splice_time })
}

/// Walk a `splice_time()` structure, returning the adjusted 90 kHz value
/// when `time_specified_flag` is set.
fn parse_splice_time(reader: &mut BitReader, pts_adjustment: u64) -> Result<Option<u64>> {
    if reader.read_bit()? {
        reader.skip_bits(6)?;
        Ok(Some(reader.read_bits_long(33)? + pts_adjustment))
    } else {
        reader.skip_bits(7)?;
        Ok(None)
    }
}
