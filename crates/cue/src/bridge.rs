//! Metadata bridge between the packet path and the muxer/serving path.
//!
//! Cue transitions cross the boundary as self-describing line-delimited
//! JSON records. The format is intentionally small; anything that fails to
//! parse, or parses but is not an SCTE-35 record, is dropped rather than
//! surfaced as an error.

use serde::{Deserialize, Serialize};

/// Discriminator value in the `type` field.
pub const RECORD_KIND: &str = "scte35";

/// One cue transition record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "eventId")]
    pub event_id: i64,
    /// PTS of the packet carrying the transition, 90 kHz ticks.
    pub pts: i64,
    #[serde(rename = "isCueOut")]
    pub is_cue_out: bool,
    /// Break duration in 90 kHz ticks, only present on cue-out with a
    /// signaled duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl CueRecord {
    pub fn cue_out(event_id: i64, pts: i64, duration: Option<i64>) -> Self {
        CueRecord {
            kind: RECORD_KIND.to_string(),
            event_id,
            pts,
            is_cue_out: true,
            duration: duration.filter(|d| *d > 0),
        }
    }

    pub fn cue_in(event_id: i64, pts: i64) -> Self {
        CueRecord {
            kind: RECORD_KIND.to_string(),
            event_id,
            pts,
            is_cue_out: false,
            duration: None,
        }
    }

    /// Serialize to one line of JSON.
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Parse a record, dropping malformed input and non-SCTE-35 metadata
    /// (ID3 and friends share the same channel).
    pub fn from_json(line: &str) -> Option<CueRecord> {
        let record: CueRecord = serde_json::from_str(line).ok()?;
        (record.kind == RECORD_KIND).then_some(record)
    }
}
