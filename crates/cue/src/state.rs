//! Per-break cue state.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use scte35::TICKS_PER_SECOND;

/// Sentinel for a segment index that has not been assigned yet.
pub const INDEX_UNASSIGNED: i64 = -1;

/// Sentinel for an unknown/indefinite break duration.
pub const DURATION_UNKNOWN: i64 = -1;

/// State of one ad break, from CUE-OUT until its CUE-IN boundary leaves the
/// playlist window.
///
/// Treated as an immutable snapshot: mutation replaces the whole entry in
/// the [`CueTable`](crate::CueTable) under its lock, never individual fields
/// in place. `cue_out_segment_index` is fixed exactly once, at creation;
/// `cue_in_segment_index` is fixed exactly once, by the injector, after the
/// CUE-IN was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CueState {
    /// Splice event id (full unsigned 32-bit range, widened).
    pub event_id: i64,
    /// PTS of the packet that carried the CUE-OUT.
    pub start_pts: i64,
    /// Break duration in 90 kHz ticks, [`DURATION_UNKNOWN`] if unsignaled.
    pub duration_ticks: i64,
    /// A cue state only exists while its break is signaled out-of-network.
    pub is_cue_out: bool,
    /// Base64 of the raw splice section, for tag styles that re-embed it.
    pub encoded_payload: String,
    /// Wall-clock creation time in Unix milliseconds.
    pub wall_clock_start_ms: i64,
    /// Absolute playlist index of the first ad segment.
    pub cue_out_segment_index: i64,
    /// Absolute playlist index of the first segment after the break.
    pub cue_in_segment_index: i64,
    /// The closing CUE-IN has been observed on the packet path.
    pub cue_in_received: bool,
    /// The injector has fixed `cue_in_segment_index`.
    pub cue_in_index_assigned: bool,
}

impl CueState {
    /// Open a new break. `cue_out_segment_index` must be the next segment
    /// the segmenter will produce (`media_sequence + segment_count` at the
    /// moment the CUE-OUT arrived).
    pub fn open(
        event_id: i64,
        start_pts: i64,
        duration_ticks: i64,
        raw_payload: &[u8],
        wall_clock_start_ms: i64,
        cue_out_segment_index: i64,
    ) -> Self {
        CueState {
            event_id,
            start_pts,
            duration_ticks,
            is_cue_out: true,
            encoded_payload: STANDARD.encode(raw_payload),
            wall_clock_start_ms,
            cue_out_segment_index,
            cue_in_segment_index: INDEX_UNASSIGNED,
            cue_in_received: false,
            cue_in_index_assigned: false,
        }
    }

    /// Break duration in seconds, when signaled.
    pub fn duration_secs(&self) -> Option<f64> {
        (self.duration_ticks > 0).then(|| self.duration_ticks as f64 / TICKS_PER_SECOND as f64)
    }

    /// Snapshot with the CUE-IN observation recorded. Index assignment stays
    /// deferred to the next playlist rewrite.
    pub fn with_cue_in_received(&self) -> Self {
        CueState {
            cue_in_received: true,
            ..self.clone()
        }
    }

    /// Snapshot with the cue-in boundary fixed.
    pub fn with_cue_in_index(&self, index: i64) -> Self {
        CueState {
            cue_in_segment_index: index,
            cue_in_index_assigned: true,
            ..self.clone()
        }
    }
}
