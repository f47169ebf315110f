//! Cue lifecycle state machine.

use scte35::{SpliceMessage, WILDCARD_EVENT_ID};
use tracing::{debug, info, warn};

use crate::{
    bridge::CueRecord,
    state::{CueState, DURATION_UNKNOWN},
    table::CueTable,
};

/// Snapshot of the playlist fields the lifecycle needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaylistMeta {
    /// `#EXT-X-MEDIA-SEQUENCE` of the first listed segment.
    pub media_sequence: i64,
    /// Number of segments currently in the window.
    pub segment_count: i64,
    /// `#EXT-X-TARGETDURATION` in seconds.
    pub target_duration: f64,
}

impl PlaylistMeta {
    /// Absolute index of the next segment the segmenter will produce.
    pub fn next_segment_index(&self) -> i64 {
        self.media_sequence + self.segment_count
    }
}

/// Source of the current playlist snapshot. Implemented by the segmenter
/// integration; the tracker never parses playlist text itself.
pub trait PlaylistSource {
    fn playlist_meta(&self) -> PlaylistMeta;
}

/// Tracker behavior knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CueTrackerConfig {
    /// Auto-close breaks whose CUE-IN never arrived after this many target
    /// durations. `None` keeps the upstream behavior: a cue with a lost
    /// CUE-IN stays active indefinitely, which leaks an entry per lost
    /// signal over the lifetime of the stream.
    pub expiry_target_durations: Option<u32>,
}

/// Consumes decoded splice messages and maintains the active-cue table.
///
/// One instance per stream, driven from the packet-processing path. Emits a
/// [`CueRecord`] for every observable transition so the muxer path can react
/// without sharing the decoder.
pub struct CueTracker<P> {
    table: CueTable,
    playlist: P,
    config: CueTrackerConfig,
}

impl<P: PlaylistSource> CueTracker<P> {
    pub fn new(table: CueTable, playlist: P) -> Self {
        Self::with_config(table, playlist, CueTrackerConfig::default())
    }

    pub fn with_config(table: CueTable, playlist: P, config: CueTrackerConfig) -> Self {
        CueTracker {
            table,
            playlist,
            config,
        }
    }

    pub fn table(&self) -> &CueTable {
        &self.table
    }

    /// Process one decoded message from the packet path.
    ///
    /// `packet_pts` is the PTS of the carrying packet, `raw_payload` the
    /// splice section bytes (re-embedded base64 in some tag styles).
    pub fn handle_message(
        &self,
        message: &SpliceMessage,
        packet_pts: i64,
        raw_payload: &[u8],
    ) -> Option<CueRecord> {
        match message {
            SpliceMessage::CueOut {
                event_id,
                break_duration,
                ..
            } => self.on_cue_out(*event_id, packet_pts, *break_duration, raw_payload),
            SpliceMessage::CueIn { event_id, .. } => self.on_cue_in(*event_id, packet_pts),
            SpliceMessage::TimeSignal { splice_time } => {
                debug!(splice_time = ?splice_time, "time_signal has no lifecycle effect");
                None
            }
            SpliceMessage::SpliceInsertCancel { event_id } => {
                debug!(event_id, "splice_insert cancel has no lifecycle effect");
                None
            }
        }
    }

    /// Apply a bridge record on the muxer side. Same idempotence rules as
    /// the packet path; the raw payload is not available over the bridge.
    pub fn apply_record(&self, record: &CueRecord) {
        if record.is_cue_out {
            self.on_cue_out(
                record.event_id,
                record.pts,
                record.duration.map(|d| d as u64),
                &[],
            );
        } else {
            self.on_cue_in(record.event_id, record.pts);
        }
    }

    /// Auto-close breaks whose CUE-IN is overdue per the configured expiry.
    /// Returns the number of cues closed. No-op unless enabled.
    pub fn expire_stale(&self, now_ms: i64) -> usize {
        let Some(factor) = self.config.expiry_target_durations else {
            return 0;
        };
        let target_duration = self.playlist.playlist_meta().target_duration;
        let max_age_ms = (f64::from(factor) * target_duration * 1000.0) as i64;
        let removed = self.table.remove_where(|cue| {
            !cue.cue_in_received && now_ms - cue.wall_clock_start_ms > max_age_ms
        });
        for cue in &removed {
            warn!(
                event_id = cue.event_id,
                age_ms = now_ms - cue.wall_clock_start_ms,
                "expiring cue without CUE-IN"
            );
        }
        removed.len()
    }

    fn on_cue_out(
        &self,
        event_id: i64,
        packet_pts: i64,
        break_duration: Option<u64>,
        raw_payload: &[u8],
    ) -> Option<CueRecord> {
        let meta = self.playlist.playlist_meta();
        let duration_ticks = break_duration
            .map(|d| d as i64)
            .unwrap_or(DURATION_UNKNOWN);
        let cue = CueState::open(
            event_id,
            packet_pts,
            duration_ticks,
            raw_payload,
            now_ms(),
            meta.next_segment_index(),
        );
        if !self.table.open(cue) {
            debug!(event_id, "duplicate CUE-OUT ignored");
            return None;
        }
        info!(
            event_id,
            packet_pts,
            duration_ticks,
            cue_out_segment_index = meta.next_segment_index(),
            "CUE-OUT: ad break opened"
        );
        Some(CueRecord::cue_out(
            event_id,
            packet_pts,
            (duration_ticks > 0).then_some(duration_ticks),
        ))
    }

    fn on_cue_in(&self, event_id: i64, packet_pts: i64) -> Option<CueRecord> {
        let target = if event_id == WILDCARD_EVENT_ID {
            let open = self.table.open_cues();
            match open.as_slice() {
                [sole] => sole.event_id,
                [] => {
                    debug!("wildcard CUE-IN with no open cue ignored");
                    return None;
                }
                _ => {
                    warn!(
                        open_cues = open.len(),
                        "wildcard CUE-IN is ambiguous, ignoring"
                    );
                    return None;
                }
            }
        } else {
            event_id
        };

        match self.table.mark_cue_in(target) {
            Some(_) => {
                info!(event_id = target, packet_pts, "CUE-IN: ad break closing");
                Some(CueRecord::cue_in(target, packet_pts))
            }
            None => {
                debug!(event_id = target, "CUE-IN without matching open cue ignored");
                None
            }
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct StubPlaylist(Mutex<PlaylistMeta>);

    impl StubPlaylist {
        fn new(media_sequence: i64, segment_count: i64) -> Self {
            StubPlaylist(Mutex::new(PlaylistMeta {
                media_sequence,
                segment_count,
                target_duration: 2.0,
            }))
        }
    }

    impl PlaylistSource for &StubPlaylist {
        fn playlist_meta(&self) -> PlaylistMeta {
            *self.0.lock()
        }
    }

    fn cue_out(event_id: i64) -> SpliceMessage {
        SpliceMessage::CueOut {
            event_id,
            splice_time: None,
            break_duration: Some(2_700_000),
            immediate: false,
        }
    }

    fn cue_in(event_id: i64) -> SpliceMessage {
        SpliceMessage::CueIn {
            event_id,
            splice_time: None,
            immediate: false,
        }
    }

    #[test]
    fn cue_out_fixes_index_from_playlist_snapshot() {
        let playlist = StubPlaylist::new(10, 5);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        let record = tracker.handle_message(&cue_out(1), 900, &[0xFC]).unwrap();
        assert!(record.is_cue_out);
        assert_eq!(record.duration, Some(2_700_000));

        let cue = tracker.table().get(1).unwrap();
        assert_eq!(cue.cue_out_segment_index, 15);
        assert_eq!(cue.start_pts, 900);
        assert!(!cue.encoded_payload.is_empty());
    }

    #[test]
    fn duplicate_cue_out_produces_one_active_cue() {
        let playlist = StubPlaylist::new(10, 5);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        assert!(tracker.handle_message(&cue_out(1), 0, &[]).is_some());
        // Window has moved on; a retransmit must not reset the boundary.
        playlist.0.lock().segment_count = 7;
        assert!(tracker.handle_message(&cue_out(1), 500, &[]).is_none());
        assert_eq!(tracker.table().len(), 1);
        assert_eq!(tracker.table().get(1).unwrap().cue_out_segment_index, 15);
    }

    #[test]
    fn cue_in_correlates_by_event_id() {
        let playlist = StubPlaylist::new(0, 0);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        tracker.handle_message(&cue_out(1), 0, &[]);
        tracker.handle_message(&cue_out(2), 0, &[]);

        let record = tracker.handle_message(&cue_in(2), 1000, &[]).unwrap();
        assert!(!record.is_cue_out);
        assert_eq!(record.event_id, 2);
        assert!(tracker.table().get(2).unwrap().cue_in_received);
        assert!(!tracker.table().get(1).unwrap().cue_in_received);
    }

    #[test]
    fn wildcard_cue_in_closes_sole_open_cue() {
        let playlist = StubPlaylist::new(0, 0);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        tracker.handle_message(&cue_out(42), 0, &[]);
        let record = tracker
            .handle_message(&cue_in(WILDCARD_EVENT_ID), 0, &[])
            .unwrap();
        assert_eq!(record.event_id, 42);
    }

    #[test]
    fn wildcard_cue_in_is_ignored_when_ambiguous_or_empty() {
        let playlist = StubPlaylist::new(0, 0);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        // No open cue.
        assert!(tracker
            .handle_message(&cue_in(WILDCARD_EVENT_ID), 0, &[])
            .is_none());
        // Two open cues: no defined correlation target.
        tracker.handle_message(&cue_out(1), 0, &[]);
        tracker.handle_message(&cue_out(2), 0, &[]);
        assert!(tracker
            .handle_message(&cue_in(WILDCARD_EVENT_ID), 0, &[])
            .is_none());
        assert!(!tracker.table().get(1).unwrap().cue_in_received);
        assert!(!tracker.table().get(2).unwrap().cue_in_received);
    }

    #[test]
    fn unmatched_cue_in_is_ignored() {
        let playlist = StubPlaylist::new(0, 0);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        assert!(tracker.handle_message(&cue_in(9), 0, &[]).is_none());
    }

    #[test]
    fn same_break_can_reopen_after_closing() {
        let playlist = StubPlaylist::new(10, 5);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        tracker.handle_message(&cue_out(1), 0, &[]);
        tracker.handle_message(&cue_in(1), 0, &[]);
        playlist.0.lock().media_sequence = 20;
        assert!(tracker.handle_message(&cue_out(1), 0, &[]).is_some());
        assert_eq!(tracker.table().get(1).unwrap().cue_out_segment_index, 25);
    }

    #[test]
    fn time_signal_and_cancel_are_inert() {
        let playlist = StubPlaylist::new(0, 0);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        assert!(tracker
            .handle_message(
                &SpliceMessage::TimeSignal {
                    splice_time: Some(90_000)
                },
                0,
                &[]
            )
            .is_none());
        assert!(tracker
            .handle_message(&SpliceMessage::SpliceInsertCancel { event_id: 1 }, 0, &[])
            .is_none());
        assert!(tracker.table().is_empty());
    }

    #[test]
    fn bridge_records_replay_on_the_muxer_side() {
        let playlist = StubPlaylist::new(10, 5);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        let record = CueRecord::from_json(
            &CueRecord::cue_out(3, 777, Some(900_000)).to_json().unwrap(),
        )
        .unwrap();
        tracker.apply_record(&record);
        let cue = tracker.table().get(3).unwrap();
        assert_eq!(cue.duration_ticks, 900_000);
        assert_eq!(cue.cue_out_segment_index, 15);

        tracker.apply_record(&CueRecord::cue_in(3, 999));
        assert!(tracker.table().get(3).unwrap().cue_in_received);
    }

    #[test]
    fn expiry_closes_only_overdue_open_cues() {
        let playlist = StubPlaylist::new(0, 0);
        let config = CueTrackerConfig {
            expiry_target_durations: Some(5),
        };
        let tracker = CueTracker::with_config(CueTable::new(), &playlist, config);
        tracker.handle_message(&cue_out(1), 0, &[]);
        let opened_at = tracker.table().get(1).unwrap().wall_clock_start_ms;

        // 5 x 2.0s target duration = 10s budget.
        assert_eq!(tracker.expire_stale(opened_at + 9_000), 0);
        assert_eq!(tracker.expire_stale(opened_at + 11_000), 1);
        assert!(tracker.table().is_empty());
    }

    #[test]
    fn expiry_disabled_by_default() {
        let playlist = StubPlaylist::new(0, 0);
        let tracker = CueTracker::new(CueTable::new(), &playlist);
        tracker.handle_message(&cue_out(1), 0, &[]);
        assert_eq!(tracker.expire_stale(i64::MAX), 0);
        assert_eq!(tracker.table().len(), 1);
    }
}
