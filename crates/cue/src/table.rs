//! Shared table of in-flight ad breaks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::state::CueState;

/// Concurrent map `event_id -> CueState`, shared between the packet path
/// (tracker, writer) and the serving path (injector, reader and finalizer of
/// cue-in indices).
///
/// Entries are replaced wholesale under the write lock; there are no
/// in-place field writes, so every check-then-act sequence on a cue is
/// atomic per entry.
#[derive(Debug, Clone, Default)]
pub struct CueTable {
    inner: Arc<RwLock<HashMap<i64, CueState>>>,
}

impl CueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly opened cue.
    ///
    /// Returns `false` without touching the table when a still-open cue with
    /// the same event id exists (retransmitted CUE-OUT). A lingering closed
    /// cue with the same id is superseded: the new break wins over a
    /// boundary tag that was still aging out of the window.
    pub fn open(&self, cue: CueState) -> bool {
        let mut map = self.inner.write();
        match map.get(&cue.event_id) {
            Some(existing) if !existing.cue_in_received => false,
            _ => {
                map.insert(cue.event_id, cue);
                true
            }
        }
    }

    /// Record the CUE-IN observation for `event_id`.
    ///
    /// Returns the updated snapshot, or `None` when there is no open cue
    /// with that id (unknown id, or CUE-IN retransmission).
    pub fn mark_cue_in(&self, event_id: i64) -> Option<CueState> {
        let mut map = self.inner.write();
        match map.get(&event_id) {
            Some(cue) if !cue.cue_in_received => {
                let updated = cue.with_cue_in_received();
                map.insert(event_id, updated.clone());
                Some(updated)
            }
            _ => None,
        }
    }

    /// Fix `cue_in_segment_index = next_index` for every cue whose CUE-IN
    /// was observed but not yet placed. Called by the injector with the
    /// current playlist's `media_sequence + segment_count`, so the boundary
    /// always lands on the next segment to be produced.
    pub fn assign_cue_in_indices(&self, next_index: i64) -> usize {
        let mut assigned = 0;
        let mut map = self.inner.write();
        for cue in map.values_mut() {
            if cue.cue_in_received && !cue.cue_in_index_assigned {
                *cue = cue.with_cue_in_index(next_index);
                info!(
                    event_id = cue.event_id,
                    cue_in_segment_index = next_index,
                    "assigned cue-in segment index"
                );
                assigned += 1;
            }
        }
        assigned
    }

    /// Drop closed cues whose cue-in boundary slid out of the playlist
    /// window (`window_start` = current media sequence). Their tags can no
    /// longer appear in any rewrite.
    pub fn prune_closed(&self, window_start: i64) -> usize {
        let mut map = self.inner.write();
        let before = map.len();
        map.retain(|_, cue| {
            let expired = cue.cue_in_index_assigned && cue.cue_in_segment_index < window_start;
            if expired {
                debug!(
                    event_id = cue.event_id,
                    cue_in_segment_index = cue.cue_in_segment_index,
                    window_start,
                    "pruning cue outside playlist window"
                );
            }
            !expired
        });
        before - map.len()
    }

    /// Remove cues matching a predicate, returning the removed snapshots.
    pub fn remove_where<F>(&self, mut predicate: F) -> Vec<CueState>
    where
        F: FnMut(&CueState) -> bool,
    {
        let mut map = self.inner.write();
        let ids: Vec<i64> = map
            .values()
            .filter(|cue| predicate(cue))
            .map(|cue| cue.event_id)
            .collect();
        ids.into_iter().filter_map(|id| map.remove(&id)).collect()
    }

    pub fn get(&self, event_id: i64) -> Option<CueState> {
        self.inner.read().get(&event_id).cloned()
    }

    pub fn remove(&self, event_id: i64) -> Option<CueState> {
        self.inner.write().remove(&event_id)
    }

    /// Point-in-time copy of all cues, ordered by cue-out index (ties by
    /// event id) so injection output is deterministic.
    pub fn snapshot(&self) -> Vec<CueState> {
        let mut cues: Vec<CueState> = self.inner.read().values().cloned().collect();
        cues.sort_by_key(|cue| (cue.cue_out_segment_index, cue.event_id));
        cues
    }

    /// Cues whose break is still open (no CUE-IN observed yet).
    pub fn open_cues(&self) -> Vec<CueState> {
        let mut cues: Vec<CueState> = self
            .inner
            .read()
            .values()
            .filter(|cue| !cue.cue_in_received)
            .cloned()
            .collect();
        cues.sort_by_key(|cue| (cue.cue_out_segment_index, cue.event_id));
        cues
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
