//! Strip-then-inject playlist rewriting.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use cue::{CueState, CueTable, INDEX_UNASSIGNED, PlaylistMeta};
use tracing::debug;

use crate::playlist::{is_segment_line, scan};

/// HLS tag dialect used to signal the break downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagStyle {
    /// `#EXT-X-CUE-OUT` / `#EXT-X-CUE-OUT-CONT` / `#EXT-X-CUE-IN`.
    #[default]
    CueOutIn,
    /// `#EXT-X-SCTE35:CUE="<base64>",...`, re-embedding the received section.
    Scte35,
    /// `#EXT-X-SPLICEPOINT-SCTE35:<base64>` at the boundaries only.
    SplicepointScte35,
    /// `#EXT-X-DATERANGE` with ISO-8601 dates and the section as hex.
    DateRange,
}

/// Result of one rewrite pass.
///
/// `playlist` is `None` when no tag was injected, so callers can skip the
/// write (or serve the original bytes) instead of copying unchanged text.
#[derive(Debug, Clone)]
pub struct InjectionOutcome {
    pub playlist: Option<String>,
    pub meta: PlaylistMeta,
}

impl InjectionOutcome {
    pub fn is_modified(&self) -> bool {
        self.playlist.is_some()
    }

    fn unchanged(meta: PlaylistMeta) -> Self {
        InjectionOutcome {
            playlist: None,
            meta,
        }
    }
}

/// Rewrite `playlist` against the shared cue table.
///
/// Two steps, invoked together on every playlist emission:
///
/// 1. Bookkeeping: every cue whose CUE-IN was observed but not yet placed
///    gets `cue_in_segment_index` fixed to this playlist's
///    `media_sequence + segment_count` — the cue-in boundary is always
///    scheduled onto the next segment, never retro-fitted into the window.
/// 2. A pure rewrite of the text against the resulting cue snapshot.
///
/// Cues whose boundaries have slid out of the window are pruned afterwards.
pub fn inject(playlist: &str, table: &CueTable, style: TagStyle) -> InjectionOutcome {
    let meta = scan(playlist);
    if playlist.is_empty() {
        return InjectionOutcome::unchanged(meta);
    }
    if table.is_empty() {
        return InjectionOutcome::unchanged(meta);
    }

    table.assign_cue_in_indices(meta.next_segment_index());
    let rewritten = inject_tags(playlist, &table.snapshot(), &meta, style);
    let pruned = table.prune_closed(meta.media_sequence);
    if pruned > 0 {
        debug!(pruned, "dropped cues behind the playlist window");
    }

    InjectionOutcome {
        playlist: rewritten,
        meta,
    }
}

/// Pure rewrite of playlist text against a cue snapshot.
///
/// Pre-existing cue/discontinuity tags are stripped first, so injecting
/// into already-injected output reproduces it instead of duplicating tags.
/// Returns `None` when no tag was placed.
pub fn inject_tags(
    playlist: &str,
    cues: &[CueState],
    meta: &PlaylistMeta,
    style: TagStyle,
) -> Option<String> {
    let mut out = String::with_capacity(playlist.len() + cues.len() * 96);
    let mut segment_offset = 0i64;
    let mut injected = false;

    for line in playlist.lines() {
        if is_stale_tag(line) {
            continue;
        }
        if line.starts_with("#EXTINF:") {
            let index = meta.media_sequence + segment_offset;
            for cue in cues {
                let wrote = write_cue_tags(&mut out, cue, index, meta, style);
                injected |= wrote;
            }
            out.push_str(line);
            out.push('\n');
        } else {
            out.push_str(line);
            out.push('\n');
            if is_segment_line(line) {
                segment_offset += 1;
            }
        }
    }

    injected.then_some(out)
}

/// Tags owned by this rewrite; removed before injecting to stay idempotent.
fn is_stale_tag(line: &str) -> bool {
    line.starts_with("#EXT-X-CUE-OUT")
        || line.starts_with("#EXT-X-CUE-IN")
        || line.starts_with("#EXT-X-SCTE35")
        || line.starts_with("#EXT-X-SPLICEPOINT-SCTE35")
        || (line.starts_with("#EXT-X-DATERANGE") && line.contains("SCTE35"))
        || line == "#EXT-X-DISCONTINUITY"
}

/// Emit the tags `cue` contributes before the segment at absolute `index`.
fn write_cue_tags(
    out: &mut String,
    cue: &CueState,
    index: i64,
    meta: &PlaylistMeta,
    style: TagStyle,
) -> bool {
    if index == cue.cue_out_segment_index {
        out.push_str("#EXT-X-DISCONTINUITY\n");
        write_cue_out(out, cue, style);
        true
    } else if cue.cue_in_segment_index != INDEX_UNASSIGNED && index == cue.cue_in_segment_index {
        out.push_str("#EXT-X-DISCONTINUITY\n");
        write_cue_in(out, cue, style);
        true
    } else if index > cue.cue_out_segment_index
        && (cue.cue_in_segment_index == INDEX_UNASSIGNED || index < cue.cue_in_segment_index)
    {
        let elapsed = (index - cue.cue_out_segment_index) as f64 * meta.target_duration;
        write_cue_cont(out, cue, elapsed, style)
    } else {
        false
    }
}

fn write_cue_out(out: &mut String, cue: &CueState, style: TagStyle) {
    match style {
        TagStyle::CueOutIn => {
            if let Some(secs) = cue.duration_secs() {
                out.push_str(&format!("#EXT-X-CUE-OUT:{secs:.3}\n"));
            } else {
                out.push_str("#EXT-X-CUE-OUT\n");
            }
        }
        TagStyle::Scte35 => {
            out.push_str(&format!(
                "#EXT-X-SCTE35:CUE=\"{}\",CUE-OUT=YES\n",
                cue.encoded_payload
            ));
        }
        TagStyle::SplicepointScte35 => {
            out.push_str(&format!(
                "#EXT-X-SPLICEPOINT-SCTE35:{}\n",
                cue.encoded_payload
            ));
        }
        TagStyle::DateRange => {
            let mut line = format!(
                "#EXT-X-DATERANGE:ID=\"{}\",START-DATE=\"{}\"",
                cue.event_id,
                iso8601(cue.wall_clock_start_ms)
            );
            if let Some(secs) = cue.duration_secs() {
                line.push_str(&format!(",PLANNED-DURATION={secs:.3}"));
            }
            line.push_str(&format!(",SCTE35-OUT=0x{}\n", payload_hex(cue)));
            out.push_str(&line);
        }
    }
}

fn write_cue_in(out: &mut String, cue: &CueState, style: TagStyle) {
    match style {
        TagStyle::CueOutIn => out.push_str("#EXT-X-CUE-IN\n"),
        TagStyle::Scte35 => {
            out.push_str(&format!(
                "#EXT-X-SCTE35:CUE=\"{}\",CUE-IN=YES\n",
                cue.encoded_payload
            ));
        }
        TagStyle::SplicepointScte35 => {
            out.push_str(&format!(
                "#EXT-X-SPLICEPOINT-SCTE35:{}\n",
                cue.encoded_payload
            ));
        }
        TagStyle::DateRange => {
            out.push_str(&format!(
                "#EXT-X-DATERANGE:ID=\"{}\",END-DATE=\"{}\",SCTE35-IN=0x{}\n",
                cue.event_id,
                iso8601(Utc::now().timestamp_millis()),
                payload_hex(cue)
            ));
        }
    }
}

fn write_cue_cont(out: &mut String, cue: &CueState, elapsed: f64, style: TagStyle) -> bool {
    match style {
        TagStyle::CueOutIn => {
            let mut line = format!("#EXT-X-CUE-OUT-CONT:Elapsed={elapsed:.3}");
            if let Some(secs) = cue.duration_secs() {
                line.push_str(&format!(",Duration={secs:.3}"));
            }
            line.push('\n');
            out.push_str(&line);
            true
        }
        TagStyle::Scte35 => {
            out.push_str(&format!(
                "#EXT-X-SCTE35:CUE=\"{}\",CUE-OUT-CONT=YES,ELAPSED={elapsed:.3}\n",
                cue.encoded_payload
            ));
            true
        }
        // Splicepoint signaling marks boundaries only.
        TagStyle::SplicepointScte35 => false,
        TagStyle::DateRange => {
            out.push_str(&format!(
                "#EXT-X-DATERANGE:ID=\"{}\",START-DATE=\"{}\",ELAPSED={elapsed:.3},SCTE35-OUT-CONT=0x{}\n",
                cue.event_id,
                iso8601(cue.wall_clock_start_ms),
                payload_hex(cue)
            ));
            true
        }
    }
}

fn iso8601(unix_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(unix_ms)
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn payload_hex(cue: &CueState) -> String {
    hex::encode_upper(STANDARD.decode(&cue.encoded_payload).unwrap_or_default())
}
