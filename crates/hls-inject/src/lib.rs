//! SCTE-35 tag injection for rolling HLS media playlists.
//!
//! Takes the segmenter's playlist text plus the shared active-cue table and
//! produces the playlist actually served to players, with ad-break tags
//! placed by segment-index arithmetic: a cue records the absolute index of
//! the segment its boundary falls on, and every rewrite derives tag
//! positions from `#EXT-X-MEDIA-SEQUENCE` alone. Re-running injection on
//! its own output is a no-op by construction.

pub mod injector;
pub mod playlist;

pub use injector::{InjectionOutcome, TagStyle, inject, inject_tags};
pub use playlist::{count_segments, parse_media_sequence, parse_target_duration, scan};
