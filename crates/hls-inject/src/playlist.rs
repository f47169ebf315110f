//! Line-level scanning of media playlist text.
//!
//! The injector must reproduce the playlist byte-for-byte outside the lines
//! it adds, so this works on raw text instead of an M3U8 AST. Missing tags
//! fall back to safe defaults rather than failing the rewrite.

use cue::PlaylistMeta;

/// Default `#EXT-X-TARGETDURATION` when the tag is absent.
pub const DEFAULT_TARGET_DURATION: f64 = 2.0;

/// Parse `#EXT-X-MEDIA-SEQUENCE`, defaulting to 0.
pub fn parse_media_sequence(playlist: &str) -> i64 {
    playlist
        .lines()
        .find_map(|line| line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Parse `#EXT-X-TARGETDURATION`, defaulting to [`DEFAULT_TARGET_DURATION`].
pub fn parse_target_duration(playlist: &str) -> f64 {
    playlist
        .lines()
        .find_map(|line| line.strip_prefix("#EXT-X-TARGETDURATION:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_TARGET_DURATION)
}

/// Count segment entries (lines naming a `.ts` or `.fmp4` file).
pub fn count_segments(playlist: &str) -> i64 {
    playlist.lines().filter(|line| is_segment_line(line)).count() as i64
}

/// Single-pass scan of the fields the injector needs.
pub fn scan(playlist: &str) -> PlaylistMeta {
    PlaylistMeta {
        media_sequence: parse_media_sequence(playlist),
        segment_count: count_segments(playlist),
        target_duration: parse_target_duration(playlist),
    }
}

pub(crate) fn is_segment_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.ends_with(".ts") || trimmed.ends_with(".fmp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYLIST: &str = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-TARGETDURATION:4\n\
        #EXT-X-MEDIA-SEQUENCE:27\n\
        #EXTINF:4.000,\n\
        seg_27.ts\n\
        #EXTINF:4.000,\n\
        seg_28.fmp4\n";

    #[test]
    fn scans_header_fields_and_segments() {
        let meta = scan(PLAYLIST);
        assert_eq!(meta.media_sequence, 27);
        assert_eq!(meta.segment_count, 2);
        assert_eq!(meta.target_duration, 4.0);
        assert_eq!(meta.next_segment_index(), 29);
    }

    #[test]
    fn missing_tags_fall_back_to_defaults() {
        let playlist = "#EXTM3U\n#EXTINF:2.0,\nseg_0.ts\n";
        assert_eq!(parse_media_sequence(playlist), 0);
        assert_eq!(parse_target_duration(playlist), DEFAULT_TARGET_DURATION);
        assert_eq!(count_segments(playlist), 1);
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let playlist = "#EXT-X-MEDIA-SEQUENCE:abc\n#EXT-X-TARGETDURATION:\n";
        assert_eq!(parse_media_sequence(playlist), 0);
        assert_eq!(parse_target_duration(playlist), DEFAULT_TARGET_DURATION);
    }

    #[test]
    fn empty_playlist_scans_to_defaults() {
        let meta = scan("");
        assert_eq!(meta.media_sequence, 0);
        assert_eq!(meta.segment_count, 0);
        assert_eq!(meta.target_duration, DEFAULT_TARGET_DURATION);
    }
}
