//! Ad-break ("cue") lifecycle tracking for SCTE-35 signaled streams.
//!
//! Consumes decoded [`scte35::SpliceMessage`]s on the packet path, maintains
//! the shared table of in-flight ad breaks, and emits the line-delimited
//! records that carry cue transitions across to the muxer/serving path.
//!
//! The table is the single piece of shared mutable state in the pipeline:
//! the tracker writes to it per incoming data packet, the manifest injector
//! reads (and finalizes cue-in indices) per playlist rewrite.

pub mod bridge;
pub mod state;
pub mod table;
pub mod tracker;

pub use bridge::CueRecord;
pub use state::{CueState, DURATION_UNKNOWN, INDEX_UNASSIGNED};
pub use table::CueTable;
pub use tracker::{CueTracker, CueTrackerConfig, PlaylistMeta, PlaylistSource};
