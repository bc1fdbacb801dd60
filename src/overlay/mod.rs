//! Per-viewer overlays: building entitled views and diffing them per
//! connection.
//!
//! - [`builder`] — reconstructs, for one viewer, the entitled slice of
//!   hidden state merged with public identity snapshots.
//! - [`diff`] — per-connection trackers that emit either a full snapshot
//!   or a bandwidth-bounded diff.

pub mod builder;
pub mod diff;

pub use builder::{build_overlay, OverlayView, Viewer, ViewerRole};
pub use diff::{
    OverlayDiffPayload, OverlayMessage, OverlayMeta, OverlaySnapshotPayload, OverlayTracker,
    MAX_DIFF_BYTES, MAX_DIFF_FRACTION, OVERLAY_SCHEMA_VERSION,
};
