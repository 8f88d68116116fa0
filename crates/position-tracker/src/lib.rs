//! Floating-control placement.
//!
//! A [`PositionTracker`] keeps one control pinned to a target element. It
//! listens to the document's layout signal stream and recomputes at most once
//! per frame; a detached target ends tracking and fires the target-lost
//! callback instead of positioning against a stale box.

pub mod geometry;
pub mod tracker;

pub use geometry::{compute_position, ControlPosition, TrackingSpec};
pub use tracker::{PositionTracker, TargetLost, TrackingHandle, DEFAULT_FRAME_INTERVAL};
