//! Shared primitives for the Dockwright crates.
//!
//! Geometry, placement vocabulary, watcher states and the error taxonomy live
//! here so every layer (locator, docking, tracking, lifecycle) speaks the same
//! types without depending on each other.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy shared by the detection and attachment layers.
///
/// None of these ever crosses the public boundary as a panic; the lifecycle
/// watcher turns them into retries, immediate re-detection or `Degraded`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DockError {
    /// No selector or heuristic candidate available.
    #[error("not found: {0}")]
    NotFound(String),

    /// A previously valid reference failed the usability predicate on re-check.
    #[error("invalidated: {0}")]
    Invalidated(String),

    /// Docking container or its structural marker disappeared.
    #[error("anchor lost: {0}")]
    AnchorLost(String),

    /// Lifecycle retry budget consumed.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },
}

impl DockError {
    /// Recovered by a delayed retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DockError::NotFound(_) | DockError::Invalidated(_))
    }

    /// Recovered by re-detecting right away, skipping the retry delay.
    pub fn needs_immediate_redetect(&self) -> bool {
        matches!(self, DockError::AnchorLost(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DockError::RetryExhausted { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DockError::NotFound(_) => "not_found",
            DockError::Invalidated(_) => "invalidated",
            DockError::AnchorLost(_) => "anchor_lost",
            DockError::RetryExhausted { .. } => "retry_exhausted",
        }
    }
}

/// Axis-aligned layout box in viewport coordinates (CSS pixels).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// True when the box has no layout extent in either dimension.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn square(side: f64) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Edge of the tracked element the floating control is attached to.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnchorEdge {
    Left,
    #[default]
    Right,
    Top,
    Bottom,
}

impl AnchorEdge {
    pub fn name(&self) -> &'static str {
        match self {
            AnchorEdge::Left => "left",
            AnchorEdge::Right => "right",
            AnchorEdge::Top => "top",
            AnchorEdge::Bottom => "bottom",
        }
    }
}

/// Where a docked control goes relative to the anchor's reference node.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InsertionRelation {
    Before,
    After,
    Append,
}

impl InsertionRelation {
    pub fn name(&self) -> &'static str {
        match self {
            InsertionRelation::Before => "before",
            InsertionRelation::After => "after",
            InsertionRelation::Append => "append",
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlacementMode {
    /// Inserted into the page's own toolbar/action area.
    #[default]
    Docked,
    /// Appended to the body and positioned next to the input.
    Floating,
}

impl PlacementMode {
    pub fn name(&self) -> &'static str {
        match self {
            PlacementMode::Docked => "docked",
            PlacementMode::Floating => "floating",
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WatcherState {
    #[default]
    Idle,
    Detecting,
    Mounted,
    Degraded,
}

impl WatcherState {
    pub fn name(&self) -> &'static str {
        match self {
            WatcherState::Idle => "idle",
            WatcherState::Detecting => "detecting",
            WatcherState::Mounted => "mounted",
            WatcherState::Degraded => "degraded",
        }
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// DOM id carried by the injected control; one attached control per id.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ControlId(pub String);

impl ControlId {
    pub const DEFAULT: &'static str = "dockwright-control";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ControlId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one watcher/bootstrap instance, surfaced in debug snapshots.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges_and_centre() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 60.0);
        assert_eq!(rect.center_x(), 60.0);
        assert_eq!(rect.center_y(), 40.0);
        assert_eq!(rect.area(), 4000.0);
        assert!(!rect.is_empty());
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_empty());
    }

    #[test]
    fn translate_keeps_size() {
        let moved = Rect::new(0.0, 0.0, 5.0, 5.0).translate(3.0, -2.0);
        assert_eq!(moved, Rect::new(3.0, -2.0, 5.0, 5.0));
    }

    #[test]
    fn error_recovery_classes() {
        assert!(DockError::NotFound("x".into()).is_retryable());
        assert!(DockError::Invalidated("x".into()).is_retryable());
        assert!(DockError::AnchorLost("x".into()).needs_immediate_redetect());
        assert!(DockError::RetryExhausted { attempts: 5 }.is_terminal());
        assert_eq!(DockError::AnchorLost("x".into()).kind(), "anchor_lost");
    }

    #[test]
    fn control_id_default() {
        assert_eq!(ControlId::default().as_str(), "dockwright-control");
    }
}
