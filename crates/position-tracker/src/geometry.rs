use dockwright_core_types::{AnchorEdge, Offset, Rect, Size, Viewport};
use dom_port::ElementRef;
use serde::Serialize;

/// What to follow and how. Immutable: repositioning builds a new spec.
#[derive(Debug, Clone)]
pub struct TrackingSpec {
    /// Non-owning; the tracker checks connectivity on every recompute.
    pub target: ElementRef,
    pub offset: Offset,
    pub anchor_edge: AnchorEdge,
}

impl TrackingSpec {
    pub fn new(target: ElementRef, offset: Offset, anchor_edge: AnchorEdge) -> Self {
        Self {
            target,
            offset,
            anchor_edge,
        }
    }
}

/// Fixed-position coordinates. Exactly one of each opposing pair is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ControlPosition {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
}

/// Place a `control`-sized box against `edge` of `target`.
///
/// The coordinate along the anchored edge is the edge plus the offset; the
/// cross axis is centred on the target's centre plus the offset.
pub fn compute_position(
    target: Rect,
    control: Size,
    offset: Offset,
    edge: AnchorEdge,
    viewport: Viewport,
) -> ControlPosition {
    let centred_top = target.center_y() + offset.y - control.height / 2.0;
    let centred_left = target.center_x() + offset.x - control.width / 2.0;
    match edge {
        AnchorEdge::Right => ControlPosition {
            left: Some(target.right() + offset.x),
            top: Some(centred_top),
            ..ControlPosition::default()
        },
        AnchorEdge::Left => ControlPosition {
            right: Some(viewport.width - (target.left() - offset.x)),
            top: Some(centred_top),
            ..ControlPosition::default()
        },
        AnchorEdge::Bottom => ControlPosition {
            left: Some(centred_left),
            top: Some(target.bottom() + offset.y),
            ..ControlPosition::default()
        },
        AnchorEdge::Top => ControlPosition {
            left: Some(centred_left),
            bottom: Some(viewport.height - (target.top() - offset.y)),
            ..ControlPosition::default()
        },
    }
}
