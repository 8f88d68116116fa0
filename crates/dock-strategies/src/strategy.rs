use std::fmt::Debug;

use dockwright_core_types::InsertionRelation;
use dom_port::{Document, DomElement, ElementRef};

/// Where the control goes. Produced fresh on every dock attempt.
#[derive(Debug, Clone)]
pub struct AnchorResult {
    pub container: ElementRef,
    /// Sibling the control is placed next to; `None` for `Append`.
    pub reference: Option<ElementRef>,
    pub relation: InsertionRelation,
    /// Placement was keyed off a reference element rather than a bare append.
    pub keyed: bool,
}

impl AnchorResult {
    pub fn append(container: ElementRef) -> Self {
        Self {
            container,
            reference: None,
            relation: InsertionRelation::Append,
            keyed: false,
        }
    }

    pub fn before(container: ElementRef, reference: ElementRef) -> Self {
        Self {
            container,
            reference: Some(reference),
            relation: InsertionRelation::Before,
            keyed: true,
        }
    }

    pub fn after(container: ElementRef, reference: ElementRef) -> Self {
        Self {
            container,
            reference: Some(reference),
            relation: InsertionRelation::After,
            keyed: true,
        }
    }

    /// Same container, reference node and relation.
    pub fn same_spot(&self, other: &AnchorResult) -> bool {
        self.container.key() == other.container.key()
            && self.relation == other.relation
            && self.reference.as_ref().map(|node| node.key())
                == other.reference.as_ref().map(|node| node.key())
    }
}

/// Per-platform docking behaviour.
pub trait DockStrategy: Send + Sync + Debug {
    fn id(&self) -> &str;

    /// Insertion point for the control, or `None` when this page offers none.
    fn find_anchor(&self, doc: &dyn Document, input: Option<&ElementRef>) -> Option<AnchorResult>;

    /// Inline style for the docked control.
    fn apply_style(&self, control: &ElementRef, container: Option<&ElementRef>);

    /// Whether an anchor chosen earlier is still a valid home.
    fn validate(&self, anchor: &AnchorResult) -> bool;
}

/// Docked controls sit in the container's flow and follow its axis.
pub(crate) fn apply_inline_style(
    control: &ElementRef,
    container: Option<&ElementRef>,
    extra: &[(&str, &str)],
) {
    control.set_style("position", None);
    control.set_style("left", None);
    control.set_style("top", None);
    control.set_style("right", None);
    control.set_style("bottom", None);
    control.set_style("display", Some("inline-flex"));
    control.set_style("flex-shrink", Some("0"));

    let column = container
        .and_then(|container| container.style("flex-direction"))
        .map_or(false, |direction| direction.starts_with("column"));
    control.set_style("align-self", Some(if column { "flex-end" } else { "center" }));

    for (property, value) in extra {
        control.set_style(property, Some(value));
    }
}

/// Connected and holding at least one match for `marker`.
pub(crate) fn holds_marker(container: &dyn DomElement, marker: &str) -> bool {
    container.is_connected() && matches!(container.query_selector(marker), Ok(Some(_)))
}
