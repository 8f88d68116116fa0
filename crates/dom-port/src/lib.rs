//! Engine-agnostic view of a live document.
//!
//! Usability and scoring logic is written against [`ElementHandle`], which
//! exposes exactly what layout checks need. Docking and the heuristic scorer
//! additionally need tree structure and attributes, which [`DomElement`]
//! adds. A host embeds Dockwright by implementing these traits over its real
//! DOM; [`memory::MemoryDocument`] implements them in-process.

pub mod errors;
pub mod memory;
pub mod selector;

use std::fmt::Debug;
use std::sync::Arc;

use dockwright_core_types::{InsertionRelation, Rect, Viewport};
use dockwright_event_bus::LayoutSignal;
use tokio::sync::broadcast;

pub use errors::{DomError, SelectorError};
pub use memory::{MemoryDocument, NodeFixture, PageFixture};

/// Shared, non-owning reference to an element.
///
/// Holding one never keeps the node in the tree; a detached node reports
/// `is_connected() == false` instead.
pub type ElementRef = Arc<dyn DomElement>;

/// Stable identity of a node within one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub document: u64,
    pub node: u64,
}

/// The slice of computed style that decides whether an element is rendered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputedVisibility {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub opacity: f64,
    pub position_fixed: bool,
}

impl ComputedVisibility {
    pub fn is_hidden(&self) -> bool {
        self.display_none || self.visibility_hidden || self.opacity <= 0.0
    }
}

impl Default for ComputedVisibility {
    fn default() -> Self {
        Self {
            display_none: false,
            visibility_hidden: false,
            opacity: 1.0,
            position_fixed: false,
        }
    }
}

/// Minimal capability surface used by every validity and scoring check.
pub trait ElementHandle: Send + Sync + Debug {
    fn key(&self) -> NodeKey;
    fn is_connected(&self) -> bool;
    fn bounding_box(&self) -> Rect;
    fn computed_visibility(&self) -> ComputedVisibility;
    /// Disabled or read-only.
    fn is_disabled(&self) -> bool;
}

/// Structural and attribute access on top of [`ElementHandle`].
pub trait DomElement: ElementHandle {
    /// Lower-case tag name.
    fn tag_name(&self) -> String;
    fn attribute(&self, name: &str) -> Option<String>;
    fn set_attribute(&self, name: &str, value: &str);
    fn parent(&self) -> Option<ElementRef>;
    fn children(&self) -> Vec<ElementRef>;
    /// Descendants matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementRef>, SelectorError>;
    fn matches(&self, selector: &str) -> Result<bool, SelectorError>;
    fn style(&self, property: &str) -> Option<String>;
    /// Set (or with `None`, clear) one inline style property.
    fn set_style(&self, property: &str, value: Option<&str>);

    fn query_selector(&self, selector: &str) -> Result<Option<ElementRef>, SelectorError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, selector: &str) -> Result<Option<ElementRef>, SelectorError> {
        if self.matches(selector)? {
            return Ok(Some(self.to_ref()));
        }
        let mut current = self.parent();
        while let Some(node) = current {
            if node.matches(selector)? {
                return Ok(Some(node));
            }
            current = node.parent();
        }
        Ok(None)
    }

    /// Inclusive descendant check.
    fn contains(&self, other: &ElementRef) -> bool {
        let key = self.key();
        if other.key() == key {
            return true;
        }
        let mut current = other.parent();
        while let Some(node) = current {
            if node.key() == key {
                return true;
            }
            current = node.parent();
        }
        false
    }

    fn is_content_editable(&self) -> bool {
        self.attribute("contenteditable")
            .map(|value| !value.eq_ignore_ascii_case("false"))
            .unwrap_or(false)
    }

    /// A fresh shared reference to this same node.
    fn to_ref(&self) -> ElementRef;
}

/// Document-level operations.
pub trait Document: Send + Sync {
    fn url(&self) -> String;
    fn viewport(&self) -> Viewport;
    fn body(&self) -> ElementRef;
    /// Connected elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementRef>, SelectorError>;
    /// First connected element whose `id` attribute equals `id`.
    fn element_by_id(&self, id: &str) -> Option<ElementRef>;
    /// Create a detached element.
    fn create_element(&self, tag: &str) -> ElementRef;
    fn insert(
        &self,
        node: &ElementRef,
        container: &ElementRef,
        reference: Option<&ElementRef>,
        relation: InsertionRelation,
    ) -> Result<(), DomError>;
    /// Detach `node` from its parent; no-op if already detached.
    fn remove(&self, node: &ElementRef);
    /// Normalized layout-change stream for this document.
    fn subscribe(&self) -> broadcast::Receiver<LayoutSignal>;

    fn query_selector(&self, selector: &str) -> Result<Option<ElementRef>, SelectorError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }
}
