//! Profile-named anchor container: append the control to it.

use dom_port::{Document, ElementRef};
use tracing::debug;

use crate::strategy::{apply_inline_style, AnchorResult, DockStrategy};

#[derive(Debug, Clone)]
pub struct SelectorStrategy {
    selector: String,
}

impl SelectorStrategy {
    pub const ID: &'static str = "selector";

    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

impl DockStrategy for SelectorStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn find_anchor(&self, doc: &dyn Document, _input: Option<&ElementRef>) -> Option<AnchorResult> {
        match doc.query_selector_all(&self.selector) {
            Ok(found) => found
                .into_iter()
                .find(|element| element.is_connected())
                .map(AnchorResult::append),
            Err(err) => {
                debug!(
                    target: "dockwright::docking",
                    selector = %self.selector,
                    error = %err,
                    "anchor selector rejected"
                );
                None
            }
        }
    }

    fn apply_style(&self, control: &ElementRef, container: Option<&ElementRef>) {
        apply_inline_style(control, container, &[]);
    }

    fn validate(&self, anchor: &AnchorResult) -> bool {
        anchor.container.is_connected()
    }
}
