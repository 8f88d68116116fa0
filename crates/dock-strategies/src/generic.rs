//! Universal fallback: dock in front of the input's submit control.

use dom_port::{Document, ElementRef};
use tracing::debug;

use crate::strategy::{apply_inline_style, holds_marker, AnchorResult, DockStrategy};

/// Submit-type controls: explicit submit buttons and send-labelled buttons.
pub const SUBMIT_SELECTOR: &str = "button[type='submit'], input[type='submit'], \
     button[aria-label*='send' i], button[data-testid*='send' i], button[title*='send' i]";

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericStrategy;

impl GenericStrategy {
    pub const ID: &'static str = "generic";

    pub fn new() -> Self {
        Self
    }
}

impl DockStrategy for GenericStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    fn find_anchor(&self, _doc: &dyn Document, input: Option<&ElementRef>) -> Option<AnchorResult> {
        let input = input?;
        let parent = input.parent()?;
        let input_key = input.key();

        // A sibling that is a submit control, or that wraps one.
        let submit = parent.children().into_iter().find(|child| {
            child.key() != input_key
                && (matches!(child.matches(SUBMIT_SELECTOR), Ok(true))
                    || matches!(child.query_selector(SUBMIT_SELECTOR), Ok(Some(_))))
        });

        match submit {
            Some(reference) => Some(AnchorResult::before(parent, reference)),
            None => {
                debug!(target: "dockwright::docking", "no submit sibling next to input");
                None
            }
        }
    }

    fn apply_style(&self, control: &ElementRef, container: Option<&ElementRef>) {
        apply_inline_style(control, container, &[("margin", "0 6px")]);
    }

    fn validate(&self, anchor: &AnchorResult) -> bool {
        holds_marker(anchor.container.as_ref(), SUBMIT_SELECTOR)
    }
}
