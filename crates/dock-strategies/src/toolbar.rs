//! Toolbar docking for known platforms.
//!
//! Search order: toolbar (inside the input's form or region first, then the
//! whole document), reference button inside the toolbar, then the button's
//! structural wrapper. A missing wrapper docks at the button, a missing
//! button appends to the toolbar, a missing toolbar gives up.

use dockwright_core_types::InsertionRelation;
use dom_port::{Document, ElementRef};
use tracing::debug;

use crate::strategy::{apply_inline_style, holds_marker, AnchorResult, DockStrategy};

const REGION_SELECTOR: &str = "form, fieldset, [role='region'], [role='dialog']";

/// Selectors and placement for one platform's composer toolbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarRecipe {
    pub id: &'static str,
    pub toolbar: &'static str,
    /// Button the control is placed next to; also the validation marker.
    pub button: &'static str,
    pub wrapper: Option<&'static str>,
    pub relation: InsertionRelation,
    pub style: &'static [(&'static str, &'static str)],
}

pub const BUILTIN_RECIPES: &[ToolbarRecipe] = &[
    ToolbarRecipe {
        id: "chatgpt",
        toolbar: "[data-testid='composer-trailing-actions'], form div.items-center.justify-end",
        button: "button[data-testid='send-button'], button#composer-submit-button",
        wrapper: Some("span[data-state], div.flex"),
        relation: InsertionRelation::Before,
        style: &[("margin", "0 4px"), ("border-radius", "9999px")],
    },
    ToolbarRecipe {
        id: "claude",
        toolbar: "div[data-testid='chat-input-actions'], fieldset div.flex.items-center",
        button: "button[aria-label='Send message' i], button[aria-label='Send Message']",
        wrapper: Some("div"),
        relation: InsertionRelation::Before,
        style: &[("margin", "0 6px")],
    },
    ToolbarRecipe {
        id: "gemini",
        toolbar: "div.trailing-actions-wrapper, div.input-buttons-wrapper-bottom",
        button: "button.send-button, button[aria-label='Send message' i]",
        wrapper: Some("div.send-button-container"),
        relation: InsertionRelation::Before,
        style: &[("margin", "0 4px")],
    },
    ToolbarRecipe {
        id: "gmail",
        toolbar: "tr.btC, div[role='toolbar']",
        button: "div[role='button'][data-tooltip^='Send'], div[role='button'].aoO",
        wrapper: Some("td"),
        relation: InsertionRelation::After,
        style: &[("margin", "0 8px"), ("vertical-align", "middle")],
    },
];

#[derive(Debug, Clone)]
pub struct ToolbarStrategy {
    recipe: ToolbarRecipe,
}

impl ToolbarStrategy {
    pub fn new(recipe: ToolbarRecipe) -> Self {
        Self { recipe }
    }

    pub fn recipe(&self) -> &ToolbarRecipe {
        &self.recipe
    }

    fn find_toolbar(&self, doc: &dyn Document, input: Option<&ElementRef>) -> Option<ElementRef> {
        let scoped = input
            .and_then(|input| input.closest(REGION_SELECTOR).ok().flatten())
            .and_then(|region| {
                if region.matches(self.recipe.toolbar).unwrap_or(false) {
                    return Some(region);
                }
                region.query_selector(self.recipe.toolbar).ok().flatten()
            });
        if scoped.is_some() {
            return scoped;
        }
        match doc.query_selector(self.recipe.toolbar) {
            Ok(found) => found,
            Err(err) => {
                debug!(
                    target: "dockwright::docking",
                    strategy = self.recipe.id,
                    error = %err,
                    "toolbar selector rejected"
                );
                None
            }
        }
    }

    /// Closest wrapper of `button` strictly inside `toolbar`.
    fn find_wrapper(&self, toolbar: &ElementRef, button: &ElementRef) -> Option<ElementRef> {
        let selector = self.recipe.wrapper?;
        let parent = button.parent()?;
        let wrapper = parent.closest(selector).ok().flatten()?;
        (wrapper.key() != toolbar.key() && toolbar.contains(&wrapper)).then_some(wrapper)
    }

    fn place(&self, reference: ElementRef) -> Option<AnchorResult> {
        let container = reference.parent()?;
        Some(match self.recipe.relation {
            InsertionRelation::After => AnchorResult::after(container, reference),
            _ => AnchorResult::before(container, reference),
        })
    }
}

impl DockStrategy for ToolbarStrategy {
    fn id(&self) -> &str {
        self.recipe.id
    }

    fn find_anchor(&self, doc: &dyn Document, input: Option<&ElementRef>) -> Option<AnchorResult> {
        let Some(toolbar) = self.find_toolbar(doc, input) else {
            debug!(target: "dockwright::docking", strategy = self.recipe.id, "toolbar not found");
            return None;
        };

        let button = match toolbar.query_selector(self.recipe.button) {
            Ok(Some(button)) => button,
            _ => {
                debug!(
                    target: "dockwright::docking",
                    strategy = self.recipe.id,
                    "reference button missing, appending to toolbar"
                );
                return Some(AnchorResult::append(toolbar));
            }
        };

        if let Some(wrapper) = self.find_wrapper(&toolbar, &button) {
            if let Some(anchor) = self.place(wrapper) {
                return Some(anchor);
            }
        }
        debug!(
            target: "dockwright::docking",
            strategy = self.recipe.id,
            "no wrapper, docking at the button"
        );
        self.place(button)
            .or_else(|| Some(AnchorResult::append(toolbar)))
    }

    fn apply_style(&self, control: &ElementRef, container: Option<&ElementRef>) {
        apply_inline_style(control, container, self.recipe.style);
    }

    fn validate(&self, anchor: &AnchorResult) -> bool {
        let container = &anchor.container;
        if !anchor.keyed {
            // Append fallback: the toolbar itself is the home.
            return container.is_connected()
                && container.matches(self.recipe.toolbar).unwrap_or(false);
        }
        let reference_alive = anchor
            .reference
            .as_ref()
            .map_or(true, |reference| reference.is_connected());
        reference_alive && holds_marker(container.as_ref(), self.recipe.button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockwright_core_types::Viewport;
    use dom_port::MemoryDocument;

    fn recipe(id: &str) -> ToolbarRecipe {
        BUILTIN_RECIPES
            .iter()
            .find(|recipe| recipe.id == id)
            .cloned()
            .unwrap()
    }

    fn gemini_page() -> (MemoryDocument, ElementRef, ElementRef, ElementRef, ElementRef) {
        let doc = MemoryDocument::new("https://gemini.google.com/app", Viewport::default());
        let body = doc.body();
        let form = doc.append(&body, "form", &[]);
        let input = doc.append(&form, "div", &[("contenteditable", "true")]);
        let toolbar = doc.append(&form, "div", &[("class", "input-buttons-wrapper-bottom")]);
        let wrapper = doc.append(&toolbar, "div", &[("class", "send-button-container")]);
        let button = doc.append(&wrapper, "button", &[("class", "send-button")]);
        (doc, input, toolbar, wrapper, button)
    }

    #[test]
    fn docks_before_wrapper() {
        let (doc, input, toolbar, wrapper, _) = gemini_page();
        let strategy = ToolbarStrategy::new(recipe("gemini"));

        let anchor = strategy.find_anchor(&doc, Some(&input)).unwrap();
        assert_eq!(anchor.container.key(), toolbar.key());
        assert_eq!(anchor.reference.as_ref().unwrap().key(), wrapper.key());
        assert_eq!(anchor.relation, InsertionRelation::Before);
        assert!(anchor.keyed);
        assert!(strategy.validate(&anchor));
    }

    #[test]
    fn missing_wrapper_docks_at_button() {
        let doc = MemoryDocument::new("https://gemini.google.com/app", Viewport::default());
        let body = doc.body();
        let toolbar = doc.append(&body, "div", &[("class", "trailing-actions-wrapper")]);
        let button = doc.append(&toolbar, "button", &[("class", "send-button")]);

        let anchor = ToolbarStrategy::new(recipe("gemini")).find_anchor(&doc, None).unwrap();
        assert_eq!(anchor.container.key(), toolbar.key());
        assert_eq!(anchor.reference.unwrap().key(), button.key());
    }

    #[test]
    fn missing_button_appends_to_toolbar() {
        let (doc, input, toolbar, wrapper, _) = gemini_page();
        doc.remove(&wrapper);
        let strategy = ToolbarStrategy::new(recipe("gemini"));

        let anchor = strategy.find_anchor(&doc, Some(&input)).unwrap();
        assert_eq!(anchor.container.key(), toolbar.key());
        assert_eq!(anchor.relation, InsertionRelation::Append);
        assert!(!anchor.keyed);
        assert!(strategy.validate(&anchor));

        doc.remove(&toolbar);
        assert!(!strategy.validate(&anchor));
    }

    #[test]
    fn missing_toolbar_gives_up() {
        let doc = MemoryDocument::new("https://gemini.google.com/app", Viewport::default());
        let body = doc.body();
        let input = doc.append(&body, "textarea", &[]);
        assert!(ToolbarStrategy::new(recipe("gemini"))
            .find_anchor(&doc, Some(&input))
            .is_none());
    }

    #[test]
    fn toolbar_in_input_region_wins_over_earlier_one() {
        let doc = MemoryDocument::new("https://chatgpt.com/", Viewport::default());
        let body = doc.body();
        doc.append(&body, "div", &[("data-testid", "composer-trailing-actions")]);
        let form = doc.append(&body, "form", &[]);
        let input = doc.append(&form, "textarea", &[]);
        let local = doc.append(&form, "div", &[("data-testid", "composer-trailing-actions")]);

        let anchor = ToolbarStrategy::new(recipe("chatgpt"))
            .find_anchor(&doc, Some(&input))
            .unwrap();
        assert_eq!(anchor.container.key(), local.key());
    }

    #[test]
    fn validate_tracks_the_marker() {
        let (doc, input, _, _, button) = gemini_page();
        let strategy = ToolbarStrategy::new(recipe("gemini"));
        let anchor = strategy.find_anchor(&doc, Some(&input)).unwrap();
        assert!(strategy.validate(&anchor));

        // Keyed off the button, so losing it invalidates the spot.
        doc.remove(&button);
        assert!(!strategy.validate(&anchor));
    }

    #[test]
    fn removed_wrapper_invalidates_keyed_anchor() {
        let (doc, input, toolbar, wrapper, _) = gemini_page();
        let strategy = ToolbarStrategy::new(recipe("gemini"));
        let anchor = strategy.find_anchor(&doc, Some(&input)).unwrap();
        assert_eq!(anchor.reference.as_ref().unwrap().key(), wrapper.key());

        doc.remove(&wrapper);
        assert!(toolbar.is_connected());
        assert!(!strategy.validate(&anchor));

        let fallback = strategy.find_anchor(&doc, Some(&input)).unwrap();
        assert_eq!(fallback.relation, InsertionRelation::Append);
        assert!(strategy.validate(&fallback));
    }

    #[test]
    fn keyed_anchor_survives_unrelated_churn() {
        let (doc, input, toolbar, _, _) = gemini_page();
        let strategy = ToolbarStrategy::new(recipe("gemini"));
        let anchor = strategy.find_anchor(&doc, Some(&input)).unwrap();

        doc.append(&toolbar, "button", &[("class", "mic-button")]);
        assert!(strategy.validate(&anchor));
    }

    #[test]
    fn gmail_docks_after_send_cell() {
        let doc = MemoryDocument::new("https://mail.google.com/mail/u/0/", Viewport::default());
        let body = doc.body();
        let row = doc.append(&body, "tr", &[("class", "btC")]);
        let cell = doc.append(&row, "td", &[]);
        doc.append(&cell, "div", &[("role", "button"), ("data-tooltip", "Send (Ctrl-Enter)")]);

        let anchor = ToolbarStrategy::new(recipe("gmail")).find_anchor(&doc, None).unwrap();
        assert_eq!(anchor.relation, InsertionRelation::After);
        assert_eq!(anchor.reference.unwrap().key(), cell.key());
    }
}
