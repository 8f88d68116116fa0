//! Ordered selector resolution with the usability predicate

use dom_port::{Document, ElementHandle, ElementRef};
use tracing::debug;

/// Connected, laid out (or fixed), rendered, and editable.
pub fn is_usable<E: ElementHandle + ?Sized>(element: &E) -> bool {
    if !element.is_connected() {
        return false;
    }
    let visibility = element.computed_visibility();
    if element.bounding_box().is_empty() && !visibility.position_fixed {
        return false;
    }
    !visibility.is_hidden() && !element.is_disabled()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorResolver;

impl SelectorResolver {
    pub fn new() -> Self {
        Self
    }

    /// First usable match of the first selector that has one.
    ///
    /// Malformed selectors are skipped.
    pub fn resolve<S: AsRef<str>>(&self, doc: &dyn Document, selectors: &[S]) -> Option<ElementRef> {
        for selector in selectors {
            let selector = selector.as_ref();
            let matches = match doc.query_selector_all(selector) {
                Ok(matches) => matches,
                Err(err) => {
                    debug!(target: "dockwright::locator", selector, error = %err, "skipping selector");
                    continue;
                }
            };
            if let Some(found) = matches.into_iter().find(|element| is_usable(element.as_ref())) {
                debug!(target: "dockwright::locator", selector, "selector resolved");
                return Some(found);
            }
        }
        None
    }
}
