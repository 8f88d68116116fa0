//! Profile-first input location with heuristic fallback

use dockwright_core_types::DockError;
use dom_port::{Document, ElementRef};
use profile_center::{match_profile, Profile};
use tracing::{debug, info};

use crate::heuristic::HeuristicScorer;
use crate::resolver::SelectorResolver;
use crate::types::{AnchorSource, HeuristicConfig, LocateResult};

#[derive(Debug, Clone, Default)]
pub struct InputLocator {
    resolver: SelectorResolver,
    scorer: HeuristicScorer,
}

impl InputLocator {
    pub fn new(config: HeuristicConfig) -> Self {
        Self {
            resolver: SelectorResolver::new(),
            scorer: HeuristicScorer::new(config),
        }
    }

    pub fn scorer(&self) -> &HeuristicScorer {
        &self.scorer
    }

    pub fn resolver(&self) -> &SelectorResolver {
        &self.resolver
    }

    /// Locate the input for `doc`, trying `profile`'s selectors before the
    /// heuristic scan.
    pub fn locate(&self, doc: &dyn Document, profile: Option<&Profile>) -> Option<LocateResult> {
        match self.try_locate(doc, profile) {
            Ok(found) => Some(found),
            Err(err) => {
                debug!(target: "dockwright::locator", error = %err, "locate failed");
                None
            }
        }
    }

    /// Match `doc`'s URL against `profiles` and locate.
    pub fn locate_for_url(&self, doc: &dyn Document, profiles: &[Profile]) -> Option<LocateResult> {
        let url = doc.url();
        self.locate(doc, match_profile(&url, profiles))
    }

    pub fn try_locate(
        &self,
        doc: &dyn Document,
        profile: Option<&Profile>,
    ) -> Result<LocateResult, DockError> {
        if let Some(profile) = profile {
            if let Some(element) = self.resolver.resolve(doc, profile.selector_list.as_slice()) {
                info!(
                    target: "dockwright::locator",
                    profile = %profile.id,
                    "input located by profile"
                );
                return Ok(LocateResult {
                    element,
                    anchor_source: AnchorSource::Profile(profile.id.clone()),
                    anchor: resolve_anchor(doc, profile),
                });
            }
            debug!(
                target: "dockwright::locator",
                profile = %profile.id,
                "profile selectors did not resolve, trying heuristic"
            );
        }

        match self.scorer.find_best(doc) {
            Some(element) => {
                info!(target: "dockwright::locator", "input located by heuristic");
                Ok(LocateResult {
                    element,
                    anchor_source: AnchorSource::Heuristic,
                    anchor: None,
                })
            }
            None => Err(DockError::NotFound(format!(
                "no usable input on {}",
                doc.url()
            ))),
        }
    }
}

fn resolve_anchor(doc: &dyn Document, profile: &Profile) -> Option<ElementRef> {
    let selector = profile.anchor_selector.as_deref()?;
    match doc.query_selector_all(selector) {
        Ok(found) => found.into_iter().find(|element| element.is_connected()),
        Err(err) => {
            debug!(
                target: "dockwright::locator",
                profile = %profile.id,
                selector,
                error = %err,
                "bad anchor selector"
            );
            None
        }
    }
}
