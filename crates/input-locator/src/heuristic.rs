//! Weighted scoring over input-like elements
//!
//! Used when no profile applies, or when a profile's selectors no longer
//! resolve. Candidates are rebuilt on every pass; layout may have changed
//! since the last one.

use dockwright_core_types::Viewport;
use dom_port::{Document, DomElement, ElementRef};
use tracing::{debug, trace};

use crate::resolver::is_usable;
use crate::types::{Candidate, HeuristicConfig};

const POOL_SELECTOR: &str = "textarea, input, [contenteditable]";
const TEXT_INPUT_TYPES: &[&str] = &["text", "search", "email", "url"];

#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    config: HeuristicConfig,
}

impl HeuristicScorer {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Highest-scoring candidate; ties keep the earliest in document order.
    pub fn find_best(&self, doc: &dyn Document) -> Option<ElementRef> {
        let best = self
            .rank(doc)
            .into_iter()
            .fold(None::<Candidate>, |best, candidate| match best {
                Some(current) if candidate.total <= current.total => Some(current),
                _ => Some(candidate),
            })?;
        debug!(
            target: "dockwright::locator",
            tag = %best.element.tag_name(),
            total = best.total,
            "heuristic candidate selected"
        );
        Some(best.element)
    }

    /// Every eligible candidate with its score, in document order.
    pub fn rank(&self, doc: &dyn Document) -> Vec<Candidate> {
        let viewport = doc.viewport();
        self.pool(doc)
            .into_iter()
            .map(|element| self.score_in(&element, viewport))
            .collect()
    }

    /// Score breakdown for one element, eligible or not.
    pub fn score(&self, doc: &dyn Document, element: &ElementRef) -> Candidate {
        self.score_in(element, doc.viewport())
    }

    fn pool(&self, doc: &dyn Document) -> Vec<ElementRef> {
        let found = match doc.query_selector_all(POOL_SELECTOR) {
            Ok(found) => found,
            Err(err) => {
                debug!(target: "dockwright::locator", error = %err, "candidate query failed");
                return Vec::new();
            }
        };
        found
            .into_iter()
            .filter(|element| is_input_like(element.as_ref()))
            .filter(|element| is_usable(element.as_ref()))
            .filter(|element| {
                let rect = element.bounding_box();
                rect.width >= self.config.min_width && rect.height >= self.config.min_height
            })
            .collect()
    }

    fn score_in(&self, element: &ElementRef, viewport: Viewport) -> Candidate {
        let rect = element.bounding_box();

        let reference_area = self.config.reference_width * self.config.reference_height;
        let size_score = if reference_area > 0.0 {
            (rect.area() / reference_area).min(1.0)
        } else {
            0.0
        };

        let position_score = if !self.config.prefer_bottom {
            0.5
        } else if viewport.height > 0.0 {
            (rect.center_y() / viewport.height).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let semantic_score = self.semantic_score(element.as_ref());

        let total = self.config.size_weight * size_score
            + self.config.position_weight * position_score
            + self.config.semantic_weight * semantic_score;

        trace!(
            target: "dockwright::locator",
            tag = %element.tag_name(),
            size_score,
            position_score,
            semantic_score,
            total,
            "scored candidate"
        );

        Candidate {
            element: element.clone(),
            size_score,
            position_score,
            semantic_score,
            total,
        }
    }

    /// Mean over the signals the element actually carries.
    fn semantic_score(&self, element: &dyn DomElement) -> f64 {
        let mut signals: Vec<f64> = Vec::with_capacity(4);

        let placeholder = element
            .attribute("placeholder")
            .or_else(|| element.attribute("aria-placeholder"))
            .or_else(|| element.attribute("data-placeholder"));
        if let Some(text) = placeholder.filter(|text| !text.trim().is_empty()) {
            signals.push(self.keyword_hit(&text));
        }

        if let Some(label) = element.attribute("aria-label").filter(|l| !l.trim().is_empty()) {
            signals.push(self.keyword_hit(&label));
        }

        let identity = [element.attribute("id"), element.attribute("class")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !identity.trim().is_empty() {
            signals.push(self.keyword_hit(&identity));
        }

        if matches!(element.closest("form"), Ok(Some(_))) {
            signals.push(1.0);
        }

        if signals.is_empty() {
            0.0
        } else {
            signals.iter().sum::<f64>() / signals.len() as f64
        }
    }

    fn keyword_hit(&self, text: &str) -> f64 {
        let text = text.to_lowercase();
        let hit = self
            .config
            .keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && text.contains(&keyword.to_lowercase()));
        if hit {
            1.0
        } else {
            0.0
        }
    }
}

fn is_input_like(element: &dyn DomElement) -> bool {
    match element.tag_name().as_str() {
        "textarea" => true,
        "input" => match element.attribute("type") {
            None => true,
            Some(kind) => {
                let kind = kind.trim().to_ascii_lowercase();
                kind.is_empty() || TEXT_INPUT_TYPES.contains(&kind.as_str())
            }
        },
        _ => element.is_content_editable(),
    }
}
