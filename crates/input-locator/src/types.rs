//! Core types for input detection

use std::fmt;

use dom_port::ElementRef;
use serde::{Deserialize, Serialize};

/// Keywords that mark an element as a message composer.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "message", "chat", "prompt", "ask", "reply", "comment", "compose", "write", "type",
];

/// Tunables for the heuristic scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    pub size_weight: f64,
    pub position_weight: f64,
    pub semantic_weight: f64,
    /// Candidates smaller than this in either dimension are ignored.
    pub min_width: f64,
    pub min_height: f64,
    /// Area that earns a full size score.
    pub reference_width: f64,
    pub reference_height: f64,
    /// Reward elements near the bottom of the viewport.
    pub prefer_bottom: bool,
    pub keywords: Vec<String>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            size_weight: 1.0,
            position_weight: 0.5,
            semantic_weight: 0.3,
            min_width: 300.0,
            min_height: 60.0,
            reference_width: 600.0,
            reference_height: 200.0,
            prefer_bottom: true,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// A scored element. Lives only for the pass that produced it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub element: ElementRef,
    pub size_score: f64,
    pub position_score: f64,
    pub semantic_score: f64,
    pub total: f64,
}

/// How an input was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "profile", rename_all = "lowercase")]
pub enum AnchorSource {
    /// Selector list of the named profile.
    Profile(String),
    Heuristic,
}

impl AnchorSource {
    pub fn name(&self) -> &'static str {
        match self {
            AnchorSource::Profile(_) => "profile",
            AnchorSource::Heuristic => "heuristic",
        }
    }

    pub fn profile_id(&self) -> Option<&str> {
        match self {
            AnchorSource::Profile(id) => Some(id),
            AnchorSource::Heuristic => None,
        }
    }
}

impl fmt::Display for AnchorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorSource::Profile(id) => write!(f, "profile:{id}"),
            AnchorSource::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// Output of [`crate::InputLocator::locate`].
#[derive(Debug, Clone)]
pub struct LocateResult {
    pub element: ElementRef,
    pub anchor_source: AnchorSource,
    /// Container matched by the profile's `anchorSelector`, if any.
    pub anchor: Option<ElementRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_source_display() {
        assert_eq!(AnchorSource::Profile("claude".into()).to_string(), "profile:claude");
        assert_eq!(AnchorSource::Heuristic.to_string(), "heuristic");
        assert_eq!(AnchorSource::Heuristic.profile_id(), None);
    }

    #[test]
    fn config_fills_missing_fields() {
        let config: HeuristicConfig =
            serde_json::from_str(r#"{"prefer_bottom": false, "min_width": 200}"#).unwrap();
        assert!(!config.prefer_bottom);
        assert_eq!(config.min_width, 200.0);
        assert_eq!(config.size_weight, 1.0);
        assert!(!config.keywords.is_empty());
    }
}
