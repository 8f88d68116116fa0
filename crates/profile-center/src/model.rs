use dockwright_core_types::{AnchorEdge, Offset, PlacementMode};
use serde::{Deserialize, Serialize};

use crate::errors::ProfileError;

pub const DEFAULT_CONTROL_SIZE: f64 = 32.0;

fn default_enabled() -> bool {
    true
}

fn default_size() -> f64 {
    DEFAULT_CONTROL_SIZE
}

/// Per-site instructions for finding the input and placing the control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    /// Literal page URL; a match here beats any domain/path match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `example.com` (host or any subdomain) or `*.example.com`.
    pub domain_pattern: String,
    /// Path glob: `*` one segment, `**` any depth, `?` one character.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_pattern: Option<String>,
    /// Tried in order; the first usable match wins.
    #[serde(default, alias = "selectors")]
    pub selector_list: Vec<String>,
    /// Container to append the control to, bypassing the platform strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_selector: Option<String>,
    /// Docking strategy id; unknown or absent means `generic`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default)]
    pub placement_mode: PlacementMode,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default = "default_size")]
    pub size: f64,
    #[serde(default)]
    pub anchor_edge: AnchorEdge,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Profile {
    pub fn new(id: impl Into<String>, domain_pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            domain_pattern: domain_pattern.into(),
            path_pattern: None,
            selector_list: Vec::new(),
            anchor_selector: None,
            platform: None,
            placement_mode: PlacementMode::Docked,
            offset_x: 0.0,
            offset_y: 0.0,
            size: DEFAULT_CONTROL_SIZE,
            anchor_edge: AnchorEdge::Right,
            enabled: true,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_path(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    pub fn with_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selector_list = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn floating(mut self, edge: AnchorEdge, offset_x: f64, offset_y: f64) -> Self {
        self.placement_mode = PlacementMode::Floating;
        self.anchor_edge = edge;
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |reason: &str| ProfileError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.domain_pattern.trim().is_empty() && self.url.is_none() {
            return Err(invalid("needs a domain pattern or a url"));
        }
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(invalid("size must be positive"));
        }
        Ok(())
    }

    pub fn placement(&self) -> PlacementConfig {
        PlacementConfig {
            mode: self.placement_mode,
            platform: self.platform.clone(),
            offset: Offset::new(self.offset_x, self.offset_y),
            size: self.size,
            anchor_edge: self.anchor_edge,
            float_when_undocked: true,
            anchor_selector: self.anchor_selector.clone(),
        }
    }
}

/// How a located input gets its control.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementConfig {
    pub mode: PlacementMode,
    pub platform: Option<String>,
    pub offset: Offset,
    pub size: f64,
    pub anchor_edge: AnchorEdge,
    /// When docking finds no insertion point, float next to the input instead.
    pub float_when_undocked: bool,
    /// Explicit docking container, overriding the platform strategy.
    pub anchor_selector: Option<String>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            mode: PlacementMode::Docked,
            platform: None,
            offset: Offset::new(8.0, 0.0),
            size: DEFAULT_CONTROL_SIZE,
            anchor_edge: AnchorEdge::Right,
            float_when_undocked: true,
            anchor_selector: None,
        }
    }
}
