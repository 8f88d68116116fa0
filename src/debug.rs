//! Point-in-time view of a watcher for diagnostics.

use std::fmt;

use chrono::{DateTime, Utc};
use dockwright_core_types::{InstanceId, PlacementMode, WatcherState};
use input_locator::AnchorSource;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    pub instance_id: InstanceId,
    pub url: String,
    pub state: WatcherState,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_source: Option<AnchorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementMode>,
    pub control_attached: bool,
    pub tracking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub last_transition: DateTime<Utc>,
}

impl fmt::Display for DebugSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "instance:   {}", self.instance_id.0)?;
        writeln!(f, "url:        {}", self.url)?;
        writeln!(f, "state:      {} (attempts {}/{})", self.state, self.attempts, self.max_attempts)?;
        if let Some(source) = &self.anchor_source {
            writeln!(f, "source:     {source}")?;
        }
        if let Some(strategy) = &self.strategy {
            let mode = self.placement.map(|mode| mode.name()).unwrap_or("-");
            writeln!(f, "strategy:   {strategy} ({mode})")?;
        }
        writeln!(
            f,
            "control:    {}{}",
            if self.control_attached { "attached" } else { "detached" },
            if self.tracking { ", tracking" } else { "" }
        )?;
        if let Some(error) = &self.last_error {
            writeln!(f, "last error: {error}")?;
        }
        write!(f, "changed at: {}", self.last_transition.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_and_skips_empty_fields() {
        let snapshot = DebugSnapshot {
            instance_id: InstanceId("abc".into()),
            url: "https://example.com/".into(),
            state: WatcherState::Mounted,
            attempts: 0,
            max_attempts: 5,
            profile_id: Some("example".into()),
            anchor_source: Some(AnchorSource::Profile("example".into())),
            strategy: Some("generic".into()),
            placement: Some(PlacementMode::Docked),
            control_attached: true,
            tracking: false,
            last_error: None,
            last_transition: Utc::now(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["state"], "mounted");
        assert_eq!(value["maxAttempts"], 5);
        assert_eq!(value["placement"], "docked");
        assert_eq!(value["anchorSource"]["kind"], "profile");
        assert!(value.get("lastError").is_none());

        let text = snapshot.to_string();
        assert!(text.contains("mounted (attempts 0/5)"));
        assert!(text.contains("source:     profile:example"));
    }
}
