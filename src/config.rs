//! Runtime configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an explicit file or
//! the optional `<config dir>/dockwright/config.yaml` and
//! `./dockwright.{yaml,toml,json}`, then `DOCKWRIGHT__SECTION__KEY`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use dockwright_core_types::{AnchorEdge, ControlId, Offset, PlacementMode};
use input_locator::HeuristicConfig;
use profile_center::PlacementConfig;
use serde::{Deserialize, Serialize};

use crate::errors::DockwrightResult;

pub const ENV_PREFIX: &str = "DOCKWRIGHT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DockwrightConfig {
    pub watcher: WatcherConfig,
    pub tracker: TrackerConfig,
    pub heuristic: HeuristicConfig,
    pub control: ControlConfig,
    pub profiles: ProfilesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Delay between failed detection attempts.
    pub retry_delay_ms: u64,
    pub max_attempts: u32,
    /// Coalescing window for layout signals while mounted.
    pub mutation_debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 2_000,
            max_attempts: 5,
            mutation_debounce_ms: 500,
        }
    }
}

impl WatcherConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub frame_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

impl TrackerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// The injected control and its placement when no profile applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub id: String,
    pub size: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub anchor_edge: AnchorEdge,
    pub float_when_undocked: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            id: ControlId::DEFAULT.to_string(),
            size: 32.0,
            offset_x: 8.0,
            offset_y: 0.0,
            anchor_edge: AnchorEdge::Right,
            float_when_undocked: true,
        }
    }
}

impl ControlConfig {
    pub fn control_id(&self) -> ControlId {
        ControlId::new(self.id.clone())
    }

    /// Placement for inputs found without a profile.
    pub fn default_placement(&self) -> PlacementConfig {
        PlacementConfig {
            mode: PlacementMode::Docked,
            platform: None,
            offset: Offset::new(self.offset_x, self.offset_y),
            size: self.size,
            anchor_edge: self.anchor_edge,
            float_when_undocked: self.float_when_undocked,
            anchor_selector: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProfilesConfig {
    /// Directory of the file-backed profile store; platform config dir when unset.
    pub store_dir: Option<PathBuf>,
}

impl DockwrightConfig {
    /// Defaults, then `path` (or the user config file and `./dockwright.*`
    /// when absent), then the process environment.
    pub fn load(path: Option<&Path>) -> DockwrightResult<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    pub fn load_with_env(path: Option<&Path>, env: Environment) -> DockwrightResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => {
                if let Some(user) = Self::user_config_path() {
                    builder = builder.add_source(File::from(user).required(false));
                }
                builder.add_source(File::with_name("dockwright").required(false))
            }
        };
        let config = builder
            .add_source(
                env.prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// `<config dir>/dockwright/config.yaml`, if it exists.
    pub fn user_config_path() -> Option<PathBuf> {
        let path = dirs::config_dir()?.join("dockwright").join("config.yaml");
        path.exists().then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = DockwrightConfig::default();
        assert_eq!(config.watcher.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.watcher.max_attempts, 5);
        assert_eq!(config.watcher.mutation_debounce(), Duration::from_millis(500));
        assert_eq!(config.heuristic.min_width, 300.0);
        assert_eq!(config.control.control_id().as_str(), "dockwright-control");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dockwright.yaml");
        std::fs::write(
            &path,
            "watcher:\n  max_attempts: 3\nheuristic:\n  prefer_bottom: false\ncontrol:\n  anchor_edge: bottom\n",
        )
        .unwrap();

        let config =
            DockwrightConfig::load_with_env(Some(&path), Environment::with_prefix("DOCKWRIGHT_TEST_NONE"))
                .unwrap();
        assert_eq!(config.watcher.max_attempts, 3);
        assert_eq!(config.watcher.retry_delay_ms, 2_000);
        assert!(!config.heuristic.prefer_bottom);
        assert_eq!(config.heuristic.size_weight, 1.0);
        assert_eq!(config.control.anchor_edge, AnchorEdge::Bottom);
    }

    #[test]
    fn environment_overrides_file() {
        let mut vars = config::Map::new();
        vars.insert("DOCKWRIGHT__WATCHER__RETRY_DELAY_MS".to_string(), "250".to_string());
        let env = Environment::with_prefix(ENV_PREFIX).source(Some(vars));

        let config = DockwrightConfig::load_with_env(None, env).unwrap();
        assert_eq!(config.watcher.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.watcher.max_attempts, 5);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(DockwrightConfig::load(Some(&missing)).is_err());
    }
}
