//! Dockwright
//!
//! Finds the text input of a third-party page, attaches one control next to
//! it and keeps that attachment valid while the page re-renders:
//! - profile selectors first, weighted heuristic fallback ([`input_locator`])
//! - per-platform docking strategies ([`dock_strategies`])
//! - floating placement that follows a moving input ([`position_tracker`])
//! - a lifecycle watcher that detects, mounts, observes and repairs ([`watcher`])

pub mod config;
pub mod debug;
pub mod errors;
pub mod mount;
pub mod page;
pub mod watcher;

pub use dock_strategies;
pub use dockwright_core_types as core_types;
pub use dockwright_event_bus as event_bus;
pub use dom_port;
pub use input_locator;
pub use position_tracker;
pub use profile_center;

pub use config::DockwrightConfig;
pub use debug::DebugSnapshot;
pub use dockwright_core_types::{AnchorEdge, DockError, PlacementMode, WatcherState};
pub use errors::{DockwrightError, DockwrightResult};
pub use mount::{Mounter, CONTROL_MARKER};
pub use page::{load_page, load_profiles};
pub use watcher::LifecycleWatcher;
