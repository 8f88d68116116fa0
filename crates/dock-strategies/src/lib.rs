//! Docking strategies
//!
//! A strategy turns a located input into an insertion point, styles the
//! control for that spot, and later re-validates the spot for the
//! self-healing loop. Strategies are selected by platform id:
//! 1. Toolbar strategies for known platforms (multi-step, each step fallible)
//! 2. Selector strategy for profiles that name an explicit anchor container
//! 3. Generic strategy as the universal fallback

pub mod generic;
pub mod registry;
pub mod selector;
pub mod strategy;
pub mod toolbar;

pub use generic::GenericStrategy;
pub use registry::StrategyRegistry;
pub use selector::SelectorStrategy;
pub use strategy::{AnchorResult, DockStrategy};
pub use toolbar::{ToolbarRecipe, ToolbarStrategy, BUILTIN_RECIPES};
