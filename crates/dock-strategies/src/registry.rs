//! Platform id → strategy lookup.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::generic::GenericStrategy;
use crate::selector::SelectorStrategy;
use crate::strategy::DockStrategy;
use crate::toolbar::{ToolbarStrategy, BUILTIN_RECIPES};

/// Concurrent strategy table with the generic strategy as fallback.
pub struct StrategyRegistry {
    strategies: DashMap<String, Arc<dyn DockStrategy>>,
    fallback: Arc<dyn DockStrategy>,
}

impl StrategyRegistry {
    /// Only the generic fallback.
    pub fn new() -> Self {
        let fallback: Arc<dyn DockStrategy> = Arc::new(GenericStrategy::new());
        let strategies = DashMap::new();
        strategies.insert(GenericStrategy::ID.to_string(), Arc::clone(&fallback));
        Self {
            strategies,
            fallback,
        }
    }

    /// Generic plus every built-in toolbar strategy.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        for recipe in BUILTIN_RECIPES {
            registry.register(Arc::new(ToolbarStrategy::new(recipe.clone())));
        }
        registry
    }

    pub fn register(&self, strategy: Arc<dyn DockStrategy>) {
        self.strategies.insert(strategy.id().to_ascii_lowercase(), strategy);
    }

    /// Strategy for `platform`; unknown or absent ids get the generic one.
    pub fn get(&self, platform: Option<&str>) -> Arc<dyn DockStrategy> {
        let Some(platform) = platform.map(str::trim).filter(|id| !id.is_empty()) else {
            return Arc::clone(&self.fallback);
        };
        match self.strategies.get(&platform.to_ascii_lowercase()) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                debug!(target: "dockwright::docking", platform, "unknown platform, using generic");
                Arc::clone(&self.fallback)
            }
        }
    }

    /// An explicit anchor selector wins over the platform table.
    pub fn resolve(
        &self,
        platform: Option<&str>,
        anchor_selector: Option<&str>,
    ) -> Arc<dyn DockStrategy> {
        match anchor_selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(selector) => Arc::new(SelectorStrategy::new(selector)),
            None => self.get(platform),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.iter().map(|kv| kv.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_platforms_resolve() {
        let registry = StrategyRegistry::with_builtin();
        assert_eq!(registry.get(Some("gemini")).id(), "gemini");
        assert_eq!(registry.get(Some("ChatGPT")).id(), "chatgpt");
        assert_eq!(registry.ids().len(), BUILTIN_RECIPES.len() + 1);
    }

    #[test]
    fn unknown_or_missing_platform_is_generic() {
        let registry = StrategyRegistry::with_builtin();
        assert_eq!(registry.get(Some("myspace")).id(), GenericStrategy::ID);
        assert_eq!(registry.get(Some("  ")).id(), GenericStrategy::ID);
        assert_eq!(registry.get(None).id(), GenericStrategy::ID);
        assert_eq!(StrategyRegistry::new().get(Some("gemini")).id(), GenericStrategy::ID);
    }

    #[test]
    fn anchor_selector_overrides_platform() {
        let registry = StrategyRegistry::default();
        assert_eq!(
            registry.resolve(Some("gemini"), Some("div.composer")).id(),
            SelectorStrategy::ID
        );
        assert_eq!(registry.resolve(Some("gemini"), Some("")).id(), "gemini");
    }
}
