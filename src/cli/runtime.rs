use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use dockwright::dom_port::MemoryDocument;
use dockwright::profile_center::{
    FileProfileStore, MemoryProfileStore, ProfileCatalog, ProfileStore, PROFILES_STORAGE_KEY,
};
use dockwright::{load_profiles, DockwrightConfig};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub fn load_config(path: Option<&Path>) -> Result<DockwrightConfig> {
    let config = DockwrightConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Profile catalog for this invocation.
///
/// A `profiles_file` is served read-only from memory; otherwise the file
/// store at `store_dir`, the configured directory, or the platform config
/// directory, in that order.
pub fn open_catalog(
    config: &DockwrightConfig,
    store_dir: Option<&Path>,
    profiles_file: Option<&Path>,
) -> Result<ProfileCatalog> {
    let store: Arc<dyn ProfileStore> = if let Some(file) = profiles_file {
        let profiles = load_profiles(file)
            .with_context(|| format!("Failed to read profiles from {}", file.display()))?;
        let raw = serde_json::to_string(&profiles)?;
        Arc::new(MemoryProfileStore::with_entry(PROFILES_STORAGE_KEY, raw))
    } else if let Some(dir) = store_dir.or(config.profiles.store_dir.as_deref()) {
        Arc::new(FileProfileStore::new(dir))
    } else {
        match FileProfileStore::default_location() {
            Some(store) => Arc::new(store),
            None => Arc::new(MemoryProfileStore::new()),
        }
    };

    let catalog = ProfileCatalog::load(store);
    info!(
        count = catalog.snapshot().len(),
        source = ?catalog.source(),
        "profile catalog ready"
    );
    Ok(catalog)
}

pub fn load_page(path: &Path) -> Result<MemoryDocument> {
    dockwright::load_page(path).with_context(|| format!("Failed to load page fixture {}", path.display()))
}
