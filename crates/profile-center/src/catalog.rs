//! The loaded profile set.
//!
//! Loaded once at startup and again on explicit [`ProfileCatalog::reload`];
//! readers take an immutable snapshot so a detection pass never sees a list
//! change underneath it.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::defaults::default_profiles;
use crate::errors::ProfileError;
use crate::matcher::{match_profile_with_tier, MatchTier};
use crate::model::Profile;
use crate::store::{ProfileStore, PROFILES_STORAGE_KEY};

/// Where the current snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    Store,
    /// Store held nothing.
    Defaults,
    /// Store content could not be read or parsed.
    DefaultsAfterError,
}

pub struct ProfileCatalog {
    store: Arc<dyn ProfileStore>,
    current: ArcSwap<Vec<Profile>>,
    source: ArcSwap<CatalogSource>,
    tx: watch::Sender<Arc<Vec<Profile>>>,
}

impl ProfileCatalog {
    pub fn load(store: Arc<dyn ProfileStore>) -> Self {
        let (profiles, source) = read_store(store.as_ref());
        let profiles = Arc::new(profiles);
        let (tx, _rx) = watch::channel(Arc::clone(&profiles));
        Self {
            store,
            current: ArcSwap::new(profiles),
            source: ArcSwap::from_pointee(source),
            tx,
        }
    }

    pub fn reload(&self) -> CatalogSource {
        let (profiles, source) = read_store(self.store.as_ref());
        let profiles = Arc::new(profiles);
        info!(
            target: "dockwright::profiles",
            count = profiles.len(),
            ?source,
            "profiles reloaded"
        );
        self.current.store(Arc::clone(&profiles));
        self.source.store(Arc::new(source));
        self.tx.send_replace(profiles);
        source
    }

    /// Persist `profiles` to the store and make them current.
    pub fn save(&self, profiles: &[Profile]) -> Result<(), ProfileError> {
        for profile in profiles {
            profile.validate()?;
        }
        let raw = serde_json::to_string_pretty(profiles)?;
        self.store.set(PROFILES_STORAGE_KEY, &raw)?;
        self.reload();
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<Vec<Profile>> {
        self.current.load_full()
    }

    pub fn source(&self) -> CatalogSource {
        **self.source.load()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Profile>>> {
        self.tx.subscribe()
    }

    /// Resolve the profile for `url` against the current snapshot.
    pub fn resolve(&self, url: &str) -> Option<(MatchTier, Profile)> {
        let snapshot = self.snapshot();
        match_profile_with_tier(url, &snapshot).map(|(tier, profile)| (tier, profile.clone()))
    }
}

/// Parse a serialized profile list (JSON or YAML).
pub fn parse_profiles(raw: &str) -> Result<Vec<Profile>, ProfileError> {
    let trimmed = raw.trim_start();
    let profiles: Vec<Profile> = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        serde_json::from_str(raw)?
    } else {
        serde_yaml::from_str(raw)?
    };
    Ok(profiles)
}

/// Read a profile list from a file on disk.
pub fn load_profiles_file(path: &Path) -> Result<Vec<Profile>, ProfileError> {
    let raw = std::fs::read_to_string(path)?;
    let profiles = parse_profiles(&raw)?;
    for profile in &profiles {
        profile.validate()?;
    }
    Ok(profiles)
}

fn read_store(store: &dyn ProfileStore) -> (Vec<Profile>, CatalogSource) {
    let raw = match store.get(PROFILES_STORAGE_KEY) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => {
            debug!(target: "dockwright::profiles", "store empty, using built-in profiles");
            return (default_profiles(), CatalogSource::Defaults);
        }
        Err(err) => {
            warn!(target: "dockwright::profiles", error = %err, "profile store unreadable");
            return (default_profiles(), CatalogSource::DefaultsAfterError);
        }
    };

    match parse_profiles(&raw) {
        Ok(profiles) if profiles.is_empty() => (default_profiles(), CatalogSource::Defaults),
        Ok(profiles) => {
            let valid: Vec<Profile> = profiles
                .into_iter()
                .filter(|profile| match profile.validate() {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(target: "dockwright::profiles", error = %err, "dropping invalid profile");
                        false
                    }
                })
                .collect();
            (valid, CatalogSource::Store)
        }
        Err(err) => {
            warn!(target: "dockwright::profiles", error = %err, "stored profiles unparseable");
            (default_profiles(), CatalogSource::DefaultsAfterError)
        }
    }
}
