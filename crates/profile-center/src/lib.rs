//! Declarative per-site placement profiles.
//!
//! Profiles are persisted by an external key-value store under
//! [`PROFILES_STORAGE_KEY`]; the catalog falls back to a built-in set when the
//! store is empty or unreadable. Matching a URL against a profile list is
//! pure and deterministic.

pub mod catalog;
pub mod defaults;
pub mod errors;
pub mod glob;
pub mod matcher;
pub mod model;
pub mod store;

pub use catalog::{load_profiles_file, parse_profiles, CatalogSource, ProfileCatalog};
pub use defaults::default_profiles;
pub use errors::ProfileError;
pub use matcher::{domain_matches, match_profile, match_profile_with_tier, MatchTier, ProfileMatcher};
pub use model::{PlacementConfig, Profile};
pub use store::{FileProfileStore, MemoryProfileStore, ProfileStore, PROFILES_STORAGE_KEY};
