//! Errors at the host/CLI edge.
//!
//! The detection and attachment layers never return these; they only appear
//! while loading configuration, profiles and page fixtures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockwrightError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Profile(#[from] profile_center::ProfileError),

    #[error("invalid page fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DockwrightResult<T> = Result<T, DockwrightError>;
