use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse profiles: {0}")]
    Parse(String),
    #[error("invalid profile '{id}': {reason}")]
    Invalid { id: String, reason: String },
    #[error("profile store unavailable: {0}")]
    Store(String),
}

impl From<serde_json::Error> for ProfileError {
    fn from(value: serde_json::Error) -> Self {
        ProfileError::Parse(value.to_string())
    }
}

impl From<serde_yaml::Error> for ProfileError {
    fn from(value: serde_yaml::Error) -> Self {
        ProfileError::Parse(value.to_string())
    }
}
