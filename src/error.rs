use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("location required")]
    LocationRequired,

    #[error("venue not found: {0}")]
    NotFound(String),

    #[error("please log in to perform this action")]
    Unauthenticated,

    #[error("search provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl AppError {
    /// Maps a failed detail lookup made while materializing a venue.
    pub fn from_lookup(venue_id: &str, err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(_) => AppError::NotFound(venue_id.to_string()),
            other => AppError::ProviderUnavailable(other),
        }
    }
}
