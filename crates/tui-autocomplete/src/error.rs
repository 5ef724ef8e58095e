//! Autocomplete error types.

use thiserror::Error;

/// Errors that can occur while fetching or configuring autocomplete.
///
/// An empty result set is not an error; it simply ends the active session.
#[derive(Debug, Error)]
pub enum AutocompleteError {
    /// Request could not be sent or the body could not be read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Candidate source responded with HTTP {status}")]
    Http { status: u16 },

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fetch target is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML error.
    #[error("TOML error: {0}")]
    Toml(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for AutocompleteError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e.to_string())
    }
}

/// Result type for autocomplete operations.
pub type AutocompleteResult<T> = Result<T, AutocompleteError>;
