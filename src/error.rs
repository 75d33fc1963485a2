//! Error types for graphfed
//!
//! Two layers: [`LoadError`] describes why a single source could not be loaded
//! and is always recovered by the loader, while [`GraphFedError`] covers the
//! failures that can reach the caller (registry bootstrap, configuration, I/O).

use thiserror::Error;

/// Result type alias for graphfed operations
pub type Result<T> = std::result::Result<T, GraphFedError>;

/// Failure to load one data source
///
/// Cloneable so it can be carried inside broadcast events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Location scheme that no fetcher understands
    #[error("Unsupported location scheme: {0}")]
    UnsupportedScheme(String),

    /// Transport-level failure (connect, timeout, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// Remote answered with a non-success status
    #[error("HTTP status {status} for {location}")]
    Http { location: String, status: u16 },

    /// Local file could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// Content could not be parsed as graph data
    #[error("Malformed content: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => LoadError::Http {
                location: e.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => LoadError::Network(e.to_string()),
        }
    }
}

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum GraphFedError {
    /// Bootstrap registry could not be loaded or lacks the source container
    #[error("Registry unavailable at {location}: {reason}")]
    RegistryUnavailable { location: String, reason: String },

    /// A single source failed to load
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// A scheduled reload failed; the task stays armed
    #[error("Scheduled reload of {location} failed: {source}")]
    ScheduleFire {
        location: String,
        #[source]
        source: LoadError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl GraphFedError {
    /// Build a `RegistryUnavailable` from any displayable cause
    pub fn registry_unavailable(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        GraphFedError::RegistryUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must abort startup
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GraphFedError::Load(_) | GraphFedError::ScheduleFire { .. }
        )
    }
}
