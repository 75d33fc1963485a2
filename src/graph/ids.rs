//! Type-safe identifier for data sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location of a data source
///
/// A URI-like string (`http://…`, `file://…`, `NC:FlashDataSources`) or a bare
/// filesystem path. Two descriptors with the same location name the same source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceLocation(String);

impl SourceLocation {
    /// Create a new SourceLocation from a string
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the URI scheme, if any
    ///
    /// Single-letter schemes are treated as Windows drive letters, not schemes.
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.0.split_once(':')?;
        let valid = scheme.len() > 1
            && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then_some(scheme)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SourceLocation {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SourceLocation {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for SourceLocation {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
