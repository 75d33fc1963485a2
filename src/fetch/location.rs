//! Fetcher for network and filesystem locations

use super::{FetchedDocument, SourceFetcher};
use crate::config::FetchConfig;
use crate::error::LoadError;
use crate::graph::SourceLocation;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Fetches `http(s)://` URLs with reqwest and `file://` URLs or plain paths from disk
#[derive(Debug, Clone)]
pub struct LocationFetcher {
    client: reqwest::Client,
}

impl LocationFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| crate::GraphFedError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch_http(&self, location: &SourceLocation) -> std::result::Result<FetchedDocument, LoadError> {
        let response = self.client.get(location.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Http {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        Ok(FetchedDocument { body, content_type })
    }

    async fn fetch_file(path: PathBuf) -> std::result::Result<FetchedDocument, LoadError> {
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;
        Ok(FetchedDocument::new(body))
    }
}

/// Filesystem path named by a `file://` URL
fn file_url_path(location: &str) -> std::result::Result<PathBuf, LoadError> {
    let rest = location
        .strip_prefix("file://")
        .ok_or_else(|| LoadError::UnsupportedScheme(location.to_string()))?;
    // Drop an optional authority ("localhost")
    let path = match rest.find('/') {
        Some(0) => rest,
        Some(i) if &rest[..i] == "localhost" => &rest[i..],
        _ => {
            return Err(LoadError::UnsupportedScheme(format!(
                "remote file URL {}",
                location
            )))
        }
    };
    let decoded = urlencoding::decode(path)
        .map_err(|e| LoadError::Malformed(format!("invalid file URL {}: {}", location, e)))?;
    Ok(PathBuf::from(decoded.into_owned()))
}

#[async_trait]
impl SourceFetcher for LocationFetcher {
    async fn fetch(&self, location: &SourceLocation) -> std::result::Result<FetchedDocument, LoadError> {
        tracing::debug!(location = %location, "Fetching source");

        match location.scheme().map(str::to_ascii_lowercase).as_deref() {
            Some("http") | Some("https") => self.fetch_http(location).await,
            Some("file") => Self::fetch_file(file_url_path(location.as_str())?).await,
            None => Self::fetch_file(PathBuf::from(location.as_str())).await,
            Some(other) => Err(LoadError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fetcher() -> LocationFetcher {
        LocationFetcher::new(&FetchConfig::default()).unwrap()
    }

    #[test]
    fn test_file_url_path() {
        assert_eq!(
            file_url_path("file:///tmp/my%20sources/reg.rdf").unwrap(),
            PathBuf::from("/tmp/my sources/reg.rdf")
        );
        assert_eq!(
            file_url_path("file://localhost/tmp/reg.rdf").unwrap(),
            PathBuf::from("/tmp/reg.rdf")
        );
        assert!(file_url_path("file://server/share/reg.rdf").is_err());
    }

    #[tokio::test]
    async fn test_fetch_plain_path_and_file_url() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("local.nt");
        std::fs::write(&path, "<urn:s> <urn:p> \"o\" .\n").unwrap();

        let doc = fetcher()
            .fetch(&SourceLocation::new(path.to_string_lossy().to_string()))
            .await
            .unwrap();
        assert!(doc.body.contains("urn:s"));
        assert_eq!(doc.content_type, None);

        let url = format!("file://{}", path.display());
        let doc = fetcher().fetch(&SourceLocation::new(url)).await.unwrap();
        assert!(doc.body.contains("urn:p"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = fetcher()
            .fetch(&SourceLocation::new("/definitely/not/here.rdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let err = fetcher()
            .fetch(&SourceLocation::new("chrome://sidebar/content/flash-registry.rdf"))
            .await
            .unwrap_err();
        assert_eq!(err, LoadError::UnsupportedScheme("chrome".to_string()));
    }
}
