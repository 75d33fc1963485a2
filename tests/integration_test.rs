//! Integration tests for graphfed
//!
//! These tests drive whole sessions from the registry through to the composite view.

use graphfed::config::FederationConfig;
use graphfed::events::{FederationEvent, LoadKind};
use graphfed::fetch::MemoryFetcher;
use graphfed::graph::{Assertion, SourceLocation, Term};
use graphfed::loader::SourceState;
use graphfed::session::{FederationSession, FederationSessionBuilder};
use graphfed::{GraphFedError, LoadError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const DC_TITLE: &str = "http://purl.org/dc/elements/1.1/title";

/// Registry document listing `entries`, each with an optional poll interval
fn registry_xml(entries: &[(&str, Option<&str>)]) -> String {
    let mut items = String::new();
    let mut descriptions = String::new();
    for (location, interval) in entries {
        items.push_str(&format!("    <RDF:li RDF:resource=\"{}\"/>\n", location));
        if let Some(interval) = interval {
            descriptions.push_str(&format!(
                "  <RDF:Description RDF:about=\"{}\" NC:poll-interval=\"{}\"/>\n",
                location, interval
            ));
        }
    }
    format!(
        r#"<?xml version="1.0"?>
<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:NC="http://home.netscape.com/NC-rdf#">
  <RDF:Seq RDF:about="NC:FlashDataSources">
{}  </RDF:Seq>
{}</RDF:RDF>"#,
        items, descriptions
    )
}

fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn title(subject: &str, value: &str) -> Assertion {
    Assertion::new(subject, DC_TITLE, Term::literal(value))
}

mod file_tests {
    use super::*;

    #[tokio::test]
    async fn test_federation_from_files() {
        let temp_dir = TempDir::new().unwrap();

        let books = temp_dir.path().join("books.rdf");
        std::fs::write(
            &books,
            r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <rdf:Description rdf:about="urn:book:1">
    <dc:title>Dune</dc:title>
  </rdf:Description>
</rdf:RDF>"#,
        )
        .unwrap();

        let films = temp_dir.path().join("films.nt");
        std::fs::write(
            &films,
            format!("<urn:film:1> <{}> \"Alien\" .\n", DC_TITLE),
        )
        .unwrap();

        let missing = temp_dir.path().join("missing.rdf");

        let (books_url, missing_url, films_url) =
            (file_url(&books), file_url(&missing), file_url(&films));
        let registry = temp_dir.path().join("registry.rdf");
        std::fs::write(
            &registry,
            registry_xml(&[
                (books_url.as_str(), None),
                (missing_url.as_str(), None),
                (films_url.as_str(), None),
            ]),
        )
        .unwrap();

        let session = FederationSessionBuilder::new(file_url(&registry))
            .build()
            .unwrap();
        let descriptors = session.start().await.unwrap();
        assert_eq!(descriptors.len(), 3);
        session.wait_for_initial_loads().await;

        let graph = session.composite().current_graph();
        assert!(graph.assertions.contains(&title("urn:book:1", "Dune")));
        assert!(graph.assertions.contains(&title("urn:film:1", "Alien")));
        assert_eq!(graph.sources.len(), 2);

        let status = session
            .loader()
            .status(&SourceLocation::new(missing_url.as_str()))
            .unwrap();
        assert_eq!(status.state, SourceState::Failed);
        assert!(matches!(status.last_error, Some(LoadError::Io(_))));

        let stats = session.stats();
        assert_eq!(stats.active, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.scheduled, 0);
    }

    #[tokio::test]
    async fn test_config_file_drives_session() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("only.nt");
        std::fs::write(&source, "<urn:s> <urn:p> <urn:o> .\n").unwrap();

        let registry = temp_dir.path().join("registry.rdf");
        let source_url = file_url(&source);
        std::fs::write(&registry, registry_xml(&[(source_url.as_str(), None)])).unwrap();

        let config_path = temp_dir.path().join("config.yaml");
        FederationConfig::new(registry.to_string_lossy().to_string())
            .save(&config_path)
            .unwrap();

        let config = FederationConfig::load(&config_path).unwrap();
        let session = FederationSession::from_config(config).unwrap();
        session.start().await.unwrap();
        session.wait_for_initial_loads().await;

        assert!(session.composite().contains(&Assertion::new(
            "urn:s",
            "urn:p",
            Term::resource("urn:o")
        )));
    }

    #[tokio::test]
    async fn test_missing_registry_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let registry = temp_dir.path().join("nowhere.rdf");

        let session = FederationSessionBuilder::new(file_url(&registry))
            .build()
            .unwrap();
        let err = session.start().await.unwrap_err();

        assert!(matches!(err, GraphFedError::RegistryUnavailable { .. }));
        assert!(session.composite().is_empty());
        assert!(session.descriptors().is_empty());
    }
}

mod memory_tests {
    use super::*;

    const REGISTRY: &str = "http://example.com/registry.rdf";
    const NEWS: &str = "http://example.com/news.nt";
    const STOCKS: &str = "http://example.com/stocks.nt";

    fn session(fetcher: &Arc<MemoryFetcher>) -> FederationSession {
        FederationSessionBuilder::new(REGISTRY)
            .fetcher(fetcher.clone())
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_polled_source_is_refreshed() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(NEWS, Some("10")), (STOCKS, None)]));
        fetcher.insert_ntriples(NEWS, format!("<urn:news> <{}> \"morning\" .\n", DC_TITLE));
        fetcher.insert_ntriples(STOCKS, format!("<urn:stocks> <{}> \"open\" .\n", DC_TITLE));

        let session = session(&fetcher);
        let mut rx = session.subscribe();
        session.start().await.unwrap();
        session.wait_for_initial_loads().await;
        assert!(session.composite().contains(&title("urn:news", "morning")));

        fetcher.insert_ntriples(NEWS, format!("<urn:news> <{}> \"evening\" .\n", DC_TITLE));

        // The paused clock jumps to the next timer while we wait
        loop {
            match rx.recv().await.unwrap() {
                FederationEvent::SourceLoaded {
                    location,
                    kind: LoadKind::Reload,
                    ..
                } => {
                    assert_eq!(location, SourceLocation::new(NEWS));
                    break;
                }
                FederationEvent::SourceFailed { location, .. } => {
                    panic!("unexpected failure for {}", location)
                }
                _ => {}
            }
        }

        let composite = session.composite();
        assert!(composite.contains(&title("urn:news", "evening")));
        assert!(!composite.contains(&title("urn:news", "morning")));
        assert!(composite.contains(&title("urn:stocks", "open")));

        // Only the polled source is ever fetched again
        assert_eq!(fetcher.fetch_count(&STOCKS.into()), 1);
        assert!(fetcher.fetch_count(&NEWS.into()) >= 2);

        session.shutdown();
    }

    #[tokio::test]
    async fn test_duplicate_registry_entries_merge_once() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(NEWS, None), (NEWS, None)]));
        fetcher.insert_ntriples(NEWS, format!("<urn:news> <{}> \"morning\" .\n", DC_TITLE));

        let session = session(&fetcher);
        let descriptors = session.start().await.unwrap();
        assert_eq!(descriptors.len(), 2);
        session.wait_for_initial_loads().await;

        let graph = session.composite().current_graph();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.sources, vec![SourceLocation::new(NEWS)]);
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_isolated() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let ftp = "ftp://example.com/data.rdf";
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(ftp, None), (NEWS, None)]));
        fetcher.fail(ftp, LoadError::UnsupportedScheme("ftp".into()));
        fetcher.insert_ntriples(NEWS, format!("<urn:news> <{}> \"morning\" .\n", DC_TITLE));

        let session = session(&fetcher);
        let mut rx = session.subscribe();
        session.start().await.unwrap();
        session.wait_for_initial_loads().await;

        let mut failed = Vec::new();
        let mut loaded = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                FederationEvent::SourceFailed { location, error, .. } => {
                    assert_eq!(error, LoadError::UnsupportedScheme("ftp".into()));
                    failed.push(location);
                }
                FederationEvent::SourceLoaded { location, .. } => loaded.push(location),
                _ => {}
            }
        }
        assert_eq!(failed, vec![SourceLocation::new(ftp)]);
        assert_eq!(loaded, vec![SourceLocation::new(NEWS)]);
        assert!(session.composite().contains(&title("urn:news", "morning")));
    }

    #[tokio::test]
    async fn test_empty_registry_loads_nothing() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[]));

        let session = session(&fetcher);
        assert!(session.start().await.unwrap().is_empty());
        session.wait_for_initial_loads().await;

        assert!(session.composite().is_empty());
        assert_eq!(session.stats().declared, 0);
    }

    #[tokio::test]
    async fn test_registry_without_container_is_unavailable() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(
            REGISTRY,
            r#"<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <RDF:Seq RDF:about="urn:something-else"/>
</RDF:RDF>"#,
        );

        let err = session(&fetcher).start().await.unwrap_err();
        assert!(matches!(err, GraphFedError::RegistryUnavailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_refresh() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert_rdf_xml(REGISTRY, registry_xml(&[(NEWS, Some("1"))]));
        fetcher.insert_ntriples(NEWS, format!("<urn:news> <{}> \"morning\" .\n", DC_TITLE));

        let session = session(&fetcher);
        session.start().await.unwrap();
        session.wait_for_initial_loads().await;
        assert_eq!(session.stats().scheduled, 1);

        session.shutdown();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(fetcher.fetch_count(&NEWS.into()), 1);
        assert!(session.composite().contains(&title("urn:news", "morning")));
    }
}
