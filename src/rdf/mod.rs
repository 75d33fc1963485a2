//! Graph document formats
//!
//! Sources (and the bootstrap registry itself) are published as RDF/XML or
//! N-Triples. Both parsers produce plain [`Assertion`](crate::graph::Assertion)
//! lists; blank nodes are skolemized against the document location so that
//! stores from different sources never share an anonymous node.
//!
//! # Example registry
//!
//! ```xml
//! <RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
//!          xmlns:NC="http://home.netscape.com/NC-rdf#">
//!   <RDF:Seq about="NC:FlashDataSources">
//!     <RDF:li resource="http://example.com/stocks.rdf" />
//!     <RDF:li resource="file:///var/lib/graphfed/local.rdf" />
//!   </RDF:Seq>
//!
//!   <RDF:Description about="http://example.com/stocks.rdf">
//!     <NC:poll-interval>300</NC:poll-interval>
//!   </RDF:Description>
//! </RDF:RDF>
//! ```

mod ntriples;
mod xml;

pub use ntriples::parse_ntriples;
pub use xml::parse_rdf_xml;

use crate::graph::SourceLocation;

/// Serialization of a graph document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// RDF/XML (the default)
    RdfXml,

    /// Line-based N-Triples
    NTriples,
}

impl SourceFormat {
    /// Pick a format from the HTTP content type, falling back to the file extension
    pub fn detect(location: &SourceLocation, content_type: Option<&str>) -> Self {
        if let Some(content_type) = content_type {
            let mime = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            match mime.as_str() {
                "application/n-triples" | "text/plain" => return Self::NTriples,
                "application/rdf+xml" | "application/xml" | "text/xml" | "text/rdf" => {
                    return Self::RdfXml
                }
                _ => {}
            }
        }

        let path = location.as_str().split(['?', '#']).next().unwrap_or_default();
        if path.to_ascii_lowercase().ends_with(".nt") {
            Self::NTriples
        } else {
            Self::RdfXml
        }
    }
}

/// Name for the `n`th blank node of a document
pub(crate) fn skolem(base: &str, label: &str) -> String {
    let base = base.split('#').next().unwrap_or(base);
    format!("{}#genid-{}", base, label)
}
