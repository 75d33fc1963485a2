//! RDF/XML parser
//!
//! Covers the striped syntax used by registries and feeds: node elements,
//! property elements, `rdf:li` numbering, `rdf:resource`, nested nodes,
//! `rdf:parseType="Resource"`, and property attributes. Unprefixed `about`,
//! `resource`, `ID`, and `nodeID` attributes are accepted as RDF attributes.

use super::skolem;
use crate::error::LoadError;
use crate::graph::{ordinal_predicate, Assertion, Term, RDF_NS, RDF_TYPE};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Element currently open in the document
enum Frame {
    /// Inside `rdf:RDF`
    Root,

    /// Inside a node element; `next_li` numbers `rdf:li` children
    Node { subject: String, next_li: usize },

    /// Inside a property element
    Property {
        subject: String,
        predicate: String,
        text: String,
        has_node: bool,
    },
}

/// An attribute with its namespace resolved
struct ResolvedAttr {
    /// Namespace URI, or `None` for unprefixed attributes
    ns: Option<String>,
    local: String,
    value: String,
}

impl ResolvedAttr {
    /// `rdf:name`, or the bare `name` accepted for compatibility
    fn is_rdf(&self, name: &str) -> bool {
        self.local == name && self.ns.as_deref().is_none_or(|ns| ns == RDF_NS)
    }

    fn uri(&self) -> Option<String> {
        self.ns.as_ref().map(|ns| format!("{}{}", ns, self.local))
    }
}

struct Parser<'a> {
    base: &'a str,
    scopes: Vec<HashMap<String, String>>,
    frames: Vec<Frame>,
    assertions: Vec<Assertion>,
    blank_count: usize,
    saw_root: bool,
}

/// Parse an RDF/XML document
///
/// `base` is the document location; relative URIs and blank nodes are resolved
/// against it.
pub fn parse_rdf_xml(base: &str, xml: &str) -> Result<Vec<Assertion>, LoadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut parser = Parser {
        base,
        scopes: Vec::new(),
        frames: Vec::new(),
        assertions: Vec::new(),
        blank_count: 0,
        saw_root: false,
    };

    loop {
        let event = reader.read_event().map_err(|e| {
            LoadError::Malformed(format!(
                "XML error at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => {
                parser.push_scope(e)?;
                let frame = parser.open(e, false)?;
                parser.frames.push(frame);
            }
            Event::Empty(ref e) => {
                parser.push_scope(e)?;
                parser.open(e, true)?;
                parser.scopes.pop();
            }
            Event::End(_) => {
                parser.close();
                parser.scopes.pop();
            }
            Event::Text(ref t) => parser.text(&String::from_utf8_lossy(t)),
            Event::CData(ref c) => parser.text(&String::from_utf8_lossy(c)),
            Event::GeneralRef(ref r) => {
                let name = String::from_utf8_lossy(r);
                parser.text(&resolve_entity(&name)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !parser.saw_root {
        return Err(LoadError::Malformed(
            "document has no rdf:RDF root element".to_string(),
        ));
    }
    if !parser.frames.is_empty() {
        return Err(LoadError::Malformed(
            "unexpected end of document".to_string(),
        ));
    }

    Ok(parser.assertions)
}

fn resolve_entity(name: &str) -> Result<String, LoadError> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };
    resolved
        .map(String::from)
        .ok_or_else(|| LoadError::Malformed(format!("unknown entity &{};", name)))
}

impl Parser<'_> {
    /// Record the namespace declarations of an element
    fn push_scope(&mut self, e: &BytesStart) -> Result<(), LoadError> {
        let mut scope = HashMap::new();
        for attr in e.attributes() {
            let attr =
                attr.map_err(|e| LoadError::Malformed(format!("Invalid attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let prefix = if key == "xmlns" {
                String::new()
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                prefix.to_string()
            } else {
                continue;
            };
            let value = attr
                .unescape_value()
                .map_err(|e| LoadError::Malformed(format!("Invalid attribute value: {}", e)))?;
            scope.insert(prefix, value.to_string());
        }
        self.scopes.push(scope);
        Ok(())
    }

    fn namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .map(String::as_str)
    }

    /// Expand an element name to a full URI
    fn element_uri(&self, qname: &str) -> Result<String, LoadError> {
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        self.namespace(prefix)
            .filter(|ns| !ns.is_empty())
            .map(|ns| format!("{}{}", ns, local))
            .ok_or_else(|| {
                LoadError::Malformed(format!("element <{}> has no namespace", qname))
            })
    }

    fn attributes(&self, e: &BytesStart) -> Result<Vec<ResolvedAttr>, LoadError> {
        let mut resolved = Vec::new();
        for attr in e.attributes() {
            let attr =
                attr.map_err(|e| LoadError::Malformed(format!("Invalid attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| LoadError::Malformed(format!("Invalid attribute value: {}", e)))?
                .to_string();

            let (ns, local) = match key.split_once(':') {
                Some((prefix, local)) => {
                    let ns = self.namespace(prefix).ok_or_else(|| {
                        LoadError::Malformed(format!("undeclared prefix '{}'", prefix))
                    })?;
                    (Some(ns.to_string()), local.to_string())
                }
                None => (None, key),
            };
            resolved.push(ResolvedAttr { ns, local, value });
        }
        Ok(resolved)
    }

    fn resolve_uri(&self, reference: &str) -> String {
        let base = self.base.split('#').next().unwrap_or(self.base);
        if reference.is_empty() {
            base.to_string()
        } else if reference.starts_with('#') {
            format!("{}{}", base, reference)
        } else if has_scheme(reference) {
            reference.to_string()
        } else if reference.starts_with('/') {
            match base.split_once("://") {
                Some((scheme, rest)) => {
                    let authority = rest.split('/').next().unwrap_or_default();
                    format!("{}://{}{}", scheme, authority, reference)
                }
                None => reference.to_string(),
            }
        } else if let Some((dir, _)) = base.rsplit_once('/') {
            format!("{}/{}", dir, reference)
        } else {
            reference.to_string()
        }
    }

    fn blank(&mut self) -> String {
        self.blank_count += 1;
        skolem(self.base, &self.blank_count.to_string())
    }

    fn emit(&mut self, subject: &str, predicate: &str, object: Term) {
        self.assertions
            .push(Assertion::new(subject, predicate, object));
    }

    /// Handle an opening (or self-closing) element, returning the frame it opens
    fn open(&mut self, e: &BytesStart, empty: bool) -> Result<Frame, LoadError> {
        let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();

        match self.frames.last() {
            None => {
                if self.saw_root || self.element_uri(&qname)? != format!("{}RDF", RDF_NS) {
                    return Err(LoadError::Malformed(format!(
                        "expected rdf:RDF root element, found <{}>",
                        qname
                    )));
                }
                self.saw_root = true;
                Ok(Frame::Root)
            }
            Some(Frame::Root) | Some(Frame::Property { .. }) => self.open_node(e, &qname),
            Some(Frame::Node { .. }) => self.open_property(e, &qname, empty),
        }
    }

    fn open_node(&mut self, e: &BytesStart, qname: &str) -> Result<Frame, LoadError> {
        let class = self.element_uri(qname)?;
        let attrs = self.attributes(e)?;

        let mut subject = None;
        for attr in &attrs {
            if attr.is_rdf("about") {
                subject = Some(self.resolve_uri(&attr.value));
            } else if attr.is_rdf("ID") {
                subject = Some(self.resolve_uri(&format!("#{}", attr.value)));
            } else if attr.is_rdf("nodeID") {
                subject = Some(skolem(self.base, &attr.value));
            }
        }
        let subject = match subject {
            Some(subject) => subject,
            None => self.blank(),
        };

        if let Some(Frame::Property {
            subject: parent,
            predicate,
            has_node,
            ..
        }) = self.frames.last_mut()
        {
            *has_node = true;
            let assertion = Assertion::new(parent.clone(), predicate.clone(), Term::resource(&subject));
            self.assertions.push(assertion);
        }

        if class != format!("{}Description", RDF_NS) {
            self.emit(&subject, RDF_TYPE, Term::resource(class));
        }
        self.property_attributes(&subject, &attrs);

        Ok(Frame::Node {
            subject,
            next_li: 1,
        })
    }

    fn open_property(
        &mut self,
        e: &BytesStart,
        qname: &str,
        empty: bool,
    ) -> Result<Frame, LoadError> {
        let mut predicate = self.element_uri(qname)?;
        let Some(Frame::Node { subject, next_li }) = self.frames.last_mut() else {
            return Err(LoadError::Malformed(format!(
                "property <{}> outside a node element",
                qname
            )));
        };
        if predicate == format!("{}li", RDF_NS) {
            predicate = ordinal_predicate(*next_li);
            *next_li += 1;
        }
        let subject = subject.clone();

        let attrs = self.attributes(e)?;
        let mut object = None;
        let mut parse_type = None;
        for attr in &attrs {
            if attr.is_rdf("resource") {
                object = Some(self.resolve_uri(&attr.value));
            } else if attr.is_rdf("nodeID") {
                object = Some(skolem(self.base, &attr.value));
            } else if attr.is_rdf("parseType") {
                parse_type = Some(attr.value.clone());
            }
        }

        match parse_type.as_deref() {
            None => {}
            Some("Resource") => {
                let node = self.blank();
                self.emit(&subject, &predicate, Term::resource(&node));
                return Ok(Frame::Node {
                    subject: node,
                    next_li: 1,
                });
            }
            Some(other) => {
                return Err(LoadError::Malformed(format!(
                    "unsupported rdf:parseType=\"{}\"",
                    other
                )))
            }
        }

        let has_props = attrs.iter().any(|a| property_attribute(a).is_some());
        if object.is_none() && has_props {
            object = Some(self.blank());
        }

        if let Some(object) = object {
            self.emit(&subject, &predicate, Term::resource(&object));
            self.property_attributes(&object, &attrs);
            return Ok(Frame::Property {
                subject,
                predicate,
                text: String::new(),
                has_node: true,
            });
        }

        if empty {
            self.emit(&subject, &predicate, Term::literal(""));
        }
        Ok(Frame::Property {
            subject,
            predicate,
            text: String::new(),
            has_node: false,
        })
    }

    /// Emit non-RDF attributes of a node as literal properties
    fn property_attributes(&mut self, subject: &str, attrs: &[ResolvedAttr]) {
        for attr in attrs {
            if let Some(predicate) = property_attribute(attr) {
                let object = if predicate == RDF_TYPE {
                    Term::resource(self.resolve_uri(&attr.value))
                } else {
                    Term::literal(attr.value.as_str())
                };
                self.emit(subject, &predicate, object);
            }
        }
    }

    fn text(&mut self, content: &str) {
        if let Some(Frame::Property { text, .. }) = self.frames.last_mut() {
            text.push_str(content);
        }
    }

    fn close(&mut self) {
        if let Some(Frame::Property {
            subject,
            predicate,
            text,
            has_node: false,
        }) = self.frames.pop()
        {
            self.emit(&subject, &predicate, Term::literal(text));
        }
    }
}

/// The predicate an attribute asserts, if it is a property attribute
fn property_attribute(attr: &ResolvedAttr) -> Option<String> {
    let ns = attr.ns.as_deref()?;
    if ns == XML_NS {
        return None;
    }
    if ns == RDF_NS && attr.local != "type" {
        return None;
    }
    attr.uri()
}

fn has_scheme(reference: &str) -> bool {
    match reference.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NC: &str = "http://home.netscape.com/NC-rdf#";

    const REGISTRY: &str = r#"<?xml version="1.0"?>
<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:NC="http://home.netscape.com/NC-rdf#">
  <RDF:Seq about="NC:FlashDataSources">
    <RDF:li resource="http://example.com/stocks.rdf" />
    <RDF:li resource="http://example.com/weather.rdf" />
    <RDF:li>
      <RDF:Description about="http://example.com/news.rdf" NC:poll-interval="60" />
    </RDF:li>
  </RDF:Seq>

  <RDF:Description about="http://example.com/stocks.rdf">
    <NC:poll-interval>300</NC:poll-interval>
    <NC:title>Stocks &amp; Bonds</NC:title>
  </RDF:Description>
</RDF:RDF>"#;

    fn find<'a>(assertions: &'a [Assertion], subject: &str, predicate: &str) -> Vec<&'a Term> {
        assertions
            .iter()
            .filter(|a| a.subject == subject && a.predicate == predicate)
            .map(|a| &a.object)
            .collect()
    }

    #[test]
    fn test_parse_registry() {
        let assertions = parse_rdf_xml("chrome://sidebar/flash-registry.rdf", REGISTRY).unwrap();

        assert_eq!(
            find(&assertions, "NC:FlashDataSources", RDF_TYPE),
            vec![&Term::resource(format!("{}Seq", RDF_NS))]
        );
        assert_eq!(
            find(&assertions, "NC:FlashDataSources", &ordinal_predicate(1)),
            vec![&Term::resource("http://example.com/stocks.rdf")]
        );
        assert_eq!(
            find(&assertions, "NC:FlashDataSources", &ordinal_predicate(3)),
            vec![&Term::resource("http://example.com/news.rdf")]
        );
        assert_eq!(
            find(&assertions, "http://example.com/news.rdf", &format!("{}poll-interval", NC)),
            vec![&Term::literal("60")]
        );
        assert_eq!(
            find(&assertions, "http://example.com/stocks.rdf", &format!("{}poll-interval", NC)),
            vec![&Term::literal("300")]
        );
        assert_eq!(
            find(&assertions, "http://example.com/stocks.rdf", &format!("{}title", NC)),
            vec![&Term::literal("Stocks & Bonds")]
        );
    }

    #[test]
    fn test_default_namespace_and_rdf_id() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                              xmlns="http://purl.org/rss/1.0/">
            <item rdf:ID="first"><title>One</title></item>
        </rdf:RDF>"#;
        let assertions = parse_rdf_xml("http://example.com/feed.rdf", xml).unwrap();

        let subject = "http://example.com/feed.rdf#first";
        assert_eq!(
            find(&assertions, subject, RDF_TYPE),
            vec![&Term::resource("http://purl.org/rss/1.0/item")]
        );
        assert_eq!(
            find(&assertions, subject, "http://purl.org/rss/1.0/title"),
            vec![&Term::literal("One")]
        );
    }

    #[test]
    fn test_blank_nodes_are_skolemized() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                              xmlns:ex="http://example.com/ns#">
            <rdf:Description rdf:about="urn:a">
                <ex:address rdf:parseType="Resource">
                    <ex:city>Mountain View</ex:city>
                </ex:address>
            </rdf:Description>
        </rdf:RDF>"#;
        let assertions = parse_rdf_xml("http://example.com/a.rdf", xml).unwrap();

        let node = "http://example.com/a.rdf#genid-1";
        assert_eq!(
            find(&assertions, "urn:a", "http://example.com/ns#address"),
            vec![&Term::resource(node)]
        );
        assert_eq!(
            find(&assertions, node, "http://example.com/ns#city"),
            vec![&Term::literal("Mountain View")]
        );
    }

    #[test]
    fn test_relative_references() {
        let xml = r##"<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
            <RDF:Seq about="#root"><RDF:li resource="other.rdf"/></RDF:Seq>
        </RDF:RDF>"##;
        let assertions = parse_rdf_xml("http://example.com/dir/reg.rdf", xml).unwrap();
        assert_eq!(
            find(&assertions, "http://example.com/dir/reg.rdf#root", &ordinal_predicate(1)),
            vec![&Term::resource("http://example.com/dir/other.rdf")]
        );
    }

    #[test]
    fn test_rejects_missing_root() {
        let err = parse_rdf_xml("urn:x", "<html><body/></html>").unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));

        let err = parse_rdf_xml("urn:x", "").unwrap_err();
        assert!(matches!(err, LoadError::Malformed(_)));
    }

    #[test]
    fn test_rejects_broken_xml() {
        let xml = r#"<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
            <RDF:Description about="urn:a">
        </RDF:RDF>"#;
        assert!(parse_rdf_xml("urn:x", xml).is_err());
    }

    #[test]
    fn test_rejects_undeclared_prefix() {
        let xml = r#"<RDF:RDF xmlns:RDF="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
            <RDF:Description about="urn:a"><NC:title>x</NC:title></RDF:Description>
        </RDF:RDF>"#;
        let err = parse_rdf_xml("urn:x", xml).unwrap_err();
        assert!(err.to_string().contains("NC:title"));
    }
}
