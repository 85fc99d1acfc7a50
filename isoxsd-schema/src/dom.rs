//! Minimal element tree for schema documents.
//!
//! Schema compilation needs random access to global declarations, so the
//! document is read once into this tree before any declaration is compiled.

use crate::error::ParseError;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// Element node of a schema document.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawElement {
    /// Namespace prefix, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub local: String,
    /// Attributes in document order (qualified names as written).
    pub attributes: Vec<(String, String)>,
    /// Child elements.
    pub children: Vec<RawElement>,
}

impl RawElement {
    /// Returns the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value of a required attribute.
    pub fn required_attr(&self, name: &str) -> Result<&str, ParseError> {
        self.attr(name)
            .ok_or_else(|| ParseError::missing_attr(self.local.as_str(), name))
    }

    /// Iterates over child elements, skipping annotations.
    pub fn content(&self) -> impl Iterator<Item = &RawElement> {
        self.children.iter().filter(|c| c.local != "annotation")
    }

    /// Returns the first child with the given local name.
    pub fn child(&self, local: &str) -> Option<&RawElement> {
        self.children.iter().find(|c| c.local == local)
    }
}

/// Parsed schema document with its namespace bindings.
#[derive(Debug, Clone)]
pub(crate) struct RawDocument {
    /// Document element.
    pub root: RawElement,
    /// Prefix to URI bindings declared anywhere in the document.
    pub namespaces: HashMap<String, String>,
}

impl RawDocument {
    /// Resolves a prefix (empty for the default namespace) to a URI.
    pub fn namespace_for(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }
}

/// Reads a schema document into an element tree.
pub(crate) fn read_document(xml: &str) -> Result<RawDocument, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut namespaces = HashMap::new();
    let mut stack: Vec<RawElement> = Vec::new();
    let mut root: Option<RawElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(read_element(e, &mut namespaces)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = read_element(e, &mut namespaces)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::structure("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::structure("unexpected end of document"));
    }
    let root = root.ok_or_else(|| ParseError::structure("document has no root element"))?;
    Ok(RawDocument { root, namespaces })
}

fn attach(
    stack: &mut [RawElement],
    root: &mut Option<RawElement>,
    element: RawElement,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ParseError::structure("multiple root elements")),
    }
    Ok(())
}

fn read_element(
    e: &BytesStart<'_>,
    namespaces: &mut HashMap<String, String>,
) -> Result<RawElement, ParseError> {
    let qname = std::str::from_utf8(e.name().as_ref())?.to_string();
    let (prefix, local) = match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, qname),
    };

    let mut attributes = Vec::new();
    for attr in e.attributes().flatten() {
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let raw = std::str::from_utf8(&attr.value)?;
        let value = unescape(raw)?.into_owned();

        if key == "xmlns" {
            namespaces.insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.insert(prefix.to_string(), value.clone());
        }
        attributes.push((key.to_string(), value));
    }

    Ok(RawElement {
        prefix,
        local,
        attributes,
        children: Vec::new(),
    })
}
