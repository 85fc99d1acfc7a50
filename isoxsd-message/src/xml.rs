//! XML element tree and serializer.

use crate::error::{MessageError, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

/// Element of an XML document under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Local element name.
    pub name: String,
    /// Namespace URI, if qualified.
    pub namespace: Option<String>,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Text content.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Creates an element with no namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an element in `namespace`, or unqualified if it is empty.
    #[must_use]
    pub fn qualified(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            ..Self::default()
        }
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Returns the first child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns every child with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Serializes the element with default options.
    ///
    /// # Errors
    /// Returns `MessageError::InvalidName` if an element name is not a valid
    /// XML name, or `MessageError::Io` if the writer fails.
    pub fn to_xml_string(&self) -> Result<String> {
        self.to_xml_string_with(&XmlWriteOptions::default())
    }

    /// Serializes the element as a complete document.
    ///
    /// # Errors
    /// Returns `MessageError::InvalidName` if an element name is not a valid
    /// XML name, or `MessageError::Io` if the writer fails.
    pub fn to_xml_string_with(&self, options: &XmlWriteOptions) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf, options)?;
        String::from_utf8(buf).map_err(|e| std::io::Error::other(e).into())
    }

    /// Writes the element as a complete document to `out`.
    ///
    /// The root declares its namespace as the default namespace. Descendants
    /// re-declare it only where their namespace differs from their parent's.
    ///
    /// # Errors
    /// Returns `MessageError::InvalidName` if an element name is not a valid
    /// XML name, or `MessageError::Io` if the writer fails.
    pub fn write_to<W: Write>(&self, out: W, options: &XmlWriteOptions) -> Result<()> {
        let mut writer = match options.indent {
            Some(width) => Writer::new_with_indent(out, b' ', width),
            None => Writer::new(out),
        };
        if options.declaration {
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        write_element(&mut writer, self, None)
    }
}

/// Returns true if `name` is a non-colonized XML name.
#[must_use]
pub fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}'))
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    node: &XmlNode,
    inherited: Option<&str>,
) -> Result<()> {
    if !is_ncname(&node.name) {
        return Err(MessageError::invalid_name(node.name.as_str(), node.name.as_str()));
    }
    let mut start = BytesStart::new(node.name.as_str());
    let namespace = node.namespace.as_deref();
    if namespace != inherited {
        start.push_attribute(("xmlns", namespace.unwrap_or("")));
    }
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.text.is_none() && node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &node.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_element(writer, child, namespace)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
    Ok(())
}

/// Output options for XML serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlWriteOptions {
    indent: Option<usize>,
    declaration: bool,
}

impl XmlWriteOptions {
    /// Creates options with the default settings: compact output with an
    /// XML declaration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            indent: None,
            declaration: true,
        }
    }

    /// Indents nested elements by `width` spaces.
    #[must_use]
    pub fn indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }

    /// Writes everything on one line.
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.indent = None;
        self
    }

    /// Sets whether the XML declaration is written.
    #[must_use]
    pub fn declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    /// Returns the indentation width, if any.
    #[must_use]
    pub fn indent_width(&self) -> Option<usize> {
        self.indent
    }

    /// Returns true if the XML declaration is written.
    #[must_use]
    pub fn writes_declaration(&self) -> bool {
        self.declaration
    }
}

impl Default for XmlWriteOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:iso:std:iso:20022:tech:xsd:test.001.001.01";

    fn bare() -> XmlWriteOptions {
        XmlWriteOptions::new().declaration(false)
    }

    #[test]
    fn test_default_namespace_declared_once() {
        let mut root = XmlNode::qualified("Document", Some(NS));
        let mut hdr = XmlNode::qualified("GrpHdr", Some(NS));
        let mut id = XmlNode::qualified("MsgId", Some(NS));
        id.text = Some("ABC".into());
        hdr.children.push(id);
        root.children.push(hdr);

        let xml = root.to_xml_string_with(&bare()).unwrap();
        assert_eq!(
            xml,
            format!(r#"<Document xmlns="{NS}"><GrpHdr><MsgId>ABC</MsgId></GrpHdr></Document>"#)
        );
        assert_eq!(xml.matches("xmlns").count(), 1);
    }

    #[test]
    fn test_namespace_change_is_redeclared() {
        let mut root = XmlNode::qualified("Document", Some(NS));
        root.children.push(XmlNode::new("Local"));
        root.children.push(XmlNode::qualified("Ext", Some("urn:other")));

        let xml = root.to_xml_string_with(&bare()).unwrap();
        assert!(xml.contains(r#"<Local xmlns=""/>"#));
        assert!(xml.contains(r#"<Ext xmlns="urn:other"/>"#));
    }

    #[test]
    fn test_attributes_and_escaping() {
        let mut amt = XmlNode::new("Amt");
        amt.set_attribute("Ccy", "EUR");
        amt.text = Some("1 < 2 & 3".into());

        let xml = amt.to_xml_string_with(&bare()).unwrap();
        assert_eq!(xml, r#"<Amt Ccy="EUR">1 &lt; 2 &amp; 3</Amt>"#);
    }

    #[test]
    fn test_empty_text_is_not_self_closing() {
        let mut node = XmlNode::new("Nm");
        node.text = Some(String::new());
        assert_eq!(node.to_xml_string_with(&bare()).unwrap(), "<Nm></Nm>");
    }

    #[test]
    fn test_declaration_and_indent() {
        let mut root = XmlNode::new("Root");
        let mut child = XmlNode::new("A");
        child.text = Some("x".into());
        root.children.push(child);

        let xml = root
            .to_xml_string_with(&XmlWriteOptions::new().indent(2))
            .unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("\n  <A>x</A>"));
    }

    #[test]
    fn test_ncname() {
        assert!(is_ncname("MsgId"));
        assert!(is_ncname("_x-1.2"));
        assert!(is_ncname("Ünïcode"));
        assert!(!is_ncname(""));
        assert!(!is_ncname("1x"));
        assert!(!is_ncname("a b"));
        assert!(!is_ncname("ns:Name"));
        assert!(!is_ncname("-x"));
    }

    #[test]
    fn test_invalid_name_is_not_written() {
        let mut root = XmlNode::new("Doc");
        root.children.push(XmlNode::new("a b"));
        assert!(matches!(
            root.to_xml_string_with(&bare()),
            Err(MessageError::InvalidName { name, .. }) if name == "a b"
        ));
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut node = XmlNode::new("Amt");
        node.set_attribute("Ccy", "EUR");
        node.set_attribute("Ccy", "USD");
        assert_eq!(node.attribute("Ccy"), Some("USD"));
        assert_eq!(node.attributes.len(), 1);
    }
}
