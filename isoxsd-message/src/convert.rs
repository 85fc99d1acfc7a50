//! JSON message instance to XML conversion.
//!
//! JSON keys may carry `_`-separated decorations so that repeated sibling
//! element names can coexist in one JSON object: numeric suffixes (`Nm_1`)
//! and path prefixes (`Document_GrpHdr_MsgId`) are dropped and the remaining
//! last segment becomes the element name. An object holding exactly a `Ccy`
//! member followed by an `Amt` member folds into one element with a currency
//! attribute.

use crate::error::{MessageError, Result};
use crate::xml::{XmlNode, XmlWriteOptions, is_ncname};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Name of the currency attribute produced by folding.
pub const CURRENCY_MEMBER: &str = "Ccy";

/// Name of the amount member folded into element text.
pub const AMOUNT_MEMBER: &str = "Amt";

/// Default name of the synthetic root wrapping several top-level elements.
pub const DEFAULT_ROOT_NAME: &str = "Document";

/// Converter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterOptions {
    namespace: Option<String>,
    root_name: String,
}

impl ConverterOptions {
    /// Creates options with no namespace and the default root name.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespace: None,
            root_name: DEFAULT_ROOT_NAME.to_string(),
        }
    }

    /// Sets the namespace applied to every element. An empty string means
    /// unqualified elements.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// Sets the name of the synthetic root used by
    /// [`InstanceJsonToXml::convert_document`].
    #[must_use]
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    /// Returns the configured namespace.
    #[must_use]
    pub fn get_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the synthetic root name.
    #[must_use]
    pub fn get_root_name(&self) -> &str {
        &self.root_name
    }
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts JSON message instances into XML element trees.
#[derive(Debug, Clone, Default)]
pub struct InstanceJsonToXml {
    options: ConverterOptions,
}

impl InstanceJsonToXml {
    /// Creates a converter.
    #[must_use]
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// Returns the converter options.
    #[must_use]
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Parses and converts a JSON document.
    ///
    /// # Errors
    /// Returns `MessageError::InvalidJson` if the text is not JSON, or
    /// `MessageError::EmptyInput` if it is not a non-empty object.
    pub fn convert_str(&self, json: &str) -> Result<Vec<XmlNode>> {
        if json.trim().is_empty() {
            return Err(MessageError::empty("the JSON document is empty"));
        }
        let value: Value = serde_json::from_str(json)?;
        self.convert_value(&value)
    }

    /// Converts every top-level member into a sibling element.
    ///
    /// # Errors
    /// Returns `MessageError::EmptyInput` if `value` is not an object or has
    /// no members.
    pub fn convert_value(&self, value: &Value) -> Result<Vec<XmlNode>> {
        let members = match value {
            Value::Object(members) if !members.is_empty() => members,
            Value::Object(_) => return Err(MessageError::empty("the top-level JSON object is empty")),
            Value::Null => return Err(MessageError::empty("the top-level JSON value is null")),
            _ => return Err(MessageError::empty("the top-level JSON value is not an object")),
        };

        debug!(
            members = members.len(),
            namespace = ?self.options.namespace,
            "Converting JSON instance"
        );
        let mut siblings = Vec::new();
        for (key, member) in members {
            let name = element_name(key)?;
            if let Some(node) = self.convert_node(member, name, &mut siblings)? {
                siblings.push(node);
            }
        }
        Ok(siblings)
    }

    /// Converts a JSON document into a single root element.
    ///
    /// A single top-level element is returned as is. Several are wrapped in a
    /// synthetic root named by [`ConverterOptions::root_name`].
    ///
    /// # Errors
    /// Same as [`convert_str`](Self::convert_str), plus
    /// `MessageError::InvalidName` if the root name is not a valid XML name.
    pub fn convert_document(&self, json: &str) -> Result<XmlNode> {
        let mut siblings = self.convert_str(json)?;
        if siblings.len() == 1 {
            return siblings
                .pop()
                .ok_or_else(|| MessageError::empty("no elements were produced"));
        }
        if siblings.is_empty() {
            return Err(MessageError::empty("no elements were produced"));
        }

        let root_name = self.options.get_root_name();
        if !is_ncname(root_name) {
            return Err(MessageError::invalid_name(root_name, root_name));
        }
        let mut root = XmlNode::qualified(root_name, self.options.get_namespace());
        root.children = siblings;
        Ok(root)
    }

    /// Converts one JSON value named `name`.
    ///
    /// Arrays produce no node of their own: each item is converted under the
    /// same name and pushed onto `siblings`.
    ///
    /// # Errors
    /// Returns `MessageError::InvalidName` if a member key does not yield a
    /// valid XML name.
    pub fn convert_node(
        &self,
        value: &Value,
        name: &str,
        siblings: &mut Vec<XmlNode>,
    ) -> Result<Option<XmlNode>> {
        match value {
            Value::Object(members) => self.convert_object(members, name).map(Some),
            Value::Array(items) => {
                trace!(name, items = items.len(), "Flattening array");
                for item in items {
                    if let Some(node) = self.convert_node(item, name, siblings)? {
                        siblings.push(node);
                    }
                }
                Ok(None)
            }
            scalar => {
                let mut node = self.element(name);
                node.text = Some(scalar_text(scalar));
                Ok(Some(node))
            }
        }
    }

    /// Converts an object. In a `Ccy`/`Amt` pair, `Ccy` always becomes the
    /// attribute; the member right after it becomes the element text.
    fn convert_object(&self, members: &Map<String, Value>, name: &str) -> Result<XmlNode> {
        let mut node = self.element(name);
        let pair = is_currency_pair(members);
        trace!(name, members = members.len(), pair, "Converting object");

        let mut children = Vec::new();
        let mut amount_is_text = false;
        for (key, member) in members {
            let display = element_name(key)?;
            if pair && display == CURRENCY_MEMBER {
                node.set_attribute(CURRENCY_MEMBER, scalar_text(member));
                amount_is_text = true;
            } else if amount_is_text {
                node.text = Some(scalar_text(member));
                amount_is_text = false;
            } else if let Some(child) = self.convert_node(member, display, &mut children)? {
                children.push(child);
            }
        }
        node.children = children;
        Ok(node)
    }

    fn element(&self, name: &str) -> XmlNode {
        XmlNode::qualified(name, self.options.get_namespace())
    }
}

/// Returns the element name encoded in a JSON key.
///
/// Trailing all-digit `_` segments are dropped, then the last remaining
/// `_`-separated segment is the name: `Amt_1` and `CdtTrfTxInf_2_Amt` both
/// give `Amt`.
#[must_use]
pub fn display_name(key: &str) -> &str {
    let mut rest = key;
    while let Some((head, tail)) = rest.rsplit_once('_') {
        if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
            return tail;
        }
        rest = head;
    }
    rest
}

fn element_name(key: &str) -> Result<&str> {
    let name = display_name(key);
    if is_ncname(name) {
        Ok(name)
    } else {
        Err(MessageError::invalid_name(name, key))
    }
}

fn is_currency_pair(members: &Map<String, Value>) -> bool {
    if members.len() != 2 {
        return false;
    }
    let mut names = members.keys().map(|key| display_name(key));
    matches!(
        (names.next(), names.next()),
        (Some(CURRENCY_MEMBER), Some(AMOUNT_MEMBER)) | (Some(AMOUNT_MEMBER), Some(CURRENCY_MEMBER))
    )
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Converts a JSON instance into its top-level sibling elements.
///
/// # Errors
/// Returns `MessageError::InvalidJson` or `MessageError::EmptyInput`.
pub fn convert(json: &str, namespace: Option<&str>) -> Result<Vec<XmlNode>> {
    converter(namespace).convert_str(json)
}

/// Converts a JSON instance into a single root element.
///
/// # Errors
/// Returns `MessageError::InvalidJson` or `MessageError::EmptyInput`.
pub fn convert_document(json: &str, namespace: Option<&str>) -> Result<XmlNode> {
    converter(namespace).convert_document(json)
}

/// Converts a JSON instance into XML text with an XML declaration.
///
/// # Errors
/// Returns `MessageError::InvalidJson`, `MessageError::EmptyInput` or
/// `MessageError::Io`.
pub fn json_to_xml(json: &str, namespace: Option<&str>, options: &XmlWriteOptions) -> Result<String> {
    convert_document(json, namespace)?.to_xml_string_with(options)
}

fn converter(namespace: Option<&str>) -> InstanceJsonToXml {
    let options = match namespace {
        Some(ns) => ConverterOptions::new().namespace(ns),
        None => ConverterOptions::new(),
    };
    InstanceJsonToXml::new(options)
}
