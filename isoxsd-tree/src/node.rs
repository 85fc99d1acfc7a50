//! Schema-description tree nodes.

use crate::path::PathTracker;
use serde::{Deserialize, Serialize};

/// Name and path of the synthetic root before any element is visited.
pub const ROOT_NAME: &str = "Document";

/// One node of the schema-description tree.
///
/// Serialized field names and order are part of the output format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// `_`-joined path segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Element name, or the wildcard namespace for `any` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Primitive type tag, `"choice"` or `"any"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_occurs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction_digits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_digits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_inclusive: Option<String>,
    /// Enumeration values in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    /// Set when the node's type carries a pattern-restricted `Ccy` attribute.
    #[serde(default)]
    pub is_currency: bool,
    /// `/`-joined path segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    /// Child nodes in declaration order.
    #[serde(default)]
    pub elements: Vec<SchemaNode>,
}

impl SchemaNode {
    /// Creates the synthetic root node.
    #[must_use]
    pub fn root() -> Self {
        Self {
            id: Some(ROOT_NAME.to_lowercase()),
            name: Some(ROOT_NAME.to_string()),
            min_occurs: Some("1".to_string()),
            xpath: Some(ROOT_NAME.to_string()),
            ..Self::default()
        }
    }

    /// Creates a node whose path fields are taken from the tracker.
    #[must_use]
    pub fn at_path(name: impl Into<String>, path: &PathTracker) -> Self {
        Self {
            id: Some(path.current_id()),
            name: Some(name.into()),
            xpath: Some(path.current_path()),
            ..Self::default()
        }
    }

    /// Creates a path-transparent choice node.
    #[must_use]
    pub fn choice() -> Self {
        Self {
            data_type: Some("choice".to_string()),
            ..Self::default()
        }
    }

    /// Returns true if this node groups alternatives.
    #[must_use]
    pub fn is_choice(&self) -> bool {
        self.data_type.as_deref() == Some("choice")
    }

    /// Finds a descendant (or this node) by its xpath.
    #[must_use]
    pub fn find(&self, xpath: &str) -> Option<&SchemaNode> {
        if self.xpath.as_deref() == Some(xpath) {
            return Some(self);
        }
        self.elements.iter().find_map(|child| child.find(xpath))
    }

    /// Visits this node and all descendants depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SchemaNode)) {
        visit(self);
        for child in &self.elements {
            child.walk(visit);
        }
    }
}

/// Serialized schema description: target namespace plus the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    /// Target namespace of the source schema.
    pub namespace: Option<String>,
    /// Root of the schema-description tree.
    pub schema_element: SchemaNode,
}

impl SchemaDocument {
    /// Serializes the document as compact JSON.
    ///
    /// # Errors
    /// Returns the serializer error.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serializes the document as indented JSON.
    ///
    /// # Errors
    /// Returns the serializer error.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a previously serialized document.
    ///
    /// # Errors
    /// Returns the deserializer error.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
