//! Error types for schema compilation and model checks.

use thiserror::Error;

/// Error type for schema compilation operations.
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed entity or character reference.
    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Missing required attribute.
    #[error("missing required attribute '{attribute}' on element '{element}'")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
    },

    /// Invalid attribute value.
    #[error("invalid value '{value}' for attribute '{attribute}' on element '{element}'")]
    InvalidAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
        /// Invalid value.
        value: String,
    },

    /// Unknown element encountered.
    #[error("unknown element '{element}' in context '{context}'")]
    UnknownElement {
        /// Element name.
        element: String,
        /// Parent context.
        context: String,
    },

    /// Unknown type reference.
    #[error("unknown type '{type_name}' referenced from '{context}'")]
    UnknownType {
        /// Type name as written in the schema.
        type_name: String,
        /// Declaration that referenced it.
        context: String,
    },

    /// Unresolvable `ref` to a global declaration.
    #[error("unknown {kind} '{name}' referenced")]
    UnknownReference {
        /// Kind of declaration (element, group, attributeGroup).
        kind: String,
        /// Referenced name.
        name: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} definition: '{name}'")]
    DuplicateDefinition {
        /// Kind of definition (type, element, group).
        kind: String,
        /// Name of the duplicate.
        name: String,
    },

    /// Invalid schema structure.
    #[error("invalid schema structure: {message}")]
    InvalidStructure {
        /// Error message.
        message: String,
    },

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Error type for checks on a compiled schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Parsing error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The schema declares no global element.
    #[error("schema declares no global element")]
    NoGlobalElement,

    /// Occurrence bounds are inverted.
    #[error("invalid occurrence bounds on '{name}': minOccurs {min} exceeds maxOccurs {max}")]
    InvalidOccurs {
        /// Element or group the bounds belong to.
        name: String,
        /// Declared lower bound.
        min: u64,
        /// Declared upper bound.
        max: u64,
    },

    /// A pattern facet is not a usable regular expression.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern as written in the schema.
        pattern: String,
        /// Regex compilation failure.
        #[source]
        source: regex::Error,
    },

    /// Validation error.
    #[error("validation error: {message}")]
    Validation {
        /// Error message.
        message: String,
    },
}

impl ParseError {
    /// Creates a missing attribute error.
    pub fn missing_attr(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates an invalid attribute error.
    pub fn invalid_attr(
        element: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            element: element.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Creates an unknown element error.
    pub fn unknown_element(element: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownElement {
            element: element.into(),
            context: context.into(),
        }
    }

    /// Creates an unknown type error.
    pub fn unknown_type(type_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
            context: context.into(),
        }
    }

    /// Creates an unknown reference error.
    pub fn unknown_ref(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownReference {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Creates a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateDefinition {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Creates an invalid structure error.
    pub fn structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}
