//! Error types for message conversion and validation.

use thiserror::Error;

/// Error type for message conversion and validation.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The JSON instance has no top-level members.
    #[error("empty input: {message}")]
    EmptyInput {
        /// What was missing.
        message: String,
    },

    /// The JSON instance could not be parsed.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The schema has no root `schema` element carrying a target namespace.
    #[error("schema declares no target namespace")]
    NamespaceNotFound,

    /// The schema failed compilation or its structural checks.
    #[error("malformed schema: {0}")]
    MalformedSchema(#[from] isoxsd_schema::SchemaError),

    /// The instance document does not conform to the schema.
    #[error("validation failed: {message}")]
    ValidationFailure {
        /// First validation error reported.
        message: String,
    },

    /// A JSON key or configured name is not a valid XML element name.
    #[error("invalid element name '{name}' from key '{key}'")]
    InvalidName {
        /// Element name derived from the key.
        name: String,
        /// JSON key or option value the name came from.
        key: String,
    },

    /// XML reading or writing error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MessageError {
    /// Creates an empty input error.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::EmptyInput {
            message: message.into(),
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            key: key.into(),
        }
    }
}

impl From<isoxsd_schema::ParseError> for MessageError {
    fn from(err: isoxsd_schema::ParseError) -> Self {
        Self::MalformedSchema(err.into())
    }
}

/// Result type alias for message operations.
pub type Result<T> = std::result::Result<T, MessageError>;
