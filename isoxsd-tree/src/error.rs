//! Error types for schema-tree extraction.

use thiserror::Error;

/// Error type for schema-tree extraction.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The schema failed compilation or its structural checks.
    #[error("malformed schema: {0}")]
    MalformedSchema(#[from] isoxsd_schema::SchemaError),

    /// The traversal reached the depth ceiling.
    #[error("traversal depth {depth} reached the maximum allowed depth at '{path}'")]
    DepthExceeded {
        /// Depth ceiling that was hit.
        depth: usize,
        /// Path that would have been created.
        path: String,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<isoxsd_schema::ParseError> for TreeError {
    fn from(err: isoxsd_schema::ParseError) -> Self {
        Self::MalformedSchema(err.into())
    }
}

/// Result type alias for schema-tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
