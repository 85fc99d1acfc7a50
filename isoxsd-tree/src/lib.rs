//! # isoxsd Tree
//!
//! Schema-description trees for ISO 20022 message schemas.
//!
//! This crate walks a compiled XSD and produces a generic tree of
//! [`SchemaNode`] values carrying element names, occurrence bounds, value
//! types, restriction facets and `/`-joined paths, serialized as JSON for
//! form and mapping tools.
//!
//! # Example
//!
//! ```ignore
//! use isoxsd_tree::schema_to_json;
//!
//! let json = schema_to_json(&std::fs::read_to_string("pain.001.001.09.xsd")?)?;
//! ```

pub mod builder;
pub mod error;
pub mod facets;
pub mod node;
pub mod path;

pub use builder::{CURRENCY_ATTRIBUTE, SchemaTreeBuilder};
pub use error::{Result, TreeError};
pub use facets::{FacetSet, extract_facets};
pub use node::{ROOT_NAME, SchemaDocument, SchemaNode};
pub use path::{MAX_DEPTH, PathTracker};

/// Compiles an XSD and builds its schema-description document.
///
/// # Errors
/// Returns `TreeError::MalformedSchema` if the schema does not compile, or
/// `TreeError::DepthExceeded` if the traversal reaches the depth ceiling.
pub fn build_schema_document(xsd: &str) -> Result<SchemaDocument> {
    let schema = isoxsd_schema::load_schema(xsd)?;
    SchemaTreeBuilder::new(&schema).build_document()
}

/// Compiles an XSD and builds its schema-description tree.
///
/// # Errors
/// Same as [`build_schema_document`].
pub fn build_schema_tree(xsd: &str) -> Result<SchemaNode> {
    let schema = isoxsd_schema::load_schema(xsd)?;
    SchemaTreeBuilder::new(&schema).build()
}

/// Compiles an XSD and returns its schema-description document as indented
/// JSON.
///
/// # Errors
/// Same as [`build_schema_document`], plus `TreeError::Json`.
pub fn schema_to_json(xsd: &str) -> Result<String> {
    Ok(build_schema_document(xsd)?.to_json_pretty()?)
}
