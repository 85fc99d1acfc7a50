//! # isoxsd Schema
//!
//! XSD schema compiler and compiled schema model.
//!
//! This crate provides:
//! - Compilation of XSD text into a navigable schema model
//! - Type definitions for elements, types, particles, attributes and facets
//! - XSD pattern translation for the `regex` crate
//! - Structural checks on a compiled schema

mod dom;
pub mod error;
pub mod parser;
pub mod pattern;
pub mod types;
pub mod validation;

pub use error::{ParseError, SchemaError};
pub use parser::parse_schema;
pub use pattern::{compile_pattern, translate_pattern};
pub use types::{
    AttributeUse, BuiltinType, ComplexType, ElementDecl, ElementForm, Facet, FacetKind,
    MaxOccurs, ModelGroup, Occurs, Particle, ProcessContents, Schema, SimpleType, SimpleVariety,
    TypeDef, TypeId, Wildcard, XSD_NAMESPACE, XSI_NAMESPACE,
};
pub use validation::check_schema;

/// Compiles an XSD schema and runs the structural checks on it.
///
/// # Errors
/// Returns `SchemaError` if the text does not compile or the compiled model
/// fails a check.
pub fn load_schema(xml: &str) -> Result<Schema, SchemaError> {
    let schema = parse_schema(xml)?;
    check_schema(&schema)?;
    Ok(schema)
}
