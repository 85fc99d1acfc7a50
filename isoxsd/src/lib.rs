//! # isoxsd
//!
//! Schema and message transcoder for ISO 20022 financial messaging.
//!
//! isoxsd moves message definitions and instances between three
//! representations: a compiled XSD, a generic schema-description tree that
//! serializes to JSON, and concrete message instances in JSON or XML form.
//!
//! ## Features
//!
//! - **Schema-description trees** - Element names, occurrence bounds, value
//!   types, facets and paths extracted from an XSD
//! - **JSON to XML** - Instance conversion with currency folding and
//!   disambiguated sibling names
//! - **XML validation** - Streaming validation with first-error reporting
//!
//! ## Quick Start
//!
//! ```ignore
//! use isoxsd::prelude::*;
//!
//! let json = schema_to_json(&xsd)?;
//!
//! let namespace = extract_target_namespace(&xsd)?;
//! let xml = json_to_xml(&instance, Some(&namespace), &XmlWriteOptions::default())?;
//!
//! let outcome = SchemaValidator::new(&xsd)?.validate(&xml);
//! assert!(outcome.is_valid, "{}", outcome.message);
//! ```
//!
//! ## Crate Organization
//!
//! - [`schema`] - XSD compilation and the compiled schema model
//! - [`tree`] - Schema-description tree extraction
//! - [`message`] - JSON to XML conversion and instance validation

pub mod prelude;

/// XSD compilation and the compiled schema model.
pub mod schema {
    pub use isoxsd_schema::*;
}

/// Schema-description tree extraction.
pub mod tree {
    pub use isoxsd_tree::*;
}

/// Message instance conversion and validation.
pub mod message {
    pub use isoxsd_message::*;
}

// Re-export commonly used items at the crate root
pub use isoxsd_message::{
    ConverterOptions, InstanceJsonToXml, MessageError, SchemaValidator, ValidationOutcome,
    XmlNode, XmlWriteOptions, json_to_xml, validate,
};
pub use isoxsd_schema::{Schema, SchemaError, load_schema};
pub use isoxsd_tree::{SchemaDocument, SchemaNode, SchemaTreeBuilder, TreeError, schema_to_json};
