//! Prelude module for convenient imports.
//!
//! ```ignore
//! use isoxsd::prelude::*;
//! ```

// Schema types
pub use isoxsd_schema::{
    BuiltinType, ComplexType, ElementDecl, Particle, Schema, SchemaError, SimpleType, TypeDef,
    TypeId, load_schema,
};

// Tree types
pub use isoxsd_tree::{
    PathTracker, SchemaDocument, SchemaNode, SchemaTreeBuilder, TreeError, build_schema_document,
    build_schema_tree, schema_to_json,
};

// Message types
pub use isoxsd_message::{
    ConverterOptions, InstanceJsonToXml, MessageError, SchemaValidator, ValidationOutcome,
    XmlNode, XmlWriteOptions, convert, convert_document, extract_target_namespace, json_to_xml,
    validate,
};
