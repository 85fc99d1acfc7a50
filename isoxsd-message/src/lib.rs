//! # isoxsd Message
//!
//! Conversion and validation of ISO 20022 message instances.
//!
//! - [`convert`]: JSON instance to XML element tree, with currency folding
//!   and disambiguated sibling names
//! - [`xml`]: XML element tree and serializer
//! - [`validator`]: streaming validation of XML instances against an XSD,
//!   reporting the first violation
//!
//! # Example
//!
//! ```ignore
//! use isoxsd_message::{SchemaValidator, XmlWriteOptions, json_to_xml};
//!
//! let xml = json_to_xml(&json, Some(namespace), &XmlWriteOptions::default())?;
//! let outcome = SchemaValidator::new(&xsd)?.validate(&xml);
//! ```

mod content;
mod lexical;
mod simple;

pub mod convert;
pub mod error;
pub mod validator;
pub mod xml;

pub use convert::{
    AMOUNT_MEMBER, CURRENCY_MEMBER, ConverterOptions, DEFAULT_ROOT_NAME, InstanceJsonToXml,
    convert, convert_document, display_name, json_to_xml,
};
pub use error::{MessageError, Result};
pub use validator::{SchemaValidator, ValidationOutcome, extract_target_namespace, validate};
pub use xml::{XmlNode, XmlWriteOptions};
