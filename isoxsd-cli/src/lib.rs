//! # isoxsd CLI
//!
//! Subcommands of the `isoxsd` binary:
//!
//! - `isoxsd schema` - XSD to schema-description JSON
//! - `isoxsd convert` - JSON message instance to XML
//! - `isoxsd validate` - XML message instance against an XSD
//!
//! ```bash
//! isoxsd schema pain.001.001.09.xsd
//! isoxsd convert payment.json --schema pain.001.001.09.xsd
//! isoxsd validate pain.001.001.09.xsd payment.xml
//! ```

pub mod convert;
pub mod schema;
pub mod validate;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads a UTF-8 input file.
///
/// # Errors
/// Returns an error naming the file if it cannot be read.
pub fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Writes an output file, creating missing parent directories.
///
/// # Errors
/// Returns an error naming the file if it cannot be written.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Returns `explicit` if given, otherwise `input` with its extension replaced.
#[must_use]
pub fn output_path(input: &Path, explicit: Option<&Path>, extension: &str) -> PathBuf {
    explicit.map_or_else(|| input.with_extension(extension), Path::to_path_buf)
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const NS: &str = "urn:iso:std:iso:20022:tech:xsd:camt.000.001.01";

    pub const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="urn:iso:std:iso:20022:tech:xsd:camt.000.001.01" elementFormDefault="qualified">
        <xs:element name="Document" type="Document"/>
        <xs:complexType name="Document">
            <xs:sequence>
                <xs:element name="MsgId" type="xs:string"/>
                <xs:element name="Amt" type="Amount"/>
            </xs:sequence>
        </xs:complexType>
        <xs:complexType name="Amount">
            <xs:simpleContent>
                <xs:extension base="xs:decimal">
                    <xs:attribute name="Ccy" type="CurrencyCode" use="required"/>
                </xs:extension>
            </xs:simpleContent>
        </xs:complexType>
        <xs:simpleType name="CurrencyCode">
            <xs:restriction base="xs:string">
                <xs:pattern value="[A-Z]{3}"/>
            </xs:restriction>
        </xs:simpleType>
    </xs:schema>"#;

    pub const INSTANCE: &str = r#"{"Document":{"MsgId":"M1","Amt":{"Ccy":"CHF","Amt":"12.50"}}}"#;
}
