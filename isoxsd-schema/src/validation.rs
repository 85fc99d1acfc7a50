//! Schema model checks.
//!
//! This module provides sanity checks on a compiled schema that must hold
//! before any traversal or instance validation runs against it.

use crate::error::SchemaError;
use crate::pattern::compile_pattern;
use crate::types::{FacetKind, MaxOccurs, Particle, Schema, TypeDef};

/// Checks a compiled schema for structural consistency.
///
/// # Arguments
/// * `schema` - The schema to check
///
/// # Returns
/// Ok(()) if usable, or SchemaError describing the issue.
///
/// # Errors
/// Returns `SchemaError` if a check fails.
pub fn check_schema(schema: &Schema) -> Result<(), SchemaError> {
    check_elements(schema)?;
    check_types(schema)?;
    Ok(())
}

/// Checks the global element declarations.
fn check_elements(schema: &Schema) -> Result<(), SchemaError> {
    use std::collections::HashSet;

    if schema.elements.is_empty() {
        return Err(SchemaError::NoGlobalElement);
    }

    let mut seen_names = HashSet::new();
    for element in &schema.elements {
        if !seen_names.insert(&element.name) {
            return Err(SchemaError::Validation {
                message: format!("Duplicate global element '{}'", element.name),
            });
        }
        if schema.get_type(element.type_id).is_none() {
            return Err(SchemaError::Validation {
                message: format!("Element '{}' references a missing type", element.name),
            });
        }
    }

    Ok(())
}

/// Checks every type in the arena.
fn check_types(schema: &Schema) -> Result<(), SchemaError> {
    for (_, type_def) in schema.types() {
        match type_def {
            TypeDef::Simple(simple) => {
                for facet in simple.facets() {
                    if facet.kind == FacetKind::Pattern {
                        compile_pattern(&facet.value).map_err(|source| {
                            SchemaError::InvalidPattern {
                                pattern: facet.value.clone(),
                                source,
                            }
                        })?;
                    }
                }
            }
            TypeDef::Complex(complex) => {
                if let Some(content) = &complex.content {
                    let owner = complex.name.as_deref().unwrap_or("anonymous complexType");
                    check_particle(owner, content)?;
                }
            }
        }
    }
    Ok(())
}

/// Checks occurrence bounds within a content particle.
fn check_particle(owner: &str, particle: &Particle) -> Result<(), SchemaError> {
    let occurs = particle.occurs();
    if let MaxOccurs::Bounded(max) = occurs.max {
        if occurs.min > max {
            let name = match particle {
                Particle::Element(e) => e.name.clone(),
                other => format!("{} in {owner}", other.kind()),
            };
            return Err(SchemaError::InvalidOccurs {
                name,
                min: occurs.min,
                max,
            });
        }
    }

    match particle {
        Particle::Sequence(group) | Particle::Choice(group) | Particle::All(group) => {
            for nested in &group.particles {
                check_particle(owner, nested)?;
            }
        }
        Particle::Element(_) | Particle::Any(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;

    #[test]
    fn test_check_valid_schema() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
            <xs:element name="Root" type="xs:string"/>
        </xs:schema>"#;

        let schema = parse_schema(xml).expect("Failed to parse");
        assert!(check_schema(&schema).is_ok());
    }

    #[test]
    fn test_check_no_global_element() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:simpleType name="A"><xs:restriction base="xs:string"/></xs:simpleType>
        </xs:schema>"#;

        let schema = parse_schema(xml).expect("Failed to parse");
        assert!(matches!(
            check_schema(&schema),
            Err(SchemaError::NoGlobalElement)
        ));
    }

    #[test]
    fn test_check_inverted_occurs() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="Root">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="A" type="xs:string" minOccurs="3" maxOccurs="2"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
        </xs:schema>"#;

        let schema = parse_schema(xml).expect("Failed to parse");
        let result = check_schema(&schema);
        assert!(matches!(
            result,
            Err(SchemaError::InvalidOccurs { min: 3, max: 2, .. })
        ));
    }

    #[test]
    fn test_check_bad_pattern() {
        let xml = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="Root" type="Code"/>
            <xs:simpleType name="Code">
                <xs:restriction base="xs:string"><xs:pattern value="[A-Z"/></xs:restriction>
            </xs:simpleType>
        </xs:schema>"#;

        let schema = parse_schema(xml).expect("Failed to parse");
        assert!(matches!(
            check_schema(&schema),
            Err(SchemaError::InvalidPattern { .. })
        ));
    }
}
