//! Schema-description tree construction.
//!
//! Walks a compiled [`Schema`] from its global elements down through complex
//! types, model groups and simple types, producing one [`SchemaNode`] per
//! element, nested choice and wildcard.

use crate::error::{Result, TreeError};
use crate::facets::extract_facets;
use crate::node::{SchemaDocument, SchemaNode};
use crate::path::PathTracker;
use isoxsd_schema::{
    ComplexType, FacetKind, Particle, Schema, SchemaError, SimpleType, TypeDef, TypeId,
};
use tracing::{debug, trace};

/// Name of the attribute that marks an amount type as currency-bearing.
pub const CURRENCY_ATTRIBUTE: &str = "Ccy";

/// Builds the schema-description tree of a compiled schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaTreeBuilder<'s> {
    schema: &'s Schema,
}

impl<'s> SchemaTreeBuilder<'s> {
    /// Creates a builder over a compiled schema.
    #[must_use]
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Builds the tree.
    ///
    /// Every global element is visited with its own path tracker and
    /// contributes its children to a single synthetic root. The root takes
    /// its name and paths from the element being visited.
    ///
    /// # Errors
    /// Returns `TreeError::DepthExceeded` if a path reaches the depth ceiling,
    /// or `TreeError::MalformedSchema` if a type reference is dangling.
    pub fn build(&self) -> Result<SchemaNode> {
        let mut root = SchemaNode::root();

        for element in &self.schema.elements {
            debug!(element = %element.name, "Building schema tree");

            let mut traversal = Traversal::new(self.schema);
            traversal.path.push(&element.name)?;
            root.name = Some(element.name.clone());
            root.xpath = Some(traversal.path.current_path());
            root.id = Some(traversal.path.current_id());

            traversal.visit_type(element.type_id, &mut root)?;
        }

        Ok(root)
    }

    /// Builds the tree and pairs it with the schema's target namespace.
    ///
    /// # Errors
    /// Same as [`SchemaTreeBuilder::build`].
    pub fn build_document(&self) -> Result<SchemaDocument> {
        Ok(SchemaDocument {
            namespace: self.schema.target_namespace.clone(),
            schema_element: self.build()?,
        })
    }
}

/// State of one top-level traversal.
struct Traversal<'s> {
    schema: &'s Schema,
    path: PathTracker,
}

impl<'s> Traversal<'s> {
    fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            path: PathTracker::new(),
        }
    }

    fn lookup(&self, id: TypeId) -> Result<&'s TypeDef> {
        let schema = self.schema;
        schema.get_type(id).ok_or_else(|| {
            TreeError::MalformedSchema(SchemaError::Validation {
                message: format!("Type #{} is not defined", id.index()),
            })
        })
    }

    fn visit_type(&mut self, id: TypeId, node: &mut SchemaNode) -> Result<()> {
        match self.lookup(id)? {
            TypeDef::Complex(complex) => self.visit_complex_type(complex, node),
            TypeDef::Simple(simple) => {
                visit_simple_type(simple, node);
                Ok(())
            }
        }
    }

    fn visit_complex_type(&mut self, complex: &'s ComplexType, node: &mut SchemaNode) -> Result<()> {
        if let Some(base) = complex.simple_base {
            if let TypeDef::Simple(simple) = self.lookup(base)? {
                visit_simple_type(simple, node);
            }
        }

        if let Some(ccy) = complex.get_attribute(CURRENCY_ATTRIBUTE) {
            if let TypeDef::Simple(simple) = self.lookup(ccy.type_id)? {
                let pattern = simple
                    .facets()
                    .iter()
                    .find(|facet| facet.kind == FacetKind::Pattern);
                if let Some(pattern) = pattern {
                    node.is_currency = true;
                    node.pattern = Some(pattern.value.clone());
                }
            }
        }

        match &complex.content {
            Some(Particle::Sequence(group)) => self.visit_items(&group.particles, node),
            Some(Particle::Choice(group)) => {
                node.data_type = Some("choice".to_string());
                self.visit_items(&group.particles, node)
            }
            Some(other) => {
                trace!(kind = other.kind(), "Content particle has no tree representation");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn visit_items(&mut self, items: &'s [Particle], parent: &mut SchemaNode) -> Result<()> {
        for item in items {
            match item {
                Particle::Element(decl) => {
                    self.path.push(&decl.name)?;
                    trace!(xpath = %self.path.current_path(), "Visiting element");

                    let mut node = SchemaNode::at_path(&decl.name, &self.path);
                    node.min_occurs = Some(decl.occurs.min.to_string());
                    node.max_occurs = Some(decl.occurs.max.to_string());
                    self.visit_type(decl.type_id, &mut node)?;

                    parent.elements.push(node);
                    self.path.pop();
                }
                Particle::Choice(group) => {
                    let mut node = SchemaNode::choice();
                    self.visit_items(&group.particles, &mut node)?;
                    parent.elements.push(node);
                }
                Particle::Any(wildcard) => {
                    self.path.push("Any")?;

                    let mut node = SchemaNode::at_path(&wildcard.namespace, &self.path);
                    node.data_type = Some("any".to_string());

                    parent.elements.push(node);
                    self.path.pop();
                }
                Particle::Sequence(_) | Particle::All(_) => {
                    trace!(kind = item.kind(), "Skipping nested model group");
                }
            }
        }
        Ok(())
    }
}

fn visit_simple_type(simple: &SimpleType, node: &mut SchemaNode) {
    node.data_type = Some(simple.builtin.type_tag());
    if simple.is_restriction() {
        extract_facets(simple.facets()).apply_to(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::MAX_DEPTH;
    use isoxsd_schema::load_schema;

    const PAYMENT_SCHEMA: &str = r###"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns="urn:iso:std:iso:20022:tech:xsd:test.001.001.01"
           targetNamespace="urn:iso:std:iso:20022:tech:xsd:test.001.001.01"
           elementFormDefault="qualified">
    <xs:element name="Document" type="Document"/>
    <xs:complexType name="Document">
        <xs:sequence>
            <xs:element name="MsgId" type="Max35Text"/>
            <xs:element name="Amt" type="ActiveCurrencyAndAmount" maxOccurs="unbounded"/>
            <xs:element name="Sts" type="StatusCode" minOccurs="0"/>
            <xs:element name="Pty" type="Party"/>
            <xs:choice>
                <xs:element name="Cd" type="xs:string"/>
                <xs:element name="Prtry" type="xs:string"/>
            </xs:choice>
            <xs:any namespace="##other" processContents="lax" minOccurs="0"/>
        </xs:sequence>
    </xs:complexType>
    <xs:complexType name="Party">
        <xs:choice>
            <xs:element name="OrgId" type="xs:string"/>
            <xs:element name="PrvtId" type="xs:date"/>
        </xs:choice>
    </xs:complexType>
    <xs:simpleType name="Max35Text">
        <xs:restriction base="xs:string">
            <xs:minLength value="1"/>
            <xs:maxLength value="35"/>
        </xs:restriction>
    </xs:simpleType>
    <xs:simpleType name="StatusCode">
        <xs:restriction base="xs:string">
            <xs:enumeration value="ACCP"/>
            <xs:enumeration value="RJCT"/>
            <xs:enumeration value="PDNG"/>
        </xs:restriction>
    </xs:simpleType>
    <xs:complexType name="ActiveCurrencyAndAmount">
        <xs:simpleContent>
            <xs:extension base="ActiveCurrencyAndAmount_SimpleType">
                <xs:attribute name="Ccy" type="ActiveCurrencyCode" use="required"/>
            </xs:extension>
        </xs:simpleContent>
    </xs:complexType>
    <xs:simpleType name="ActiveCurrencyAndAmount_SimpleType">
        <xs:restriction base="xs:decimal">
            <xs:fractionDigits value="5"/>
            <xs:totalDigits value="18"/>
            <xs:minInclusive value="0"/>
        </xs:restriction>
    </xs:simpleType>
    <xs:simpleType name="ActiveCurrencyCode">
        <xs:restriction base="xs:string">
            <xs:pattern value="[A-Z]{3,3}"/>
        </xs:restriction>
    </xs:simpleType>
</xs:schema>"###;

    fn build(xsd: &str) -> Result<SchemaNode> {
        let schema = load_schema(xsd)?;
        SchemaTreeBuilder::new(&schema).build()
    }

    /// A chain of `depth` nested elements named `E0` .. `E{depth-1}`.
    fn nested_schema(depth: usize) -> String {
        let mut body = format!(r#"<xs:element name="E{}" type="xs:string"/>"#, depth - 1);
        for i in (0..depth - 1).rev() {
            body = format!(
                r#"<xs:element name="E{i}"><xs:complexType><xs:sequence>{body}</xs:sequence></xs:complexType></xs:element>"#
            );
        }
        format!(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{body}</xs:schema>"#)
    }

    #[test]
    fn test_root_node() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        assert_eq!(root.name.as_deref(), Some("Document"));
        assert_eq!(root.xpath.as_deref(), Some("Document"));
        assert_eq!(root.id.as_deref(), Some("Document"));
        assert_eq!(root.min_occurs.as_deref(), Some("1"));
        assert_eq!(root.elements.len(), 6);
    }

    #[test]
    fn test_paths_follow_element_names() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        let mut checked = 0;
        root.walk(&mut |node| {
            if let (Some(xpath), Some(id)) = (&node.xpath, &node.id) {
                assert_eq!(&xpath.replace('/', "_"), id);
                checked += 1;
            }
        });
        assert!(checked >= 9);

        let org = root.find("Document/Pty/OrgId").unwrap();
        assert_eq!(org.id.as_deref(), Some("Document_Pty_OrgId"));
    }

    #[test]
    fn test_simple_element_facets() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        let msg_id = root.find("Document/MsgId").unwrap();
        assert_eq!(msg_id.data_type.as_deref(), Some("string"));
        assert_eq!(msg_id.min_length.as_deref(), Some("1"));
        assert_eq!(msg_id.max_length.as_deref(), Some("35"));
        assert_eq!(msg_id.min_occurs.as_deref(), Some("1"));
        assert_eq!(msg_id.max_occurs.as_deref(), Some("1"));
        assert!(!msg_id.is_currency);
    }

    #[test]
    fn test_enumeration_order() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        let status = root.find("Document/Sts").unwrap();
        assert_eq!(
            status.values,
            Some(vec!["ACCP".into(), "RJCT".into(), "PDNG".into()])
        );
        assert_eq!(status.min_occurs.as_deref(), Some("0"));
    }

    #[test]
    fn test_currency_amount() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        let amount = root.find("Document/Amt").unwrap();
        assert!(amount.is_currency);
        assert_eq!(amount.pattern.as_deref(), Some("[A-Z]{3,3}"));
        assert_eq!(amount.data_type.as_deref(), Some("decimal"));
        assert_eq!(amount.fraction_digits.as_deref(), Some("5"));
        assert_eq!(amount.total_digits.as_deref(), Some("18"));
        assert_eq!(amount.min_inclusive.as_deref(), Some("0"));
        assert_eq!(amount.max_occurs.as_deref(), Some("unbounded"));
        assert!(amount.elements.is_empty());
    }

    #[test]
    fn test_currency_pattern_after_other_facets() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
            <xs:element name="Amt" type="Amount"/>
            <xs:complexType name="Amount">
                <xs:simpleContent>
                    <xs:extension base="xs:decimal">
                        <xs:attribute name="Ccy" type="CurrencyCode"/>
                    </xs:extension>
                </xs:simpleContent>
            </xs:complexType>
            <xs:simpleType name="CurrencyCode">
                <xs:restriction base="xs:string">
                    <xs:maxLength value="3"/>
                    <xs:pattern value="[A-Z]{3}"/>
                    <xs:pattern value="[A-Z]+"/>
                </xs:restriction>
            </xs:simpleType>
        </xs:schema>"#;
        let root = build(xsd).unwrap();
        assert!(root.is_currency);
        assert_eq!(root.pattern.as_deref(), Some("[A-Z]{3}"));
    }

    #[test]
    fn test_currency_without_pattern() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
            <xs:element name="Amt">
                <xs:complexType>
                    <xs:simpleContent>
                        <xs:extension base="xs:decimal">
                            <xs:attribute name="Ccy" type="xs:string"/>
                        </xs:extension>
                    </xs:simpleContent>
                </xs:complexType>
            </xs:element>
        </xs:schema>"#;
        let root = build(xsd).unwrap();
        assert!(!root.is_currency);
        assert!(root.pattern.is_none());
    }

    #[test]
    fn test_choice_type() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        let party = root.find("Document/Pty").unwrap();
        assert_eq!(party.data_type.as_deref(), Some("choice"));
        assert_eq!(party.elements.len(), 2);
        assert_eq!(party.elements[1].data_type.as_deref(), Some("date"));
    }

    #[test]
    fn test_nested_choice_is_path_transparent() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        let choice = &root.elements[4];
        assert!(choice.is_choice());
        assert!(choice.xpath.is_none());
        assert!(choice.name.is_none());

        let names: Vec<_> = choice.elements.iter().map(|e| e.xpath.as_deref()).collect();
        assert_eq!(names, vec![Some("Document/Cd"), Some("Document/Prtry")]);
    }

    #[test]
    fn test_wildcard_node() {
        let root = build(PAYMENT_SCHEMA).unwrap();
        let any = &root.elements[5];
        assert_eq!(any.name.as_deref(), Some("##other"));
        assert_eq!(any.data_type.as_deref(), Some("any"));
        assert_eq!(any.xpath.as_deref(), Some("Document/Any"));
        assert_eq!(any.id.as_deref(), Some("Document_Any"));
        assert!(any.min_occurs.is_none());
    }

    #[test]
    fn test_depth_below_ceiling() {
        let root = build(&nested_schema(MAX_DEPTH - 1)).unwrap();
        let mut deepest = 0;
        root.walk(&mut |node| {
            if let Some(xpath) = &node.xpath {
                deepest = deepest.max(xpath.split('/').count());
            }
        });
        assert_eq!(deepest, MAX_DEPTH - 1);
    }

    #[test]
    fn test_depth_at_ceiling_fails() {
        let err = build(&nested_schema(MAX_DEPTH)).unwrap_err();
        let TreeError::DepthExceeded { depth, path } = err else {
            panic!("expected DepthExceeded, got {err:?}");
        };
        assert_eq!(depth, MAX_DEPTH);
        assert!(path.ends_with("/E63"));
    }

    #[test]
    fn test_recursive_type_hits_ceiling() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="Node" type="NodeType"/>
            <xs:complexType name="NodeType">
                <xs:sequence>
                    <xs:element name="Child" type="NodeType" minOccurs="0"/>
                </xs:sequence>
            </xs:complexType>
        </xs:schema>"#;

        assert!(matches!(
            build(xsd),
            Err(TreeError::DepthExceeded { depth: 64, .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="Root" type="Missing"/>
        </xs:schema>"#;

        assert!(matches!(build(xsd), Err(TreeError::MalformedSchema(_))));
    }

    #[test]
    fn test_build_document_json() {
        let schema = load_schema(PAYMENT_SCHEMA).unwrap();
        let doc = SchemaTreeBuilder::new(&schema).build_document().unwrap();
        assert_eq!(
            doc.namespace.as_deref(),
            Some("urn:iso:std:iso:20022:tech:xsd:test.001.001.01")
        );

        let json = doc.to_json().unwrap();
        assert!(json.contains(r#""schemaElement":{"id":"Document","name":"Document","minOccurs":"1","isCurrency":false,"xpath":"Document","elements":["#));
        assert!(json.contains(r#""isCurrency":true"#));
    }
}
