//! XSD schema compiler.
//!
//! This module turns XSD text into the compiled [`Schema`] model. It covers
//! the subset of XML Schema that ISO 20022 message definitions use: global
//! and local elements, named and anonymous simple and complex types,
//! sequence/choice/all groups, wildcards, named groups, attributes and
//! attribute groups, and simple/complex content derivation.

use crate::dom::{RawDocument, RawElement, read_document};
use crate::error::ParseError;
use crate::types::{
    AttributeUse, BuiltinType, ComplexType, ElementDecl, ElementForm, Facet, FacetKind,
    MaxOccurs, ModelGroup, Occurs, Particle, ProcessContents, Schema, SimpleType, SimpleVariety,
    TypeDef, TypeId, Wildcard, XSD_NAMESPACE,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Compiles an XSD schema from a string.
///
/// # Arguments
/// * `xml` - XSD schema content
///
/// # Returns
/// Compiled schema or parse error.
///
/// # Errors
/// Returns `ParseError` if the XML is malformed, the document is not an XML
/// Schema, or a declaration references something that does not exist.
pub fn parse_schema(xml: &str) -> Result<Schema, ParseError> {
    let doc = read_document(xml)?;
    if doc.root.local != "schema" {
        return Err(ParseError::unknown_element(
            doc.root.local.as_str(),
            "document",
        ));
    }
    let root_ns = doc.namespace_for(doc.root.prefix.as_deref().unwrap_or(""));
    if root_ns != Some(XSD_NAMESPACE) {
        return Err(ParseError::structure(
            "schema element is not in the XML Schema namespace",
        ));
    }

    let schema = Compiler::new(&doc)?.compile()?;
    debug!(
        target_namespace = schema.target_namespace.as_deref().unwrap_or(""),
        elements = schema.elements.len(),
        types = schema.type_count(),
        "compiled schema"
    );
    Ok(schema)
}

/// Compilation state of one arena slot.
enum Slot<'a> {
    /// Named type whose body has not been compiled yet.
    Pending(&'a RawElement),
    /// Type body currently being compiled.
    InProgress,
    /// Compiled type.
    Done(TypeDef),
}

struct Compiler<'a> {
    doc: &'a RawDocument,
    target_namespace: Option<String>,
    element_form: ElementForm,
    slots: Vec<Slot<'a>>,
    named_types: HashMap<&'a str, TypeId>,
    builtins: HashMap<BuiltinType, TypeId>,
    any_type: Option<TypeId>,
    element_order: Vec<&'a str>,
    global_elements: HashMap<&'a str, &'a RawElement>,
    global_element_types: HashMap<&'a str, TypeId>,
    global_attributes: HashMap<&'a str, &'a RawElement>,
    groups: HashMap<&'a str, &'a RawElement>,
    attribute_groups: HashMap<&'a str, &'a RawElement>,
    group_stack: Vec<&'a str>,
}

impl<'a> Compiler<'a> {
    fn new(doc: &'a RawDocument) -> Result<Self, ParseError> {
        let root = &doc.root;
        let element_form = match root.attr("elementFormDefault") {
            Some(value) => ElementForm::parse(value)
                .ok_or_else(|| ParseError::invalid_attr("schema", "elementFormDefault", value))?,
            None => ElementForm::Unqualified,
        };

        let mut compiler = Self {
            doc,
            target_namespace: root.attr("targetNamespace").map(str::to_string),
            element_form,
            slots: Vec::new(),
            named_types: HashMap::new(),
            builtins: HashMap::new(),
            any_type: None,
            element_order: Vec::new(),
            global_elements: HashMap::new(),
            global_element_types: HashMap::new(),
            global_attributes: HashMap::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
            group_stack: Vec::new(),
        };
        compiler.collect_globals()?;
        Ok(compiler)
    }

    /// Registers every top-level declaration so forward references resolve.
    fn collect_globals(&mut self) -> Result<(), ParseError> {
        let doc = self.doc;
        for node in doc.root.content() {
            match node.local.as_str() {
                "element" => {
                    let name = node.required_attr("name")?;
                    if self.global_elements.insert(name, node).is_some() {
                        return Err(ParseError::duplicate("element", name));
                    }
                    self.element_order.push(name);
                }
                "complexType" | "simpleType" => {
                    let name = node.required_attr("name")?;
                    let id = self.alloc(Slot::Pending(node));
                    if self.named_types.insert(name, id).is_some() {
                        return Err(ParseError::duplicate("type", name));
                    }
                }
                "group" => {
                    let name = node.required_attr("name")?;
                    if self.groups.insert(name, node).is_some() {
                        return Err(ParseError::duplicate("group", name));
                    }
                }
                "attributeGroup" => {
                    let name = node.required_attr("name")?;
                    if self.attribute_groups.insert(name, node).is_some() {
                        return Err(ParseError::duplicate("attributeGroup", name));
                    }
                }
                "attribute" => {
                    let name = node.required_attr("name")?;
                    if self.global_attributes.insert(name, node).is_some() {
                        return Err(ParseError::duplicate("attribute", name));
                    }
                }
                other => warn!(construct = other, "ignoring unsupported top-level schema construct"),
            }
        }
        Ok(())
    }

    fn compile(mut self) -> Result<Schema, ParseError> {
        let mut elements = Vec::with_capacity(self.element_order.len());
        for name in self.element_order.clone() {
            let type_id = self.global_element_type(name)?;
            elements.push(ElementDecl::new(name.to_string(), type_id));
        }

        // Compiling a body may allocate further slots, so the length is re-read.
        let mut index = 0;
        while index < self.slots.len() {
            self.ensure_type(TypeId(index))?;
            index += 1;
        }

        let mut schema = Schema::new(self.target_namespace);
        schema.element_form = self.element_form;
        for slot in self.slots {
            match slot {
                Slot::Done(type_def) => {
                    schema.add_type(type_def);
                }
                Slot::Pending(_) | Slot::InProgress => {
                    return Err(ParseError::structure("type left uncompiled"));
                }
            }
        }
        schema.elements = elements;
        Ok(schema)
    }

    fn alloc(&mut self, slot: Slot<'a>) -> TypeId {
        self.slots.push(slot);
        TypeId(self.slots.len() - 1)
    }

    fn ensure_type(&mut self, id: TypeId) -> Result<(), ParseError> {
        match self.slots[id.0] {
            Slot::Pending(node) => {
                self.slots[id.0] = Slot::InProgress;
                let type_def = self.compile_type_node(node)?;
                self.slots[id.0] = Slot::Done(type_def);
                Ok(())
            }
            Slot::InProgress => Err(ParseError::structure(format!(
                "circular type derivation involving type #{}",
                id.0
            ))),
            Slot::Done(_) => Ok(()),
        }
    }

    /// Returns the compiled body of a type, compiling it on demand.
    fn compiled(&mut self, id: TypeId) -> Result<TypeDef, ParseError> {
        self.ensure_type(id)?;
        match &self.slots[id.0] {
            Slot::Done(type_def) => Ok(type_def.clone()),
            _ => Err(ParseError::structure("type body unavailable")),
        }
    }

    fn builtin(&mut self, builtin: BuiltinType) -> TypeId {
        if let Some(&id) = self.builtins.get(&builtin) {
            return id;
        }
        let id = self.alloc(Slot::Done(TypeDef::Simple(SimpleType::builtin(builtin))));
        self.builtins.insert(builtin, id);
        id
    }

    /// The `xs:anyType` ur-type: mixed content with any elements.
    fn any_type(&mut self) -> TypeId {
        if let Some(id) = self.any_type {
            return id;
        }
        let mut any = ComplexType::new(Some("anyType".to_string()));
        any.mixed = true;
        any.content = Some(Particle::Sequence(ModelGroup::new(vec![Particle::Any(
            Wildcard {
                namespace: "##any".to_string(),
                process_contents: ProcessContents::Lax,
                occurs: Occurs::new(0, MaxOccurs::Unbounded),
            },
        )])));
        let id = self.alloc(Slot::Done(TypeDef::Complex(any)));
        self.any_type = Some(id);
        id
    }

    fn resolve_type_ref(&mut self, qname: &str, context: &str) -> Result<TypeId, ParseError> {
        let (prefix, local) = match qname.split_once(':') {
            Some((prefix, local)) => (prefix, local),
            None => ("", qname),
        };

        if self.doc.namespace_for(prefix) == Some(XSD_NAMESPACE) {
            if local == "anyType" {
                return Ok(self.any_type());
            }
            return BuiltinType::from_xsd_name(local)
                .map(|builtin| self.builtin(builtin))
                .ok_or_else(|| ParseError::unknown_type(qname, context));
        }

        self.named_types
            .get(local)
            .copied()
            .ok_or_else(|| ParseError::unknown_type(qname, context))
    }

    fn compile_anonymous(&mut self, node: &'a RawElement) -> Result<TypeId, ParseError> {
        let id = self.alloc(Slot::InProgress);
        let type_def = self.compile_type_node(node)?;
        self.slots[id.0] = Slot::Done(type_def);
        Ok(id)
    }

    fn compile_type_node(&mut self, node: &'a RawElement) -> Result<TypeDef, ParseError> {
        let name = node.attr("name");
        match node.local.as_str() {
            "complexType" => Ok(TypeDef::Complex(self.compile_complex(node, name)?)),
            "simpleType" => Ok(TypeDef::Simple(self.compile_simple(node, name)?)),
            other => Err(ParseError::unknown_element(other, "type definition")),
        }
    }

    fn compile_simple(
        &mut self,
        node: &'a RawElement,
        name: Option<&str>,
    ) -> Result<SimpleType, ParseError> {
        let context = name.unwrap_or("anonymous simpleType");
        let derivation = node
            .content()
            .find(|c| matches!(c.local.as_str(), "restriction" | "list" | "union"))
            .ok_or_else(|| {
                ParseError::structure(format!("simpleType '{context}' has no derivation"))
            })?;

        let (builtin, variety) = match derivation.local.as_str() {
            "restriction" => {
                let base = self.simple_base(derivation, "base", context)?;
                let builtin = self.builtin_of(base, context)?;
                let facets = derivation
                    .content()
                    .filter(|c| c.local != "simpleType")
                    .map(|c| {
                        Ok(Facet::new(
                            FacetKind::from_xsd_name(&c.local),
                            c.required_attr("value")?,
                        ))
                    })
                    .collect::<Result<Vec<_>, ParseError>>()?;
                (builtin, SimpleVariety::Restriction { base, facets })
            }
            "list" => {
                let item = self.simple_base(derivation, "itemType", context)?;
                (self.builtin_of(item, context)?, SimpleVariety::List { item })
            }
            _ => {
                let mut members = Vec::new();
                if let Some(member_types) = derivation.attr("memberTypes") {
                    for member in member_types.split_whitespace() {
                        members.push(self.resolve_type_ref(member, context)?);
                    }
                }
                for inline in derivation.content().filter(|c| c.local == "simpleType") {
                    members.push(self.compile_anonymous(inline)?);
                }
                (BuiltinType::AnySimpleType, SimpleVariety::Union { members })
            }
        };

        Ok(SimpleType {
            name: name.map(str::to_string),
            builtin,
            variety,
        })
    }

    /// Resolves the base of a restriction or list, named or inline.
    fn simple_base(
        &mut self,
        derivation: &'a RawElement,
        attribute: &str,
        context: &str,
    ) -> Result<TypeId, ParseError> {
        if let Some(base) = derivation.attr(attribute) {
            return self.resolve_type_ref(base, context);
        }
        match derivation.child("simpleType") {
            Some(inline) => self.compile_anonymous(inline),
            None => Err(ParseError::missing_attr(
                derivation.local.as_str(),
                attribute,
            )),
        }
    }

    fn builtin_of(&mut self, id: TypeId, context: &str) -> Result<BuiltinType, ParseError> {
        match self.compiled(id)? {
            TypeDef::Simple(simple) => Ok(simple.builtin),
            TypeDef::Complex(_) => Err(ParseError::structure(format!(
                "simple type '{context}' derives from a complex type"
            ))),
        }
    }

    fn compile_complex(
        &mut self,
        node: &'a RawElement,
        name: Option<&str>,
    ) -> Result<ComplexType, ParseError> {
        let mut complex = ComplexType::new(name.map(str::to_string));
        complex.mixed = node.attr("mixed") == Some("true");

        for child in node.content() {
            match child.local.as_str() {
                "sequence" | "choice" | "all" => complex.content = Some(self.compile_group(child)?),
                "group" => complex.content = Some(self.compile_group_ref(child)?),
                "attribute" => self.apply_attribute(child, &mut complex.attributes)?,
                "attributeGroup" => self.apply_attribute_group(child, &mut complex.attributes)?,
                "simpleContent" => self.compile_simple_content(child, &mut complex)?,
                "complexContent" => self.compile_complex_content(child, &mut complex)?,
                "anyAttribute" => {}
                other => warn!(construct = other, "ignoring unsupported complexType member"),
            }
        }
        Ok(complex)
    }

    fn compile_simple_content(
        &mut self,
        node: &'a RawElement,
        complex: &mut ComplexType,
    ) -> Result<(), ParseError> {
        let derivation = derivation_of(node)?;
        let base_name = derivation.required_attr("base")?;
        let base = self.resolve_type_ref(base_name, "simpleContent")?;

        let simple_base = match self.compiled(base)? {
            TypeDef::Simple(_) => base,
            TypeDef::Complex(base_complex) => {
                complex.attributes = base_complex.attributes;
                base_complex.simple_base.ok_or_else(|| {
                    ParseError::structure(format!(
                        "simpleContent base '{base_name}' has no simple content"
                    ))
                })?
            }
        };

        let facets = derivation
            .content()
            .filter(|c| {
                !matches!(
                    c.local.as_str(),
                    "attribute" | "attributeGroup" | "anyAttribute" | "simpleType"
                )
            })
            .map(|c| {
                Ok(Facet::new(
                    FacetKind::from_xsd_name(&c.local),
                    c.required_attr("value")?,
                ))
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        complex.simple_base = Some(if facets.is_empty() {
            simple_base
        } else {
            let builtin = self.builtin_of(simple_base, base_name)?;
            self.alloc(Slot::Done(TypeDef::Simple(SimpleType {
                name: None,
                builtin,
                variety: SimpleVariety::Restriction {
                    base: simple_base,
                    facets,
                },
            })))
        });

        self.apply_attributes(derivation, &mut complex.attributes)
    }

    fn compile_complex_content(
        &mut self,
        node: &'a RawElement,
        complex: &mut ComplexType,
    ) -> Result<(), ParseError> {
        complex.mixed |= node.attr("mixed") == Some("true");
        let derivation = derivation_of(node)?;
        let base_name = derivation.required_attr("base")?;
        let base = self.resolve_type_ref(base_name, "complexContent")?;

        let TypeDef::Complex(base_complex) = self.compiled(base)? else {
            return Err(ParseError::structure(format!(
                "complexContent base '{base_name}' is a simple type"
            )));
        };
        complex.attributes = base_complex.attributes;

        let mut own = None;
        for child in derivation.content() {
            match child.local.as_str() {
                "sequence" | "choice" | "all" => own = Some(self.compile_group(child)?),
                "group" => own = Some(self.compile_group_ref(child)?),
                _ => {}
            }
        }

        complex.content = if derivation.local == "extension" {
            match (base_complex.content, own) {
                (Some(inherited), Some(own)) => {
                    Some(Particle::Sequence(ModelGroup::new(vec![inherited, own])))
                }
                (inherited, own) => own.or(inherited),
            }
        } else {
            own
        };

        self.apply_attributes(derivation, &mut complex.attributes)
    }

    fn compile_group(&mut self, node: &'a RawElement) -> Result<Particle, ParseError> {
        let mut group = ModelGroup {
            occurs: read_occurs(node)?,
            particles: Vec::new(),
        };
        for child in node.content() {
            if let Some(particle) = self.compile_particle(child)? {
                group.particles.push(particle);
            }
        }

        Ok(match node.local.as_str() {
            "choice" => Particle::Choice(group),
            "all" => Particle::All(group),
            _ => Particle::Sequence(group),
        })
    }

    fn compile_particle(&mut self, node: &'a RawElement) -> Result<Option<Particle>, ParseError> {
        let particle = match node.local.as_str() {
            "element" => Particle::Element(self.compile_local_element(node)?),
            "sequence" | "choice" | "all" => self.compile_group(node)?,
            "group" => self.compile_group_ref(node)?,
            "any" => {
                let process_contents = match node.attr("processContents") {
                    Some(value) => ProcessContents::parse(value)
                        .ok_or_else(|| ParseError::invalid_attr("any", "processContents", value))?,
                    None => ProcessContents::Strict,
                };
                Particle::Any(Wildcard {
                    namespace: node.attr("namespace").unwrap_or("##any").to_string(),
                    process_contents,
                    occurs: read_occurs(node)?,
                })
            }
            other => {
                warn!(construct = other, "ignoring unsupported particle");
                return Ok(None);
            }
        };
        Ok(Some(particle))
    }

    fn compile_group_ref(&mut self, node: &'a RawElement) -> Result<Particle, ParseError> {
        let name = local_part(node.required_attr("ref")?);
        let group = self
            .groups
            .get(name)
            .copied()
            .ok_or_else(|| ParseError::unknown_ref("group", name))?;
        if self.group_stack.contains(&name) {
            return Err(ParseError::structure(format!(
                "circular group reference '{name}'"
            )));
        }

        let inner = group
            .content()
            .find(|c| matches!(c.local.as_str(), "sequence" | "choice" | "all"))
            .ok_or_else(|| ParseError::structure(format!("group '{name}' has no model group")))?;

        self.group_stack.push(name);
        let compiled = self.compile_group(inner);
        self.group_stack.pop();

        let occurs = read_occurs(node)?;
        Ok(match compiled? {
            Particle::Sequence(g) => Particle::Sequence(ModelGroup { occurs, ..g }),
            Particle::Choice(g) => Particle::Choice(ModelGroup { occurs, ..g }),
            Particle::All(g) => Particle::All(ModelGroup { occurs, ..g }),
            other => other,
        })
    }

    fn compile_local_element(&mut self, node: &'a RawElement) -> Result<ElementDecl, ParseError> {
        let occurs = read_occurs(node)?;

        if let Some(reference) = node.attr("ref") {
            let name = local_part(reference);
            let type_id = self.global_element_type(name)?;
            return Ok(ElementDecl {
                name: name.to_string(),
                type_id,
                occurs,
                qualified: true,
            });
        }

        let name = node.required_attr("name")?;
        let form = match node.attr("form") {
            Some(value) => ElementForm::parse(value)
                .ok_or_else(|| ParseError::invalid_attr("element", "form", value))?,
            None => self.element_form,
        };
        Ok(ElementDecl {
            name: name.to_string(),
            type_id: self.element_type(node)?,
            occurs,
            qualified: form == ElementForm::Qualified,
        })
    }

    fn element_type(&mut self, node: &'a RawElement) -> Result<TypeId, ParseError> {
        if let Some(type_name) = node.attr("type") {
            let context = node.attr("name").unwrap_or("element");
            return self.resolve_type_ref(type_name, context);
        }
        match node
            .content()
            .find(|c| matches!(c.local.as_str(), "complexType" | "simpleType"))
        {
            Some(inline) => self.compile_anonymous(inline),
            None => Ok(self.any_type()),
        }
    }

    fn global_element_type(&mut self, name: &'a str) -> Result<TypeId, ParseError> {
        if let Some(&id) = self.global_element_types.get(name) {
            return Ok(id);
        }
        let node = self
            .global_elements
            .get(name)
            .copied()
            .ok_or_else(|| ParseError::unknown_ref("element", name))?;

        let inline = node
            .content()
            .find(|c| matches!(c.local.as_str(), "complexType" | "simpleType"));
        match inline {
            Some(inline) if node.attr("type").is_none() => {
                // Registered before compiling so self-references resolve.
                let id = self.alloc(Slot::Pending(inline));
                self.global_element_types.insert(name, id);
                self.ensure_type(id)?;
                Ok(id)
            }
            _ => {
                let id = self.element_type(node)?;
                self.global_element_types.insert(name, id);
                Ok(id)
            }
        }
    }

    fn apply_attributes(
        &mut self,
        node: &'a RawElement,
        attributes: &mut Vec<AttributeUse>,
    ) -> Result<(), ParseError> {
        for child in node.content() {
            match child.local.as_str() {
                "attribute" => self.apply_attribute(child, attributes)?,
                "attributeGroup" => self.apply_attribute_group(child, attributes)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn apply_attribute(
        &mut self,
        node: &'a RawElement,
        attributes: &mut Vec<AttributeUse>,
    ) -> Result<(), ParseError> {
        let decl = match node.attr("ref") {
            Some(reference) => {
                let name = local_part(reference);
                self.global_attributes
                    .get(name)
                    .copied()
                    .ok_or_else(|| ParseError::unknown_ref("attribute", name))?
            }
            None => node,
        };
        let name = decl.required_attr("name")?;

        let required = match node.attr("use").unwrap_or("optional") {
            "required" => true,
            "optional" => false,
            "prohibited" => {
                attributes.retain(|a| a.name != name);
                return Ok(());
            }
            other => return Err(ParseError::invalid_attr("attribute", "use", other)),
        };

        let type_id = match decl.attr("type") {
            Some(type_name) => self.resolve_type_ref(type_name, name)?,
            None => match decl.child("simpleType") {
                Some(inline) => self.compile_anonymous(inline)?,
                None => self.builtin(BuiltinType::AnySimpleType),
            },
        };

        let attribute = AttributeUse {
            name: name.to_string(),
            type_id,
            required,
        };
        match attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => attributes.push(attribute),
        }
        Ok(())
    }

    fn apply_attribute_group(
        &mut self,
        node: &'a RawElement,
        attributes: &mut Vec<AttributeUse>,
    ) -> Result<(), ParseError> {
        let name = local_part(node.required_attr("ref")?);
        let group = self
            .attribute_groups
            .get(name)
            .copied()
            .ok_or_else(|| ParseError::unknown_ref("attributeGroup", name))?;
        if self.group_stack.contains(&name) {
            return Err(ParseError::structure(format!(
                "circular attributeGroup reference '{name}'"
            )));
        }

        self.group_stack.push(name);
        let applied = self.apply_attributes(group, attributes);
        self.group_stack.pop();
        applied
    }
}

fn derivation_of(node: &RawElement) -> Result<&RawElement, ParseError> {
    node.content()
        .find(|c| matches!(c.local.as_str(), "extension" | "restriction"))
        .ok_or_else(|| {
            ParseError::structure(format!("{} has no extension or restriction", node.local))
        })
}

fn read_occurs(node: &RawElement) -> Result<Occurs, ParseError> {
    let min = match node.attr("minOccurs") {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ParseError::invalid_attr(node.local.as_str(), "minOccurs", value))?,
        None => 1,
    };
    let max = match node.attr("maxOccurs") {
        Some(value) => MaxOccurs::parse(value)
            .ok_or_else(|| ParseError::invalid_attr(node.local.as_str(), "maxOccurs", value))?,
        None => MaxOccurs::Bounded(1),
    };
    Ok(Occurs::new(min, max))
}

fn local_part(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}
