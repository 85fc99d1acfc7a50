//! Instance document validation against an XSD.
//!
//! The validator streams the instance through a namespace-aware reader and
//! checks every element when it opens (declaration, position in the parent's
//! content model, attributes) and when it closes (complete content, text
//! value). Only the first problem is reported.

use crate::content::{ContentModel, Term};
use crate::error::{MessageError, Result};
use crate::simple::SimpleTypeChecker;
use isoxsd_schema::{
    ComplexType, Occurs, ProcessContents, Schema, TypeDef, TypeId, XSI_NAMESPACE, load_schema,
};
use quick_xml::NsReader;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use std::collections::HashMap;
use tracing::debug;

/// Result of validating one instance document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// True if the document conforms to the schema.
    pub is_valid: bool,
    /// First validation error, empty when valid.
    pub message: String,
}

impl ValidationOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::new(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }

    /// Converts the outcome into a `Result`.
    ///
    /// # Errors
    /// Returns `MessageError::ValidationFailure` carrying the message if the
    /// document is invalid.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(MessageError::ValidationFailure {
                message: self.message,
            })
        }
    }
}

/// Returns the `targetNamespace` of a schema document.
///
/// The first element whose local name is `schema` is inspected, whatever its
/// prefix.
///
/// # Errors
/// Returns `MessageError::NamespaceNotFound` if there is no such element or it
/// has no `targetNamespace`, or `MessageError::Xml` if the text is not
/// well-formed before that point.
pub fn extract_target_namespace(xsd: &str) -> Result<String> {
    let mut reader = Reader::from_str(xsd);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"schema" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"targetNamespace" {
                        let raw = String::from_utf8_lossy(&attr.value);
                        let value = unescape(&raw).map_err(quick_xml::Error::from)?;
                        return Ok(value.into_owned());
                    }
                }
                return Err(MessageError::NamespaceNotFound);
            }
            Event::Eof => return Err(MessageError::NamespaceNotFound),
            _ => {}
        }
    }
}

/// Validates an instance document against a schema.
///
/// # Errors
/// Returns `MessageError::NamespaceNotFound` or `MessageError::MalformedSchema`
/// if the schema cannot be used. Problems with the instance are reported in
/// the outcome, not as errors.
pub fn validate(xsd: &str, xml: &str) -> Result<ValidationOutcome> {
    Ok(SchemaValidator::new(xsd)?.validate(xml))
}

/// Compiled schema ready to validate instance documents.
///
/// A validator is immutable once built and can be shared across threads.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Schema,
    target_namespace: String,
    models: HashMap<TypeId, ContentModel>,
    simple: SimpleTypeChecker,
}

impl SchemaValidator {
    /// Compiles a schema document for validation.
    ///
    /// # Errors
    /// Returns `MessageError::NamespaceNotFound` if the schema has no target
    /// namespace, or `MessageError::MalformedSchema` if it does not compile.
    pub fn new(xsd: &str) -> Result<Self> {
        let target_namespace = extract_target_namespace(xsd)?;
        let schema = load_schema(xsd)?;
        Self::with_namespace(schema, target_namespace)
    }

    /// Builds a validator from an already compiled schema.
    ///
    /// # Errors
    /// Returns `MessageError::NamespaceNotFound` if the schema has no target
    /// namespace, or `MessageError::MalformedSchema` if a pattern facet does
    /// not compile.
    pub fn from_schema(schema: Schema) -> Result<Self> {
        let target_namespace = schema
            .target_namespace
            .clone()
            .ok_or(MessageError::NamespaceNotFound)?;
        Self::with_namespace(schema, target_namespace)
    }

    fn with_namespace(schema: Schema, target_namespace: String) -> Result<Self> {
        let models = schema
            .types()
            .filter_map(|(id, type_def)| match type_def {
                TypeDef::Complex(complex) => {
                    Some((id, ContentModel::compile(complex.content.as_ref())))
                }
                TypeDef::Simple(_) => None,
            })
            .collect();
        let simple = SimpleTypeChecker::new(&schema)?;

        debug!(namespace = %target_namespace, types = schema.type_count(), "Schema validator ready");
        Ok(Self {
            schema,
            target_namespace,
            models,
            simple,
        })
    }

    /// Returns the compiled schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the target namespace the validator checks against.
    #[must_use]
    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    /// Validates an instance document.
    ///
    /// Malformed XML ends the run and is reported like any validation error.
    #[must_use]
    pub fn validate(&self, xml: &str) -> ValidationOutcome {
        let outcome = match Run::new(self).execute(xml) {
            Ok(()) => ValidationOutcome::valid(),
            Err(message) => ValidationOutcome::invalid(message),
        };
        debug!(is_valid = outcome.is_valid, message = %outcome.message, "Validation finished");
        outcome
    }

    fn frame_kind(&self, id: TypeId) -> std::result::Result<FrameKind<'_>, String> {
        match self.schema.get_type(id) {
            Some(TypeDef::Simple(_)) => Ok(FrameKind::Simple(id)),
            Some(TypeDef::Complex(complex)) => {
                let model = self
                    .models
                    .get(&id)
                    .ok_or_else(|| format!("No content model for type #{}", id.index()))?;
                Ok(FrameKind::Complex {
                    complex,
                    model,
                    states: model.start(),
                })
            }
            None => Err(format!("Type #{} is not defined", id.index())),
        }
    }

    /// Finds a global element by expanded name.
    fn global(&self, namespace: Option<&str>, local: &str) -> Option<TypeId> {
        if namespace != Some(self.target_namespace.as_str()) {
            return None;
        }
        self.schema.get_element(local).map(|decl| decl.type_id)
    }
}

enum FrameKind<'v> {
    /// Content is not validated.
    Skip,
    Simple(TypeId),
    Complex {
        complex: &'v ComplexType,
        model: &'v ContentModel,
        states: Vec<usize>,
    },
}

struct Frame<'v> {
    name: String,
    kind: FrameKind<'v>,
    text: String,
    children: Vec<String>,
}

/// State of one validation pass.
struct Run<'v> {
    validator: &'v SchemaValidator,
    frames: Vec<Frame<'v>>,
    root_seen: bool,
}

type Check = std::result::Result<(), String>;

impl<'v> Run<'v> {
    fn new(validator: &'v SchemaValidator) -> Self {
        Self {
            validator,
            frames: Vec::new(),
            root_seen: false,
        }
    }

    fn execute(mut self, xml: &str) -> Check {
        let mut reader = NsReader::from_str(xml);
        loop {
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|e| format!("The XML is not well-formed: {e}"))?;
            let namespace = match resolved {
                ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
                ResolveResult::Unbound => None,
                ResolveResult::Unknown(prefix) => {
                    return Err(format!(
                        "The namespace prefix '{}' is not declared",
                        String::from_utf8_lossy(&prefix)
                    ));
                }
            };

            match event {
                Event::Start(e) => self.open(&reader, &e, namespace)?,
                Event::Empty(e) => {
                    self.open(&reader, &e, namespace)?;
                    self.close()?;
                }
                Event::End(_) => self.close()?,
                Event::Text(t) => self.text(&String::from_utf8_lossy(&t))?,
                Event::CData(c) => self.text(&String::from_utf8_lossy(&c))?,
                Event::GeneralRef(r) => {
                    let raw = String::from_utf8_lossy(&r);
                    let reference = format!("&{raw};");
                    let resolved = unescape(&reference)
                        .map_err(|_| format!("Reference to undeclared entity '{raw}'"))?;
                    self.text(&resolved)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(frame) = self.frames.last() {
            return Err(format!(
                "Unexpected end of file while parsing element '{}'",
                frame.name
            ));
        }
        if !self.root_seen {
            return Err("Root element is missing".to_string());
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Check {
        match self.frames.last_mut() {
            Some(frame) if !matches!(frame.kind, FrameKind::Skip) => frame.text.push_str(text),
            Some(_) => {}
            None if text.trim().is_empty() => {}
            None => return Err("Data at the root level is invalid".to_string()),
        }
        Ok(())
    }

    fn open(
        &mut self,
        reader: &NsReader<&[u8]>,
        start: &BytesStart<'_>,
        namespace: Option<String>,
    ) -> Check {
        let validator = self.validator;
        let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let namespace = namespace.as_deref();
        let target = Some(validator.target_namespace.as_str());

        let kind = match self.frames.last_mut() {
            None => {
                if self.root_seen {
                    return Err("There are multiple root elements".to_string());
                }
                self.root_seen = true;
                let type_id = validator
                    .global(namespace, &local)
                    .ok_or_else(|| format!("The '{}' element is not declared", expanded(namespace, &local)))?;
                validator.frame_kind(type_id)?
            }
            Some(parent) => match &mut parent.kind {
                FrameKind::Skip => FrameKind::Skip,
                FrameKind::Simple(_) => {
                    return Err(format!(
                        "The element '{}' cannot contain child element '{local}' because its type is simple",
                        parent.name
                    ));
                }
                FrameKind::Complex {
                    complex,
                    model,
                    states,
                } => {
                    let model: &'v ContentModel = *model;
                    if complex.has_simple_content() {
                        return Err(format!(
                            "The element '{}' cannot contain child element '{local}' because it has simple content",
                            parent.name
                        ));
                    }

                    let Some((next, term)) =
                        model.step(states, |term| term_matches(term, namespace, &local, target))
                    else {
                        return Err(format!(
                            "The element '{}' has invalid child element '{local}'{}",
                            parent.name,
                            expected_suffix(&model.expected(states))
                        ));
                    };
                    *states = next;
                    parent.children.push(local.clone());

                    match term {
                        Term::Element(decl) => validator.frame_kind(decl.type_id)?,
                        Term::Any(wildcard) => match wildcard.process_contents {
                            ProcessContents::Skip => FrameKind::Skip,
                            ProcessContents::Lax => match validator.global(namespace, &local) {
                                Some(type_id) => validator.frame_kind(type_id)?,
                                None => FrameKind::Skip,
                            },
                            ProcessContents::Strict => {
                                let type_id = validator.global(namespace, &local).ok_or_else(|| {
                                    format!("The '{}' element is not declared", expanded(namespace, &local))
                                })?;
                                validator.frame_kind(type_id)?
                            }
                        },
                    }
                }
            },
        };

        self.check_attributes(reader, start, &local, &kind)?;
        self.frames.push(Frame {
            name: local,
            kind,
            text: String::new(),
            children: Vec::new(),
        });
        Ok(())
    }

    fn check_attributes(
        &self,
        reader: &NsReader<&[u8]>,
        start: &BytesStart<'_>,
        element: &str,
        kind: &FrameKind<'v>,
    ) -> Check {
        let complex = match kind {
            FrameKind::Skip => return Ok(()),
            FrameKind::Simple(_) => None,
            FrameKind::Complex { complex, .. } => Some(*complex),
        };
        let schema = &self.validator.schema;
        let mut seen = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| format!("The XML is not well-formed: {e}"))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }

            let (resolved, local_name) = reader.resolver().resolve_attribute(attr.key);
            let name = String::from_utf8_lossy(local_name.as_ref()).into_owned();
            match resolved {
                ResolveResult::Bound(ns) if ns.as_ref() == XSI_NAMESPACE.as_bytes() => continue,
                ResolveResult::Unbound => {}
                _ => return Err(format!("The '{name}' attribute is not declared")),
            }

            let Some(declared) = complex.and_then(|c| c.get_attribute(&name)) else {
                return Err(format!("The '{name}' attribute is not declared"));
            };
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw)
                .map_err(|_| format!("The '{name}' attribute has an invalid value"))?;
            self.validator
                .simple
                .check(schema, declared.type_id, &value)
                .map_err(|reason| format!("The '{name}' attribute is invalid - {reason}"))?;
            seen.push(name);
        }

        if let Some(complex) = complex {
            if let Some(missing) = complex
                .attributes
                .iter()
                .find(|a| a.required && !seen.contains(&a.name))
            {
                return Err(format!(
                    "The required attribute '{}' is missing on element '{element}'",
                    missing.name
                ));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Check {
        let Some(frame) = self.frames.pop() else {
            return Err("Unexpected end tag".to_string());
        };
        let validator = self.validator;
        let invalid = |reason: String| format!("The '{}' element is invalid - {reason}", frame.name);

        match &frame.kind {
            FrameKind::Skip => Ok(()),
            FrameKind::Simple(id) => validator
                .simple
                .check(&validator.schema, *id, &frame.text)
                .map_err(invalid),
            FrameKind::Complex {
                complex,
                model,
                states,
            } => {
                if !model.accepts(states) {
                    return Err(format!(
                        "The element '{}' has incomplete content{}",
                        frame.name,
                        expected_suffix(&model.expected(states))
                    ));
                }

                for group in model.all_groups() {
                    for (name, min, max) in &group.members {
                        let count = frame.children.iter().filter(|c| *c == name).count() as u64;
                        if count < *min || !Occurs::new(*min, *max).allows(count) {
                            return Err(format!(
                                "The element '{}' must contain '{name}' between {min} and {max} times",
                                frame.name
                            ));
                        }
                    }
                }

                match complex.simple_base {
                    Some(base) => validator
                        .simple
                        .check(&validator.schema, base, &frame.text)
                        .map_err(invalid),
                    None if !complex.mixed && !frame.text.trim().is_empty() => Err(format!(
                        "The element '{}' cannot contain text because its content is element-only",
                        frame.name
                    )),
                    None => Ok(()),
                }
            }
        }
    }
}

fn term_matches(term: &Term, namespace: Option<&str>, local: &str, target: Option<&str>) -> bool {
    match term {
        Term::Element(decl) => {
            let expected = if decl.qualified { target } else { None };
            decl.name == local && namespace == expected
        }
        Term::Any(wildcard) => wildcard.matches_namespace(namespace, target),
    }
}

fn expanded(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}:{local}"),
        None => local.to_string(),
    }
}

fn expected_suffix(expected: &[String]) -> String {
    if expected.is_empty() {
        String::new()
    } else {
        format!(". Expected: {}", expected.join(", "))
    }
}
