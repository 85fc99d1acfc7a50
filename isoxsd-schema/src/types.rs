//! Compiled schema model.
//!
//! This module contains the navigable representation of an XSD after
//! compilation: global elements, an arena of simple and complex types,
//! content particles, attribute uses and restriction facets. Types are
//! addressed by [`TypeId`] so that recursive content models need no shared
//! ownership.

use std::collections::HashMap;
use std::fmt;

/// Namespace URI of the XML Schema vocabulary.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Namespace URI of the XML Schema instance vocabulary.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Index of a type definition inside a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Returns the arena index of this type.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Complete compiled schema.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Target namespace of the schema document.
    pub target_namespace: Option<String>,
    /// Whether locally declared elements are namespace qualified by default.
    pub element_form: ElementForm,
    /// Global element declarations in declaration order.
    pub elements: Vec<ElementDecl>,
    /// Type arena.
    types: Vec<TypeDef>,
    /// Named type lookup map.
    type_map: HashMap<String, TypeId>,
}

impl Schema {
    /// Creates a new empty schema.
    #[must_use]
    pub fn new(target_namespace: Option<String>) -> Self {
        Self {
            target_namespace,
            element_form: ElementForm::Unqualified,
            elements: Vec::new(),
            types: Vec::new(),
            type_map: HashMap::new(),
        }
    }

    /// Adds a type definition and returns its id.
    pub fn add_type(&mut self, type_def: TypeDef) -> TypeId {
        let id = TypeId(self.types.len());
        if let Some(name) = type_def.name().filter(|_| !type_def.is_builtin()) {
            self.type_map.insert(name.to_string(), id);
        }
        self.types.push(type_def);
        id
    }

    /// Returns the type definition for `id`.
    ///
    /// # Panics
    /// Panics if `id` was not issued by this schema.
    #[must_use]
    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0]
    }

    /// Looks up a type definition by id.
    #[must_use]
    pub fn get_type(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.0)
    }

    /// Looks up a named type.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_map.get(name).copied()
    }

    /// Looks up a global element declaration by name.
    #[must_use]
    pub fn get_element(&self, name: &str) -> Option<&ElementDecl> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Iterates over all types with their ids.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeDef)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }

    /// Returns the number of types in the arena.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

/// Default namespace qualification of local declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementForm {
    /// Local elements carry the target namespace.
    Qualified,
    /// Local elements carry no namespace.
    #[default]
    Unqualified,
}

impl ElementForm {
    /// Parses a form value from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "qualified" => Some(Self::Qualified),
            "unqualified" => Some(Self::Unqualified),
            _ => None,
        }
    }
}

/// Lower and upper occurrence bounds of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurs {
    /// Minimum number of occurrences.
    pub min: u64,
    /// Maximum number of occurrences.
    pub max: MaxOccurs,
}

impl Occurs {
    /// Exactly one occurrence.
    pub const ONCE: Self = Self {
        min: 1,
        max: MaxOccurs::Bounded(1),
    };

    /// Creates occurrence bounds.
    #[must_use]
    pub const fn new(min: u64, max: MaxOccurs) -> Self {
        Self { min, max }
    }

    /// Returns true if `count` occurrences are permitted by the upper bound.
    #[must_use]
    pub const fn allows(&self, count: u64) -> bool {
        match self.max {
            MaxOccurs::Bounded(max) => count <= max,
            MaxOccurs::Unbounded => true,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::ONCE
    }
}

/// Upper occurrence bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxOccurs {
    /// A finite bound.
    Bounded(u64),
    /// `maxOccurs="unbounded"`.
    Unbounded,
}

impl MaxOccurs {
    /// Parses an upper bound from its attribute value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "unbounded" => Some(Self::Unbounded),
            other => other.parse().ok().map(Self::Bounded),
        }
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Element declaration, global or local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    /// Element local name.
    pub name: String,
    /// Declared type.
    pub type_id: TypeId,
    /// Occurrence bounds (always once for global declarations).
    pub occurs: Occurs,
    /// Whether the element name is namespace qualified.
    pub qualified: bool,
}

impl ElementDecl {
    /// Creates a new element declaration occurring exactly once.
    #[must_use]
    pub fn new(name: String, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            occurs: Occurs::ONCE,
            qualified: true,
        }
    }
}

/// Type definition variants.
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// Simple type definition.
    Simple(SimpleType),
    /// Complex type definition.
    Complex(ComplexType),
}

impl TypeDef {
    /// Returns the name of the type, if it is a named type.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Simple(s) => s.name.as_deref(),
            Self::Complex(c) => c.name.as_deref(),
        }
    }

    /// Returns true if this is a simple type.
    #[must_use]
    pub const fn is_simple(&self) -> bool {
        matches!(self, Self::Simple(_))
    }

    /// Returns true if this is a complex type.
    #[must_use]
    pub const fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    /// Returns true if this is one of the built-in XSD datatypes.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        matches!(
            self,
            Self::Simple(SimpleType {
                variety: SimpleVariety::Atomic,
                ..
            })
        )
    }
}

/// Simple type definition.
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Type name (None for anonymous types).
    pub name: Option<String>,
    /// Nearest built-in value type.
    pub builtin: BuiltinType,
    /// How the type is derived.
    pub variety: SimpleVariety,
}

impl SimpleType {
    /// Creates the simple type for a built-in datatype.
    #[must_use]
    pub fn builtin(builtin: BuiltinType) -> Self {
        Self {
            name: Some(builtin.xsd_name().to_string()),
            builtin,
            variety: SimpleVariety::Atomic,
        }
    }

    /// Returns the facets declared directly on this type.
    #[must_use]
    pub fn facets(&self) -> &[Facet] {
        match &self.variety {
            SimpleVariety::Restriction { facets, .. } => facets,
            _ => &[],
        }
    }

    /// Returns true if this type is a restriction of another simple type.
    #[must_use]
    pub const fn is_restriction(&self) -> bool {
        matches!(self.variety, SimpleVariety::Restriction { .. })
    }
}

/// Derivation variety of a simple type.
#[derive(Debug, Clone)]
pub enum SimpleVariety {
    /// A built-in primitive or derived datatype.
    Atomic,
    /// Restriction of a base simple type by facets.
    Restriction {
        /// Base type.
        base: TypeId,
        /// Facets in declaration order.
        facets: Vec<Facet>,
    },
    /// Whitespace separated list of an item type.
    List {
        /// Item type.
        item: TypeId,
    },
    /// Union of member types.
    Union {
        /// Member types.
        members: Vec<TypeId>,
    },
}

/// Complex type definition.
#[derive(Debug, Clone, Default)]
pub struct ComplexType {
    /// Type name (None for anonymous types).
    pub name: Option<String>,
    /// Simple base type when the type has simple content.
    pub simple_base: Option<TypeId>,
    /// Attribute uses, including inherited ones.
    pub attributes: Vec<AttributeUse>,
    /// Content particle (None for empty or simple content).
    pub content: Option<Particle>,
    /// Whether character data may be mixed with child elements.
    pub mixed: bool,
}

impl ComplexType {
    /// Creates a new empty complex type.
    #[must_use]
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Looks up an attribute use by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeUse> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Returns true if the type has simple content.
    #[must_use]
    pub const fn has_simple_content(&self) -> bool {
        self.simple_base.is_some()
    }
}

/// Attribute use on a complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUse {
    /// Attribute name.
    pub name: String,
    /// Simple type of the attribute value.
    pub type_id: TypeId,
    /// Whether `use="required"`.
    pub required: bool,
}

/// Content model particle.
#[derive(Debug, Clone)]
pub enum Particle {
    /// Element declaration.
    Element(ElementDecl),
    /// Ordered sequence of particles.
    Sequence(ModelGroup),
    /// Exactly one of the particles.
    Choice(ModelGroup),
    /// Particles in any order.
    All(ModelGroup),
    /// Element wildcard.
    Any(Wildcard),
}

impl Particle {
    /// Returns the occurrence bounds of the particle.
    #[must_use]
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Element(e) => e.occurs,
            Self::Sequence(g) | Self::Choice(g) | Self::All(g) => g.occurs,
            Self::Any(w) => w.occurs,
        }
    }

    /// Returns a short name of the particle kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::Sequence(_) => "sequence",
            Self::Choice(_) => "choice",
            Self::All(_) => "all",
            Self::Any(_) => "any",
        }
    }
}

/// Model group (sequence, choice or all).
#[derive(Debug, Clone, Default)]
pub struct ModelGroup {
    /// Occurrence bounds of the group.
    pub occurs: Occurs,
    /// Member particles in declaration order.
    pub particles: Vec<Particle>,
}

impl ModelGroup {
    /// Creates a group occurring exactly once.
    #[must_use]
    pub fn new(particles: Vec<Particle>) -> Self {
        Self {
            occurs: Occurs::ONCE,
            particles,
        }
    }
}

/// Element wildcard (`xs:any`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    /// Namespace constraint as written (`##any`, `##other`, URI list).
    pub namespace: String,
    /// How matched elements are validated.
    pub process_contents: ProcessContents,
    /// Occurrence bounds.
    pub occurs: Occurs,
}

impl Wildcard {
    /// Returns true if an element in `namespace` matches this wildcard.
    #[must_use]
    pub fn matches_namespace(&self, namespace: Option<&str>, target: Option<&str>) -> bool {
        self.namespace.split_whitespace().any(|token| match token {
            "##any" => true,
            "##other" => namespace.is_some() && namespace != target,
            "##targetNamespace" => namespace == target,
            "##local" => namespace.is_none(),
            uri => namespace == Some(uri),
        })
    }
}

/// Wildcard `processContents` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessContents {
    /// Matched elements must be declared and valid.
    #[default]
    Strict,
    /// Validate if a declaration is found.
    Lax,
    /// No validation.
    Skip,
}

impl ProcessContents {
    /// Parses a `processContents` value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Restriction facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    /// Facet kind.
    pub kind: FacetKind,
    /// Facet value as written.
    pub value: String,
}

impl Facet {
    /// Creates a new facet.
    #[must_use]
    pub fn new(kind: FacetKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Restriction facet kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// `length`.
    Length,
    /// `minLength`.
    MinLength,
    /// `maxLength`.
    MaxLength,
    /// `pattern`.
    Pattern,
    /// `enumeration`.
    Enumeration,
    /// `whiteSpace`.
    WhiteSpace,
    /// `maxInclusive`.
    MaxInclusive,
    /// `maxExclusive`.
    MaxExclusive,
    /// `minInclusive`.
    MinInclusive,
    /// `minExclusive`.
    MinExclusive,
    /// `totalDigits`.
    TotalDigits,
    /// `fractionDigits`.
    FractionDigits,
    /// A facet this model does not interpret.
    Other(String),
}

impl FacetKind {
    /// Maps an XSD facet element name to its kind.
    #[must_use]
    pub fn from_xsd_name(name: &str) -> Self {
        match name {
            "length" => Self::Length,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "pattern" => Self::Pattern,
            "enumeration" => Self::Enumeration,
            "whiteSpace" => Self::WhiteSpace,
            "maxInclusive" => Self::MaxInclusive,
            "maxExclusive" => Self::MaxExclusive,
            "minInclusive" => Self::MinInclusive,
            "minExclusive" => Self::MinExclusive,
            "totalDigits" => Self::TotalDigits,
            "fractionDigits" => Self::FractionDigits,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Built-in XSD datatypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    /// `anySimpleType`.
    AnySimpleType,
    /// `string`.
    String,
    /// `normalizedString`.
    NormalizedString,
    /// `token`.
    Token,
    /// `language`.
    Language,
    /// `Name`.
    Name,
    /// `NCName`.
    NcName,
    /// `ID`.
    Id,
    /// `IDREF`.
    IdRef,
    /// `NMTOKEN`.
    NmToken,
    /// `anyURI`.
    AnyUri,
    /// `QName`.
    QName,
    /// `boolean`.
    Boolean,
    /// `decimal`.
    Decimal,
    /// `integer`.
    Integer,
    /// `nonNegativeInteger`.
    NonNegativeInteger,
    /// `positiveInteger`.
    PositiveInteger,
    /// `nonPositiveInteger`.
    NonPositiveInteger,
    /// `negativeInteger`.
    NegativeInteger,
    /// `long`.
    Long,
    /// `int`.
    Int,
    /// `short`.
    Short,
    /// `byte`.
    Byte,
    /// `unsignedLong`.
    UnsignedLong,
    /// `unsignedInt`.
    UnsignedInt,
    /// `unsignedShort`.
    UnsignedShort,
    /// `unsignedByte`.
    UnsignedByte,
    /// `float`.
    Float,
    /// `double`.
    Double,
    /// `duration`.
    Duration,
    /// `dateTime`.
    DateTime,
    /// `date`.
    Date,
    /// `time`.
    Time,
    /// `gYear`.
    GYear,
    /// `gYearMonth`.
    GYearMonth,
    /// `gMonth`.
    GMonth,
    /// `gMonthDay`.
    GMonthDay,
    /// `gDay`.
    GDay,
    /// `base64Binary`.
    Base64Binary,
    /// `hexBinary`.
    HexBinary,
}

impl BuiltinType {
    const ALL: [Self; 40] = [
        Self::AnySimpleType,
        Self::String,
        Self::NormalizedString,
        Self::Token,
        Self::Language,
        Self::Name,
        Self::NcName,
        Self::Id,
        Self::IdRef,
        Self::NmToken,
        Self::AnyUri,
        Self::QName,
        Self::Boolean,
        Self::Decimal,
        Self::Integer,
        Self::NonNegativeInteger,
        Self::PositiveInteger,
        Self::NonPositiveInteger,
        Self::NegativeInteger,
        Self::Long,
        Self::Int,
        Self::Short,
        Self::Byte,
        Self::UnsignedLong,
        Self::UnsignedInt,
        Self::UnsignedShort,
        Self::UnsignedByte,
        Self::Float,
        Self::Double,
        Self::Duration,
        Self::DateTime,
        Self::Date,
        Self::Time,
        Self::GYear,
        Self::GYearMonth,
        Self::GMonth,
        Self::GMonthDay,
        Self::GDay,
        Self::Base64Binary,
        Self::HexBinary,
    ];

    /// Returns the XSD local name of the datatype.
    #[must_use]
    pub const fn xsd_name(&self) -> &'static str {
        match self {
            Self::AnySimpleType => "anySimpleType",
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::Name => "Name",
            Self::NcName => "NCName",
            Self::Id => "ID",
            Self::IdRef => "IDREF",
            Self::NmToken => "NMTOKEN",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::Float => "float",
            Self::Double => "double",
            Self::Duration => "duration",
            Self::DateTime => "dateTime",
            Self::Date => "date",
            Self::Time => "time",
            Self::GYear => "gYear",
            Self::GYearMonth => "gYearMonth",
            Self::GMonth => "gMonth",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::Base64Binary => "base64Binary",
            Self::HexBinary => "hexBinary",
        }
    }

    /// Parses a built-in datatype from its XSD local name.
    #[must_use]
    pub fn from_xsd_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.xsd_name() == name)
    }

    /// Returns the lower-cased tag used in schema descriptions.
    #[must_use]
    pub fn type_tag(&self) -> String {
        self.xsd_name().to_lowercase()
    }

    /// Returns true for `decimal` and every type derived from it.
    #[must_use]
    pub const fn is_decimal(&self) -> bool {
        matches!(self, Self::Decimal) || self.is_integer()
    }

    /// Returns true for `integer` and every type derived from it.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::NonNegativeInteger
                | Self::PositiveInteger
                | Self::NonPositiveInteger
                | Self::NegativeInteger
                | Self::Long
                | Self::Int
                | Self::Short
                | Self::Byte
                | Self::UnsignedLong
                | Self::UnsignedInt
                | Self::UnsignedShort
                | Self::UnsignedByte
        )
    }

    /// Returns true if values keep their whitespace verbatim.
    #[must_use]
    pub const fn preserves_whitespace(&self) -> bool {
        matches!(self, Self::String | Self::AnySimpleType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_occurs_parse() {
        assert_eq!(MaxOccurs::parse("unbounded"), Some(MaxOccurs::Unbounded));
        assert_eq!(MaxOccurs::parse("3"), Some(MaxOccurs::Bounded(3)));
        assert_eq!(MaxOccurs::parse("many"), None);
    }

    #[test]
    fn test_max_occurs_display() {
        assert_eq!(MaxOccurs::Unbounded.to_string(), "unbounded");
        assert_eq!(MaxOccurs::Bounded(1).to_string(), "1");
    }

    #[test]
    fn test_occurs_allows() {
        let occurs = Occurs::new(0, MaxOccurs::Bounded(2));
        assert!(occurs.allows(2));
        assert!(!occurs.allows(3));
        assert!(Occurs::new(1, MaxOccurs::Unbounded).allows(1_000));
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(
            BuiltinType::from_xsd_name("dateTime"),
            Some(BuiltinType::DateTime)
        );
        assert_eq!(BuiltinType::DateTime.type_tag(), "datetime");
        assert_eq!(BuiltinType::Base64Binary.type_tag(), "base64binary");
        assert_eq!(BuiltinType::from_xsd_name("Decimal"), None);
    }

    #[test]
    fn test_builtin_categories() {
        assert!(BuiltinType::Decimal.is_decimal());
        assert!(BuiltinType::UnsignedByte.is_decimal());
        assert!(!BuiltinType::Decimal.is_integer());
        assert!(!BuiltinType::String.is_decimal());
    }

    #[test]
    fn test_facet_kind_from_name() {
        assert_eq!(FacetKind::from_xsd_name("pattern"), FacetKind::Pattern);
        assert_eq!(
            FacetKind::from_xsd_name("assertion"),
            FacetKind::Other("assertion".to_string())
        );
    }

    #[test]
    fn test_wildcard_namespace_matching() {
        let any = Wildcard {
            namespace: "##any".to_string(),
            process_contents: ProcessContents::Lax,
            occurs: Occurs::ONCE,
        };
        assert!(any.matches_namespace(None, Some("urn:a")));

        let other = Wildcard {
            namespace: "##other".to_string(),
            ..any.clone()
        };
        assert!(other.matches_namespace(Some("urn:b"), Some("urn:a")));
        assert!(!other.matches_namespace(Some("urn:a"), Some("urn:a")));
        assert!(!other.matches_namespace(None, Some("urn:a")));

        let list = Wildcard {
            namespace: "urn:x urn:y".to_string(),
            ..any
        };
        assert!(list.matches_namespace(Some("urn:y"), None));
        assert!(!list.matches_namespace(Some("urn:z"), None));
    }

    #[test]
    fn test_schema_type_lookup() {
        let mut schema = Schema::new(Some("urn:test".to_string()));
        let builtin = schema.add_type(TypeDef::Simple(SimpleType::builtin(BuiltinType::String)));
        let named = schema.add_type(TypeDef::Simple(SimpleType {
            name: Some("Max35Text".to_string()),
            builtin: BuiltinType::String,
            variety: SimpleVariety::Restriction {
                base: builtin,
                facets: vec![Facet::new(FacetKind::MaxLength, "35")],
            },
        }));
        assert_eq!(schema.type_by_name("Max35Text"), Some(named));
        assert_eq!(schema.type_by_name("string"), None);
        assert!(schema.type_def(builtin).is_builtin());
        assert!(!schema.type_def(named).is_builtin());
        assert!(schema.get_type(TypeId(99)).is_none());
    }
}
