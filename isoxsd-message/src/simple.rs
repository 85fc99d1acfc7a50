//! Simple-type value checks.
//!
//! A value is checked against its type by walking the derivation chain from
//! the built-in base down to the declared type. Each restriction step applies
//! its own facets: patterns and enumerations of one step are alternatives,
//! every other facet must hold.

use crate::lexical::{
    LexicalRules, binary_length, digit_counts, parse_date, parse_date_time, parse_decimal,
    parse_time,
};
use isoxsd_schema::{
    BuiltinType, Facet, FacetKind, Schema, SchemaError, SimpleType, SimpleVariety, TypeDef, TypeId,
    compile_pattern,
};
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

/// Whitespace handling of a simple type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WhiteSpace {
    Preserve,
    Replace,
    Collapse,
}

impl WhiteSpace {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "preserve" => Some(Self::Preserve),
            "replace" => Some(Self::Replace),
            "collapse" => Some(Self::Collapse),
            _ => None,
        }
    }

    fn apply<'v>(self, value: &'v str) -> Cow<'v, str> {
        match self {
            Self::Preserve => Cow::Borrowed(value),
            Self::Replace => Cow::Owned(value.replace(['\t', '\n', '\r'], " ")),
            Self::Collapse => Cow::Owned(value.split_whitespace().collect::<Vec<_>>().join(" ")),
        }
    }
}

/// Checks text values against the simple types of one schema.
#[derive(Debug, Clone)]
pub(crate) struct SimpleTypeChecker {
    patterns: HashMap<String, Regex>,
    lexical: LexicalRules,
}

impl SimpleTypeChecker {
    /// Compiles every pattern facet of `schema`.
    pub fn new(schema: &Schema) -> Result<Self, SchemaError> {
        let mut patterns = HashMap::new();
        for (_, type_def) in schema.types() {
            let TypeDef::Simple(simple) = type_def else {
                continue;
            };
            for facet in simple.facets() {
                if facet.kind == FacetKind::Pattern && !patterns.contains_key(&facet.value) {
                    let regex = compile_pattern(&facet.value).map_err(|source| {
                        SchemaError::InvalidPattern {
                            pattern: facet.value.clone(),
                            source,
                        }
                    })?;
                    patterns.insert(facet.value.clone(), regex);
                }
            }
        }

        Ok(Self {
            patterns,
            lexical: LexicalRules::new()?,
        })
    }

    /// Checks raw text against the simple type `id`.
    ///
    /// # Returns
    /// Ok(()) if the value is valid, or the reason it is not.
    pub fn check(&self, schema: &Schema, id: TypeId, raw: &str) -> Result<(), String> {
        let value = whitespace_of(schema, id).apply(raw);
        self.check_value(schema, id, &value)
    }

    fn check_value(&self, schema: &Schema, id: TypeId, value: &str) -> Result<(), String> {
        let simple = simple_type(schema, id)?;
        match &simple.variety {
            SimpleVariety::Atomic => self.lexical.check(simple.builtin, value),
            SimpleVariety::Restriction { base, facets } => {
                self.check_value(schema, *base, value)?;
                self.check_facets(schema, *base, simple.builtin, facets, value)
            }
            SimpleVariety::List { item } => value
                .split_whitespace()
                .try_for_each(|token| self.check_value(schema, *item, token)),
            SimpleVariety::Union { members } => {
                if members
                    .iter()
                    .any(|member| self.check_value(schema, *member, value).is_ok())
                {
                    Ok(())
                } else {
                    Err(format!(
                        "The value '{value}' does not match any member type of the union"
                    ))
                }
            }
        }
    }

    fn check_facets(
        &self,
        schema: &Schema,
        base: TypeId,
        builtin: BuiltinType,
        facets: &[Facet],
        value: &str,
    ) -> Result<(), String> {
        let mut patterns = Vec::new();
        let mut enumeration = Vec::new();

        for facet in facets {
            match &facet.kind {
                FacetKind::Pattern => patterns.push(facet.value.as_str()),
                FacetKind::Enumeration => enumeration.push(facet.value.as_str()),
                FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength => {
                    check_length(schema, base, builtin, facet, value)?;
                }
                FacetKind::TotalDigits | FacetKind::FractionDigits => {
                    check_digits(facet, value)?;
                }
                FacetKind::MinInclusive
                | FacetKind::MinExclusive
                | FacetKind::MaxInclusive
                | FacetKind::MaxExclusive => {
                    check_bound(builtin, facet, value)?;
                }
                FacetKind::WhiteSpace | FacetKind::Other(_) => {}
            }
        }

        if !patterns.is_empty()
            && !patterns.iter().any(|pattern| {
                self.patterns
                    .get(*pattern)
                    .is_some_and(|regex| regex.is_match(value))
            })
        {
            return Err(format!(
                "The value '{value}' does not match the pattern '{}'",
                patterns.join("' or '")
            ));
        }

        if !enumeration.is_empty()
            && !enumeration
                .iter()
                .any(|allowed| values_equal(builtin, value, allowed))
        {
            return Err(format!(
                "The value '{value}' is not one of the enumerated values"
            ));
        }

        Ok(())
    }
}

fn simple_type(schema: &Schema, id: TypeId) -> Result<&SimpleType, String> {
    match schema.get_type(id) {
        Some(TypeDef::Simple(simple)) => Ok(simple),
        Some(TypeDef::Complex(complex)) => Err(format!(
            "Type '{}' is not a simple type",
            complex.name.as_deref().unwrap_or("anonymous")
        )),
        None => Err(format!("Type #{} is not defined", id.index())),
    }
}

fn whitespace_of(schema: &Schema, mut id: TypeId) -> WhiteSpace {
    loop {
        let Ok(simple) = simple_type(schema, id) else {
            return WhiteSpace::Collapse;
        };
        match &simple.variety {
            SimpleVariety::Atomic => {
                return if simple.builtin.preserves_whitespace() {
                    WhiteSpace::Preserve
                } else if simple.builtin == BuiltinType::NormalizedString {
                    WhiteSpace::Replace
                } else {
                    WhiteSpace::Collapse
                };
            }
            SimpleVariety::Restriction { base, facets } => {
                let declared = facets
                    .iter()
                    .filter(|facet| facet.kind == FacetKind::WhiteSpace)
                    .find_map(|facet| WhiteSpace::parse(&facet.value));
                if let Some(declared) = declared {
                    return declared;
                }
                id = *base;
            }
            SimpleVariety::List { .. } | SimpleVariety::Union { .. } => {
                return WhiteSpace::Collapse;
            }
        }
    }
}

fn is_list(schema: &Schema, mut id: TypeId) -> bool {
    while let Ok(simple) = simple_type(schema, id) {
        match &simple.variety {
            SimpleVariety::List { .. } => return true,
            SimpleVariety::Restriction { base, .. } => id = *base,
            SimpleVariety::Atomic | SimpleVariety::Union { .. } => return false,
        }
    }
    false
}

fn facet_number<T: std::str::FromStr>(facet: &Facet) -> Option<T> {
    let parsed = facet.value.trim().parse().ok();
    if parsed.is_none() {
        warn!(value = %facet.value, "Ignoring facet with a non-numeric value");
    }
    parsed
}

fn check_length(
    schema: &Schema,
    base: TypeId,
    builtin: BuiltinType,
    facet: &Facet,
    value: &str,
) -> Result<(), String> {
    let Some(limit) = facet_number::<usize>(facet) else {
        return Ok(());
    };
    let length = if is_list(schema, base) {
        value.split_whitespace().count()
    } else {
        binary_length(builtin, value).unwrap_or_else(|| value.chars().count())
    };

    let (ok, relation) = match facet.kind {
        FacetKind::Length => (length == limit, "different from the length"),
        FacetKind::MinLength => (length >= limit, "less than the minimum length"),
        _ => (length <= limit, "greater than the maximum length"),
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "The actual length {length} of '{value}' is {relation} {limit}"
        ))
    }
}

fn check_digits(facet: &Facet, value: &str) -> Result<(), String> {
    let (Some(limit), Some(decimal)) = (facet_number::<u32>(facet), parse_decimal(value)) else {
        return Ok(());
    };
    let (total, fraction) = digit_counts(decimal);
    match facet.kind {
        FacetKind::TotalDigits if total > limit => Err(format!(
            "The value '{value}' has {total} total digits, more than the allowed {limit}"
        )),
        FacetKind::FractionDigits if fraction > limit => Err(format!(
            "The value '{value}' has {fraction} fraction digits, more than the allowed {limit}"
        )),
        _ => Ok(()),
    }
}

fn check_bound(builtin: BuiltinType, facet: &Facet, value: &str) -> Result<(), String> {
    let Some(ordering) = compare_values(builtin, value, &facet.value) else {
        warn!(value = %facet.value, "Ignoring bound that is not comparable");
        return Ok(());
    };
    let (ok, relation) = match facet.kind {
        FacetKind::MinInclusive => (ordering != Ordering::Less, "less than"),
        FacetKind::MinExclusive => (ordering == Ordering::Greater, "less than or equal to"),
        FacetKind::MaxInclusive => (ordering != Ordering::Greater, "greater than"),
        _ => (ordering == Ordering::Less, "greater than or equal to"),
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "The value '{value}' is {relation} the bound '{}'",
            facet.value
        ))
    }
}

/// Compares two lexical values in the value space of `builtin`.
fn compare_values(builtin: BuiltinType, a: &str, b: &str) -> Option<Ordering> {
    if builtin.is_decimal() {
        return Some(parse_decimal(a)?.cmp(&parse_decimal(b.trim())?));
    }
    match builtin {
        BuiltinType::Float | BuiltinType::Double => {
            a.parse::<f64>().ok()?.partial_cmp(&b.trim().parse::<f64>().ok()?)
        }
        BuiltinType::DateTime => Some(parse_date_time(a)?.cmp(&parse_date_time(b.trim())?)),
        BuiltinType::Date => Some(parse_date(a)?.cmp(&parse_date(b.trim())?)),
        BuiltinType::Time => Some(parse_time(a)?.cmp(&parse_time(b.trim())?)),
        _ => Some(a.cmp(b)),
    }
}

fn values_equal(builtin: BuiltinType, value: &str, allowed: &str) -> bool {
    if builtin.is_decimal() {
        if let (Some(a), Some(b)) = (parse_decimal(value), parse_decimal(allowed)) {
            return a == b;
        }
    }
    value == allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoxsd_schema::load_schema;

    const TYPES: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="Root" type="Code"/>
        <xs:simpleType name="Code">
            <xs:restriction base="xs:string"><xs:pattern value="[A-Z]{3,3}"/></xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="AltCode">
            <xs:restriction base="xs:string">
                <xs:pattern value="[A-Z]{2}"/>
                <xs:pattern value="[0-9]{2}"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="Max35Text">
            <xs:restriction base="xs:string">
                <xs:minLength value="1"/>
                <xs:maxLength value="35"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="Status">
            <xs:restriction base="xs:token">
                <xs:enumeration value="ACCP"/>
                <xs:enumeration value="RJCT"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="Amount">
            <xs:restriction base="xs:decimal">
                <xs:fractionDigits value="2"/>
                <xs:totalDigits value="5"/>
                <xs:minExclusive value="0"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="ShortAmount">
            <xs:restriction base="Amount">
                <xs:maxInclusive value="100"/>
            </xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="Codes">
            <xs:list itemType="Code"/>
        </xs:simpleType>
        <xs:simpleType name="TwoCodes">
            <xs:restriction base="Codes"><xs:length value="2"/></xs:restriction>
        </xs:simpleType>
        <xs:simpleType name="CodeOrNumber">
            <xs:union memberTypes="Code xs:int"/>
        </xs:simpleType>
    </xs:schema>"#;

    fn check(type_name: &str, value: &str) -> Result<(), String> {
        let schema = load_schema(TYPES).unwrap();
        let checker = SimpleTypeChecker::new(&schema).unwrap();
        let id = schema.type_by_name(type_name).unwrap();
        checker.check(&schema, id, value)
    }

    #[test]
    fn test_pattern() {
        assert!(check("Code", "EUR").is_ok());
        assert!(check("Code", "EURO").is_err());
        assert!(check("Code", "eur").is_err());
    }

    #[test]
    fn test_patterns_of_one_step_are_alternatives() {
        assert!(check("AltCode", "AB").is_ok());
        assert!(check("AltCode", "12").is_ok());
        assert!(check("AltCode", "A1").is_err());
    }

    #[test]
    fn test_length_bounds() {
        assert!(check("Max35Text", "A").is_ok());
        assert!(check("Max35Text", "").is_err());
        let err = check("Max35Text", &"x".repeat(36)).unwrap_err();
        assert!(err.contains("maximum length 35"));
    }

    #[test]
    fn test_enumeration_after_collapse() {
        assert!(check("Status", "  ACCP ").is_ok());
        assert!(check("Status", "PDNG").is_err());
    }

    #[test]
    fn test_digits_and_bounds() {
        assert!(check("Amount", "123.45").is_ok());
        assert!(check("Amount", "123.450").is_ok());
        assert!(check("Amount", "1.234").is_err());
        assert!(check("Amount", "1234.56").is_err());
        assert!(check("Amount", "0").is_err());
        assert!(check("Amount", "abc").is_err());
    }

    #[test]
    fn test_inherited_restrictions() {
        assert!(check("ShortAmount", "99.99").is_ok());
        assert!(check("ShortAmount", "100.01").is_err());
        assert!(check("ShortAmount", "0").is_err());
    }

    #[test]
    fn test_list_and_union() {
        assert!(check("Codes", "EUR USD GBP").is_ok());
        assert!(check("Codes", "EUR usd").is_err());
        assert!(check("TwoCodes", "EUR USD").is_ok());
        assert!(check("TwoCodes", "EUR").is_err());
        assert!(check("CodeOrNumber", "EUR").is_ok());
        assert!(check("CodeOrNumber", "42").is_ok());
        assert!(check("CodeOrNumber", "4.2").is_err());
    }
}
