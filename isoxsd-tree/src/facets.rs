//! Restriction facet aggregation.

use crate::node::SchemaNode;
use isoxsd_schema::{Facet, FacetKind};

/// Aggregated facet values of one simple-type restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSet {
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub pattern: Option<String>,
    pub fraction_digits: Option<String>,
    pub total_digits: Option<String>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    /// Enumeration values in declaration order.
    pub values: Option<Vec<String>>,
}

impl FacetSet {
    /// Returns true if no facet was recognized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copies every present value onto `node`, leaving the others untouched.
    pub fn apply_to(self, node: &mut SchemaNode) {
        fn copy<T>(from: Option<T>, to: &mut Option<T>) {
            if from.is_some() {
                *to = from;
            }
        }

        copy(self.min_length, &mut node.min_length);
        copy(self.max_length, &mut node.max_length);
        copy(self.pattern, &mut node.pattern);
        copy(self.fraction_digits, &mut node.fraction_digits);
        copy(self.total_digits, &mut node.total_digits);
        copy(self.min_inclusive, &mut node.min_inclusive);
        copy(self.max_inclusive, &mut node.max_inclusive);
        copy(self.values, &mut node.values);
    }
}

/// Aggregates an ordered list of facets.
///
/// Enumerations accumulate in order and every other kind keeps its last
/// value. Exclusive bounds are reported as the inclusive bound of the same
/// side when the restriction declares no inclusive bound there. Kinds with no
/// node attribute (`length`, `whiteSpace`, ...) are skipped.
///
/// # Arguments
/// * `facets` - Facets in declaration order
///
/// # Returns
/// The aggregated facet set.
#[must_use]
pub fn extract_facets(facets: &[Facet]) -> FacetSet {
    let mut set = FacetSet::default();
    let mut min_exclusive = None;
    let mut max_exclusive = None;

    for facet in facets {
        let value = facet.value.clone();
        match &facet.kind {
            FacetKind::MinLength => set.min_length = Some(value),
            FacetKind::MaxLength => set.max_length = Some(value),
            FacetKind::Pattern => set.pattern = Some(value),
            FacetKind::FractionDigits => set.fraction_digits = Some(value),
            FacetKind::TotalDigits => set.total_digits = Some(value),
            FacetKind::MinInclusive => set.min_inclusive = Some(value),
            FacetKind::MaxInclusive => set.max_inclusive = Some(value),
            FacetKind::MinExclusive => min_exclusive = Some(value),
            FacetKind::MaxExclusive => max_exclusive = Some(value),
            FacetKind::Enumeration => set.values.get_or_insert_with(Vec::new).push(value),
            FacetKind::Length | FacetKind::WhiteSpace | FacetKind::Other(_) => {}
        }
    }

    if set.min_inclusive.is_none() {
        set.min_inclusive = min_exclusive;
    }
    if set.max_inclusive.is_none() {
        set.max_inclusive = max_exclusive;
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facet(kind: FacetKind, value: &str) -> Facet {
        Facet::new(kind, value)
    }

    #[test]
    fn test_enumerations_keep_order() {
        let set = extract_facets(&[
            facet(FacetKind::Enumeration, "CRED"),
            facet(FacetKind::Enumeration, "DEBT"),
            facet(FacetKind::Enumeration, "SHAR"),
        ]);
        assert_eq!(
            set.values,
            Some(vec!["CRED".into(), "DEBT".into(), "SHAR".into()])
        );
    }

    #[test]
    fn test_enumerations_around_length() {
        let set = extract_facets(&[
            facet(FacetKind::Enumeration, "A"),
            facet(FacetKind::Length, "5"),
            facet(FacetKind::Enumeration, "B"),
        ]);
        assert_eq!(set.values, Some(vec!["A".to_string(), "B".to_string()]));
        assert!(set.min_length.is_none());
        assert!(set.max_length.is_none());
    }

    #[test]
    fn test_last_value_wins() {
        let set = extract_facets(&[
            facet(FacetKind::MaxLength, "35"),
            facet(FacetKind::MaxLength, "140"),
        ]);
        assert_eq!(set.max_length.as_deref(), Some("140"));
    }

    #[test]
    fn test_amount_facets() {
        let set = extract_facets(&[
            facet(FacetKind::MinInclusive, "0"),
            facet(FacetKind::FractionDigits, "5"),
            facet(FacetKind::TotalDigits, "18"),
        ]);
        assert_eq!(set.min_inclusive.as_deref(), Some("0"));
        assert_eq!(set.fraction_digits.as_deref(), Some("5"));
        assert_eq!(set.total_digits.as_deref(), Some("18"));
        assert!(set.values.is_none());
    }

    #[test]
    fn test_exclusive_bounds() {
        let set = extract_facets(&[
            facet(FacetKind::MinExclusive, "0"),
            facet(FacetKind::MaxExclusive, "100"),
            facet(FacetKind::MaxInclusive, "99"),
        ]);
        assert_eq!(set.min_inclusive.as_deref(), Some("0"));
        assert_eq!(set.max_inclusive.as_deref(), Some("99"));
    }

    #[test]
    fn test_unmapped_kinds_ignored() {
        let set = extract_facets(&[
            facet(FacetKind::Length, "3"),
            facet(FacetKind::WhiteSpace, "collapse"),
            facet(FacetKind::Other("assertion".into()), "x"),
        ]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_apply_keeps_existing_values() {
        let mut node = SchemaNode {
            pattern: Some("[A-Z]{3,3}".into()),
            max_length: Some("3".into()),
            ..SchemaNode::default()
        };
        extract_facets(&[facet(FacetKind::MaxLength, "5")]).apply_to(&mut node);

        assert_eq!(node.pattern.as_deref(), Some("[A-Z]{3,3}"));
        assert_eq!(node.max_length.as_deref(), Some("5"));
    }
}
