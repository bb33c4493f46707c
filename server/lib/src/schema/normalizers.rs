//! The built in value normalizers and comparators. Meta-schema entries refer to these by
//! name through `m-fqcn`.

use std::cmp::Ordering;

use hashbrown::HashMap;

use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalizer {
    DeepTrimToLower,
    DeepTrim,
    Numeric,
    Boolean,
    NoOp,
}

impl Normalizer {
    pub fn from_fqcn(fqcn: &str) -> Option<Self> {
        match fqcn {
            "deepTrimToLowerNormalizer" => Some(Normalizer::DeepTrimToLower),
            "deepTrimNormalizer" => Some(Normalizer::DeepTrim),
            "numericNormalizer" => Some(Normalizer::Numeric),
            "booleanNormalizer" => Some(Normalizer::Boolean),
            "noOpNormalizer" => Some(Normalizer::NoOp),
            _ => None,
        }
    }

    pub fn fqcn(self) -> &'static str {
        match self {
            Normalizer::DeepTrimToLower => "deepTrimToLowerNormalizer",
            Normalizer::DeepTrim => "deepTrimNormalizer",
            Normalizer::Numeric => "numericNormalizer",
            Normalizer::Boolean => "booleanNormalizer",
            Normalizer::NoOp => "noOpNormalizer",
        }
    }

    pub fn normalize(self, value: &str) -> String {
        match self {
            Normalizer::DeepTrimToLower => deep_trim(value).to_lowercase(),
            Normalizer::DeepTrim => deep_trim(value),
            Normalizer::Numeric => value.chars().filter(|c| !c.is_whitespace()).collect(),
            Normalizer::Boolean => value.trim().to_uppercase(),
            Normalizer::NoOp => value.to_string(),
        }
    }
}

/// Strip leading and trailing whitespace and collapse inner runs of whitespace
/// to a single space.
pub fn deep_trim(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    CaseIgnore,
    CaseExact,
    Integer,
    Octet,
}

impl Comparator {
    pub fn from_fqcn(fqcn: &str) -> Option<Self> {
        match fqcn {
            "caseIgnoreComparator" => Some(Comparator::CaseIgnore),
            "caseExactComparator" => Some(Comparator::CaseExact),
            "integerComparator" => Some(Comparator::Integer),
            "octetComparator" => Some(Comparator::Octet),
            _ => None,
        }
    }

    pub fn fqcn(self) -> &'static str {
        match self {
            Comparator::CaseIgnore => "caseIgnoreComparator",
            Comparator::CaseExact => "caseExactComparator",
            Comparator::Integer => "integerComparator",
            Comparator::Octet => "octetComparator",
        }
    }

    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            Comparator::CaseIgnore => deep_trim(a)
                .to_lowercase()
                .cmp(&deep_trim(b).to_lowercase()),
            Comparator::CaseExact => deep_trim(a).cmp(&deep_trim(b)),
            Comparator::Integer => match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => a.cmp(b),
            },
            Comparator::Octet => a.as_bytes().cmp(b.as_bytes()),
        }
    }
}

/// Attribute type to normalizer, derived from each attribute's equality matching rule.
/// Attributes without a registered normalizer use [`Normalizer::DeepTrimToLower`].
///
/// Also folds every alias and OID of an attribute type onto its primary name.
#[derive(Clone, Debug, Default)]
pub struct NormalizerMapping {
    by_attr: HashMap<Attribute, Normalizer>,
    canonical: HashMap<Attribute, Attribute>,
}

impl NormalizerMapping {
    pub fn insert(&mut self, attr: Attribute, normalizer: Normalizer) {
        self.by_attr.insert(attr, normalizer);
    }

    /// Record `alias` as another name of `primary`.
    pub fn insert_alias(&mut self, alias: Attribute, primary: Attribute) {
        self.canonical.insert(alias, primary);
    }

    /// The primary name of an attribute type, accepting `OID.`-prefixed OIDs. Names the
    /// schema doesn't know are returned as given.
    pub fn canonical(&self, attr: &Attribute) -> Attribute {
        if let Some(primary) = self.canonical.get(attr) {
            return primary.clone();
        }
        let name = attr.as_str();
        match name.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("oid.") => self
                .canonical
                .get(&Attribute::from_str(&name[4..]))
                .cloned()
                .unwrap_or_else(|| attr.clone()),
            _ => attr.clone(),
        }
    }

    pub fn get(&self, attr: &Attribute) -> Normalizer {
        self.by_attr
            .get(attr)
            .copied()
            .unwrap_or(Normalizer::DeepTrimToLower)
    }

    pub fn normalize(&self, attr: &Attribute, value: &str) -> String {
        self.get(attr).normalize(value)
    }

    pub fn len(&self) -> usize {
        self.by_attr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_attr.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{deep_trim, Comparator, Normalizer};
    use std::cmp::Ordering;

    #[test]
    fn test_deep_trim() {
        assert_eq!(deep_trim("  a   b\tc  "), "a b c");
        assert_eq!(Normalizer::DeepTrimToLower.normalize(" Big   Corp "), "big corp");
        assert_eq!(Normalizer::Numeric.normalize(" 1 234 "), "1234");
    }

    #[test]
    fn test_fqcn_lookup() {
        for n in [
            Normalizer::DeepTrimToLower,
            Normalizer::DeepTrim,
            Normalizer::Numeric,
            Normalizer::Boolean,
            Normalizer::NoOp,
        ] {
            assert_eq!(Normalizer::from_fqcn(n.fqcn()), Some(n));
        }
        assert_eq!(Normalizer::from_fqcn("org.example.Missing"), None);
        assert_eq!(Comparator::from_fqcn("caseExactComparator"), Some(Comparator::CaseExact));
    }

    #[test]
    fn test_comparators() {
        assert_eq!(Comparator::CaseIgnore.compare("ABC", "abc"), Ordering::Equal);
        assert_eq!(Comparator::CaseExact.compare("ABC", "abc"), Ordering::Less);
        assert_eq!(Comparator::Integer.compare("10", "9"), Ordering::Greater);
    }
}
