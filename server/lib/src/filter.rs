//! Filters are the query language of the directory. A [`Filter`] is a tree of assertions
//! about an entry's attribute values, and searches return the entries in scope that the
//! filter matches.
//!
//! Value comparisons are case insensitive and whitespace is deep trimmed, which is what the
//! default equality rules of the bootstrap schema do.

use std::fmt;

use itertools::Itertools;

use crate::prelude::*;
use crate::schema::normalizers::deep_trim;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// Only the base entry.
    Base,
    /// The immediate children of the base, not the base itself.
    One,
    /// The base and everything beneath it.
    #[default]
    Subtree,
}

impl Scope {
    /// True if `dn` is within this scope of `base`.
    pub fn contains(self, base: &Dn, dn: &Dn) -> bool {
        match self {
            Scope::Base => dn == base,
            Scope::One => dn.size() == base.size() + 1 && dn.is_descendant_of(base),
            Scope::Subtree => dn.is_descendant_of(base),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    Eq(Attribute, String),
    Pres(Attribute),
    /// A substring pattern where `*` matches any run of characters.
    Sub(Attribute, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

pub fn f_eq(attr: Attribute, value: &str) -> Filter {
    Filter::Eq(attr, value.to_string())
}

pub fn f_pres(attr: Attribute) -> Filter {
    Filter::Pres(attr)
}

pub fn f_sub(attr: Attribute, pattern: &str) -> Filter {
    Filter::Sub(attr, pattern.to_string())
}

pub fn f_and(vs: Vec<Filter>) -> Filter {
    Filter::And(vs)
}

pub fn f_or(vs: Vec<Filter>) -> Filter {
    Filter::Or(vs)
}

pub fn f_not(f: Filter) -> Filter {
    Filter::Not(Box::new(f))
}

fn normalise(v: &str) -> String {
    deep_trim(v).to_lowercase()
}

fn substring_match(pattern: &str, value: &str) -> bool {
    let pattern = normalise(pattern);
    let value = normalise(value);
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(x) => x,
        None => return true,
    };
    let Some(mut remaining) = value.strip_prefix(first) else {
        return false;
    };
    let (last, middle) = match rest.split_last() {
        Some(x) => x,
        // No wildcard, so this was an exact match.
        None => return remaining.is_empty(),
    };
    for part in middle {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}

impl Filter {
    /// A filter that matches every entry.
    pub fn everything() -> Self {
        f_pres(Attribute::ObjectClass)
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::Eq(attr, value) => entry.attribute_equality(attr, value),
            Filter::Pres(attr) => entry.attribute_pres(attr),
            Filter::Sub(attr, pattern) => entry
                .get_ava(attr)
                .map(|vs| vs.iter().any(|v| substring_match(pattern, v)))
                .unwrap_or(false),
            Filter::And(fs) => fs.iter().all(|f| f.matches(entry)),
            Filter::Or(fs) => fs.iter().any(|f| f.matches(entry)),
            Filter::Not(f) => !f.matches(entry),
        }
    }

    pub fn validate(&self) -> Result<(), OperationError> {
        match self {
            Filter::And(fs) | Filter::Or(fs) => {
                if fs.is_empty() {
                    filter_error!("empty and/or term in filter");
                    return Err(OperationError::InvalidFilter(self.to_string()));
                }
                fs.iter().try_for_each(|f| f.validate())
            }
            Filter::Not(f) => f.validate(),
            Filter::Eq(..) | Filter::Pres(_) | Filter::Sub(..) => Ok(()),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Eq(a, v) => write!(f, "({}={})", a, v),
            Filter::Pres(a) => write!(f, "({}=*)", a),
            Filter::Sub(a, p) => write!(f, "({}={})", a, p),
            Filter::And(fs) => write!(f, "(&{})", fs.iter().join("")),
            Filter::Or(fs) => write!(f, "(|{})", fs.iter().join("")),
            Filter::Not(inner) => write!(f, "(!{})", inner),
        }
    }
}
