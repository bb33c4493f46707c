//! Subtree specifications (RFC 3672) in their generic string encoding.
//!
//! ```text
//! { base "ou=people", specificExclusions { chopBefore:"ou=x", chopAfter:"ou=y" },
//!   minimum 1, maximum 3, specificationFilter and:{ item:person, not:item:device } }
//! ```
//!
//! Every component is optional; `{ }` selects the whole administrative area.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use super::refinement::Refinement;
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Component {
    Base(String),
    Exclusions(Vec<Exclusion>),
    Minimum(usize),
    Maximum(usize),
    Filter(Refinement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Exclusion {
    ChopBefore(String),
    ChopAfter(String),
}

peg::parser! {
    pub(crate) grammar subtreespec() for str {

        pub rule parse() -> Vec<Component> =
            _ "{" _ c:(component() ** (_ "," _)) _ "}" _ { c }

        rule component() -> Component =
            base()
            / exclusions()
            / minimum()
            / maximum()
            / filter()

        rule base() -> Component =
            "base" __ s:dnstring() { Component::Base(s) }

        rule exclusions() -> Component =
            "specificExclusions" _ "{" _ e:(exclusion() ** (_ "," _)) _ "}" { Component::Exclusions(e) }

        rule exclusion() -> Exclusion =
            "chopBefore" _ ":" _ s:dnstring() { Exclusion::ChopBefore(s) }
            / "chopAfter" _ ":" _ s:dnstring() { Exclusion::ChopAfter(s) }

        rule minimum() -> Component =
            "minimum" __ n:number() { Component::Minimum(n) }

        rule maximum() -> Component =
            "maximum" __ n:number() { Component::Maximum(n) }

        rule filter() -> Component =
            "specificationFilter" __ r:refinement() { Component::Filter(r) }

        pub rule refinement() -> Refinement =
            ref_item()
            / ref_and()
            / ref_or()
            / ref_not()

        rule ref_item() -> Refinement =
            "item" _ ":" _ s:oid() { Refinement::Item(s.to_string()) }

        rule ref_and() -> Refinement =
            "and" _ ":" _ "{" _ r:(refinement() ** (_ "," _)) _ "}" { Refinement::And(r) }

        rule ref_or() -> Refinement =
            "or" _ ":" _ "{" _ r:(refinement() ** (_ "," _)) _ "}" { Refinement::Or(r) }

        rule ref_not() -> Refinement =
            "not" _ ":" _ r:refinement() { Refinement::Not(Box::new(r)) }

        // A doubled quote stands for a quote.
        rule dnstring() -> String =
            "\"" s:$(("\"\"" / (!['"'] [_]))*) "\"" { s.replace("\"\"", "\"") }

        rule number() -> usize =
            n:$(['0'..='9']+) {? n.parse().or(Err("number")) }

        rule oid() -> &'input str =
            $(['a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | ';']+)

        rule _ = [' ' | '\t' | '\n' | '\r']*

        rule __ = [' ' | '\t' | '\n' | '\r']+
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubtreeSpecification {
    /// Relative to the administrative point. Empty is the administrative point itself.
    pub base: Dn,
    /// Relative to the base.
    pub chop_before: Vec<Dn>,
    /// Relative to the base.
    pub chop_after: Vec<Dn>,
    pub minimum: usize,
    /// `None` is unbounded.
    pub maximum: Option<usize>,
    pub refinement: Option<Refinement>,
}

fn invalid(value: &str, why: &str) -> OperationError {
    OperationError::SchemaViolation(SchemaError::InvalidSubtreeSpecification(format!(
        "{}: {}",
        value, why
    )))
}

impl SubtreeSpecification {
    pub fn parse(value: &str) -> Result<Self, OperationError> {
        let components = subtreespec::parse(value).map_err(|e| {
            invalid(value, &format!("expected {} at {}", e.expected, e.location))
        })?;

        let relative = |dn: &str| {
            Dn::parse(dn).map_err(|_| invalid(value, &format!("{} is not a valid name", dn)))
        };

        let mut spec = SubtreeSpecification::default();
        let mut seen: Vec<&'static str> = Vec::with_capacity(5);
        for c in components {
            let name = match &c {
                Component::Base(_) => "base",
                Component::Exclusions(_) => "specificExclusions",
                Component::Minimum(_) => "minimum",
                Component::Maximum(_) => "maximum",
                Component::Filter(_) => "specificationFilter",
            };
            if seen.contains(&name) {
                return Err(invalid(value, &format!("{} given more than once", name)));
            }
            seen.push(name);

            match c {
                Component::Base(dn) => spec.base = relative(&dn)?,
                Component::Exclusions(exclusions) => {
                    for e in exclusions {
                        match e {
                            Exclusion::ChopBefore(dn) => spec.chop_before.push(relative(&dn)?),
                            Exclusion::ChopAfter(dn) => spec.chop_after.push(relative(&dn)?),
                        }
                    }
                }
                Component::Minimum(n) => spec.minimum = n,
                Component::Maximum(n) => spec.maximum = Some(n),
                Component::Filter(r) => spec.refinement = Some(r),
            }
        }

        if let Some(max) = spec.maximum {
            if spec.minimum > max {
                return Err(invalid(
                    value,
                    &format!("minimum {} is greater than maximum {}", spec.minimum, max),
                ));
            }
        }
        if spec.chop_before.iter().chain(spec.chop_after.iter()).any(|c| c.is_empty()) {
            return Err(invalid(value, "an exclusion can't be the base itself"));
        }
        Ok(spec)
    }

    /// The entries this specification can select all sit beneath this name.
    pub fn base_dn(&self, administrative_point: &Dn) -> Dn {
        administrative_point.concat(&self.base)
    }
}

impl FromStr for SubtreeSpecification {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubtreeSpecification::parse(s)
    }
}

fn quoted(dn: &Dn) -> String {
    format!("\"{}\"", dn.to_string().replace('"', "\"\""))
}

impl fmt::Display for SubtreeSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.base.is_empty() {
            parts.push(format!("base {}", quoted(&self.base)));
        }
        if !self.chop_before.is_empty() || !self.chop_after.is_empty() {
            let exclusions = self
                .chop_before
                .iter()
                .map(|dn| format!("chopBefore:{}", quoted(dn)))
                .chain(self.chop_after.iter().map(|dn| format!("chopAfter:{}", quoted(dn))))
                .join(", ");
            parts.push(format!("specificExclusions {{ {} }}", exclusions));
        }
        if self.minimum > 0 {
            parts.push(format!("minimum {}", self.minimum));
        }
        if let Some(max) = self.maximum {
            parts.push(format!("maximum {}", max));
        }
        if let Some(r) = self.refinement.as_ref() {
            parts.push(format!("specificationFilter {}", r));
        }
        if parts.is_empty() {
            f.write_str("{ }")
        } else {
            write!(f, "{{ {} }}", parts.join(", "))
        }
    }
}
