//! Refinements narrow a subtree specification to entries of particular object classes.
//!
//! ```text
//! Refinement ::= item:<oid or name>
//!              | and:{ Refinement, ... }
//!              | or:{ Refinement, ... }
//!              | not:Refinement
//! ```

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use super::subtree::subtreespec;
use crate::prelude::*;
use crate::schema::SchemaRegistries;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Refinement {
    Item(String),
    And(Vec<Refinement>),
    Or(Vec<Refinement>),
    Not(Box<Refinement>),
}

impl fmt::Display for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refinement::Item(oc) => write!(f, "item:{}", oc),
            Refinement::And(rs) => write!(f, "and:{{ {} }}", rs.iter().join(", ")),
            Refinement::Or(rs) => write!(f, "or:{{ {} }}", rs.iter().join(", ")),
            Refinement::Not(r) => write!(f, "not:{}", r),
        }
    }
}

impl FromStr for Refinement {
    type Err = OperationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        subtreespec::refinement(value.trim()).map_err(|e| {
            OperationError::SchemaViolation(SchemaError::InvalidRefinement(format!(
                "{}: expected {} at {}",
                value, e.expected, e.location
            )))
        })
    }
}

/// Decides a single `item:` assertion. The item and the entry's object classes may each be
/// given by name or OID.
pub struct RefinementLeafEvaluator<'a> {
    registries: &'a SchemaRegistries,
}

impl<'a> RefinementLeafEvaluator<'a> {
    pub fn new(registries: &'a SchemaRegistries) -> Self {
        RefinementLeafEvaluator { registries }
    }

    pub fn evaluate(&self, item: &str, object_classes: &ValueSet) -> bool {
        match self.registries.lookup_object_class(item) {
            Some(oc) => object_classes.iter().any(|v| oc.meta.is_named(v.trim())),
            // Unknown to the schema, so only a literal match can select it.
            None => object_classes.contains(item.trim()),
        }
    }
}

pub struct RefinementEvaluator<'a> {
    leaf: RefinementLeafEvaluator<'a>,
}

impl<'a> RefinementEvaluator<'a> {
    pub fn new(registries: &'a SchemaRegistries) -> Self {
        RefinementEvaluator {
            leaf: RefinementLeafEvaluator::new(registries),
        }
    }

    /// Evaluate `refinement` against the `objectClass` values of an entry. An entry with no
    /// object classes is a caller error.
    pub fn evaluate(
        &self,
        refinement: &Refinement,
        object_classes: Option<&ValueSet>,
    ) -> Result<bool, OperationError> {
        let object_classes = object_classes.ok_or_else(|| {
            OperationError::IllegalState(
                "a refinement can only be evaluated against object classes".to_string(),
            )
        })?;
        Ok(self.evaluate_node(refinement, object_classes))
    }

    fn evaluate_node(&self, refinement: &Refinement, object_classes: &ValueSet) -> bool {
        match refinement {
            Refinement::Item(item) => self.leaf.evaluate(item, object_classes),
            Refinement::And(rs) => rs.iter().all(|r| self.evaluate_node(r, object_classes)),
            Refinement::Or(rs) => rs.iter().any(|r| self.evaluate_node(r, object_classes)),
            Refinement::Not(r) => !self.evaluate_node(r, object_classes),
        }
    }
}
