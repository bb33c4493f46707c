use super::refinement::RefinementEvaluator;
use super::subtree::SubtreeSpecification;
use crate::prelude::*;
use crate::schema::SchemaRegistries;

/// Decides whether a subtree specification selects an entry.
pub struct SubtreeEvaluator<'a> {
    refinements: RefinementEvaluator<'a>,
}

impl<'a> SubtreeEvaluator<'a> {
    pub fn new(registries: &'a SchemaRegistries) -> Self {
        SubtreeEvaluator {
            refinements: RefinementEvaluator::new(registries),
        }
    }

    /// `entry_dn` is given separately from `entry` so that a rename or move can be checked
    /// against the name the entry is about to have.
    pub fn evaluate(
        &self,
        subtree: &SubtreeSpecification,
        administrative_point: &Dn,
        entry_dn: &Dn,
        entry: &Entry,
    ) -> Result<bool, OperationError> {
        let Some(ap_relative) = entry_dn.relative_to(administrative_point) else {
            return Ok(false);
        };
        let Some(base_relative) = ap_relative.relative_to(&subtree.base) else {
            return Ok(false);
        };

        let distance = base_relative.size();
        if let Some(max) = subtree.maximum {
            if distance > max {
                return Ok(false);
            }
        }
        if subtree.minimum > 0 && distance < subtree.minimum {
            return Ok(false);
        }

        if subtree
            .chop_before
            .iter()
            .any(|chop| base_relative.is_descendant_of(chop))
        {
            return Ok(false);
        }
        // The chop point itself stays selected.
        if subtree
            .chop_after
            .iter()
            .any(|chop| base_relative.is_strict_descendant_of(chop))
        {
            return Ok(false);
        }

        match subtree.refinement.as_ref() {
            Some(refinement) => {
                let selected = self
                    .refinements
                    .evaluate(refinement, entry.object_classes())
                    .map_err(|e| {
                        filter_error!(dn = %entry_dn, ?e, "refinement evaluation failed");
                        e
                    })?;
                Ok(selected)
            }
            None => Ok(true),
        }
    }
}
