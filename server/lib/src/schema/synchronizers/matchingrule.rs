use super::SchemaObjectSynchronizer;
use crate::schema::objects::SchemaObjectKind;

/// Matching rules link an attribute type's equality to the normalizer and comparator
/// registered under the same OID.
pub struct MatchingRuleSynchronizer;

impl SchemaObjectSynchronizer for MatchingRuleSynchronizer {
    fn kind(&self) -> SchemaObjectKind {
        SchemaObjectKind::MatchingRule
    }
}
