use super::{delete_object, oid_of, SchemaChange, SchemaObjectSynchronizer};
use crate::prelude::*;
use crate::schema::objects::SchemaObjectKind;
use crate::schema::{SchemaTransaction, SchemaWriteTransaction};

/// Normalizers are only loosely tied to the matching rule sharing their OID, so removing one
/// never waits on its dependents, and removing one that is already gone is not an error.
pub struct NormalizerSynchronizer;

impl SchemaObjectSynchronizer for NormalizerSynchronizer {
    fn kind(&self) -> SchemaObjectKind {
        SchemaObjectKind::Normalizer
    }

    fn check_dependents(&self) -> bool {
        false
    }

    fn delete(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        entry: &Entry,
        cascade: bool,
    ) -> Result<SchemaChange, OperationError> {
        let oid = oid_of(entry)?;
        if !txn.get_registries().contains_oid(self.kind(), &oid) {
            schema_info!(%oid, "normalizer already absent");
            return Ok(SchemaChange::Unchanged);
        }
        delete_object(txn, self.kind(), entry, cascade, self.check_dependents())
    }
}
