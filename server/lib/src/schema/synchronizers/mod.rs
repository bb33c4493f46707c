//! Synchronizers keep the live registries in step with the meta-schema entries stored
//! beneath `ou=schema`. Each kind of schema element has one, and every change to a
//! meta-schema entry is replayed on the registries through it inside the same schema write
//! transaction as the partition change.
//!
//! The entries are laid out as
//!
//! ```text
//! ou=schema
//!   cn=<schema>                                     metaSchema
//!     ou=attributetypes                             container
//!       m-oid=<oid>                                 metaAttributeType
//!     ou=objectclasses / ou=syntaxes / ...
//! ```

use super::factory;
use super::objects::*;
use super::{SchemaTransaction, SchemaWriteTransaction};
use crate::prelude::*;

mod attributetype;
mod comparator;
mod matchingrule;
mod normalizer;
mod objectclass;
mod schema;
mod syntax;

pub use self::attributetype::AttributeTypeSynchronizer;
pub use self::comparator::ComparatorSynchronizer;
pub use self::matchingrule::MatchingRuleSynchronizer;
pub use self::normalizer::NormalizerSynchronizer;
pub use self::objectclass::ObjectClassSynchronizer;
pub use self::schema::SchemaSynchronizer;
pub use self::syntax::SyntaxSynchronizer;

/// Whether the registries changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaChange {
    Modified,
    Unchanged,
}

pub trait SchemaObjectSynchronizer: Send + Sync {
    fn kind(&self) -> SchemaObjectKind;

    /// Whether removing an element must be refused while others still refer to it.
    fn check_dependents(&self) -> bool {
        true
    }

    fn add(&self, txn: &mut SchemaWriteTransaction<'_>, entry: &Entry) -> Result<SchemaChange, OperationError> {
        add_object(txn, self.kind(), entry)
    }

    fn delete(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        entry: &Entry,
        cascade: bool,
    ) -> Result<SchemaChange, OperationError> {
        delete_object(txn, self.kind(), entry, cascade, self.check_dependents())
    }

    fn modify(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        before: &Entry,
        after: &Entry,
        cascade: bool,
    ) -> Result<SchemaChange, OperationError> {
        modify_object(txn, self.kind(), before, after, cascade, self.check_dependents())
    }

    fn rename(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        entry: &Entry,
        new_rdn: &Rdn,
        cascade: bool,
    ) -> Result<SchemaChange, OperationError> {
        let parent = parent_of(entry)?;
        move_object(txn, self.kind(), entry, &parent, Some(new_rdn), cascade)
    }

    fn move_entry(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        entry: &Entry,
        new_parent: &Dn,
        cascade: bool,
    ) -> Result<SchemaChange, OperationError> {
        move_object(txn, self.kind(), entry, new_parent, None, cascade)
    }

    fn move_and_rename(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        entry: &Entry,
        new_parent: &Dn,
        new_rdn: &Rdn,
        cascade: bool,
    ) -> Result<SchemaChange, OperationError> {
        move_object(txn, self.kind(), entry, new_parent, Some(new_rdn), cascade)
    }
}

pub fn for_kind(kind: SchemaObjectKind) -> &'static dyn SchemaObjectSynchronizer {
    match kind {
        SchemaObjectKind::Syntax => &SyntaxSynchronizer,
        SchemaObjectKind::Comparator => &ComparatorSynchronizer,
        SchemaObjectKind::Normalizer => &NormalizerSynchronizer,
        SchemaObjectKind::MatchingRule => &MatchingRuleSynchronizer,
        SchemaObjectKind::AttributeType => &AttributeTypeSynchronizer,
        SchemaObjectKind::ObjectClass => &ObjectClassSynchronizer,
    }
}

fn parent_of(entry: &Entry) -> Result<Dn, OperationError> {
    entry
        .dn()
        .parent()
        .ok_or_else(|| OperationError::NamingViolation(format!("{} has no parent", entry.dn())))
}

/// Check `parent` is `ou=<container>,cn=<schema>,ou=schema` for `kind` and return the
/// schema name.
pub fn check_parent(kind: SchemaObjectKind, parent: &Dn) -> Result<String, OperationError> {
    let violation = || {
        OperationError::NamingViolation(format!(
            "the parent of a {} must be ou={},cn=<schema>,{}, not {}",
            kind,
            kind.container(),
            SCHEMA_DN,
            parent
        ))
    };

    let rdns = parent.rdns();
    if rdns.len() != 3 || parent.parent().and_then(|p| p.parent()) != Some(Dn::parse(SCHEMA_DN)?) {
        return Err(violation());
    }
    let container = rdns[0].ava();
    if container.attr != Attribute::Ou || !container.value.trim().eq_ignore_ascii_case(kind.container()) {
        return Err(violation());
    }
    let schema = rdns[1].ava();
    if schema.attr != Attribute::Cn {
        return Err(violation());
    }
    Ok(schema.value.trim().to_string())
}

pub fn check_oid_is_unique(
    txn: &SchemaWriteTransaction<'_>,
    kind: SchemaObjectKind,
    oid: &str,
) -> Result<(), OperationError> {
    if txn.get_registries().contains_oid(kind, oid) {
        schema_warn!(%oid, %kind, "oid already in use");
        return Err(OperationError::SchemaViolation(SchemaError::OidAlreadyExists(
            oid.to_string(),
        )));
    }
    Ok(())
}

fn build(kind: SchemaObjectKind, entry: &Entry, parent: &Dn) -> Result<SchemaObject, OperationError> {
    let schema_name = check_parent(kind, parent)?;
    factory::schema_object(kind, entry, &schema_name)
}

fn oid_of(entry: &Entry) -> Result<String, OperationError> {
    entry
        .get_ava_single(&Attribute::MOid)
        .map(|o| o.trim().to_string())
        .ok_or_else(|| OperationError::NoSuchAttribute(format!("{} has no {}", entry.dn(), Attribute::MOid)))
}

pub fn add_object(
    txn: &mut SchemaWriteTransaction<'_>,
    kind: SchemaObjectKind,
    entry: &Entry,
) -> Result<SchemaChange, OperationError> {
    let obj = build(kind, entry, &parent_of(entry)?)?;
    check_oid_is_unique(txn, kind, obj.oid())?;
    let registered = txn.add(obj)?;
    schema_info!(dn = %entry.dn(), %registered, "added {}", kind);
    Ok(SchemaChange::Modified)
}

pub fn delete_object(
    txn: &mut SchemaWriteTransaction<'_>,
    kind: SchemaObjectKind,
    entry: &Entry,
    cascade: bool,
    check_dependents: bool,
) -> Result<SchemaChange, OperationError> {
    if cascade {
        return Err(OperationError::UnwillingToPerform(format!(
            "cascading delete of a {} is not supported",
            kind
        )));
    }
    check_parent(kind, &parent_of(entry)?)?;
    let oid = oid_of(entry)?;
    if check_dependents {
        txn.delete(kind, &oid)?;
    } else {
        txn.unregister(kind, &oid)?;
    }
    schema_info!(dn = %entry.dn(), "deleted {}", kind);
    Ok(SchemaChange::Modified)
}

pub fn modify_object(
    txn: &mut SchemaWriteTransaction<'_>,
    kind: SchemaObjectKind,
    before: &Entry,
    after: &Entry,
    cascade: bool,
    check_dependents: bool,
) -> Result<SchemaChange, OperationError> {
    if cascade {
        return Err(OperationError::UnwillingToPerform(format!(
            "cascading modify of a {} is not supported",
            kind
        )));
    }
    let parent = parent_of(before)?;
    let old = build(kind, before, &parent)?;
    let new = build(kind, after, &parent)?;
    if old == new {
        return Ok(SchemaChange::Unchanged);
    }
    if old.oid() != new.oid() {
        // The OID names the entry, so it only changes through a rename.
        return Err(OperationError::NamingViolation(format!(
            "the oid of {} can only change by renaming it",
            before.dn()
        )));
    }
    if old.is_enabled() && !new.is_enabled() && check_dependents {
        txn.disable_object(kind, old.oid())?;
    }
    txn.replace(old.oid(), new)?;
    schema_info!(dn = %after.dn(), "modified {}", kind);
    Ok(SchemaChange::Modified)
}

/// Rename, move, or both. The RDN of a meta-schema element is always its `m-oid`.
pub fn move_object(
    txn: &mut SchemaWriteTransaction<'_>,
    kind: SchemaObjectKind,
    entry: &Entry,
    new_parent: &Dn,
    new_rdn: Option<&Rdn>,
    cascade: bool,
) -> Result<SchemaChange, OperationError> {
    if cascade {
        return Err(OperationError::UnwillingToPerform(format!(
            "cascading rename or move of a {} is not supported",
            kind
        )));
    }
    check_parent(kind, &parent_of(entry)?)?;
    let old_oid = oid_of(entry)?;
    let mut obj = build(kind, entry, new_parent)?;

    if let Some(rdn) = new_rdn {
        let ava = rdn.ava();
        if ava.attr != Attribute::MOid {
            return Err(OperationError::NamingViolation(format!(
                "a {} must be named by {}, not {}",
                kind,
                Attribute::MOid,
                ava.attr
            )));
        }
        let new_oid = ava.value.trim().to_string();
        if new_oid != old_oid {
            check_oid_is_unique(txn, kind, &new_oid)?;
        }
        obj.meta_mut().oid = new_oid;
    }

    let target_enabled = txn
        .loaded_schema(obj.schema_name())
        .map(|s| s.enabled)
        .ok_or_else(|| {
            OperationError::UnwillingToPerform(format!(
                "schema {} is not loaded",
                obj.schema_name()
            ))
        })?;
    if target_enabled {
        txn.replace(&old_oid, obj)?;
    } else {
        // Deactivating it must not strand anything that refers to it.
        txn.delete(kind, &old_oid)?;
        txn.add(obj)?;
    }
    schema_info!(from = %entry.dn(), to = %new_parent, "moved {}", kind);
    Ok(SchemaChange::Modified)
}

// Entry points used by the schema interceptor. Schema entries go to the schema
// synchronizer, element entries to the synchronizer of their kind, and anything else
// beneath ou=schema (the containers) leaves the registries alone.

pub fn add(txn: &mut SchemaWriteTransaction<'_>, entry: &Entry) -> Result<SchemaChange, OperationError> {
    if factory::is_schema_entry(entry) {
        return SchemaSynchronizer.add(txn, entry);
    }
    match factory::kind_of(entry) {
        Some(kind) => for_kind(kind).add(txn, entry),
        None => Ok(SchemaChange::Unchanged),
    }
}

pub fn delete(txn: &mut SchemaWriteTransaction<'_>, entry: &Entry, cascade: bool) -> Result<SchemaChange, OperationError> {
    if factory::is_schema_entry(entry) {
        return SchemaSynchronizer.delete(txn, entry, cascade);
    }
    match factory::kind_of(entry) {
        Some(kind) => for_kind(kind).delete(txn, entry, cascade),
        None => Ok(SchemaChange::Unchanged),
    }
}

pub fn modify(
    txn: &mut SchemaWriteTransaction<'_>,
    before: &Entry,
    after: &Entry,
    cascade: bool,
) -> Result<SchemaChange, OperationError> {
    if factory::is_schema_entry(before) {
        return SchemaSynchronizer.modify(txn, before, after);
    }
    match factory::kind_of(before) {
        Some(kind) => for_kind(kind).modify(txn, before, after, cascade),
        None => Ok(SchemaChange::Unchanged),
    }
}

pub fn rename(
    txn: &mut SchemaWriteTransaction<'_>,
    entry: &Entry,
    new_rdn: &Rdn,
    cascade: bool,
) -> Result<SchemaChange, OperationError> {
    if factory::is_schema_entry(entry) {
        return SchemaSynchronizer.rename(entry);
    }
    match factory::kind_of(entry) {
        Some(kind) => for_kind(kind).rename(txn, entry, new_rdn, cascade),
        None => Ok(SchemaChange::Unchanged),
    }
}

pub fn move_entry(
    txn: &mut SchemaWriteTransaction<'_>,
    entry: &Entry,
    new_parent: &Dn,
    cascade: bool,
) -> Result<SchemaChange, OperationError> {
    if factory::is_schema_entry(entry) {
        return SchemaSynchronizer.move_entry(entry);
    }
    match factory::kind_of(entry) {
        Some(kind) => for_kind(kind).move_entry(txn, entry, new_parent, cascade),
        None => Ok(SchemaChange::Unchanged),
    }
}

pub fn move_and_rename(
    txn: &mut SchemaWriteTransaction<'_>,
    entry: &Entry,
    new_parent: &Dn,
    new_rdn: &Rdn,
    cascade: bool,
) -> Result<SchemaChange, OperationError> {
    if factory::is_schema_entry(entry) {
        return SchemaSynchronizer.move_entry(entry);
    }
    match factory::kind_of(entry) {
        Some(kind) => for_kind(kind).move_and_rename(txn, entry, new_parent, new_rdn, cascade),
        None => Ok(SchemaChange::Unchanged),
    }
}
