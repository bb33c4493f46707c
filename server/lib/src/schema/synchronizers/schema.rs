//! Loads, unloads, enables and disables whole schemas as their `cn=<name>,ou=schema`
//! entries change.

use super::SchemaChange;
use crate::prelude::*;
use crate::schema::factory;
use crate::schema::{SchemaTransaction, SchemaWriteTransaction};

pub struct SchemaSynchronizer;

fn name_of(entry: &Entry) -> Result<String, OperationError> {
    entry
        .get_ava_single(&Attribute::Cn)
        .map(|n| n.trim().to_string())
        .ok_or_else(|| OperationError::NoSuchAttribute(format!("{} has no {}", entry.dn(), Attribute::Cn)))
}

impl SchemaSynchronizer {
    pub fn add(&self, txn: &mut SchemaWriteTransaction<'_>, entry: &Entry) -> Result<SchemaChange, OperationError> {
        if entry.dn().parent() != Some(Dn::parse(SCHEMA_DN)?) {
            return Err(OperationError::NamingViolation(format!(
                "a schema must be directly beneath {}, not {}",
                SCHEMA_DN,
                entry.dn()
            )));
        }
        let schema = factory::schema(entry)?;
        if txn.get_registries().loaded_schema(&schema.name).is_some() {
            // The built in schemas are loaded before their entries are read back.
            schema_trace!(name = %schema.name, "schema already loaded");
            return Ok(SchemaChange::Unchanged);
        }
        txn.add_schema(schema)?;
        Ok(SchemaChange::Modified)
    }

    pub fn delete(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        entry: &Entry,
        cascade: bool,
    ) -> Result<SchemaChange, OperationError> {
        if cascade {
            return Err(OperationError::UnwillingToPerform(
                "cascading delete of a schema is not supported".to_string(),
            ));
        }
        let name = name_of(entry)?;
        txn.remove_schema(&name)?;
        schema_info!(%name, "schema unloaded");
        Ok(SchemaChange::Modified)
    }

    /// Apply a change of `m-disabled` or `m-dependencies`. Only a transition of the
    /// disabled flag enables or disables the schema.
    pub fn modify(
        &self,
        txn: &mut SchemaWriteTransaction<'_>,
        before: &Entry,
        after: &Entry,
    ) -> Result<SchemaChange, OperationError> {
        let name = name_of(before)?;
        let mut change = SchemaChange::Unchanged;

        let was_disabled = factory::is_disabled(before);
        let is_disabled = factory::is_disabled(after);
        let old = factory::schema(before)?;
        let new = factory::schema(after)?;

        // Dependencies must be right before enabling, and stay valid until disabled.
        if !is_disabled && old.dependencies != new.dependencies {
            txn.set_dependencies(&name, new.dependencies.clone())?;
            change = SchemaChange::Modified;
        }
        match (was_disabled, is_disabled) {
            (false, true) => {
                if txn.disable(&name)? {
                    change = SchemaChange::Modified;
                }
            }
            (true, false) => {
                if txn.enable(&name)? {
                    change = SchemaChange::Modified;
                }
            }
            _ => {}
        }
        if is_disabled && old.dependencies != new.dependencies {
            txn.set_dependencies(&name, new.dependencies)?;
            change = SchemaChange::Modified;
        }
        Ok(change)
    }

    pub fn rename(&self, entry: &Entry) -> Result<SchemaChange, OperationError> {
        Err(OperationError::UnwillingToPerform(format!(
            "renaming the schema {} is not supported",
            entry.dn()
        )))
    }

    pub fn move_entry(&self, entry: &Entry) -> Result<SchemaChange, OperationError> {
        Err(OperationError::UnwillingToPerform(format!(
            "moving the schema {} is not supported",
            entry.dn()
        )))
    }
}
