//! An in-memory partition. Entries live in a concurrent B+tree keyed by normalised DN. Every
//! mutation is one write transaction, so readers never observe half of a subtree rename.

use std::sync::atomic::{AtomicU64, Ordering};

use concread::bptree::BptreeMap;

use super::PartitionNexus;
use crate::prelude::*;

pub struct MemoryPartition {
    suffixes: Vec<Dn>,
    entries: BptreeMap<String, Entry>,
    syncs: AtomicU64,
}

impl MemoryPartition {
    pub fn new(suffixes: Vec<Dn>) -> Self {
        MemoryPartition {
            suffixes,
            entries: BptreeMap::new(),
            syncs: AtomicU64::new(0),
        }
    }

    /// How many times the partition has been flushed.
    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_suffix(&self, dn: &Dn) -> bool {
        self.suffixes.iter().any(|s| s == dn)
    }

    fn in_scope(&self, base: &Dn, scope: Scope) -> Result<Vec<Entry>, OperationError> {
        let rd = self.entries.read();
        if !base.is_empty() && rd.get(&base.norm_string()).is_none() {
            return Err(OperationError::NoSuchObject(base.to_string()));
        }
        let mut found: Vec<Entry> = rd
            .iter()
            .filter(|(_, e)| scope.contains(base, e.dn()))
            .map(|(_, e)| e.clone())
            .collect();
        // Parents before children.
        found.sort_by_key(|e| e.dn().size());
        Ok(found)
    }

    fn moddn<P: ModDnPayload>(&self, ctx: &OperationContext<P>) -> Result<(), OperationError> {
        let old_dn = &ctx.dn;
        let new_dn = ctx.op.new_dn(old_dn)?;
        let old_key = old_dn.norm_string();
        let new_key = new_dn.norm_string();

        let mut wr = self.entries.write();
        let mut target = wr
            .get(&old_key)
            .cloned()
            .ok_or_else(|| OperationError::NoSuchObject(old_dn.to_string()))?;
        if old_key != new_key && wr.contains_key(&new_key) {
            return Err(OperationError::EntryAlreadyExists(new_dn.to_string()));
        }
        if new_dn.is_strict_descendant_of(old_dn) {
            return Err(OperationError::UnwillingToPerform(format!(
                "can't move {} beneath itself",
                old_dn
            )));
        }
        if let Some(parent) = new_dn.parent() {
            if !self.is_suffix(&new_dn) && !wr.contains_key(&parent.norm_string()) {
                return Err(OperationError::NoSuchObject(parent.to_string()));
            }
        }

        let descendants: Vec<(String, Entry)> = wr
            .iter()
            .filter(|(_, e)| e.dn().is_strict_descendant_of(old_dn))
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();

        if let Some((new_rdn, delete_old_rdn)) = ctx.op.rename() {
            if delete_old_rdn {
                if let Some(old_rdn) = old_dn.rdn() {
                    for ava in old_rdn.avas() {
                        target.remove_ava(&ava.attr, &ava.value);
                    }
                }
            }
            for ava in new_rdn.avas() {
                target.add_ava(ava.attr.clone(), ava.value.clone());
            }
        }

        wr.remove(&old_key);
        target.set_dn(new_dn.clone());
        wr.insert(new_key, target);

        for (key, mut e) in descendants {
            wr.remove(&key);
            if let Some(rebased) = e.dn().rebase(old_dn, &new_dn) {
                e.set_dn(rebased.clone());
                wr.insert(rebased.norm_string(), e);
            }
        }
        wr.commit();
        Ok(())
    }
}

impl PartitionNexus for MemoryPartition {
    fn suffixes(&self) -> Vec<Dn> {
        self.suffixes.clone()
    }

    fn fetch(&self, dn: &Dn) -> Result<Option<Entry>, OperationError> {
        Ok(self.entries.read().get(&dn.norm_string()).cloned())
    }

    fn has_children(&self, dn: &Dn) -> Result<bool, OperationError> {
        let size = dn.size() + 1;
        Ok(self
            .entries
            .read()
            .iter()
            .any(|(_, e)| e.dn().size() == size && e.dn().is_descendant_of(dn)))
    }

    fn add(&self, ctx: &OperationContext<AddOp>) -> Result<(), OperationError> {
        let entry = &ctx.op.entry;
        let key = entry.dn().norm_string();
        let mut wr = self.entries.write();
        if wr.contains_key(&key) {
            return Err(OperationError::EntryAlreadyExists(entry.dn().to_string()));
        }
        if !self.is_suffix(entry.dn()) {
            let parent = entry
                .dn()
                .parent()
                .ok_or_else(|| OperationError::UnwillingToPerform("can't add the root dse".to_string()))?;
            if !wr.contains_key(&parent.norm_string()) {
                return Err(OperationError::NoSuchObject(parent.to_string()));
            }
        }
        trace!(dn = %entry.dn(), "partition add");
        wr.insert(key, entry.clone());
        wr.commit();
        Ok(())
    }

    fn delete(&self, ctx: &OperationContext<DeleteOp>) -> Result<(), OperationError> {
        if self.has_children(&ctx.dn)? {
            return Err(OperationError::NotAllowedOnNonLeaf(ctx.dn.to_string()));
        }
        let mut wr = self.entries.write();
        if wr.remove(&ctx.dn.norm_string()).is_none() {
            return Err(OperationError::NoSuchObject(ctx.dn.to_string()));
        }
        trace!(dn = %ctx.dn, "partition delete");
        wr.commit();
        Ok(())
    }

    fn modify(&self, ctx: &OperationContext<ModifyOp>) -> Result<Entry, OperationError> {
        let key = ctx.dn.norm_string();
        let mut wr = self.entries.write();
        let mut entry = wr
            .get(&key)
            .cloned()
            .ok_or_else(|| OperationError::NoSuchObject(ctx.dn.to_string()))?;
        entry.apply_modlist(&ctx.op.mods);

        // The naming values must survive.
        if let Some(rdn) = ctx.dn.rdn() {
            if let Some(ava) = rdn
                .avas()
                .iter()
                .find(|ava| !entry.attribute_equality(&ava.attr, &ava.value))
            {
                return Err(OperationError::NamingViolation(format!(
                    "modification removes the naming value {} of {}",
                    ava, ctx.dn
                )));
            }
        }
        wr.insert(key, entry.clone());
        wr.commit();
        Ok(entry)
    }

    fn rename(&self, ctx: &OperationContext<RenameOp>) -> Result<(), OperationError> {
        self.moddn(ctx)
    }

    fn move_entry(&self, ctx: &OperationContext<MoveOp>) -> Result<(), OperationError> {
        self.moddn(ctx)
    }

    fn move_and_rename(&self, ctx: &OperationContext<MoveAndRenameOp>) -> Result<(), OperationError> {
        self.moddn(ctx)
    }

    fn lookup(&self, ctx: &OperationContext<LookupOp>) -> Result<Option<Entry>, OperationError> {
        self.fetch(&ctx.dn)
    }

    fn has_entry(&self, ctx: &OperationContext<HasEntryOp>) -> Result<bool, OperationError> {
        Ok(self.entries.read().contains_key(&ctx.dn.norm_string()))
    }

    fn search(&self, ctx: &OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        ctx.op.filter.validate()?;
        let found: Vec<Entry> = self
            .in_scope(&ctx.dn, ctx.op.scope)?
            .into_iter()
            .filter(|e| ctx.op.filter.matches(e))
            .collect();
        filter_trace!(base = %ctx.dn, filter = %ctx.op.filter, found = found.len(), "partition search");
        Ok(EntryCursor::new(found))
    }

    fn list(&self, ctx: &OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        self.in_scope(&ctx.dn, Scope::One).map(EntryCursor::new)
    }

    fn compare(&self, ctx: &OperationContext<CompareOp>) -> Result<bool, OperationError> {
        let entry = self
            .fetch(&ctx.dn)?
            .ok_or_else(|| OperationError::NoSuchObject(ctx.dn.to_string()))?;
        Ok(entry.attribute_equality(&ctx.op.attr, &ctx.op.value))
    }

    fn root_dse(&self, _ctx: &OperationContext<RootDseOp>) -> Result<Entry, OperationError> {
        let mut e = entry_init!(
            Dn::root(),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::ExtensibleObject.as_ref()),
            (Attribute::SubschemaSubentry, SUBSCHEMA_SUBENTRY_DN),
            (Attribute::SupportedLdapVersion, "3"),
            (Attribute::SupportedControl, OID_SUBENTRIES_CONTROL),
            (Attribute::SupportedControl, OID_MANAGE_DSA_IT_CONTROL),
            (Attribute::VendorName, VENDOR_NAME)
        );
        e.add_avas(
            Attribute::NamingContexts,
            self.suffixes.iter().map(|s| s.to_string()),
        );
        Ok(e)
    }

    fn sync(&self) -> Result<(), OperationError> {
        self.syncs.fetch_add(1, Ordering::Relaxed);
        trace!("partition sync");
        Ok(())
    }
}
