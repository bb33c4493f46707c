//! The subentry cache indexes every subentry held by the partitions by its normalised DN.
//! It is derived data: rebuilt from a search at startup and maintained by the subentry
//! interceptor afterwards.

use concread::cowcell::{CowCell, CowCellReadTxn, CowCellWriteTxn};
use hashbrown::HashMap;

use super::evaluator::SubtreeEvaluator;
use super::subtree::SubtreeSpecification;
use crate::prelude::*;

bitflags::bitflags! {
    /// The policy families a subentry belongs to. A subentry may belong to several.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SubentryTypes: u8 {
        const ACCESS_CONTROL = 0b0001;
        const SCHEMA =         0b0010;
        const COLLECTIVE =     0b0100;
        const TRIGGER =        0b1000;
    }
}

const TYPE_CLASSES: [(SubentryTypes, EntryClass, Attribute); 4] = [
    (
        SubentryTypes::ACCESS_CONTROL,
        EntryClass::AccessControlSubentry,
        Attribute::AccessControlSubentries,
    ),
    (
        SubentryTypes::SCHEMA,
        EntryClass::Subschema,
        Attribute::SubschemaSubentry,
    ),
    (
        SubentryTypes::COLLECTIVE,
        EntryClass::CollectiveAttributeSubentry,
        Attribute::CollectiveAttributeSubentries,
    ),
    (
        SubentryTypes::TRIGGER,
        EntryClass::TriggerExecutionSubentry,
        Attribute::TriggerExecutionSubentries,
    ),
];

impl SubentryTypes {
    pub fn from_entry(entry: &Entry) -> Self {
        TYPE_CLASSES
            .iter()
            .filter(|(_, class, _)| entry.has_class(*class))
            .fold(SubentryTypes::empty(), |acc, (t, _, _)| acc | *t)
    }

    /// The operational attributes through which entries refer to subentries of these types.
    pub fn reference_attrs(self) -> Vec<Attribute> {
        TYPE_CLASSES
            .iter()
            .filter(|(t, _, _)| self.contains(*t))
            .map(|(_, _, attr)| attr.clone())
            .collect()
    }

    /// Every reference attribute, whatever the type.
    pub fn all_reference_attrs() -> Vec<Attribute> {
        SubentryTypes::all().reference_attrs()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subentry {
    pub dn: Dn,
    pub subtree: SubtreeSpecification,
    pub types: SubentryTypes,
}

impl Subentry {
    pub fn from_entry(entry: &Entry) -> Result<Self, OperationError> {
        let value = entry
            .get_ava_single(&Attribute::SubtreeSpecification)
            .ok_or_else(|| {
                OperationError::SchemaViolation(SchemaError::InvalidSubtreeSpecification(format!(
                    "{} has no {}",
                    entry.dn(),
                    Attribute::SubtreeSpecification
                )))
            })?;
        Ok(Subentry {
            dn: entry.dn().clone(),
            subtree: SubtreeSpecification::parse(value)?,
            types: SubentryTypes::from_entry(entry),
        })
    }

    /// A subentry sits immediately beneath its administrative point.
    pub fn administrative_point(&self) -> Dn {
        self.dn.parent().unwrap_or_default()
    }

    /// The root of every entry this subentry can select.
    pub fn base_dn(&self) -> Dn {
        self.subtree.base_dn(&self.administrative_point())
    }

    pub fn selects(
        &self,
        evaluator: &SubtreeEvaluator<'_>,
        entry_dn: &Dn,
        entry: &Entry,
    ) -> Result<bool, OperationError> {
        // Subentries never select themselves or each other.
        if entry.is_subentry() {
            return Ok(false);
        }
        evaluator.evaluate(&self.subtree, &self.administrative_point(), entry_dn, entry)
    }
}

type SubentryMap = HashMap<String, Subentry>;

pub struct SubentryCache {
    inner: CowCell<SubentryMap>,
}

pub struct SubentryCacheReadTransaction {
    inner: CowCellReadTxn<SubentryMap>,
}

/// Subentry writers are serialised. Nothing is visible to readers until commit.
pub struct SubentryCacheWriteTransaction<'a> {
    inner: CowCellWriteTxn<'a, SubentryMap>,
}

pub trait SubentryCacheTransaction {
    fn get_map(&self) -> &SubentryMap;

    fn get(&self, dn: &Dn) -> Option<&Subentry> {
        self.get_map().get(&dn.norm_string())
    }

    fn contains(&self, dn: &Dn) -> bool {
        self.get_map().contains_key(&dn.norm_string())
    }

    fn len(&self) -> usize {
        self.get_map().len()
    }

    fn is_empty(&self) -> bool {
        self.get_map().is_empty()
    }

    fn subentries(&self) -> Vec<&Subentry> {
        self.get_map().values().collect()
    }

    /// The subentries whose administrative area includes `dn`.
    fn covering(&self, dn: &Dn) -> Vec<&Subentry> {
        self.get_map()
            .values()
            .filter(|s| dn.is_descendant_of(&s.administrative_point()))
            .collect()
    }
}

impl SubentryCacheTransaction for SubentryCacheReadTransaction {
    fn get_map(&self) -> &SubentryMap {
        &self.inner
    }
}

impl<'a> SubentryCacheTransaction for SubentryCacheWriteTransaction<'a> {
    fn get_map(&self) -> &SubentryMap {
        &self.inner
    }
}

impl SubentryCache {
    pub fn new() -> Self {
        SubentryCache {
            inner: CowCell::new(HashMap::new()),
        }
    }

    pub fn read(&self) -> SubentryCacheReadTransaction {
        SubentryCacheReadTransaction {
            inner: self.inner.read(),
        }
    }

    pub fn write(&self) -> SubentryCacheWriteTransaction<'_> {
        SubentryCacheWriteTransaction {
            inner: self.inner.write(),
        }
    }
}

impl Default for SubentryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SubentryCacheWriteTransaction<'a> {
    pub fn insert(&mut self, subentry: Subentry) -> Option<Subentry> {
        trace!(dn = %subentry.dn, types = ?subentry.types, "caching subentry");
        self.inner.insert(subentry.dn.norm_string(), subentry)
    }

    pub fn remove(&mut self, dn: &Dn) -> Option<Subentry> {
        trace!(%dn, "uncaching subentry");
        self.inner.remove(&dn.norm_string())
    }

    /// Move a cached subentry to a new name, keeping its specification and types.
    pub fn rename(&mut self, old_dn: &Dn, new_dn: &Dn) -> Option<&Subentry> {
        let mut subentry = self.inner.remove(&old_dn.norm_string())?;
        subentry.dn = new_dn.clone();
        let key = new_dn.norm_string();
        self.inner.insert(key.clone(), subentry);
        self.inner.get(&key)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn commit(self) {
        self.inner.commit();
    }
}
