//! The schema manager. The live registries of syntaxes, comparators, normalizers, matching
//! rules, attribute types and object classes are held in a [`CowCell`] so that readers
//! always see a consistent snapshot while a single writer at a time applies changes. A write
//! transaction that is dropped without [`commit`](SchemaWriteTransaction::commit) leaves
//! the registries untouched, which is how failed schema operations roll back.
//!
//! Every element is either *registered* (its schema is enabled and the element is not
//! individually disabled) or *stashed* on its [`Schema`] so that enabling the schema later
//! can restore it. OIDs are unique per element kind over both states.

use std::collections::BTreeMap;

use concread::cowcell::{CowCell, CowCellReadTxn, CowCellWriteTxn};
use hashbrown::{HashMap, HashSet};

use crate::prelude::*;

pub mod factory;
pub mod normalizers;
pub mod objects;
pub mod synchronizers;

use self::normalizers::{Normalizer, NormalizerMapping};
use self::objects::*;

#[derive(Clone, Default)]
pub struct SchemaRegistries {
    objects: HashMap<SchemaObjectKind, HashMap<String, SchemaObject>>,
    // lower cased name or oid -> oid
    names: HashMap<SchemaObjectKind, HashMap<String, String>>,
    known: HashMap<SchemaObjectKind, HashSet<String>>,
    schemas: BTreeMap<String, Schema>,
    mapping: NormalizerMapping,
    errors: Vec<SchemaError>,
}

impl SchemaRegistries {
    /// Resolve a name or OID of a registered element to its OID.
    pub fn resolve_oid(&self, kind: SchemaObjectKind, name_or_oid: &str) -> Option<&str> {
        self.names
            .get(&kind)
            .and_then(|n| n.get(&name_or_oid.trim().to_lowercase()))
            .map(|s| s.as_str())
    }

    /// A registered element by name or OID.
    pub fn get(&self, kind: SchemaObjectKind, name_or_oid: &str) -> Option<&SchemaObject> {
        let oid = self.resolve_oid(kind, name_or_oid)?;
        self.objects.get(&kind).and_then(|o| o.get(oid))
    }

    pub fn is_registered(&self, kind: SchemaObjectKind, oid: &str) -> bool {
        self.objects
            .get(&kind)
            .map(|o| o.contains_key(oid))
            .unwrap_or(false)
    }

    /// True if the OID is in use by an element of this kind, registered or stashed.
    pub fn contains_oid(&self, kind: SchemaObjectKind, oid: &str) -> bool {
        self.known
            .get(&kind)
            .map(|k| k.contains(oid))
            .unwrap_or(false)
    }

    /// An element by OID, registered or stashed.
    pub fn find(&self, kind: SchemaObjectKind, oid: &str) -> Option<SchemaObject> {
        if let Some(obj) = self.objects.get(&kind).and_then(|o| o.get(oid)) {
            return Some(obj.clone());
        }
        self.schemas
            .values()
            .flat_map(|s| s.stashed.iter())
            .find(|o| o.kind() == kind && o.oid() == oid)
            .cloned()
    }

    pub fn iter(&self, kind: SchemaObjectKind) -> impl Iterator<Item = &SchemaObject> {
        self.objects.get(&kind).into_iter().flat_map(|o| o.values())
    }

    pub fn count(&self, kind: SchemaObjectKind) -> usize {
        self.objects.get(&kind).map(|o| o.len()).unwrap_or(0)
    }

    pub fn lookup_attribute_type(&self, name_or_oid: &str) -> Option<&AttributeType> {
        match self.get(SchemaObjectKind::AttributeType, name_or_oid) {
            Some(SchemaObject::AttributeType(at)) => Some(at),
            _ => None,
        }
    }

    pub fn lookup_object_class(&self, name_or_oid: &str) -> Option<&ObjectClass> {
        match self.get(SchemaObjectKind::ObjectClass, name_or_oid) {
            Some(SchemaObject::ObjectClass(oc)) => Some(oc),
            _ => None,
        }
    }

    pub fn lookup_matching_rule(&self, name_or_oid: &str) -> Option<&MatchingRule> {
        match self.get(SchemaObjectKind::MatchingRule, name_or_oid) {
            Some(SchemaObject::MatchingRule(mr)) => Some(mr),
            _ => None,
        }
    }

    pub fn lookup_normalizer(&self, oid: &str) -> Option<&NormalizerDescription> {
        match self.get(SchemaObjectKind::Normalizer, oid) {
            Some(SchemaObject::Normalizer(n)) => Some(n),
            _ => None,
        }
    }

    pub fn lookup_comparator(&self, oid: &str) -> Option<&ComparatorDescription> {
        match self.get(SchemaObjectKind::Comparator, oid) {
            Some(SchemaObject::Comparator(c)) => Some(c),
            _ => None,
        }
    }

    pub fn loaded_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(&name.to_lowercase())
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn normalizer_mapping(&self) -> &NormalizerMapping {
        &self.mapping
    }

    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// The elements this one refers to, as `(kind, name or oid)`.
    fn references(obj: &SchemaObject) -> Vec<(SchemaObjectKind, &str)> {
        match obj {
            SchemaObject::AttributeType(at) => at
                .superior
                .iter()
                .map(|s| (SchemaObjectKind::AttributeType, s.as_str()))
                .chain(at.syntax.iter().map(|s| (SchemaObjectKind::Syntax, s.as_str())))
                .chain(
                    at.equality
                        .iter()
                        .map(|s| (SchemaObjectKind::MatchingRule, s.as_str())),
                )
                .collect(),
            SchemaObject::ObjectClass(oc) => oc
                .superiors
                .iter()
                .map(|s| (SchemaObjectKind::ObjectClass, s.as_str()))
                .chain(
                    oc.must
                        .iter()
                        .chain(oc.may.iter())
                        .map(|s| (SchemaObjectKind::AttributeType, s.as_str())),
                )
                .collect(),
            SchemaObject::MatchingRule(mr) => {
                vec![(SchemaObjectKind::Syntax, mr.syntax.as_str())]
            }
            SchemaObject::Syntax(_) | SchemaObject::Normalizer(_) | SchemaObject::Comparator(_) => {
                Vec::new()
            }
        }
    }

    /// Check that everything `obj` refers to is registered.
    fn check_references(&self, obj: &SchemaObject) -> Result<(), OperationError> {
        for (kind, name) in Self::references(obj) {
            let is_self = kind == obj.kind() && obj.meta().is_named(name);
            if !is_self && self.resolve_oid(kind, name).is_none() {
                schema_error!(%obj, missing = %name, "reference to an unregistered {}", kind);
                return Err(OperationError::SchemaViolation(SchemaError::NoSuchOid(
                    name.to_string(),
                )));
            }
        }
        Ok(())
    }

    /// Registered elements that depend on `(kind, oid)`, split into descendants (sub types
    /// and sub classes) and other dependents.
    pub fn dependents_of(&self, kind: SchemaObjectKind, oid: &str) -> (Vec<String>, Vec<String>) {
        let mut descendants = Vec::new();
        let mut dependents = Vec::new();

        if matches!(kind, SchemaObjectKind::Normalizer | SchemaObjectKind::Comparator) {
            if self.is_registered(SchemaObjectKind::MatchingRule, oid) {
                dependents.push(oid.to_string());
            }
            return (descendants, dependents);
        }

        for other in self.objects.values().flat_map(|o| o.values()) {
            if other.kind() == kind && other.oid() == oid {
                continue;
            }
            for (ref_kind, name) in Self::references(other) {
                if ref_kind != kind || self.resolve_oid(kind, name) != Some(oid) {
                    continue;
                }
                let hierarchical = matches!(
                    (other, kind),
                    (SchemaObject::AttributeType(at), SchemaObjectKind::AttributeType)
                        if at.superior.as_deref() == Some(name)
                ) || matches!(
                    (other, kind),
                    (SchemaObject::ObjectClass(oc), SchemaObjectKind::ObjectClass)
                        if oc.superiors.iter().any(|s| s == name)
                );
                if hierarchical {
                    descendants.push(other.meta().name().to_string());
                } else {
                    dependents.push(other.meta().name().to_string());
                }
                break;
            }
        }
        descendants.sort();
        dependents.sort();
        (descendants, dependents)
    }

    fn check_no_dependents(&self, kind: SchemaObjectKind, oid: &str) -> Result<(), OperationError> {
        let (descendants, dependents) = self.dependents_of(kind, oid);
        if !descendants.is_empty() {
            return Err(OperationError::SchemaViolation(SchemaError::HasDescendants {
                oid: oid.to_string(),
                descendants,
            }));
        }
        if !dependents.is_empty() {
            return Err(OperationError::SchemaViolation(SchemaError::HasDependents {
                oid: oid.to_string(),
                dependents,
            }));
        }
        Ok(())
    }

    fn register(&mut self, obj: SchemaObject) {
        let kind = obj.kind();
        let oid = obj.oid().to_string();
        let names = self.names.entry(kind).or_default();
        names.insert(oid.to_lowercase(), oid.clone());
        for name in obj.meta().names.iter() {
            names.insert(name.to_lowercase(), oid.clone());
        }
        self.known.entry(kind).or_default().insert(oid.clone());
        self.objects.entry(kind).or_default().insert(oid, obj);
    }

    fn deregister(&mut self, kind: SchemaObjectKind, oid: &str) -> Option<SchemaObject> {
        let obj = self.objects.get_mut(&kind)?.remove(oid)?;
        if let Some(names) = self.names.get_mut(&kind) {
            names.retain(|_, v| v != oid);
        }
        Some(obj)
    }

    fn take_stashed(&mut self, kind: SchemaObjectKind, oid: &str) -> Option<SchemaObject> {
        self.schemas.values_mut().find_map(|s| {
            let idx = s
                .stashed
                .iter()
                .position(|o| o.kind() == kind && o.oid() == oid)?;
            Some(s.stashed.remove(idx))
        })
    }

    fn stash(&mut self, obj: SchemaObject) -> Result<(), OperationError> {
        let schema_name = obj.schema_name().to_lowercase();
        let kind = obj.kind();
        let oid = obj.oid().to_string();
        let schema = self.schemas.get_mut(&schema_name).ok_or_else(|| {
            OperationError::SchemaViolation(SchemaError::InvalidSchemaEntry(format!(
                "schema {} is not loaded",
                schema_name
            )))
        })?;
        schema.stashed.push(obj);
        self.known.entry(kind).or_default().insert(oid);
        Ok(())
    }

    /// The equality matching rule of an attribute type, inherited from its superiors.
    fn equality_of(&self, at: &AttributeType) -> Option<String> {
        let mut current = at;
        // Bounded so a hierarchy cycle can't hang us.
        for _ in 0..16 {
            if let Some(eq) = current.equality.as_ref() {
                return self
                    .resolve_oid(SchemaObjectKind::MatchingRule, eq)
                    .map(str::to_string);
            }
            current = self.lookup_attribute_type(current.superior.as_deref()?)?;
        }
        None
    }

    fn rebuild_mapping(&mut self) {
        let mut mapping = NormalizerMapping::default();
        for obj in self.iter(SchemaObjectKind::AttributeType) {
            let SchemaObject::AttributeType(at) = obj else {
                continue;
            };
            let normalizer = self
                .equality_of(at)
                .and_then(|eq| self.lookup_normalizer(&eq))
                .and_then(|n| Normalizer::from_fqcn(&n.fqcn))
                .unwrap_or(Normalizer::DeepTrimToLower);
            let primary = Attribute::from_str(at.meta.name());
            for alias in at.meta.names.iter().chain(std::iter::once(&at.meta.oid)) {
                let alias = Attribute::from_str(alias);
                mapping.insert(alias.clone(), normalizer);
                mapping.insert_alias(alias, primary.clone());
            }
        }
        self.mapping = mapping;
    }
}

pub struct SchemaManager {
    registries: CowCell<SchemaRegistries>,
}

/// A readonly snapshot of the registries.
pub struct SchemaReadTransaction {
    registries: CowCellReadTxn<SchemaRegistries>,
}

/// A writable transaction over the registries. Writers are serialised; nothing is
/// visible to readers until [`commit`](Self::commit).
pub struct SchemaWriteTransaction<'a> {
    registries: CowCellWriteTxn<'a, SchemaRegistries>,
}

pub trait SchemaTransaction {
    fn get_registries(&self) -> &SchemaRegistries;

    fn lookup_attribute_type(&self, name_or_oid: &str) -> Option<&AttributeType> {
        self.get_registries().lookup_attribute_type(name_or_oid)
    }

    fn lookup_object_class(&self, name_or_oid: &str) -> Option<&ObjectClass> {
        self.get_registries().lookup_object_class(name_or_oid)
    }

    fn normalizer_mapping(&self) -> &NormalizerMapping {
        self.get_registries().normalizer_mapping()
    }

    fn loaded_schema(&self, name: &str) -> Option<&Schema> {
        self.get_registries().loaded_schema(name)
    }

    fn errors(&self) -> &[SchemaError] {
        self.get_registries().errors()
    }

    fn is_operational(&self, attr: &Attribute) -> bool {
        self.lookup_attribute_type(attr.as_str())
            .map(|at| at.usage.is_operational())
            .unwrap_or(false)
    }

    fn is_collective(&self, attr: &Attribute) -> bool {
        self.lookup_attribute_type(attr.as_str())
            .map(|at| at.collective)
            .unwrap_or(false)
    }

    fn is_no_user_modification(&self, attr: &Attribute) -> bool {
        self.lookup_attribute_type(attr.as_str())
            .map(|at| at.no_user_modification)
            .unwrap_or(false)
    }

    fn is_single_value(&self, attr: &Attribute) -> bool {
        self.lookup_attribute_type(attr.as_str())
            .map(|at| at.single_value)
            .unwrap_or(false)
    }

    /// Check every registered element only refers to registered elements.
    fn validate(&self) -> Vec<OperationError> {
        let registries = self.get_registries();
        SchemaObjectKind::all()
            .into_iter()
            .flat_map(|kind| registries.iter(kind))
            .filter_map(|obj| registries.check_references(obj).err())
            .collect()
    }
}

impl SchemaTransaction for SchemaReadTransaction {
    fn get_registries(&self) -> &SchemaRegistries {
        &self.registries
    }
}

impl<'a> SchemaTransaction for SchemaWriteTransaction<'a> {
    fn get_registries(&self) -> &SchemaRegistries {
        &self.registries
    }
}

impl SchemaManager {
    /// An empty manager with no schemas loaded.
    pub fn new() -> Self {
        SchemaManager {
            registries: CowCell::new(SchemaRegistries::default()),
        }
    }

    /// A manager with every bootstrap schema loaded and enabled.
    pub fn bootstrap() -> Result<Self, OperationError> {
        let manager = Self::new();
        let mut sw = manager.write();
        for (schema, _) in BOOTSTRAP_SCHEMAS.iter() {
            sw.add_schema(schema.clone())?;
        }
        // Elements may refer across schemas, so register them kind by kind.
        let mut objects: Vec<SchemaObject> = BOOTSTRAP_SCHEMAS
            .iter()
            .flat_map(|(_, objects)| objects.iter().cloned())
            .collect();
        objects.sort_by_key(|o| o.kind());
        for obj in objects {
            sw.add(obj)?;
        }
        sw.commit()?;
        Ok(manager)
    }

    pub fn read(&self) -> SchemaReadTransaction {
        SchemaReadTransaction {
            registries: self.registries.read(),
        }
    }

    pub fn write(&self) -> SchemaWriteTransaction<'_> {
        SchemaWriteTransaction {
            registries: self.registries.write(),
        }
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SchemaWriteTransaction<'a> {
    pub fn commit(self) -> Result<(), OperationError> {
        let SchemaWriteTransaction { registries } = self;
        registries.commit();
        Ok(())
    }

    /// Add an element. It is registered if its schema and the element itself are enabled,
    /// otherwise it is stashed for OID bookkeeping only. Returns true if registered.
    #[instrument(level = "debug", name = "schema::add", skip_all)]
    pub fn add(&mut self, obj: SchemaObject) -> Result<bool, OperationError> {
        let kind = obj.kind();
        if self.registries.contains_oid(kind, obj.oid()) {
            schema_warn!(%obj, "oid already in use");
            return Err(OperationError::SchemaViolation(SchemaError::OidAlreadyExists(
                obj.oid().to_string(),
            )));
        }
        let schema_enabled = self
            .registries
            .loaded_schema(obj.schema_name())
            .map(|s| s.enabled)
            .ok_or_else(|| {
                OperationError::SchemaViolation(SchemaError::InvalidSchemaEntry(format!(
                    "schema {} is not loaded",
                    obj.schema_name()
                )))
            })?;

        if let SchemaObject::AttributeType(at) = &obj {
            if at.collective && at.usage.is_operational() {
                return Err(OperationError::SchemaViolation(SchemaError::InvalidAttribute(
                    format!("collective attribute {} must be a user attribute", at.meta.name()),
                )));
            }
        }

        if schema_enabled && obj.is_enabled() {
            self.registries.check_references(&obj)?;
            schema_trace!(%obj, "registering");
            self.registries.register(obj);
            self.registries.rebuild_mapping();
            Ok(true)
        } else {
            schema_trace!(%obj, "stashing, schema or element disabled");
            self.registries.stash(obj)?;
            Ok(false)
        }
    }

    /// Delete an element, refusing if other registered elements still depend on it.
    #[instrument(level = "debug", name = "schema::delete", skip_all)]
    pub fn delete(&mut self, kind: SchemaObjectKind, oid: &str) -> Result<SchemaObject, OperationError> {
        if self.registries.is_registered(kind, oid) {
            self.registries.check_no_dependents(kind, oid)?;
        }
        self.unregister(kind, oid)
    }

    /// Remove an element without checking its dependents.
    pub fn unregister(&mut self, kind: SchemaObjectKind, oid: &str) -> Result<SchemaObject, OperationError> {
        let obj = match self.registries.deregister(kind, oid) {
            Some(obj) => obj,
            None => self.registries.take_stashed(kind, oid).ok_or_else(|| {
                OperationError::SchemaViolation(SchemaError::NoSuchOid(oid.to_string()))
            })?,
        };
        if let Some(known) = self.registries.known.get_mut(&kind) {
            known.remove(oid);
        }
        self.registries.rebuild_mapping();
        schema_trace!(%obj, "unregistered");
        Ok(obj)
    }

    pub fn unregister_attribute_type(&mut self, oid: &str) -> Result<SchemaObject, OperationError> {
        self.unregister(SchemaObjectKind::AttributeType, oid)
    }

    pub fn unregister_object_class(&mut self, oid: &str) -> Result<SchemaObject, OperationError> {
        self.unregister(SchemaObjectKind::ObjectClass, oid)
    }

    pub fn unregister_normalizer(&mut self, oid: &str) -> Result<SchemaObject, OperationError> {
        self.unregister(SchemaObjectKind::Normalizer, oid)
    }

    pub fn unregister_comparator(&mut self, oid: &str) -> Result<SchemaObject, OperationError> {
        self.unregister(SchemaObjectKind::Comparator, oid)
    }

    /// Swap an element for an updated version of itself. When the OID changes the new OID
    /// must be free and the old one must have no dependents.
    pub fn replace(&mut self, old_oid: &str, obj: SchemaObject) -> Result<bool, OperationError> {
        let kind = obj.kind();
        if obj.oid() != old_oid {
            if self.registries.contains_oid(kind, obj.oid()) {
                return Err(OperationError::SchemaViolation(SchemaError::OidAlreadyExists(
                    obj.oid().to_string(),
                )));
            }
            self.delete(kind, old_oid)?;
        } else {
            self.unregister(kind, old_oid)?;
        }
        self.add(obj)
    }

    /// Disable a single element, keeping it stashed on its schema.
    pub fn disable_object(&mut self, kind: SchemaObjectKind, oid: &str) -> Result<(), OperationError> {
        if !self.registries.is_registered(kind, oid) {
            return Ok(());
        }
        self.registries.check_no_dependents(kind, oid)?;
        let mut obj = self.unregister(kind, oid)?;
        obj.meta_mut().enabled = false;
        self.registries.stash(obj)?;
        Ok(())
    }

    /// Load a schema. An enabled schema requires all of its dependencies to be loaded
    /// and enabled.
    pub fn add_schema(&mut self, schema: Schema) -> Result<(), OperationError> {
        let key = schema.name.to_lowercase();
        if self.registries.schemas.contains_key(&key) {
            return Err(OperationError::SchemaViolation(SchemaError::InvalidSchemaEntry(
                format!("schema {} is already loaded", schema.name),
            )));
        }
        for dep in schema.dependencies.iter() {
            match self.registries.loaded_schema(dep) {
                None => {
                    return Err(OperationError::UnwillingToPerform(format!(
                        "schema {} depends on {} which is not loaded",
                        schema.name, dep
                    )))
                }
                Some(d) if schema.enabled && !d.enabled => {
                    return Err(OperationError::UnwillingToPerform(format!(
                        "schema {} depends on {} which is disabled",
                        schema.name, dep
                    )))
                }
                Some(_) => {}
            }
        }
        schema_info!(name = %schema.name, enabled = schema.enabled, "loading schema");
        self.registries.schemas.insert(key, schema);
        Ok(())
    }

    /// Unload a schema. It must have no elements left and no schema may depend on it.
    pub fn remove_schema(&mut self, name: &str) -> Result<Schema, OperationError> {
        let key = name.to_lowercase();
        let dependents: Vec<_> = self
            .registries
            .schemas
            .values()
            .filter(|s| s.depends_on(name))
            .map(|s| s.name.clone())
            .collect();
        if !dependents.is_empty() {
            return Err(OperationError::UnwillingToPerform(format!(
                "schema {} is required by {}",
                name,
                dependents.join(", ")
            )));
        }
        let has_objects = !self.schema_objects(name).is_empty()
            || self
                .registries
                .loaded_schema(name)
                .map(|s| !s.stashed.is_empty())
                .unwrap_or(false);
        if has_objects {
            return Err(OperationError::UnwillingToPerform(format!(
                "schema {} still has elements",
                name
            )));
        }
        self.registries.schemas.remove(&key).ok_or_else(|| {
            OperationError::SchemaViolation(SchemaError::NoSuchOid(name.to_string()))
        })
    }

    /// Replace the recorded dependencies of a loaded schema.
    pub fn set_dependencies(&mut self, name: &str, dependencies: Vec<String>) -> Result<(), OperationError> {
        let enabled = self
            .registries
            .loaded_schema(name)
            .map(|s| s.enabled)
            .ok_or_else(|| OperationError::SchemaViolation(SchemaError::NoSuchOid(name.to_string())))?;
        for dep in dependencies.iter() {
            let ok = self
                .registries
                .loaded_schema(dep)
                .map(|d| d.enabled || !enabled)
                .unwrap_or(false);
            if !ok {
                return Err(OperationError::UnwillingToPerform(format!(
                    "schema {} can't depend on {}",
                    name, dep
                )));
            }
        }
        if let Some(schema) = self.registries.schemas.get_mut(&name.to_lowercase()) {
            schema.dependencies = dependencies;
        }
        Ok(())
    }

    fn schema_objects(&self, name: &str) -> Vec<(SchemaObjectKind, String)> {
        let mut objs: Vec<_> = SchemaObjectKind::all()
            .into_iter()
            .flat_map(|kind| self.registries.iter(kind))
            .filter(|o| o.schema_name().eq_ignore_ascii_case(name))
            .map(|o| (o.kind(), o.oid().to_string()))
            .collect();
        objs.sort();
        objs
    }

    /// Enable a schema, registering its stashed elements. Returns false if it was already
    /// enabled.
    #[instrument(level = "debug", name = "schema::enable", skip_all)]
    pub fn enable(&mut self, name: &str) -> Result<bool, OperationError> {
        let schema = self.registries.loaded_schema(name).ok_or_else(|| {
            OperationError::UnwillingToPerform(format!("schema {} is not loaded", name))
        })?;
        if schema.enabled {
            return Ok(false);
        }
        for dep in schema.dependencies.iter() {
            let dep_enabled = self
                .registries
                .loaded_schema(dep)
                .map(|d| d.enabled)
                .unwrap_or(false);
            if !dep_enabled {
                return Err(OperationError::UnwillingToPerform(format!(
                    "schema {} depends on {} which is not enabled",
                    name, dep
                )));
            }
        }

        let mut stashed = match self.registries.schemas.get_mut(&name.to_lowercase()) {
            Some(schema) => {
                schema.enabled = true;
                std::mem::take(&mut schema.stashed)
            }
            None => Vec::new(),
        };
        stashed.sort_by_key(|o| o.kind());
        for obj in stashed {
            if let Some(known) = self.registries.known.get_mut(&obj.kind()) {
                known.remove(obj.oid());
            }
            self.add(obj)?;
        }
        schema_info!(%name, "schema enabled");
        Ok(true)
    }

    /// Disable a schema, stashing its registered elements. Refused while an enabled schema
    /// depends on it. Returns false if it was already disabled.
    #[instrument(level = "debug", name = "schema::disable", skip_all)]
    pub fn disable(&mut self, name: &str) -> Result<bool, OperationError> {
        let schema = self.registries.loaded_schema(name).ok_or_else(|| {
            OperationError::UnwillingToPerform(format!("schema {} is not loaded", name))
        })?;
        if !schema.enabled {
            return Ok(false);
        }
        let dependents: Vec<_> = self
            .registries
            .schemas
            .values()
            .filter(|s| s.enabled && s.depends_on(name))
            .map(|s| s.name.clone())
            .collect();
        if !dependents.is_empty() {
            return Err(OperationError::UnwillingToPerform(format!(
                "schema {} has enabled dependents: {}",
                name,
                dependents.join(", ")
            )));
        }

        let mut objects = self.schema_objects(name);
        // Most dependent kinds first.
        objects.reverse();
        for (kind, oid) in objects.iter() {
            let (descendants, dependents) = self.registries.dependents_of(*kind, oid);
            let outside: Vec<_> = descendants
                .into_iter()
                .chain(dependents)
                .filter(|d| {
                    self.registries
                        .get(*kind, d)
                        .or_else(|| {
                            SchemaObjectKind::all()
                                .into_iter()
                                .find_map(|k| self.registries.get(k, d))
                        })
                        .map(|o| !o.schema_name().eq_ignore_ascii_case(name))
                        .unwrap_or(false)
                })
                .collect();
            if !outside.is_empty() {
                return Err(OperationError::SchemaViolation(SchemaError::HasDependents {
                    oid: oid.clone(),
                    dependents: outside,
                }));
            }
        }
        for (kind, oid) in objects {
            if let Some(obj) = self.registries.deregister(kind, &oid) {
                self.registries.stash(obj)?;
            }
        }
        if let Some(schema) = self.registries.schemas.get_mut(&name.to_lowercase()) {
            schema.enabled = false;
        }
        self.registries.rebuild_mapping();
        schema_info!(%name, "schema disabled");
        Ok(true)
    }

    pub fn record_error(&mut self, error: SchemaError) {
        schema_error!(?error, "schema error recorded");
        self.registries.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::normalizers::Normalizer;
    use super::objects::*;
    use super::{SchemaManager, SchemaTransaction};
    use crate::prelude::*;

    fn test_attribute(oid: &str, name: &str, schema: &str) -> SchemaObject {
        SchemaObject::AttributeType(AttributeType {
            meta: SchemaMeta::new(oid, &[name], schema),
            syntax: Some(SYNTAX_DIRECTORY_STRING.to_string()),
            equality: Some(MR_CASE_IGNORE.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_schema_bootstrap() {
        sketching::test_init();
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        let sr = schema.read();
        assert!(sr.lookup_attribute_type("cn").is_some());
        assert!(sr.lookup_attribute_type("commonName").is_some());
        assert!(sr.lookup_attribute_type("2.5.4.3").is_some());
        assert!(sr.lookup_object_class("subentry").is_some());
        assert!(sr.is_operational(&Attribute::AccessControlSubentries));
        assert!(!sr.is_operational(&Attribute::Cn));
        assert!(sr.is_collective(&Attribute::from_str("c-l")));
        assert!(sr.is_no_user_modification(&Attribute::CreateTimestamp));
        assert!(sr.validate().is_empty());
        // cn inherits its equality rule from name.
        assert_eq!(
            sr.normalizer_mapping().get(&Attribute::Cn),
            Normalizer::DeepTrimToLower
        );
        assert_eq!(
            sr.normalizer_mapping().get(&Attribute::from_str("userPassword")),
            Normalizer::NoOp
        );
    }

    #[test]
    fn test_schema_oid_uniqueness() {
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        let mut sw = schema.write();
        let before = sw.get_registries().count(SchemaObjectKind::AttributeType);
        let res = sw.add(test_attribute("2.5.4.3", "duplicate", SCHEMA_NAME_CORE));
        assert_eq!(
            res,
            Err(OperationError::SchemaViolation(SchemaError::OidAlreadyExists(
                "2.5.4.3".to_string()
            )))
        );
        assert_eq!(
            sw.get_registries().count(SchemaObjectKind::AttributeType),
            before
        );
    }

    #[test]
    fn test_schema_delete_dependents() {
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        let mut sw = schema.write();
        // name has descendants.
        assert!(matches!(
            sw.delete(SchemaObjectKind::AttributeType, "2.5.4.41"),
            Err(OperationError::SchemaViolation(SchemaError::HasDescendants { .. }))
        ));
        // a syntax in use by attribute types.
        assert!(matches!(
            sw.delete(SchemaObjectKind::Syntax, SYNTAX_DIRECTORY_STRING),
            Err(OperationError::SchemaViolation(SchemaError::HasDependents { .. }))
        ));
        // comparators back live matching rules.
        assert!(matches!(
            sw.delete(SchemaObjectKind::Comparator, MR_CASE_IGNORE),
            Err(OperationError::SchemaViolation(SchemaError::HasDependents { .. }))
        ));

        assert_eq!(
            sw.add(test_attribute("1.2.3.4", "leaf", SCHEMA_NAME_CORE)),
            Ok(true)
        );
        assert!(sw.delete(SchemaObjectKind::AttributeType, "1.2.3.4").is_ok());
        assert!(sw.lookup_attribute_type("leaf").is_none());
        assert!(matches!(
            sw.delete(SchemaObjectKind::AttributeType, "1.2.3.4"),
            Err(OperationError::SchemaViolation(SchemaError::NoSuchOid(_)))
        ));
    }

    #[test]
    fn test_schema_missing_reference() {
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        let mut sw = schema.write();
        let mut at = test_attribute("1.2.3.5", "broken", SCHEMA_NAME_CORE);
        if let SchemaObject::AttributeType(at) = &mut at {
            at.syntax = Some("9.9.9".to_string());
        }
        assert_eq!(
            sw.add(at),
            Err(OperationError::SchemaViolation(SchemaError::NoSuchOid(
                "9.9.9".to_string()
            )))
        );
    }

    #[test]
    fn test_schema_enable_disable() {
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        let mut sw = schema.write();

        // core is needed by enabled schemas.
        assert!(matches!(
            sw.disable(SCHEMA_NAME_CORE),
            Err(OperationError::UnwillingToPerform(_))
        ));

        assert_eq!(sw.disable(SCHEMA_NAME_COLLECTIVE), Ok(true));
        assert!(sw.lookup_attribute_type("c-l").is_none());
        assert!(sw
            .get_registries()
            .contains_oid(SchemaObjectKind::AttributeType, "2.5.4.7.1"));
        assert_eq!(sw.disable(SCHEMA_NAME_COLLECTIVE), Ok(false));

        // Elements of a disabled schema are stashed.
        assert_eq!(
            sw.add(test_attribute("1.2.3.6", "c-extra", SCHEMA_NAME_COLLECTIVE)),
            Ok(false)
        );
        assert!(sw.lookup_attribute_type("c-extra").is_none());

        assert_eq!(sw.enable(SCHEMA_NAME_COLLECTIVE), Ok(true));
        assert!(sw.lookup_attribute_type("c-l").is_some());
        assert!(sw.lookup_attribute_type("c-extra").is_some());
        assert!(sw.commit().is_ok());
    }

    #[test]
    fn test_schema_unregister() {
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        let mut sw = schema.write();
        assert_eq!(
            sw.add(test_attribute("1.2.3.8", "dropped", SCHEMA_NAME_CORE)),
            Ok(true)
        );
        let obj = sw
            .unregister_attribute_type("1.2.3.8")
            .expect("registered attribute type");
        assert_eq!(obj.oid(), "1.2.3.8");
        assert!(sw.lookup_attribute_type("dropped").is_none());
        assert!(!sw
            .get_registries()
            .contains_oid(SchemaObjectKind::AttributeType, "1.2.3.8"));
        assert!(matches!(
            sw.unregister_object_class("1.2.3.8"),
            Err(OperationError::SchemaViolation(SchemaError::NoSuchOid(_)))
        ));

        // Unlike delete, dependents are not consulted.
        assert!(sw.get_registries().lookup_comparator(MR_CASE_IGNORE).is_some());
        assert!(sw.unregister_comparator(MR_CASE_IGNORE).is_ok());
        assert!(sw.get_registries().lookup_comparator(MR_CASE_IGNORE).is_none());
        assert!(sw.unregister_normalizer(MR_CASE_IGNORE).is_ok());
        assert!(sw
            .get_registries()
            .lookup_matching_rule("caseIgnoreMatch")
            .is_some());
    }

    #[test]
    fn test_schema_write_rollback() {
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        {
            let mut sw = schema.write();
            assert_eq!(
                sw.add(test_attribute("1.2.3.7", "uncommitted", SCHEMA_NAME_CORE)),
                Ok(true)
            );
            // Dropped without commit.
        }
        assert!(schema.read().lookup_attribute_type("uncommitted").is_none());
    }
}
