//! Checks entries against the schema, and replays changes to the meta-schema entries
//! beneath `ou=schema` on the live registries.
//!
//! A meta-schema change runs inside one schema write transaction: the synchronizer updates
//! the registries, the rest of the chain updates the partition, and only if both succeed is
//! the transaction committed. Any failure drops the transaction and the registries are left
//! as they were.

use hashbrown::HashSet;

use super::{Interceptor, NextInterceptor, SCHEMA_INTERCEPTOR};
use crate::prelude::*;
use crate::schema::synchronizers;
use crate::schema::SchemaTransaction;

pub struct SchemaInterceptor;

fn is_meta_entry(dn: &Dn) -> Result<bool, OperationError> {
    Ok(dn.is_strict_descendant_of(&Dn::parse(SCHEMA_DN)?))
}

fn cascade<O: OperationPayload>(ctx: &OperationContext<O>) -> bool {
    ctx.has_request_control(OID_CASCADE_CONTROL)
}

/// The OID of an attribute type, or the lower cased name if the schema doesn't know it.
fn attribute_oid<T: SchemaTransaction>(sr: &T, name: &str) -> String {
    sr.lookup_attribute_type(name)
        .map(|at| at.meta.oid.clone())
        .unwrap_or_else(|| name.trim().to_lowercase())
}

/// True if the attribute type or one of its superiors is in `allowed`.
fn is_allowed<T: SchemaTransaction>(sr: &T, attr: &Attribute, allowed: &HashSet<String>) -> bool {
    let mut current = sr.lookup_attribute_type(attr.as_str());
    let mut depth = 0;
    while let Some(at) = current {
        if allowed.contains(&at.meta.oid) {
            return true;
        }
        depth += 1;
        if depth > 16 {
            break;
        }
        current = at
            .superior
            .as_deref()
            .and_then(|s| sr.lookup_attribute_type(s));
    }
    false
}

/// Check an entry against the object classes it claims: every class and attribute must be
/// known, every required attribute present, single valued attributes hold one value and no
/// user attribute falls outside the classes. Operational and collective attributes are
/// allowed on any entry.
pub(crate) fn check_entry<T: SchemaTransaction>(sr: &T, entry: &Entry) -> Result<(), OperationError> {
    let classes = entry
        .object_classes()
        .filter(|vs| !vs.is_empty())
        .ok_or_else(|| {
            schema_warn!(dn = %entry.dn(), "entry has no object class");
            OperationError::SchemaViolation(SchemaError::MissingObjectClass)
        })?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut must: Vec<(String, String)> = Vec::new();
    let mut allowed: HashSet<String> = HashSet::new();
    let mut extensible = false;
    let mut pending: Vec<String> = classes.iter().map(|c| c.trim().to_string()).collect();

    while let Some(name) = pending.pop() {
        let oc = sr.lookup_object_class(&name).ok_or_else(|| {
            schema_warn!(dn = %entry.dn(), class = %name, "unknown object class");
            OperationError::SchemaViolation(SchemaError::NoSuchOid(name.clone()))
        })?;
        if !seen.insert(oc.meta.oid.clone()) {
            continue;
        }
        if oc.meta.is_named(EntryClass::ExtensibleObject.as_ref()) {
            extensible = true;
        }
        for m in oc.must.iter() {
            must.push((oc.meta.name().to_string(), m.clone()));
            allowed.insert(attribute_oid(sr, m));
        }
        for m in oc.may.iter() {
            allowed.insert(attribute_oid(sr, m));
        }
        pending.extend(oc.superiors.iter().cloned());
    }

    for (attr, values) in entry.attrs() {
        let at = sr.lookup_attribute_type(attr.as_str()).ok_or_else(|| {
            schema_warn!(dn = %entry.dn(), %attr, "unknown attribute");
            OperationError::SchemaViolation(SchemaError::InvalidAttribute(attr.to_string()))
        })?;
        if at.single_value && values.len() > 1 {
            return Err(OperationError::SchemaViolation(SchemaError::MultipleSingleValue(
                attr.to_string(),
            )));
        }
        if extensible || at.collective || at.usage.is_operational() {
            continue;
        }
        if !is_allowed(sr, attr, &allowed) {
            schema_warn!(dn = %entry.dn(), %attr, "attribute not allowed by the object classes");
            return Err(OperationError::SchemaViolation(SchemaError::InvalidAttribute(
                attr.to_string(),
            )));
        }
    }

    let present: HashSet<String> = entry
        .attr_names()
        .map(|a| attribute_oid(sr, a.as_str()))
        .collect();
    if let Some((class, attribute)) = must
        .into_iter()
        .find(|(_, m)| !present.contains(&attribute_oid(sr, m)))
    {
        schema_warn!(dn = %entry.dn(), %class, %attribute, "required attribute missing");
        return Err(OperationError::SchemaViolation(SchemaError::MissingMustAttribute {
            class,
            attribute,
        }));
    }
    Ok(())
}

fn check<O: OperationPayload>(ctx: &OperationContext<O>, entry: &Entry) -> Result<(), OperationError> {
    let sr = ctx.session().service().schema().read();
    check_entry(&sr, entry)
}

/// Removing values that aren't there is an error, unlike removing a whole attribute.
fn check_removals(entry: &Entry, mods: &ModifyList) -> Result<(), OperationError> {
    for m in mods {
        if let Modify::Remove(attr, values) = m {
            if !entry.attribute_pres(attr) {
                return Err(OperationError::NoSuchAttribute(format!(
                    "{} has no {}",
                    entry.dn(),
                    attr
                )));
            }
            if let Some(v) = values.iter().find(|v| !entry.attribute_equality(attr, v)) {
                return Err(OperationError::NoSuchAttribute(format!(
                    "{} has no {} value {}",
                    entry.dn(),
                    attr,
                    v
                )));
            }
        }
    }
    Ok(())
}

/// The target as it will be once renamed.
fn renamed(entry: &Entry, new_dn: &Dn, rename: Option<(&Rdn, bool)>) -> Entry {
    let mut after = entry.clone();
    if let Some((new_rdn, delete_old_rdn)) = rename {
        if delete_old_rdn {
            if let Some(old_rdn) = entry.dn().rdn() {
                for ava in old_rdn.avas() {
                    after.remove_ava(&ava.attr, &ava.value);
                }
            }
        }
        for ava in new_rdn.avas() {
            after.add_ava(ava.attr.clone(), ava.value.clone());
        }
    }
    after.set_dn(new_dn.clone());
    after
}

impl Interceptor for SchemaInterceptor {
    fn name(&self) -> &str {
        SCHEMA_INTERCEPTOR
    }

    #[instrument(level = "debug", name = "schema::interceptor::add", skip_all)]
    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        check(ctx, &ctx.op.entry)?;
        if !is_meta_entry(&ctx.dn)? {
            return next.add(ctx);
        }
        let service = ctx.session().service().clone();
        let mut txn = service.schema().write();
        let change = synchronizers::add(&mut txn, &ctx.op.entry)?;
        next.add(ctx)?;
        txn.commit()?;
        schema_info!(dn = %ctx.dn, ?change, "meta-schema entry added");
        Ok(())
    }

    #[instrument(level = "debug", name = "schema::interceptor::delete", skip_all)]
    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        if !is_meta_entry(&ctx.dn)? {
            return next.delete(ctx);
        }
        let entry = ctx.target_entry()?.clone();
        let service = ctx.session().service().clone();
        let mut txn = service.schema().write();
        let change = synchronizers::delete(&mut txn, &entry, cascade(ctx))?;
        next.delete(ctx)?;
        txn.commit()?;
        schema_info!(dn = %ctx.dn, ?change, "meta-schema entry deleted");
        Ok(())
    }

    #[instrument(level = "debug", name = "schema::interceptor::modify", skip_all)]
    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        let before = ctx.target_entry()?.clone();
        check_removals(&before, &ctx.op.mods)?;
        let mut after = before.clone();
        after.apply_modlist(&ctx.op.mods);
        check(ctx, &after)?;

        if !is_meta_entry(&ctx.dn)? {
            return next.modify(ctx);
        }
        let service = ctx.session().service().clone();
        let mut txn = service.schema().write();
        let change = synchronizers::modify(&mut txn, &before, &after, cascade(ctx))?;
        next.modify(ctx)?;
        txn.commit()?;
        schema_info!(dn = %ctx.dn, ?change, "meta-schema entry modified");
        Ok(())
    }

    #[instrument(level = "debug", name = "schema::interceptor::rename", skip_all)]
    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        let entry = ctx.target_entry()?.clone();
        let new_dn = ctx.op.new_dn(&ctx.dn)?;
        check(ctx, &renamed(&entry, &new_dn, ctx.op.rename()))?;
        if !is_meta_entry(&ctx.dn)? {
            return next.rename(ctx);
        }
        let service = ctx.session().service().clone();
        let mut txn = service.schema().write();
        let change = synchronizers::rename(&mut txn, &entry, &ctx.op.new_rdn, cascade(ctx))?;
        next.rename(ctx)?;
        txn.commit()?;
        schema_info!(dn = %ctx.dn, ?change, "meta-schema entry renamed");
        Ok(())
    }

    #[instrument(level = "debug", name = "schema::interceptor::move", skip_all)]
    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        let entry = ctx.target_entry()?.clone();
        let new_dn = ctx.op.new_dn(&ctx.dn)?;
        check(ctx, &renamed(&entry, &new_dn, ctx.op.rename()))?;
        if !is_meta_entry(&ctx.dn)? && !is_meta_entry(&ctx.op.new_superior)? {
            return next.move_entry(ctx);
        }
        let new_superior = ctx.op.new_superior.clone();
        let service = ctx.session().service().clone();
        let mut txn = service.schema().write();
        let change = synchronizers::move_entry(&mut txn, &entry, &new_superior, cascade(ctx))?;
        next.move_entry(ctx)?;
        txn.commit()?;
        schema_info!(dn = %ctx.dn, to = %new_superior, ?change, "meta-schema entry moved");
        Ok(())
    }

    #[instrument(level = "debug", name = "schema::interceptor::move_and_rename", skip_all)]
    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        let entry = ctx.target_entry()?.clone();
        let new_dn = ctx.op.new_dn(&ctx.dn)?;
        check(ctx, &renamed(&entry, &new_dn, ctx.op.rename()))?;
        if !is_meta_entry(&ctx.dn)? && !is_meta_entry(&ctx.op.new_superior)? {
            return next.move_and_rename(ctx);
        }
        let new_superior = ctx.op.new_superior.clone();
        let new_rdn = ctx.op.new_rdn.clone();
        let service = ctx.session().service().clone();
        let mut txn = service.schema().write();
        let change =
            synchronizers::move_and_rename(&mut txn, &entry, &new_superior, &new_rdn, cascade(ctx))?;
        next.move_and_rename(ctx)?;
        txn.commit()?;
        schema_info!(dn = %ctx.dn, to = %new_dn, ?change, "meta-schema entry moved and renamed");
        Ok(())
    }

    fn verify(&self, service: &DirectoryService) -> Vec<OperationError> {
        let sr = service.schema().read();
        let mut errors = sr.validate();
        errors.extend(
            sr.errors()
                .iter()
                .cloned()
                .map(OperationError::SchemaViolation),
        );
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::check_entry;
    use crate::interceptor::SCHEMA_INTERCEPTOR;
    use crate::prelude::*;
    use crate::schema::{SchemaManager, SchemaTransaction};

    fn person(dn: &str) -> Entry {
        entry_init!(
            Dn::parse(dn).expect("dn"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, "ann"),
            (Attribute::Sn, "smith")
        )
    }

    #[test]
    fn test_check_entry() {
        let schema = SchemaManager::bootstrap().expect("bootstrap");
        let sr = schema.read();
        let good = person("cn=ann,dc=example,dc=com");
        assert_eq!(check_entry(&sr, &good), Ok(()));

        let mut e = good.clone();
        e.purge_ava(&Attribute::ObjectClass);
        assert_eq!(
            check_entry(&sr, &e),
            Err(OperationError::SchemaViolation(SchemaError::MissingObjectClass))
        );

        let mut e = good.clone();
        e.add_ava(Attribute::ObjectClass, "starship");
        assert_eq!(
            check_entry(&sr, &e),
            Err(OperationError::SchemaViolation(SchemaError::NoSuchOid("starship".to_string())))
        );

        let mut e = good.clone();
        e.purge_ava(&Attribute::Sn);
        assert_eq!(
            check_entry(&sr, &e),
            Err(OperationError::SchemaViolation(SchemaError::MissingMustAttribute {
                class: "person".to_string(),
                attribute: "sn".to_string(),
            }))
        );

        // Known, but not allowed by person.
        let mut e = good.clone();
        e.add_ava(Attribute::Dc, "nope");
        assert!(matches!(
            check_entry(&sr, &e),
            Err(OperationError::SchemaViolation(SchemaError::InvalidAttribute(_)))
        ));
        // Unless the entry is extensible.
        e.add_ava(Attribute::ObjectClass, EntryClass::ExtensibleObject.as_ref());
        assert_eq!(check_entry(&sr, &e), Ok(()));

        let mut e = good.clone();
        e.add_ava(Attribute::from_str("shoeSize"), "9");
        assert!(matches!(
            check_entry(&sr, &e),
            Err(OperationError::SchemaViolation(SchemaError::InvalidAttribute(_)))
        ));

        // Operational attributes are allowed anywhere, but only once if single valued.
        let mut e = good;
        e.add_ava(Attribute::CreateTimestamp, "20240101000000Z");
        assert_eq!(check_entry(&sr, &e), Ok(()));
        e.add_ava(Attribute::CreateTimestamp, "20250101000000Z");
        assert_eq!(
            check_entry(&sr, &e),
            Err(OperationError::SchemaViolation(SchemaError::MultipleSingleValue(
                "createtimestamp".to_string()
            )))
        );
        assert!(sr.is_single_value(&Attribute::CreateTimestamp));
    }

    #[ds_test]
    fn test_schema_checked_on_write(server: &Arc<DirectoryService>) {
        let session = server.admin_session();
        assert!(matches!(
            session.add(entry_init!(
                Dn::parse("cn=ann,ou=people,dc=example,dc=com").expect("dn"),
                (Attribute::ObjectClass, EntryClass::Person.as_ref()),
                (Attribute::Cn, "ann")
            )),
            Err(OperationError::SchemaViolation(SchemaError::MissingMustAttribute { .. }))
        ));

        let ann = person("cn=ann,ou=people,dc=example,dc=com");
        let dn = ann.dn().clone();
        assert!(session.add(ann).is_ok());
        assert!(matches!(
            session.modify(&dn, ModifyList::new_purge(Attribute::Sn)),
            Err(OperationError::SchemaViolation(SchemaError::MissingMustAttribute { .. }))
        ));
        assert!(matches!(
            session.modify(&dn, ModifyList::new_remove(Attribute::Description, "absent")),
            Err(OperationError::NoSuchAttribute(_))
        ));
        assert!(session
            .modify(&dn, ModifyList::new_append(Attribute::Description, "present"))
            .is_ok());
    }

    #[ds_test]
    fn test_schema_checked_on_move(server: &Arc<DirectoryService>) {
        let session = server.admin_session();
        // Stored before sn was required of it.
        let dn = Dn::parse("cn=bob,ou=people,dc=example,dc=com").expect("dn");
        let entry = entry_init!(
            dn.clone(),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, "bob")
        );
        let mut ctx = session
            .context(dn.clone(), AddOp { entry })
            .with_bypass(Bypass::from_names(&[SCHEMA_INTERCEPTOR]));
        assert!(server.operation_manager().add(&mut ctx).is_ok());

        let groups = Dn::parse("ou=groups,dc=example,dc=com").expect("dn");
        assert!(matches!(
            session.move_entry(&dn, groups.clone()),
            Err(OperationError::SchemaViolation(SchemaError::MissingMustAttribute { .. }))
        ));
        assert_eq!(session.has_entry(&dn), Ok(true));

        assert!(session
            .modify(&dn, ModifyList::new_append(Attribute::Sn, "builder"))
            .is_ok());
        assert!(session.move_entry(&dn, groups).is_ok());
        assert_eq!(session.has_entry(&dn), Ok(false));
    }

    #[ds_test]
    fn test_meta_schema_entries_update_registries(server: &Arc<DirectoryService>) {
        let session = server.admin_session();
        let schema = Dn::parse("cn=other,ou=schema").expect("dn");
        assert!(session
            .add(entry_init!(
                schema.clone(),
                (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                (Attribute::ObjectClass, EntryClass::MetaSchema.as_ref()),
                (Attribute::Cn, "other"),
                (Attribute::MDependencies, SCHEMA_NAME_CORE)
            ))
            .is_ok());
        assert!(session
            .add(entry_init!(
                Dn::parse("ou=attributetypes,cn=other,ou=schema").expect("dn"),
                (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                (Attribute::ObjectClass, EntryClass::OrganizationalUnit.as_ref()),
                (Attribute::Ou, "attributetypes")
            ))
            .is_ok());

        let at = Dn::parse("m-oid=1.3.6.1.4.1.9999.2,ou=attributetypes,cn=other,ou=schema").expect("dn");
        let entry = entry_init!(
            at.clone(),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaTop.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaAttributeType.as_ref()),
            (Attribute::MOid, "1.3.6.1.4.1.9999.2"),
            (Attribute::MName, "nickName"),
            (Attribute::MSyntax, SYNTAX_DIRECTORY_STRING),
            (Attribute::MEquality, MR_CASE_IGNORE)
        );
        assert!(session.add(entry).is_ok());
        assert!(server
            .schema()
            .read()
            .lookup_attribute_type("nickname")
            .is_some());

        // An element in the wrong container never reaches the registries.
        let misplaced = entry_init!(
            Dn::parse("m-oid=1.3.6.1.4.1.9999.3,cn=other,ou=schema").expect("dn"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaTop.as_ref()),
            (Attribute::ObjectClass, EntryClass::MetaAttributeType.as_ref()),
            (Attribute::MOid, "1.3.6.1.4.1.9999.3"),
            (Attribute::MSyntax, SYNTAX_DIRECTORY_STRING)
        );
        assert!(matches!(
            session.add(misplaced),
            Err(OperationError::NamingViolation(_))
        ));
        assert!(server
            .schema()
            .read()
            .lookup_attribute_type("1.3.6.1.4.1.9999.3")
            .is_none());
        let misplaced = Dn::parse("m-oid=1.3.6.1.4.1.9999.3,cn=other,ou=schema").expect("dn");
        assert_eq!(session.has_entry(&misplaced), Ok(false));

        assert!(session.delete(&at).is_ok());
        assert!(server
            .schema()
            .read()
            .lookup_attribute_type("nickname")
            .is_none());
    }
}
