//! Maintains the subentry cache and the operational attributes through which every entry
//! refers to the subentries selecting it, and hides subentries from ordinary searches.
//!
//! References are always recomputed from the cache rather than patched. A change to a
//! subentry reconciles every entry it selected before or selects after; a change to an
//! ordinary entry reconciles that entry and anything moved with it.

use std::collections::BTreeMap;

use super::{Interceptor, NextInterceptor, SUBENTRY_INTERCEPTOR};
use crate::prelude::*;
use crate::schema::SchemaTransaction;
use crate::subentry::{Subentry, SubentryCacheTransaction, SubentryTypes, SubtreeEvaluator};

pub struct SubentryInterceptor;

/// The references `entry` should carry, named by `dn`, given the cached subentries.
fn selected_references<T: SubentryCacheTransaction>(
    cache: &T,
    eval: &SubtreeEvaluator<'_>,
    dn: &Dn,
    entry: &Entry,
) -> Result<BTreeMap<Attribute, Vec<String>>, OperationError> {
    let mut refs: BTreeMap<Attribute, Vec<String>> = BTreeMap::new();
    if entry.is_subentry() {
        return Ok(refs);
    }
    let mut covering = cache.covering(dn);
    covering.sort_by_key(|s| s.dn.norm_string());
    for subentry in covering {
        if subentry.selects(eval, dn, entry)? {
            for attr in subentry.types.reference_attrs() {
                refs.entry(attr).or_default().push(subentry.dn.to_string());
            }
        }
    }
    Ok(refs)
}

/// The changes bringing the references held by `entry` to `wanted`.
fn reference_mods(entry: &Entry, wanted: &BTreeMap<Attribute, Vec<String>>) -> ModifyList {
    let mut mods = ModifyList::new();
    for attr in SubentryTypes::all_reference_attrs() {
        let want = wanted.get(&attr).map(|v| v.as_slice()).unwrap_or_default();
        let have = entry.get_ava(&attr);
        let same = match have {
            Some(vs) => vs.len() == want.len() && want.iter().all(|w| vs.contains(w)),
            None => want.is_empty(),
        };
        if same {
            continue;
        }
        if want.is_empty() {
            mods.push_mod(m_purge(attr));
        } else {
            mods.push_mod(Modify::Replace(attr, want.to_vec()));
        }
    }
    mods
}

/// Bring the stored references of `entry` up to date.
fn reconcile<O: OperationPayload, T: SubentryCacheTransaction>(
    ctx: &OperationContext<O>,
    cache: &T,
    eval: &SubtreeEvaluator<'_>,
    entry: &Entry,
) -> Result<(), OperationError> {
    let wanted = selected_references(cache, eval, entry.dn(), entry)?;
    let mods = reference_mods(entry, &wanted);
    if !mods.is_empty() {
        trace!(dn = %entry.dn(), ?mods, "updating subentry references");
        ctx.modify(entry.dn().clone(), mods, Bypass::all())?;
    }
    Ok(())
}

/// Every entry at or beneath `base` matching `filter`, as stored.
fn subtree_entries<O: OperationPayload>(
    ctx: &OperationContext<O>,
    base: &Dn,
    filter: Filter,
) -> Result<Vec<Entry>, OperationError> {
    if !ctx.has_entry(base.clone(), Bypass::all())? {
        return Ok(Vec::new());
    }
    ctx.search(
        base.clone(),
        Scope::Subtree,
        filter,
        AttrSelection::all(),
        Bypass::all(),
    )?
    .collect_entries()
}

/// Entries beneath the administrative point of `subentry` that refer to it.
fn referencing_entries<O: OperationPayload>(
    ctx: &OperationContext<O>,
    subentry: &Subentry,
) -> Result<Vec<Entry>, OperationError> {
    let dn = subentry.dn.to_string();
    let terms: Vec<Filter> = subentry
        .types
        .reference_attrs()
        .into_iter()
        .map(|attr| f_eq(attr, &dn))
        .collect();
    if terms.is_empty() {
        return Ok(Vec::new());
    }
    subtree_entries(ctx, &subentry.administrative_point(), f_or(terms))
}

/// Merge entry lists, keeping the first copy of each entry.
fn union(lists: Vec<Vec<Entry>>) -> Vec<Entry> {
    let mut seen: BTreeMap<String, Entry> = BTreeMap::new();
    for e in lists.into_iter().flatten() {
        seen.entry(e.dn().norm_string()).or_insert(e);
    }
    seen.into_values().collect()
}

fn check_administrative_point<O: OperationPayload>(
    ctx: &OperationContext<O>,
    parent: &Dn,
) -> Result<(), OperationError> {
    let ap = ctx.session().service().nexus().fetch(parent)?;
    if ap.map(|e| e.is_administrative_point()).unwrap_or(false) {
        Ok(())
    } else {
        request_warn!(%parent, "subentry parent is not an administrative point");
        Err(OperationError::NoSuchAttribute(format!(
            "{} has no {}, subentries must be placed beneath an administrative point",
            parent,
            Attribute::AdministrativeRole
        )))
    }
}

fn subentries_visible<O: OperationPayload>(ctx: &OperationContext<O>) -> bool {
    ctx.request_controls
        .get(OID_SUBENTRIES_CONTROL)
        .map(|c| {
            c.value
                .as_deref()
                .map(|v| !v.eq_ignore_ascii_case(VALUE_FALSE))
                .unwrap_or(true)
        })
        .unwrap_or(false)
}

/// Ordinary searches see ordinary entries, the subentries control flips that.
fn visible(cursor: EntryCursor, subentries: bool) -> EntryCursor {
    cursor.retain(|e| e.is_subentry() == subentries)
}

/// A subentry keeps its specification when renamed or moved, only its administrative point
/// and name change.
fn moddn_subentry<P: ModDnPayload>(
    ctx: &mut OperationContext<P>,
    run: impl FnOnce(&mut OperationContext<P>) -> Result<(), OperationError>,
) -> Result<(), OperationError> {
    let new_dn = ctx.op.new_dn(&ctx.dn)?;
    let new_parent = new_dn.parent().unwrap_or_default();
    check_administrative_point(ctx, &new_parent)?;

    let service = ctx.session().service().clone();
    let sr = service.schema().read();
    let eval = SubtreeEvaluator::new(sr.get_registries());
    let mut cw = service.subentries().write();
    let old = match cw.get(&ctx.dn) {
        Some(s) => s.clone(),
        None => {
            let uncached = Subentry::from_entry(ctx.target_entry()?)?;
            cw.insert(uncached.clone());
            uncached
        }
    };
    let moved = cw.rename(&ctx.dn, &new_dn).cloned().ok_or_else(|| {
        OperationError::IllegalState(format!("subentry {} vanished from the cache", ctx.dn))
    })?;

    run(ctx)?;

    let affected = union(vec![
        referencing_entries(ctx, &old)?,
        subtree_entries(ctx, &moved.base_dn(), f_pres(Attribute::ObjectClass))?,
    ]);
    for e in affected.iter() {
        reconcile(ctx, &cw, &eval, e)?;
    }
    cw.commit();
    admin_info!(from = %ctx.dn, to = %new_dn, "subentry renamed");
    Ok(())
}

/// An ordinary entry can't be renamed or moved if it is, or holds, an administrative point.
fn moddn_entry<P: ModDnPayload>(
    ctx: &mut OperationContext<P>,
    run: impl FnOnce(&mut OperationContext<P>) -> Result<(), OperationError>,
) -> Result<(), OperationError> {
    let holds_ap = !subtree_entries(ctx, &ctx.dn, f_pres(Attribute::AdministrativeRole))?.is_empty();
    if holds_ap {
        request_warn!(dn = %ctx.dn, "refusing to rename an administrative area");
        return Err(OperationError::SchemaViolation(
            SchemaError::AdministrativeDescendant(ctx.dn.to_string()),
        ));
    }
    let new_dn = ctx.op.new_dn(&ctx.dn)?;

    let service = ctx.session().service().clone();
    let sr = service.schema().read();
    let eval = SubtreeEvaluator::new(sr.get_registries());
    // Held until the references are settled, so subentry changes wait for the move.
    let cw = service.subentries().write();

    run(ctx)?;

    for e in subtree_entries(ctx, &new_dn, f_pres(Attribute::ObjectClass))?.iter() {
        reconcile(ctx, &cw, &eval, e)?;
    }
    Ok(())
}

fn moddn<P: ModDnPayload>(
    ctx: &mut OperationContext<P>,
    run: impl FnOnce(&mut OperationContext<P>) -> Result<(), OperationError>,
) -> Result<(), OperationError> {
    if ctx.target_entry()?.is_subentry() {
        moddn_subentry(ctx, run)
    } else {
        moddn_entry(ctx, run)
    }
}

impl Interceptor for SubentryInterceptor {
    fn name(&self) -> &str {
        SUBENTRY_INTERCEPTOR
    }

    #[instrument(level = "debug", name = "subentry::add", skip_all)]
    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        let service = ctx.session().service().clone();
        let sr = service.schema().read();
        let eval = SubtreeEvaluator::new(sr.get_registries());

        if !ctx.op.entry.is_subentry() {
            // Held until the entry is stored, so no subentry can arrive in between.
            let cw = service.subentries().write();
            let wanted = selected_references(&cw, &eval, &ctx.dn, &ctx.op.entry)?;
            let entry = &mut ctx.op.entry;
            for attr in SubentryTypes::all_reference_attrs() {
                entry.purge_ava(&attr);
            }
            for (attr, values) in wanted {
                entry.set_ava(attr, values);
            }
            return next.add(ctx);
        }

        // Rejected before anything changes if the specification doesn't parse.
        let subentry = Subentry::from_entry(&ctx.op.entry)?;
        check_administrative_point(ctx, &subentry.administrative_point())?;

        let mut cw = service.subentries().write();
        cw.insert(subentry.clone());
        next.add(ctx)?;

        for e in subtree_entries(ctx, &subentry.base_dn(), f_pres(Attribute::ObjectClass))?.iter() {
            reconcile(ctx, &cw, &eval, e)?;
        }
        cw.commit();
        admin_info!(dn = %subentry.dn, types = ?subentry.types, "subentry added");
        Ok(())
    }

    #[instrument(level = "debug", name = "subentry::delete", skip_all)]
    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        if !ctx.target_entry()?.is_subentry() {
            return next.delete(ctx);
        }

        let service = ctx.session().service().clone();
        let sr = service.schema().read();
        let eval = SubtreeEvaluator::new(sr.get_registries());
        let mut cw = service.subentries().write();
        let removed = match cw.remove(&ctx.dn) {
            Some(s) => s,
            None => Subentry::from_entry(ctx.target_entry()?)?,
        };
        next.delete(ctx)?;

        for e in referencing_entries(ctx, &removed)?.iter() {
            reconcile(ctx, &cw, &eval, e)?;
        }
        cw.commit();
        admin_info!(dn = %removed.dn, "subentry deleted");
        Ok(())
    }

    #[instrument(level = "debug", name = "subentry::modify", skip_all)]
    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        let before = ctx.target_entry()?.clone();
        let service = ctx.session().service().clone();
        let sr = service.schema().read();
        let eval = SubtreeEvaluator::new(sr.get_registries());

        if before.is_subentry() {
            let respecified = ctx.op.mods.touches(&Attribute::SubtreeSpecification)
                || ctx.op.mods.touches(&Attribute::ObjectClass);
            if !respecified {
                return next.modify(ctx);
            }
            let mut after = before.clone();
            after.apply_modlist(&ctx.op.mods);
            let old = Subentry::from_entry(&before)?;
            let new = Subentry::from_entry(&after)?;

            let mut cw = service.subentries().write();
            cw.insert(new.clone());
            next.modify(ctx)?;

            let affected = union(vec![
                subtree_entries(ctx, &old.base_dn(), f_pres(Attribute::ObjectClass))?,
                subtree_entries(ctx, &new.base_dn(), f_pres(Attribute::ObjectClass))?,
            ]);
            for e in affected.iter() {
                reconcile(ctx, &cw, &eval, e)?;
            }
            cw.commit();
            admin_info!(dn = %new.dn, "subentry specification changed");
            return Ok(());
        }

        // Only the object classes take part in refinements.
        if !ctx.op.mods.touches(&Attribute::ObjectClass) {
            return next.modify(ctx);
        }
        let cw = service.subentries().write();
        next.modify(ctx)?;
        if let Some(after) = ctx.op.altered.clone() {
            let wanted = selected_references(&cw, &eval, &ctx.dn, &after)?;
            let mods = reference_mods(&after, &wanted);
            if !mods.is_empty() {
                ctx.op.altered = Some(ctx.modify(ctx.dn.clone(), mods, Bypass::all())?);
            }
        }
        Ok(())
    }

    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        moddn(ctx, |ctx| next.rename(ctx))
    }

    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        moddn(ctx, |ctx| next.move_entry(ctx))
    }

    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        moddn(ctx, |ctx| next.move_and_rename(ctx))
    }

    fn search(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        let cursor = next.search(ctx)?;
        if ctx.op.scope == Scope::Base {
            return Ok(cursor);
        }
        Ok(visible(cursor, subentries_visible(ctx)))
    }

    fn list(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        let cursor = next.list(ctx)?;
        Ok(visible(cursor, subentries_visible(ctx)))
    }

    fn verify(&self, service: &DirectoryService) -> Vec<OperationError> {
        let cache = service.subentries().read();
        cache
            .subentries()
            .into_iter()
            .filter_map(|s| match service.nexus().fetch(&s.dn) {
                Ok(Some(e)) if e.is_subentry() => None,
                Ok(_) => {
                    admin_error!(dn = %s.dn, "cached subentry is missing from the directory");
                    Some(OperationError::IllegalState(format!(
                        "cached subentry {} is not in the directory",
                        s.dn
                    )))
                }
                Err(e) => Some(e),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread::JoinHandle;

    use crate::interceptor::{
        default_interceptors, Interceptor, NextInterceptor, SUBENTRY_INTERCEPTOR,
    };
    use crate::prelude::*;
    use crate::subentry::SubentryCacheTransaction;
    use crate::testkit::{setup_test, TestConfiguration};

    fn dn(s: &str) -> Dn {
        Dn::parse(s).expect("dn")
    }

    fn person(parent: &str, cn: &str) -> Entry {
        entry_init!(
            dn(parent).with_rdn(Rdn::new(Attribute::Cn, cn)),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, cn),
            (Attribute::Sn, "tester")
        )
    }

    fn acl_subentry(cn: &str, spec: &str) -> Entry {
        entry_init!(
            dn("dc=example,dc=com").with_rdn(Rdn::new(Attribute::Cn, cn)),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Subentry.as_ref()),
            (Attribute::ObjectClass, EntryClass::AccessControlSubentry.as_ref()),
            (Attribute::Cn, cn),
            (Attribute::SubtreeSpecification, spec),
            (Attribute::PrescriptiveAci, "grant all")
        )
    }

    fn make_ap(session: &CoreSession, target: &str) {
        assert!(session
            .modify(
                &dn(target),
                ModifyList::new_append(Attribute::AdministrativeRole, "accessControlSpecificArea")
            )
            .is_ok());
    }

    fn acl_refs(session: &CoreSession, target: &str) -> Vec<String> {
        session
            .lookup(&dn(target), AttrSelection::all())
            .expect("lookup")
            .get_ava(&Attribute::AccessControlSubentries)
            .map(|vs| vs.to_vec())
            .unwrap_or_default()
    }

    #[ds_test]
    fn test_subentry_reference_lifecycle(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        make_ap(&admin, "dc=example,dc=com");
        assert!(admin.add(person("ou=people,dc=example,dc=com", "ann")).is_ok());

        assert!(admin
            .add(acl_subentry("acl", "{ base \"ou=people\" }"))
            .is_ok());
        assert_eq!(server.subentries().read().len(), 1);
        let acl = "cn=acl,dc=example,dc=com".to_string();

        // Existing entries are updated, new ones are stamped as they arrive.
        assert_eq!(acl_refs(&admin, "ou=people,dc=example,dc=com"), vec![acl.clone()]);
        assert_eq!(acl_refs(&admin, "cn=ann,ou=people,dc=example,dc=com"), vec![acl.clone()]);
        assert!(admin.add(person("ou=people,dc=example,dc=com", "ben")).is_ok());
        assert_eq!(acl_refs(&admin, "cn=ben,ou=people,dc=example,dc=com"), vec![acl.clone()]);
        assert!(acl_refs(&admin, "ou=groups,dc=example,dc=com").is_empty());
        assert!(acl_refs(&admin, "dc=example,dc=com").is_empty());

        // Respecifying moves the references.
        assert!(admin
            .modify(
                &dn("cn=acl,dc=example,dc=com"),
                ModifyList::new_list(vec![m_replace(
                    Attribute::SubtreeSpecification,
                    "{ base \"ou=groups\" }"
                )])
            )
            .is_ok());
        assert!(acl_refs(&admin, "cn=ann,ou=people,dc=example,dc=com").is_empty());
        assert_eq!(acl_refs(&admin, "ou=groups,dc=example,dc=com"), vec![acl]);

        // Renaming rewrites them.
        assert!(admin
            .rename(&dn("cn=acl,dc=example,dc=com"), Rdn::new(Attribute::Cn, "policy"), true)
            .is_ok());
        assert_eq!(
            acl_refs(&admin, "ou=groups,dc=example,dc=com"),
            vec!["cn=policy,dc=example,dc=com".to_string()]
        );
        assert!(server
            .subentries()
            .read()
            .contains(&dn("cn=policy,dc=example,dc=com")));

        // And deleting strips them, leaving entries as they were.
        assert!(admin.delete(&dn("cn=policy,dc=example,dc=com")).is_ok());
        assert!(server.subentries().read().is_empty());
        for target in [
            "ou=groups,dc=example,dc=com",
            "ou=people,dc=example,dc=com",
            "cn=ann,ou=people,dc=example,dc=com",
            "cn=ben,ou=people,dc=example,dc=com",
        ] {
            let e = admin.lookup(&dn(target), AttrSelection::all()).expect("lookup");
            assert!(!e.attribute_pres(&Attribute::AccessControlSubentries));
        }
        assert!(server.verify().is_empty());
    }

    /// Adds an access control subentry from another thread while `cn=dave` is on its way
    /// to the partition.
    #[derive(Default)]
    struct ConcurrentSubentryAdd {
        handle: Arc<Mutex<Option<JoinHandle<Result<(), OperationError>>>>>,
    }

    impl Interceptor for ConcurrentSubentryAdd {
        fn name(&self) -> &str {
            "concurrentSubentryAdd"
        }

        fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
            if ctx.dn == dn("cn=dave,ou=people,dc=example,dc=com") {
                let service = ctx.session().service().clone();
                let handle = std::thread::spawn(move || {
                    service
                        .admin_session()
                        .add(acl_subentry("acl", "{ base \"ou=people\" }"))
                });
                if let Ok(mut h) = self.handle.lock() {
                    *h = Some(handle);
                }
                // Give the subentry every chance to land first.
                std::thread::sleep(Duration::from_millis(100));
            }
            next.add(ctx)
        }
    }

    #[test]
    fn test_subentry_added_during_entry_add() {
        let racer = ConcurrentSubentryAdd::default();
        let handle = racer.handle.clone();
        let mut stages = default_interceptors();
        let at = stages
            .iter()
            .position(|i| i.name() == SUBENTRY_INTERCEPTOR)
            .expect("subentry stage");
        stages.insert(at + 1, Box::new(racer));
        let server = setup_test(TestConfiguration {
            interceptors: Some(stages),
            ..Default::default()
        });
        let admin = server.admin_session();
        make_ap(&admin, "dc=example,dc=com");

        assert!(admin.add(person("ou=people,dc=example,dc=com", "dave")).is_ok());
        let spawned = handle
            .lock()
            .expect("lock")
            .take()
            .expect("subentry add was started");
        assert_eq!(spawned.join().expect("join"), Ok(()));

        assert_eq!(server.subentries().read().len(), 1);
        assert_eq!(
            acl_refs(&admin, "cn=dave,ou=people,dc=example,dc=com"),
            vec!["cn=acl,dc=example,dc=com".to_string()]
        );
        assert!(server.shutdown().is_ok());
    }

    #[ds_test]
    fn test_subentry_rejections(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();

        // Not beneath an administrative point.
        assert!(matches!(
            admin.add(acl_subentry("acl", "{}")),
            Err(OperationError::NoSuchAttribute(_))
        ));

        make_ap(&admin, "dc=example,dc=com");
        assert!(matches!(
            admin.add(acl_subentry("acl", "{ base ")),
            Err(OperationError::SchemaViolation(
                SchemaError::InvalidSubtreeSpecification(_)
            ))
        ));
        assert!(server.subentries().read().is_empty());
        assert_eq!(admin.has_entry(&dn("cn=acl,dc=example,dc=com")), Ok(false));

        // An administrative area can't be moved out from under its subentries.
        let unit = entry_init!(
            dn("ou=unit,ou=people,dc=example,dc=com"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::OrganizationalUnit.as_ref()),
            (Attribute::Ou, "unit"),
            (Attribute::AdministrativeRole, "accessControlSpecificArea")
        );
        assert!(admin.add(unit).is_ok());
        assert_eq!(
            admin.rename(&dn("ou=people,dc=example,dc=com"), Rdn::new(Attribute::Ou, "staff"), true),
            Err(OperationError::SchemaViolation(
                SchemaError::AdministrativeDescendant("ou=people,dc=example,dc=com".to_string())
            ))
        );
        assert_eq!(admin.has_entry(&dn("ou=people,dc=example,dc=com")), Ok(true));
    }

    #[ds_test]
    fn test_subentry_move_regular_entry(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        make_ap(&admin, "dc=example,dc=com");
        assert!(admin
            .add(acl_subentry("acl", "{ base \"ou=people\", minimum 1 }"))
            .is_ok());
        assert!(admin.add(person("ou=groups,dc=example,dc=com", "carl")).is_ok());
        assert!(acl_refs(&admin, "cn=carl,ou=groups,dc=example,dc=com").is_empty());

        assert!(admin
            .move_entry(
                &dn("cn=carl,ou=groups,dc=example,dc=com"),
                dn("ou=people,dc=example,dc=com")
            )
            .is_ok());
        assert_eq!(
            acl_refs(&admin, "cn=carl,ou=people,dc=example,dc=com"),
            vec!["cn=acl,dc=example,dc=com".to_string()]
        );
        // Minimum 1 leaves the base itself out.
        assert!(acl_refs(&admin, "ou=people,dc=example,dc=com").is_empty());
    }

    #[ds_test]
    fn test_subentry_search_visibility(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        make_ap(&admin, "dc=example,dc=com");
        assert!(admin.add(acl_subentry("acl", "{}")).is_ok());
        let base = dn("dc=example,dc=com");
        let everything = f_pres(Attribute::ObjectClass);

        let found = admin
            .search(&base, Scope::Subtree, everything.clone(), AttrSelection::default())
            .expect("search");
        assert!(!found.is_empty());
        assert!(found.iter().all(|e| !e.is_subentry()));

        let mut ctx = admin
            .context(
                base,
                SearchOp {
                    scope: Scope::Subtree,
                    filter: everything.clone(),
                    attrs: AttrSelection::default(),
                },
            )
            .with_control(Control::new(OID_SUBENTRIES_CONTROL));
        let found = server
            .operation_manager()
            .search(&mut ctx)
            .and_then(|c| c.collect_entries())
            .expect("search");
        assert_eq!(found.len(), 1);
        assert!(found[0].is_subentry());

        // A base search always finds it.
        let found = admin
            .search(&dn("cn=acl,dc=example,dc=com"), Scope::Base, everything, AttrSelection::default())
            .expect("search");
        assert_eq!(found.len(), 1);
    }
}
