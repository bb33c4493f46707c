//! Collective attributes are held by collective attribute subentries and shared by every
//! entry those subentries select. They are never stored on the entries themselves, they are
//! merged into them as they are read.

use hashbrown::HashMap;

use super::{Interceptor, NextInterceptor, COLLECTIVE_ATTRIBUTE_INTERCEPTOR};
use crate::prelude::*;
use crate::schema::{SchemaReadTransaction, SchemaTransaction};

pub struct CollectiveAttributeInterceptor;

/// Only collective attribute subentries may hold collective attributes.
fn check_collective<O: OperationPayload>(
    ctx: &OperationContext<O>,
    entry: &Entry,
) -> Result<(), OperationError> {
    if entry.has_class(EntryClass::CollectiveAttributeSubentry) {
        return Ok(());
    }
    let sr = ctx.session().service().schema().read();
    if let Some(attr) = entry.attr_names().find(|a| sr.is_collective(a)) {
        schema_warn!(dn = %entry.dn(), %attr, "collective attribute on an ordinary entry");
        return Err(OperationError::SchemaViolation(
            SchemaError::CollectiveAttributeNotAllowed(entry.dn().to_string()),
        ));
    }
    Ok(())
}

enum Exclusions {
    All,
    Named(Vec<Attribute>),
}

impl Exclusions {
    fn from_entry(entry: &Entry) -> Self {
        let Some(values) = entry.get_ava(&Attribute::CollectiveExclusions) else {
            return Exclusions::Named(Vec::new());
        };
        if values
            .iter()
            .any(|v| v.eq_ignore_ascii_case(EXCLUDE_ALL_COLLECTIVE_ATTRIBUTES))
        {
            Exclusions::All
        } else {
            Exclusions::Named(values.iter().map(Attribute::from).collect())
        }
    }

    fn excludes(&self, sr: &SchemaReadTransaction, attr: &Attribute) -> bool {
        match self {
            Exclusions::All => true,
            Exclusions::Named(names) => names.iter().any(|n| {
                n == attr
                    // Excluding by OID works too.
                    || match (sr.lookup_attribute_type(n.as_str()), sr.lookup_attribute_type(attr.as_str())) {
                        (Some(a), Some(b)) => a.meta.oid == b.meta.oid,
                        _ => false,
                    }
            }),
        }
    }
}

/// Fetches and remembers the subentries referenced while reading a batch of entries.
struct CollectiveSource<'a, O> {
    ctx: &'a OperationContext<O>,
    subentries: HashMap<String, Option<Entry>>,
}

impl<'a, O: OperationPayload> CollectiveSource<'a, O> {
    fn new(ctx: &'a OperationContext<O>) -> Self {
        CollectiveSource {
            ctx,
            subentries: HashMap::new(),
        }
    }

    fn subentry(&mut self, dn: &str) -> Result<Option<&Entry>, OperationError> {
        let dn = Dn::parse(dn)?;
        let key = dn.norm_string();
        if !self.subentries.contains_key(&key) {
            let found = self.ctx.try_lookup(dn, AttrSelection::all(), Bypass::all())?;
            if found.is_none() {
                // The reference outlived its subentry.
                warn!(subentry = %key, "dangling collective attribute subentry reference");
            }
            self.subentries.insert(key.clone(), found);
        }
        Ok(self.subentries.get(&key).and_then(|e| e.as_ref()))
    }

    fn inject(&mut self, mut entry: Entry) -> Result<Entry, OperationError> {
        let Some(refs) = entry
            .get_ava(&Attribute::CollectiveAttributeSubentries)
            .map(|v| v.to_vec())
        else {
            return Ok(entry);
        };
        let exclusions = Exclusions::from_entry(&entry);
        if matches!(exclusions, Exclusions::All) {
            return Ok(entry);
        }

        let service = self.ctx.session().service().clone();
        let sr = service.schema().read();
        for subentry_dn in refs.iter() {
            let Some(subentry) = self.subentry(subentry_dn)? else {
                continue;
            };
            for (attr, values) in subentry.attrs() {
                if !sr.is_collective(attr) || exclusions.excludes(&sr, attr) {
                    continue;
                }
                entry.add_avas(attr.clone(), values.iter().cloned());
            }
        }
        Ok(entry)
    }
}

impl Interceptor for CollectiveAttributeInterceptor {
    fn name(&self) -> &str {
        COLLECTIVE_ATTRIBUTE_INTERCEPTOR
    }

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        check_collective(ctx, &ctx.op.entry)?;
        next.add(ctx)
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        let mut after = ctx.target_entry()?.clone();
        after.apply_modlist(&ctx.op.mods);
        check_collective(ctx, &after)?;
        next.modify(ctx)
    }

    fn lookup(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
        let entry = next.lookup(ctx)?;
        CollectiveSource::new(ctx).inject(entry)
    }

    fn search(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        let cursor = next.search(ctx)?;
        let mut source = CollectiveSource::new(ctx);
        cursor.try_map_entries(|e| source.inject(e))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn people() -> Dn {
        Dn::parse("ou=people,dc=example,dc=com").expect("dn")
    }

    fn person(cn: &str) -> Entry {
        entry_init!(
            people().with_rdn(Rdn::new(Attribute::Cn, cn)),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, cn),
            (Attribute::Sn, "tester")
        )
    }

    fn collective_area(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let ap = Dn::parse("dc=example,dc=com").expect("dn");
        assert!(admin
            .modify(
                &ap,
                ModifyList::new_append(Attribute::AdministrativeRole, "collectiveAttributeSpecificArea")
            )
            .is_ok());
        let subentry = entry_init!(
            Dn::parse("cn=location,dc=example,dc=com").expect("dn"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Subentry.as_ref()),
            (Attribute::ObjectClass, EntryClass::CollectiveAttributeSubentry.as_ref()),
            (Attribute::Cn, "location"),
            (Attribute::SubtreeSpecification, "{ base \"ou=people\" }"),
            (Attribute::from_str("c-l"), "Berlin")
        );
        assert!(admin.add(subentry).is_ok());
    }

    #[ds_test]
    fn test_collective_attribute_injection(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let c_l = Attribute::from_str("c-l");
        assert!(admin.add(person("ann")).is_ok());
        collective_area(server);
        assert!(admin.add(person("ben")).is_ok());

        // Entries present before and after the subentry share its attributes.
        for cn in ["ann", "ben"] {
            let dn = people().with_rdn(Rdn::new(Attribute::Cn, cn));
            let e = admin.lookup(&dn, AttrSelection::default()).expect("lookup");
            assert!(e.attribute_equality(&c_l, "berlin"));
            // The reference itself stays operational.
            assert!(!e.attribute_pres(&Attribute::CollectiveAttributeSubentries));
        }

        let found = admin
            .search(&people(), Scope::One, f_pres(Attribute::Cn), AttrSelection::default())
            .expect("search");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.attribute_pres(&c_l)));

        // Outside the selected subtree.
        let groups = Dn::parse("ou=groups,dc=example,dc=com").expect("dn");
        let e = admin.lookup(&groups, AttrSelection::default()).expect("lookup");
        assert!(!e.attribute_pres(&c_l));
    }

    #[ds_test]
    fn test_collective_attribute_exclusions(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let c_l = Attribute::from_str("c-l");
        collective_area(server);

        let mut e = person("carl");
        e.add_ava(Attribute::CollectiveExclusions, "c-l");
        assert!(admin.add(e).is_ok());
        let mut e = person("dora");
        e.add_ava(Attribute::CollectiveExclusions, EXCLUDE_ALL_COLLECTIVE_ATTRIBUTES);
        assert!(admin.add(e).is_ok());

        for cn in ["carl", "dora"] {
            let dn = people().with_rdn(Rdn::new(Attribute::Cn, cn));
            let e = admin.lookup(&dn, AttrSelection::default()).expect("lookup");
            assert!(!e.attribute_pres(&c_l));
        }
    }

    #[ds_test]
    fn test_collective_attribute_not_allowed(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let mut e = person("erin");
        e.add_ava(Attribute::from_str("c-l"), "Paris");
        assert_eq!(
            admin.add(e),
            Err(OperationError::SchemaViolation(
                SchemaError::CollectiveAttributeNotAllowed(
                    "cn=erin,ou=people,dc=example,dc=com".to_string()
                )
            ))
        );

        assert!(admin.add(person("erin")).is_ok());
        let dn = people().with_rdn(Rdn::new(Attribute::Cn, "erin"));
        assert!(matches!(
            admin.modify(&dn, ModifyList::new_append(Attribute::from_str("c-l"), "Paris")),
            Err(OperationError::SchemaViolation(
                SchemaError::CollectiveAttributeNotAllowed(_)
            ))
        ));
    }
}
