//! Maintains the operational attributes recording who created or last changed an entry and
//! when, and trims returned entries to the attributes that were asked for.

use time::OffsetDateTime;
use uuid::Uuid;

use super::{Interceptor, NextInterceptor, OPERATIONAL_ATTRIBUTE_INTERCEPTOR};
use crate::prelude::*;
use crate::schema::SchemaTransaction;

pub struct OperationalAttributeInterceptor;

/// The current time in generalized time syntax, `YYYYMMDDHHMMSSZ`.
pub fn generalized_time_now() -> String {
    let t = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}Z",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}

fn modified_stamp<O: OperationPayload>(ctx: &OperationContext<O>) -> Result<ModifyList, OperationError> {
    let modifier = ctx.session().principal().dn()?;
    Ok(ModifyList::new_list(vec![
        m_replace(Attribute::ModifiersName, &modifier.to_string()),
        m_replace(Attribute::ModifyTimestamp, &generalized_time_now()),
    ]))
}

/// Strip the attributes the selection doesn't cover.
fn filter_attrs<O: OperationPayload>(ctx: &OperationContext<O>, attrs: &AttrSelection, mut entry: Entry) -> Entry {
    let sr = ctx.session().service().schema().read();
    entry.retain_attrs(|a| attrs.includes(a, sr.is_operational(a)));
    entry
}

fn stamp_moddn<P: ModDnPayload>(ctx: &OperationContext<P>) -> Result<(), OperationError> {
    let new_dn = ctx.op.new_dn(&ctx.dn)?;
    ctx.modify(new_dn, modified_stamp(ctx)?, Bypass::all())?;
    Ok(())
}

impl Interceptor for OperationalAttributeInterceptor {
    fn name(&self) -> &str {
        OPERATIONAL_ATTRIBUTE_INTERCEPTOR
    }

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        let creator = ctx.session().principal().dn()?.to_string();
        let entry = &mut ctx.op.entry;
        // Values that are already present were set by the administrator, keep them.
        if !entry.attribute_pres(&Attribute::CreatorsName) {
            entry.set_ava(Attribute::CreatorsName, [creator]);
        }
        if !entry.attribute_pres(&Attribute::CreateTimestamp) {
            entry.set_ava(Attribute::CreateTimestamp, [generalized_time_now()]);
        }
        if !entry.attribute_pres(&Attribute::EntryUuid) {
            entry.set_ava(Attribute::EntryUuid, [Uuid::new_v4().to_string()]);
        }
        next.add(ctx)
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        let stamp = modified_stamp(ctx)?;
        for m in stamp.iter() {
            ctx.op.mods.push_mod(m.clone());
        }
        next.modify(ctx)
    }

    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        next.rename(ctx)?;
        stamp_moddn(ctx)
    }

    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        next.move_entry(ctx)?;
        stamp_moddn(ctx)
    }

    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        next.move_and_rename(ctx)?;
        stamp_moddn(ctx)
    }

    fn lookup(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
        let entry = next.lookup(ctx)?;
        let ctx = &*ctx;
        Ok(filter_attrs(ctx, &ctx.op.attrs, entry))
    }

    fn search(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        let cursor = next.search(ctx)?;
        let ctx = &*ctx;
        Ok(cursor.map_entries(|e| filter_attrs(ctx, &ctx.op.attrs, e)))
    }

    fn list(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        let cursor = next.list(ctx)?;
        let ctx = &*ctx;
        let attrs = AttrSelection::default();
        Ok(cursor.map_entries(|e| filter_attrs(ctx, &attrs, e)))
    }

    fn root_dse(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RootDseOp>) -> Result<Entry, OperationError> {
        let entry = next.root_dse(ctx)?;
        let ctx = &*ctx;
        Ok(filter_attrs(ctx, &ctx.op.attrs, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::generalized_time_now;
    use crate::prelude::*;

    fn person(dn: &Dn, cn: &str) -> Entry {
        entry_init!(
            dn.clone(),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, cn),
            (Attribute::Sn, "tester"),
            (Attribute::UserPassword, "pw")
        )
    }

    #[test]
    fn test_generalized_time_shape() {
        let now = generalized_time_now();
        assert_eq!(now.len(), 15);
        assert!(now.ends_with('Z'));
        assert!(now[..14].chars().all(|c| c.is_ascii_digit()));
    }

    #[ds_test]
    fn test_operational_attributes_stamped(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let dn = Dn::parse("cn=dave,ou=people,dc=example,dc=com").expect("dn");
        assert!(admin.add(person(&dn, "dave")).is_ok());

        // Hidden unless asked for.
        let plain = admin.lookup(&dn, AttrSelection::default()).expect("lookup");
        assert!(!plain.attribute_pres(&Attribute::CreatorsName));
        assert!(plain.attribute_pres(&Attribute::Cn));

        let ops = admin
            .lookup(&dn, AttrSelection::from_requested(&["+"]))
            .expect("lookup");
        assert_eq!(ops.get_ava_single(&Attribute::CreatorsName), Some(ADMIN_DN));
        assert!(ops.attribute_pres(&Attribute::CreateTimestamp));
        assert!(ops.attribute_pres(&Attribute::EntryUuid));
        assert!(!ops.attribute_pres(&Attribute::Cn));

        let user = server.anonymous_session().bind(&dn, "pw").expect("bind");
        assert!(user
            .modify(&dn, ModifyList::new_append(Attribute::Description, "hello"))
            .is_ok());
        let ops = admin
            .lookup(&dn, AttrSelection::from_requested(&["+", "description"]))
            .expect("lookup");
        assert_eq!(
            ops.get_ava_single(&Attribute::ModifiersName),
            Some("cn=dave,ou=people,dc=example,dc=com")
        );
        assert!(ops.attribute_pres(&Attribute::ModifyTimestamp));
        assert!(ops.attribute_equality(&Attribute::Description, "hello"));

        // Users can't forge them.
        assert!(matches!(
            user.modify(&dn, ModifyList::new_append(Attribute::CreatorsName, "cn=someone")),
            Err(OperationError::NoPermission(_))
        ));
        let forged = Dn::parse("cn=eve,ou=people,dc=example,dc=com").expect("dn");
        let mut e = person(&forged, "eve");
        e.add_ava(Attribute::CreateTimestamp, "19700101000000Z");
        assert!(matches!(user.add(e), Err(OperationError::NoPermission(_))));
    }

    #[ds_test]
    fn test_operational_attributes_on_rename(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let dn = Dn::parse("cn=frank,ou=people,dc=example,dc=com").expect("dn");
        assert!(admin.add(person(&dn, "frank")).is_ok());
        assert!(admin.rename(&dn, Rdn::new(Attribute::Cn, "francis"), true).is_ok());

        let renamed = Dn::parse("cn=francis,ou=people,dc=example,dc=com").expect("dn");
        let e = admin.lookup(&renamed, AttrSelection::all()).expect("lookup");
        assert_eq!(e.get_ava_single(&Attribute::ModifiersName), Some(ADMIN_DN));
        assert!(e.attribute_pres(&Attribute::ModifyTimestamp));
        assert!(e.attribute_equality(&Attribute::Cn, "francis"));
    }
}
