//! Records each successful mutation in the change log, together with the records that
//! undo it. The inverse is computed from the target as it was before the change.

use super::operational::generalized_time_now;
use super::{Interceptor, NextInterceptor, CHANGELOG_INTERCEPTOR};
use crate::ldif::LdifEntry;
use crate::prelude::*;

pub struct ChangeLogInterceptor;

fn enabled<O: OperationPayload>(ctx: &OperationContext<O>) -> bool {
    ctx.session().service().changelog().is_enabled()
}

fn record<O: OperationPayload>(
    ctx: &OperationContext<O>,
    forward: LdifEntry,
    reverse: Vec<LdifEntry>,
) -> Result<(), OperationError> {
    let revision = ctx.session().service().changelog().log(
        ctx.session().principal(),
        generalized_time_now(),
        forward,
        reverse,
    )?;
    request_trace!(operation = %ctx.id(), revision, "recorded change");
    Ok(())
}

fn moddn<P: ModDnPayload>(
    ctx: &mut OperationContext<P>,
    run: impl FnOnce(&mut OperationContext<P>) -> Result<(), OperationError>,
) -> Result<(), OperationError> {
    if !enabled(ctx) {
        return run(ctx);
    }
    let before = ctx.target_entry()?.clone();
    let new_dn = ctx.op.new_dn(&ctx.dn)?;
    let reverse = LdifEntry::reverse_moddn(&before, &new_dn)?;
    run(ctx)?;

    let (new_rdn, delete_old_rdn) = match ctx.op.rename() {
        Some((rdn, delete)) => (rdn.clone(), delete),
        None => match new_dn.rdn() {
            Some(rdn) => (rdn.clone(), false),
            None => return Err(OperationError::IllegalState("moved to the root".to_string())),
        },
    };
    let new_superior = if new_dn.parent() != ctx.dn.parent() {
        new_dn.parent()
    } else {
        None
    };
    let forward = LdifEntry::ModDn {
        dn: ctx.dn.clone(),
        new_rdn,
        delete_old_rdn,
        new_superior,
    };
    record(ctx, forward, vec![reverse])
}

impl Interceptor for ChangeLogInterceptor {
    fn name(&self) -> &str {
        CHANGELOG_INTERCEPTOR
    }

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        next.add(ctx)?;
        if !enabled(ctx) {
            return Ok(());
        }
        record(
            ctx,
            LdifEntry::Add(ctx.op.entry.clone()),
            vec![LdifEntry::reverse_add(&ctx.dn)],
        )
    }

    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        if !enabled(ctx) {
            return next.delete(ctx);
        }
        let before = ctx.target_entry()?.clone();
        next.delete(ctx)?;
        record(
            ctx,
            LdifEntry::Delete(ctx.dn.clone()),
            vec![LdifEntry::reverse_delete(&before)],
        )
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        if !enabled(ctx) {
            return next.modify(ctx);
        }
        let before = ctx.target_entry()?.clone();
        next.modify(ctx)?;
        record(
            ctx,
            LdifEntry::Modify {
                dn: ctx.dn.clone(),
                mods: ctx.op.mods.clone(),
            },
            vec![LdifEntry::reverse_modify(&before, &ctx.op.mods)],
        )
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
}

#[cfg(test)]
mod tests {
    use crate::ldif::LdifEntry;
    use crate::prelude::*;

    #[ds_test(changelog = true)]
    fn test_changelog_records_mutations(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let log = server.changelog();
        let start = log.current_revision();

        let dn = Dn::parse("cn=gail,ou=people,dc=example,dc=com").expect("dn");
        assert!(admin
            .add(entry_init!(
                dn.clone(),
                (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                (Attribute::ObjectClass, EntryClass::Person.as_ref()),
                (Attribute::Cn, "gail"),
                (Attribute::Sn, "tester")
            ))
            .is_ok());
        assert!(admin
            .modify(&dn, ModifyList::new_append(Attribute::Description, "first"))
            .is_ok());
        assert!(admin.rename(&dn, Rdn::new(Attribute::Cn, "gale"), false).is_ok());

        let events = log.events_since(start);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.principal.is_admin()));
        assert!(matches!(events[0].forward, LdifEntry::Add(_)));
        assert_eq!(events[0].reverse, vec![LdifEntry::Delete(dn.clone())]);
        assert!(matches!(events[1].reverse.as_slice(), [LdifEntry::Modify { .. }]));
        assert_eq!(
            events[2].reverse,
            vec![LdifEntry::ModDn {
                dn: Dn::parse("cn=gale,ou=people,dc=example,dc=com").expect("dn"),
                new_rdn: Rdn::new(Attribute::Cn, "gail"),
                delete_old_rdn: true,
                new_superior: None,
            }]
        );

        // Failures leave no trace.
        let revision = log.current_revision();
        assert!(admin.delete(&dn).is_err());
        assert_eq!(log.current_revision(), revision);
    }

    #[ds_test]
    fn test_changelog_disabled_records_nothing(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let groups = Dn::parse("ou=groups,dc=example,dc=com").expect("dn");
        assert!(admin
            .modify(&groups, ModifyList::new_append(Attribute::Description, "x"))
            .is_ok());
        assert_eq!(server.changelog().current_revision(), 0);
        assert_eq!(server.revert(None), Err(OperationError::ChangeLogDisabled));
    }
}
