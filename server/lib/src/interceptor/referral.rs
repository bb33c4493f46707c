//! Sends operations that land on or beneath a referral entry to the referred servers.
//! The ManageDsaIT control asks for referral entries to be treated as ordinary entries.

use super::{Interceptor, NextInterceptor, REFERRAL_INTERCEPTOR};
use crate::prelude::*;

pub struct ReferralInterceptor;

/// Fail with the referral's URLs if `from` or one of its ancestors is a referral.
fn check<O: OperationPayload>(ctx: &mut OperationContext<O>, parent_only: bool) -> Result<(), OperationError> {
    if ctx.has_request_control(OID_MANAGE_DSA_IT_CONTROL) {
        ctx.throw_referral = false;
    }
    if !ctx.throw_referral {
        return Ok(());
    }
    let from = if parent_only {
        ctx.dn.parent()
    } else {
        Some(ctx.dn.clone())
    };
    let Some(from) = from else {
        return Ok(());
    };

    let nexus = ctx.session().service().nexus().clone();
    for dn in from.ancestors() {
        let Some(e) = nexus.fetch(&dn)? else {
            continue;
        };
        if e.is_referral() {
            let urls = e
                .get_ava(&Attribute::Ref)
                .map(|vs| vs.to_vec())
                .unwrap_or_default();
            request_info!(target = %ctx.dn, referral = %dn, ?urls, "referring operation");
            return Err(OperationError::Referral(urls));
        }
    }
    Ok(())
}

impl Interceptor for ReferralInterceptor {
    fn name(&self) -> &str {
        REFERRAL_INTERCEPTOR
    }

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        check(ctx, true)?;
        next.add(ctx)
    }

    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        check(ctx, false)?;
        next.delete(ctx)
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        check(ctx, false)?;
        next.modify(ctx)
    }

    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        check(ctx, false)?;
        next.rename(ctx)
    }

    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        check(ctx, false)?;
        next.move_entry(ctx)
    }

    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        check(ctx, false)?;
        next.move_and_rename(ctx)
    }

    fn lookup(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
        check(ctx, false)?;
        next.lookup(ctx)
    }

    fn search(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        check(ctx, false)?;
        next.search(ctx)
    }

    fn list(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        check(ctx, false)?;
        next.list(ctx)
    }

    fn compare(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<CompareOp>) -> Result<bool, OperationError> {
        check(ctx, false)?;
        next.compare(ctx)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[ds_test]
    fn test_referral_thrown_and_managed(server: &Arc<DirectoryService>) {
        let session = server.admin_session();
        let remote = Dn::parse("ou=remote,dc=example,dc=com").expect("dn");
        assert!(session
            .add(entry_init!(
                remote.clone(),
                (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                (Attribute::ObjectClass, EntryClass::Referral.as_ref()),
                (Attribute::ObjectClass, EntryClass::ExtensibleObject.as_ref()),
                (Attribute::Ou, "remote"),
                (Attribute::Ref, "ldap://other.example.com/ou=remote,dc=example,dc=com")
            ))
            .is_ok());

        let below = Dn::parse("cn=someone,ou=remote,dc=example,dc=com").expect("dn");
        assert_eq!(
            session.lookup(&below, AttrSelection::default()),
            Err(OperationError::Referral(vec![
                "ldap://other.example.com/ou=remote,dc=example,dc=com".to_string()
            ]))
        );
        assert!(matches!(
            session.lookup(&remote, AttrSelection::default()),
            Err(OperationError::Referral(_))
        ));

        // With ManageDsaIT the referral is an ordinary entry.
        let mut ctx = session
            .context(remote.clone(), LookupOp::default())
            .with_control(Control::new(OID_MANAGE_DSA_IT_CONTROL));
        let e = server.operation_manager().lookup(&mut ctx).expect("lookup");
        assert!(e.is_referral());
        assert!(!ctx.throw_referral);

        let mut ctx = session
            .context(remote, DeleteOp)
            .with_control(Control::new(OID_MANAGE_DSA_IT_CONTROL));
        assert!(server.operation_manager().delete(&mut ctx).is_ok());
    }
}
