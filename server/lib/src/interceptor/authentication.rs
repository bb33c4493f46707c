//! Verifies bind credentials and keeps anonymous sessions to the operations they are
//! allowed.

use super::{Interceptor, NextInterceptor, AUTHENTICATION_INTERCEPTOR};
use crate::prelude::*;

pub struct AuthenticationInterceptor;

fn require_authenticated<O: OperationPayload>(ctx: &OperationContext<O>) -> Result<(), OperationError> {
    if ctx.session().principal().is_anonymous() {
        security_access!(kind = %ctx.kind(), dn = %ctx.dn, "anonymous session may not modify the directory");
        return Err(OperationError::NotAuthenticated);
    }
    Ok(())
}

fn check_read<O: OperationPayload>(ctx: &OperationContext<O>) -> Result<(), OperationError> {
    let session = ctx.session();
    if session.principal().is_anonymous() && !session.service().config().allow_anonymous_access {
        security_access!(kind = %ctx.kind(), dn = %ctx.dn, "anonymous access is disabled");
        return Err(OperationError::NotAuthenticated);
    }
    Ok(())
}

impl Interceptor for AuthenticationInterceptor {
    fn name(&self) -> &str {
        AUTHENTICATION_INTERCEPTOR
    }

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        require_authenticated(ctx)?;
        next.add(ctx)
    }

    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        require_authenticated(ctx)?;
        next.delete(ctx)
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        require_authenticated(ctx)?;
        next.modify(ctx)
    }

    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        require_authenticated(ctx)?;
        next.rename(ctx)
    }

    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        require_authenticated(ctx)?;
        next.move_entry(ctx)
    }

    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        require_authenticated(ctx)?;
        next.move_and_rename(ctx)
    }

    fn lookup(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
        check_read(ctx)?;
        next.lookup(ctx)
    }

    fn has_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<HasEntryOp>) -> Result<bool, OperationError> {
        check_read(ctx)?;
        next.has_entry(ctx)
    }

    fn search(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        check_read(ctx)?;
        next.search(ctx)
    }

    fn list(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        check_read(ctx)?;
        next.list(ctx)
    }

    fn compare(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<CompareOp>) -> Result<bool, OperationError> {
        check_read(ctx)?;
        next.compare(ctx)
    }

    #[instrument(level = "debug", name = "authentication::bind", skip_all)]
    fn bind(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<BindOp>) -> Result<(), OperationError> {
        if ctx.op.credentials.is_empty() {
            security_info!(dn = %ctx.dn, "unauthenticated bind refused");
            return Err(OperationError::InvalidCredentials);
        }
        let stored = ctx.try_lookup(ctx.dn.clone(), AttrSelection::all(), Bypass::all())?;
        let verified = stored
            .as_ref()
            .and_then(|e| e.get_ava(&Attribute::UserPassword))
            .map(|pws| pws.iter().any(|pw| pw == &ctx.op.credentials))
            .unwrap_or(false);
        if !verified {
            security_info!(dn = %ctx.dn, "bind failed");
            return Err(OperationError::InvalidCredentials);
        }

        let principal = if ctx.dn == Dn::parse(ADMIN_DN)? {
            Principal::Admin
        } else {
            Principal::User(ctx.dn.clone())
        };
        ctx.op.principal = Some(principal);
        next.bind(ctx)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn person(dn: &Dn, password: &str) -> Entry {
        entry_init!(
            dn.clone(),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, "claire"),
            (Attribute::Sn, "user"),
            (Attribute::UserPassword, password)
        )
    }

    #[ds_test(admin_password = "hunter2")]
    fn test_bind(server: &Arc<DirectoryService>) {
        let anon = server.anonymous_session();
        let admin_dn = Dn::parse(ADMIN_DN).expect("dn");

        assert_eq!(
            anon.bind(&admin_dn, "wrong").map(|_| ()),
            Err(OperationError::InvalidCredentials)
        );
        assert_eq!(
            anon.bind(&admin_dn, "").map(|_| ()),
            Err(OperationError::InvalidCredentials)
        );
        let admin = anon.bind(&admin_dn, "hunter2").expect("bind");
        assert!(admin.principal().is_admin());

        let claire = Dn::parse("cn=claire,ou=people,dc=example,dc=com").expect("dn");
        assert!(admin.add(person(&claire, "pw")).is_ok());
        let user = anon.bind(&claire, "pw").expect("bind");
        assert_eq!(user.principal(), &Principal::User(claire.clone()));

        // Nobody by that name.
        let ghost = Dn::parse("cn=ghost,ou=people,dc=example,dc=com").expect("dn");
        assert_eq!(
            anon.bind(&ghost, "pw").map(|_| ()),
            Err(OperationError::InvalidCredentials)
        );
    }

    #[ds_test]
    fn test_anonymous_cannot_write(server: &Arc<DirectoryService>) {
        let anon = server.anonymous_session();
        let dn = Dn::parse("cn=anon,ou=people,dc=example,dc=com").expect("dn");
        assert_eq!(
            anon.add(person(&dn, "pw")),
            Err(OperationError::NotAuthenticated)
        );
        let base = Dn::parse("dc=example,dc=com").expect("dn");
        assert_eq!(anon.has_entry(&base), Ok(true));
    }

    #[ds_test(allow_anonymous_access = false)]
    fn test_anonymous_reads_disabled(server: &Arc<DirectoryService>) {
        let anon = server.anonymous_session();
        let base = Dn::parse("dc=example,dc=com").expect("dn");
        assert_eq!(anon.has_entry(&base), Err(OperationError::NotAuthenticated));
        // The root DSE stays readable.
        assert!(anon.root_dse(AttrSelection::default()).is_ok());
    }
}
