//! A coarse access policy. Only the administrator may change the schema, subentries,
//! administrative points or the administrator's own entry, and only the administrator may
//! write attributes the schema marks no-user-modification.

use super::{Interceptor, NextInterceptor, ACCESS_CONTROL_INTERCEPTOR};
use crate::prelude::*;
use crate::schema::SchemaTransaction;

pub struct AccessControlInterceptor;

/// Why `entry` is reserved to the administrator, if it is.
fn protected(dn: &Dn, entry: Option<&Entry>) -> Result<Option<&'static str>, OperationError> {
    if dn.is_descendant_of(&Dn::parse(SCHEMA_DN)?) {
        return Ok(Some("schema entries"));
    }
    if dn == &Dn::parse(ADMIN_DN)? {
        return Ok(Some("the administrator entry"));
    }
    Ok(entry.and_then(|e| {
        if e.is_subentry() {
            Some("subentries")
        } else if e.is_administrative_point() {
            Some("administrative points")
        } else {
            None
        }
    }))
}

fn check<O: OperationPayload>(ctx: &OperationContext<O>, entry: Option<&Entry>) -> Result<(), OperationError> {
    let principal = ctx.session().principal();
    if principal.is_admin() {
        return Ok(());
    }
    if let Some(what) = protected(&ctx.dn, entry)? {
        security_access!(%principal, dn = %ctx.dn, kind = %ctx.kind(), "denied, {} are administrator only", what);
        return Err(OperationError::NoPermission(format!(
            "{} may not change {}: {} are administrator only",
            principal, ctx.dn, what
        )));
    }
    Ok(())
}

/// Only the administrator may write attributes the schema marks no-user-modification.
fn check_user_modifiable<'a, O, I>(ctx: &OperationContext<O>, attrs: I) -> Result<(), OperationError>
where
    O: OperationPayload,
    I: IntoIterator<Item = &'a Attribute>,
{
    let principal = ctx.session().principal();
    if principal.is_admin() {
        return Ok(());
    }
    let sr = ctx.session().service().schema().read();
    if let Some(attr) = attrs.into_iter().find(|a| sr.is_no_user_modification(a)) {
        security_access!(%principal, dn = %ctx.dn, %attr, "denied write of a no-user-modification attribute");
        return Err(OperationError::NoPermission(format!(
            "{} may not be modified by {}",
            attr, principal
        )));
    }
    Ok(())
}

impl Interceptor for AccessControlInterceptor {
    fn name(&self) -> &str {
        ACCESS_CONTROL_INTERCEPTOR
    }

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        check(ctx, Some(&ctx.op.entry))?;
        check_user_modifiable(ctx, ctx.op.entry.attr_names())?;
        next.add(ctx)
    }

    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        check(ctx, ctx.entry.as_ref())?;
        next.delete(ctx)
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        check(ctx, ctx.entry.as_ref())?;
        if !ctx.session().principal().is_admin() && ctx.op.mods.touches(&Attribute::AdministrativeRole) {
            return Err(OperationError::NoPermission(format!(
                "only the administrator may create administrative points, {}",
                ctx.dn
            )));
        }
        check_user_modifiable(ctx, ctx.op.mods.attrs())?;
        next.modify(ctx)
    }

    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        check(ctx, ctx.entry.as_ref())?;
        next.rename(ctx)
    }

    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        check(ctx, ctx.entry.as_ref())?;
        next.move_entry(ctx)
    }

    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        check(ctx, ctx.entry.as_ref())?;
        next.move_and_rename(ctx)
    }
}
