//! Rewrites every name an operation carries into its schema normalised form, so later
//! stages and the partition only ever see one spelling of a DN.

use super::{Interceptor, NextInterceptor, NORMALIZATION_INTERCEPTOR};
use crate::prelude::*;
use crate::schema::SchemaTransaction;

pub struct NormalizationInterceptor;

fn normalize_dn<O: OperationPayload>(ctx: &OperationContext<O>, dn: &Dn) -> Dn {
    let sr = ctx.session().service().schema().read();
    dn.normalize(sr.normalizer_mapping())
}

fn normalize_rdn<O: OperationPayload>(ctx: &OperationContext<O>, rdn: &Rdn) -> Rdn {
    let sr = ctx.session().service().schema().read();
    rdn.normalize(sr.normalizer_mapping())
}

fn normalize_target<O: OperationPayload>(ctx: &mut OperationContext<O>) {
    let dn = normalize_dn(ctx, &ctx.dn);
    trace!(from = %ctx.dn, to = %dn, "normalised target");
    ctx.dn = dn;
}

impl Interceptor for NormalizationInterceptor {
    fn name(&self) -> &str {
        NORMALIZATION_INTERCEPTOR
    }

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        normalize_target(ctx);
        let dn = ctx.dn.clone();
        ctx.op.entry.set_dn(dn);
        next.add(ctx)
    }

    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        normalize_target(ctx);
        next.delete(ctx)
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        normalize_target(ctx);
        next.modify(ctx)
    }

    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        normalize_target(ctx);
        ctx.op.new_rdn = normalize_rdn(ctx, &ctx.op.new_rdn);
        next.rename(ctx)
    }

    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        normalize_target(ctx);
        ctx.op.new_superior = normalize_dn(ctx, &ctx.op.new_superior);
        next.move_entry(ctx)
    }

    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        normalize_target(ctx);
        ctx.op.new_superior = normalize_dn(ctx, &ctx.op.new_superior);
        ctx.op.new_rdn = normalize_rdn(ctx, &ctx.op.new_rdn);
        next.move_and_rename(ctx)
    }

    fn lookup(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
        normalize_target(ctx);
        next.lookup(ctx)
    }

    fn has_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<HasEntryOp>) -> Result<bool, OperationError> {
        normalize_target(ctx);
        next.has_entry(ctx)
    }

    fn search(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        normalize_target(ctx);
        next.search(ctx)
    }

    fn list(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        normalize_target(ctx);
        next.list(ctx)
    }

    fn compare(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<CompareOp>) -> Result<bool, OperationError> {
        normalize_target(ctx);
        next.compare(ctx)
    }

    fn bind(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<BindOp>) -> Result<(), OperationError> {
        normalize_target(ctx);
        next.bind(ctx)
    }
}
