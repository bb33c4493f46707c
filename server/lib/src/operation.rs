//! The operation manager is the single entry point for every directory operation, first
//! level or nested. It performs the structural pre-checks that don't depend on any policy,
//! loads the snapshot of the target, records the operation on the session's frame stack and
//! then walks the interceptor chain.

use crate::interceptor::{InterceptorChain, NextInterceptor};
use crate::partition::PartitionNexus;
use crate::prelude::*;

pub struct OperationManager {
    chain: InterceptorChain,
}

/// True if `dn` or one of its ancestors is a referral the operation should be sent to
/// rather than being checked locally.
fn beneath_referral<O: OperationPayload>(
    nexus: &dyn PartitionNexus,
    ctx: &OperationContext<O>,
    dn: &Dn,
) -> Result<bool, OperationError> {
    if !ctx.throw_referral || ctx.has_request_control(OID_MANAGE_DSA_IT_CONTROL) {
        return Ok(false);
    }
    for ancestor in dn.ancestors() {
        if let Some(e) = nexus.fetch(&ancestor)? {
            if e.is_referral() {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn is_suffix(nexus: &dyn PartitionNexus, dn: &Dn) -> bool {
    nexus.suffixes().iter().any(|s| s == dn)
}

/// Load the snapshot of an existing target.
fn load_target<O: OperationPayload>(
    nexus: &dyn PartitionNexus,
    ctx: &mut OperationContext<O>,
) -> Result<(), OperationError> {
    if beneath_referral(nexus, ctx, &ctx.dn)? {
        ctx.entry = nexus.fetch(&ctx.dn)?;
        return Ok(());
    }
    match nexus.fetch(&ctx.dn)? {
        Some(e) => {
            ctx.entry = Some(e);
            Ok(())
        }
        None => {
            request_info!(dn = %ctx.dn, kind = %ctx.kind(), "target does not exist");
            Err(OperationError::NoSuchObject(ctx.dn.to_string()))
        }
    }
}

fn check_moddn<P: ModDnPayload>(
    nexus: &dyn PartitionNexus,
    ctx: &mut OperationContext<P>,
) -> Result<(), OperationError> {
    load_target(nexus, ctx)?;
    if ctx.entry.is_none() {
        // Beneath a referral, the referral stage answers.
        return Ok(());
    }
    let new_dn = ctx.op.new_dn(&ctx.dn)?;
    if new_dn.is_strict_descendant_of(&ctx.dn) {
        return Err(OperationError::UnwillingToPerform(format!(
            "can't move {} beneath itself",
            ctx.dn
        )));
    }
    if new_dn != ctx.dn && nexus.fetch(&new_dn)?.is_some() {
        return Err(OperationError::EntryAlreadyExists(new_dn.to_string()));
    }
    if let Some(parent) = new_dn.parent() {
        if !parent.is_empty() && !is_suffix(nexus, &new_dn) && nexus.fetch(&parent)?.is_none() {
            return Err(OperationError::NoSuchObject(parent.to_string()));
        }
    }
    Ok(())
}

impl OperationManager {
    pub fn new(chain: InterceptorChain) -> Self {
        OperationManager { chain }
    }

    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    fn nexus(&self) -> &dyn PartitionNexus {
        self.chain.nexus().as_ref()
    }

    fn ensure_started<O: OperationPayload>(ctx: &OperationContext<O>) -> Result<(), OperationError> {
        if ctx.session().service().is_started() {
            Ok(())
        } else {
            request_warn!(kind = %ctx.kind(), "directory service is not started");
            Err(OperationError::UnwillingToPerform(
                "the directory service is not started".to_string(),
            ))
        }
    }

    /// Run the chain for an operation, keeping it on the session's frame stack for the
    /// duration. The frame is always released; the operation's own error wins.
    fn execute<O, R, F>(&self, ctx: &mut OperationContext<O>, f: F) -> Result<R, OperationError>
    where
        O: OperationPayload,
        F: FnOnce(NextInterceptor<'_>, &mut OperationContext<O>) -> Result<R, OperationError>,
    {
        let session = ctx.session().clone();
        let frame = ctx.frame().clone();
        session.push_frame(frame.clone())?;
        request_trace!(
            operation = %ctx.id(),
            kind = %ctx.kind(),
            dn = %ctx.dn,
            depth = frame.depth(),
            "begin operation"
        );
        let res = f(self.chain.start(), ctx);
        let released = session.pop_frame(&frame);
        if let Err(e) = &res {
            request_trace!(operation = %ctx.id(), err = ?e, "operation failed");
        }
        let r = res?;
        released?;
        Ok(r)
    }

    #[instrument(level = "debug", name = "operation::add", skip_all)]
    pub fn add(&self, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        let nexus = self.nexus();
        let dn = ctx.dn.clone();
        let parent = dn.parent();
        let under_referral = match parent.as_ref() {
            Some(p) => beneath_referral(nexus, ctx, p)?,
            None => false,
        };
        if !under_referral {
            if nexus.fetch(&dn)?.is_some() {
                return Err(OperationError::EntryAlreadyExists(dn.to_string()));
            }
            if !is_suffix(nexus, &dn) {
                match parent {
                    Some(p) if !p.is_empty() => {
                        if nexus.fetch(&p)?.is_none() {
                            return Err(OperationError::NoSuchObject(p.to_string()));
                        }
                    }
                    _ => {
                        return Err(OperationError::UnwillingToPerform(format!(
                            "{} is not beneath a naming context",
                            dn
                        )))
                    }
                }
            }
        }
        self.execute(ctx, |next, ctx| next.add(ctx))
    }

    #[instrument(level = "debug", name = "operation::delete", skip_all)]
    pub fn delete(&self, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        let nexus = self.nexus();
        load_target(nexus, ctx)?;
        if ctx.entry.is_some() && nexus.has_children(&ctx.dn)? {
            return Err(OperationError::NotAllowedOnNonLeaf(ctx.dn.to_string()));
        }
        self.execute(ctx, |next, ctx| next.delete(ctx))
    }

    #[instrument(level = "debug", name = "operation::modify", skip_all)]
    pub fn modify(&self, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        load_target(self.nexus(), ctx)?;
        self.execute(ctx, |next, ctx| next.modify(ctx))
    }

    #[instrument(level = "debug", name = "operation::rename", skip_all)]
    pub fn rename(&self, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        check_moddn(self.nexus(), ctx)?;
        self.execute(ctx, |next, ctx| next.rename(ctx))
    }

    #[instrument(level = "debug", name = "operation::move", skip_all)]
    pub fn move_entry(&self, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        check_moddn(self.nexus(), ctx)?;
        self.execute(ctx, |next, ctx| next.move_entry(ctx))
    }

    #[instrument(level = "debug", name = "operation::move_and_rename", skip_all)]
    pub fn move_and_rename(&self, ctx: &mut OperationContext<MoveAndRenameOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        check_moddn(self.nexus(), ctx)?;
        self.execute(ctx, |next, ctx| next.move_and_rename(ctx))
    }

    #[instrument(level = "debug", name = "operation::lookup", skip_all)]
    pub fn lookup(&self, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
        Self::ensure_started(ctx)?;
        load_target(self.nexus(), ctx)?;
        self.execute(ctx, |next, ctx| next.lookup(ctx))
    }

    #[instrument(level = "debug", name = "operation::has_entry", skip_all)]
    pub fn has_entry(&self, ctx: &mut OperationContext<HasEntryOp>) -> Result<bool, OperationError> {
        Self::ensure_started(ctx)?;
        self.execute(ctx, |next, ctx| next.has_entry(ctx))
    }

    #[instrument(level = "debug", name = "operation::search", skip_all)]
    pub fn search(&self, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        Self::ensure_started(ctx)?;
        if !ctx.dn.is_empty() {
            load_target(self.nexus(), ctx)?;
        }
        self.execute(ctx, |next, ctx| next.search(ctx))
    }

    #[instrument(level = "debug", name = "operation::list", skip_all)]
    pub fn list(&self, ctx: &mut OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        Self::ensure_started(ctx)?;
        if !ctx.dn.is_empty() {
            load_target(self.nexus(), ctx)?;
        }
        self.execute(ctx, |next, ctx| next.list(ctx))
    }

    #[instrument(level = "debug", name = "operation::compare", skip_all)]
    pub fn compare(&self, ctx: &mut OperationContext<CompareOp>) -> Result<bool, OperationError> {
        Self::ensure_started(ctx)?;
        load_target(self.nexus(), ctx)?;
        self.execute(ctx, |next, ctx| next.compare(ctx))
    }

    #[instrument(level = "debug", name = "operation::bind", skip_all)]
    pub fn bind(&self, ctx: &mut OperationContext<BindOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        ctx.entry = self.nexus().fetch(&ctx.dn)?;
        self.execute(ctx, |next, ctx| next.bind(ctx))
    }

    #[instrument(level = "debug", name = "operation::unbind", skip_all)]
    pub fn unbind(&self, ctx: &mut OperationContext<UnbindOp>) -> Result<(), OperationError> {
        Self::ensure_started(ctx)?;
        self.execute(ctx, |next, ctx| next.unbind(ctx))
    }

    #[instrument(level = "debug", name = "operation::root_dse", skip_all)]
    pub fn root_dse(&self, ctx: &mut OperationContext<RootDseOp>) -> Result<Entry, OperationError> {
        Self::ensure_started(ctx)?;
        self.execute(ctx, |next, ctx| next.root_dse(ctx))
    }
}
