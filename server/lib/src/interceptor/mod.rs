//! Interceptors allow an operation to be inspected, rewritten, rejected or short circuited
//! on its way to the partition. The [`InterceptorChain`] holds the configured stages in
//! order and every operation walks them from the first to the last, skipping any stage
//! named in the operation's bypass set, before reaching the [`PartitionNexus`].
//!
//! Each stage receives a [`NextInterceptor`] positioned just after itself. Calling it
//! proceeds down the remaining chain; a stage may instead return early, fail, or issue
//! nested operations through the context, which start a fresh walk of the chain.

use crate::partition::PartitionNexus;
use crate::prelude::*;

mod access;
mod authentication;
mod changelog;
mod collective;
mod normalization;
mod operational;
mod referral;
mod schema;
mod subentry;

pub use self::access::AccessControlInterceptor;
pub use self::authentication::AuthenticationInterceptor;
pub use self::changelog::ChangeLogInterceptor;
pub use self::collective::CollectiveAttributeInterceptor;
pub use self::normalization::NormalizationInterceptor;
pub use self::operational::OperationalAttributeInterceptor;
pub use self::referral::ReferralInterceptor;
pub use self::schema::SchemaInterceptor;
pub use self::subentry::SubentryInterceptor;

pub const NORMALIZATION_INTERCEPTOR: &str = "normalizationInterceptor";
pub const AUTHENTICATION_INTERCEPTOR: &str = "authenticationInterceptor";
pub const REFERRAL_INTERCEPTOR: &str = "referralInterceptor";
pub const ACCESS_CONTROL_INTERCEPTOR: &str = "accessControlInterceptor";
pub const SCHEMA_INTERCEPTOR: &str = "schemaInterceptor";
pub const OPERATIONAL_ATTRIBUTE_INTERCEPTOR: &str = "operationalAttributeInterceptor";
pub const COLLECTIVE_ATTRIBUTE_INTERCEPTOR: &str = "collectiveAttributeInterceptor";
pub const SUBENTRY_INTERCEPTOR: &str = "subentryInterceptor";
pub const CHANGELOG_INTERCEPTOR: &str = "changeLogInterceptor";

/// The built in stages in their default order.
pub const DEFAULT_INTERCEPTOR_ORDER: [&str; 9] = [
    NORMALIZATION_INTERCEPTOR,
    AUTHENTICATION_INTERCEPTOR,
    REFERRAL_INTERCEPTOR,
    ACCESS_CONTROL_INTERCEPTOR,
    SCHEMA_INTERCEPTOR,
    OPERATIONAL_ATTRIBUTE_INTERCEPTOR,
    COLLECTIVE_ATTRIBUTE_INTERCEPTOR,
    SUBENTRY_INTERCEPTOR,
    CHANGELOG_INTERCEPTOR,
];

/// A built in stage by name.
pub fn builtin(name: &str) -> Option<Box<dyn Interceptor>> {
    let i: Box<dyn Interceptor> = match name {
        NORMALIZATION_INTERCEPTOR => Box::new(NormalizationInterceptor),
        AUTHENTICATION_INTERCEPTOR => Box::new(AuthenticationInterceptor),
        REFERRAL_INTERCEPTOR => Box::new(ReferralInterceptor),
        ACCESS_CONTROL_INTERCEPTOR => Box::new(AccessControlInterceptor),
        SCHEMA_INTERCEPTOR => Box::new(SchemaInterceptor),
        OPERATIONAL_ATTRIBUTE_INTERCEPTOR => Box::new(OperationalAttributeInterceptor),
        COLLECTIVE_ATTRIBUTE_INTERCEPTOR => Box::new(CollectiveAttributeInterceptor),
        SUBENTRY_INTERCEPTOR => Box::new(SubentryInterceptor),
        CHANGELOG_INTERCEPTOR => Box::new(ChangeLogInterceptor),
        _ => return None,
    };
    Some(i)
}

pub fn default_interceptors() -> Vec<Box<dyn Interceptor>> {
    DEFAULT_INTERCEPTOR_ORDER
        .iter()
        .filter_map(|name| builtin(name))
        .collect()
}

/// Build stages from configured names. Unknown names are an error.
pub fn interceptors_from_names<S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<Box<dyn Interceptor>>, OperationError> {
    names
        .iter()
        .map(|name| {
            builtin(name.as_ref()).ok_or_else(|| {
                admin_error!(name = %name.as_ref(), "unknown interceptor");
                OperationError::UnwillingToPerform(format!(
                    "no interceptor named {}",
                    name.as_ref()
                ))
            })
        })
        .collect()
}

/// A stage of the chain. Every operation defaults to passing straight through to the next
/// stage, so a stage only implements what it cares about.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
        next.add(ctx)
    }

    fn delete(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<DeleteOp>) -> Result<(), OperationError> {
        next.delete(ctx)
    }

    fn modify(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ModifyOp>) -> Result<(), OperationError> {
        next.modify(ctx)
    }

    fn rename(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RenameOp>) -> Result<(), OperationError> {
        next.rename(ctx)
    }

    fn move_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<MoveOp>) -> Result<(), OperationError> {
        next.move_entry(ctx)
    }

    fn move_and_rename(
        &self,
        next: NextInterceptor<'_>,
        ctx: &mut OperationContext<MoveAndRenameOp>,
    ) -> Result<(), OperationError> {
        next.move_and_rename(ctx)
    }

    fn lookup(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
        next.lookup(ctx)
    }

    fn has_entry(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<HasEntryOp>) -> Result<bool, OperationError> {
        next.has_entry(ctx)
    }

    fn search(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<SearchOp>) -> Result<EntryCursor, OperationError> {
        next.search(ctx)
    }

    fn list(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<ListOp>) -> Result<EntryCursor, OperationError> {
        next.list(ctx)
    }

    fn compare(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<CompareOp>) -> Result<bool, OperationError> {
        next.compare(ctx)
    }

    fn bind(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<BindOp>) -> Result<(), OperationError> {
        next.bind(ctx)
    }

    fn unbind(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<UnbindOp>) -> Result<(), OperationError> {
        next.unbind(ctx)
    }

    fn root_dse(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<RootDseOp>) -> Result<Entry, OperationError> {
        next.root_dse(ctx)
    }

    /// Check the state this stage maintains is consistent.
    fn verify(&self, _service: &DirectoryService) -> Vec<OperationError> {
        Vec::new()
    }
}

/// The remainder of the chain after the current stage.
#[derive(Clone, Copy)]
pub struct NextInterceptor<'a> {
    chain: &'a InterceptorChain,
    position: usize,
}

macro_rules! next_stage {
    (
        $op:ident,
        $payload:ty,
        $ret:ty,
        |$nexus:ident, $ctx:ident| $terminal:expr
    ) => {
        pub fn $op(self, ctx: &mut OperationContext<$payload>) -> Result<$ret, OperationError> {
            match self.chain.next_stage(self.position, &ctx.bypass) {
                Some((idx, stage)) => {
                    trace!(interceptor = %stage.name(), operation = %ctx.id(), "entering");
                    stage.$op(
                        NextInterceptor {
                            chain: self.chain,
                            position: idx + 1,
                        },
                        ctx,
                    )
                }
                None => {
                    let $nexus: &dyn PartitionNexus = self.chain.nexus.as_ref();
                    let $ctx = ctx;
                    $terminal
                }
            }
        }
    };
}

impl<'a> NextInterceptor<'a> {
    next_stage!(add, AddOp, (), |nexus, ctx| nexus.add(ctx));
    next_stage!(delete, DeleteOp, (), |nexus, ctx| nexus.delete(ctx));
    next_stage!(modify, ModifyOp, (), |nexus, ctx| {
        ctx.op.altered = Some(nexus.modify(ctx)?);
        Ok(())
    });
    next_stage!(rename, RenameOp, (), |nexus, ctx| nexus.rename(ctx));
    next_stage!(move_entry, MoveOp, (), |nexus, ctx| nexus.move_entry(ctx));
    next_stage!(move_and_rename, MoveAndRenameOp, (), |nexus, ctx| nexus
        .move_and_rename(ctx));
    next_stage!(lookup, LookupOp, Entry, |nexus, ctx| nexus
        .lookup(ctx)?
        .ok_or_else(|| OperationError::NoSuchObject(ctx.dn.to_string())));
    next_stage!(has_entry, HasEntryOp, bool, |nexus, ctx| nexus.has_entry(ctx));
    next_stage!(search, SearchOp, EntryCursor, |nexus, ctx| nexus.search(ctx));
    next_stage!(list, ListOp, EntryCursor, |nexus, ctx| nexus.list(ctx));
    next_stage!(compare, CompareOp, bool, |nexus, ctx| nexus.compare(ctx));
    // Credentials are checked by a stage; the partition has nothing to do.
    next_stage!(bind, BindOp, (), |_nexus, _ctx| Ok(()));
    next_stage!(unbind, UnbindOp, (), |_nexus, _ctx| Ok(()));
    next_stage!(root_dse, RootDseOp, Entry, |nexus, ctx| nexus.root_dse(ctx));
}

pub struct InterceptorChain {
    stages: Vec<Box<dyn Interceptor>>,
    nexus: Arc<dyn PartitionNexus>,
}

impl InterceptorChain {
    /// Build the chain. A stage whose name was already seen is logged and dropped.
    pub fn new(interceptors: Vec<Box<dyn Interceptor>>, nexus: Arc<dyn PartitionNexus>) -> Self {
        let mut stages: Vec<Box<dyn Interceptor>> = Vec::with_capacity(interceptors.len());
        for i in interceptors {
            if stages.iter().any(|s| s.name() == i.name()) {
                admin_warn!(name = %i.name(), "duplicate interceptor name, ignoring the later one");
                continue;
            }
            stages.push(i);
        }
        admin_debug!(stages = ?stages.iter().map(|s| s.name()).collect::<Vec<_>>(), "interceptor chain");
        InterceptorChain { stages, nexus }
    }

    pub fn nexus(&self) -> &Arc<dyn PartitionNexus> {
        &self.nexus
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Interceptor> {
        self.stages
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn stages(&self) -> impl Iterator<Item = &dyn Interceptor> {
        self.stages.iter().map(|s| s.as_ref())
    }

    /// The head of the chain.
    pub fn start(&self) -> NextInterceptor<'_> {
        NextInterceptor {
            chain: self,
            position: 0,
        }
    }

    fn next_stage(&self, from: usize, bypass: &Bypass) -> Option<(usize, &dyn Interceptor)> {
        self.stages
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, s)| !bypass.skips(s.name()))
            .map(|(idx, s)| (idx, s.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{
        default_interceptors, Interceptor, InterceptorChain, NextInterceptor,
        DEFAULT_INTERCEPTOR_ORDER, NORMALIZATION_INTERCEPTOR,
    };
    use crate::partition::MemoryPartition;
    use crate::prelude::*;
    use crate::testkit::{setup_test, TestConfiguration};

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Interceptor for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn has_entry(
            &self,
            next: NextInterceptor<'_>,
            ctx: &mut OperationContext<HasEntryOp>,
        ) -> Result<bool, OperationError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(self.name.to_string());
            }
            next.has_entry(ctx)
        }
    }

    /// Issues a nested lookup of the parent from inside an add, recording the causation
    /// chain the nested lookup observes.
    #[derive(Default)]
    struct NestedLookup {
        seen: Arc<Mutex<Vec<(bool, OperationId, OperationId)>>>,
    }

    impl Interceptor for NestedLookup {
        fn name(&self) -> &str {
            "nestedLookup"
        }

        fn add(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<AddOp>) -> Result<(), OperationError> {
            if let Some(parent) = ctx.dn.parent() {
                ctx.try_lookup(parent, AttrSelection::default(), Bypass::none())?;
            }
            next.add(ctx)
        }

        fn lookup(&self, next: NextInterceptor<'_>, ctx: &mut OperationContext<LookupOp>) -> Result<Entry, OperationError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push((ctx.is_first_operation(), ctx.first_operation().id(), ctx.id()));
            }
            next.lookup(ctx)
        }
    }

    #[test]
    fn test_chain_default_order_and_duplicates() {
        sketching::test_init();
        let nexus = Arc::new(MemoryPartition::new(Vec::new()));
        let mut stages = default_interceptors();
        stages.extend(default_interceptors());
        let chain = InterceptorChain::new(stages, nexus);
        assert_eq!(chain.names(), DEFAULT_INTERCEPTOR_ORDER.to_vec());
        assert!(chain.get(NORMALIZATION_INTERCEPTOR).is_some());
        assert!(chain.get("nope").is_none());
    }

    #[test]
    fn test_chain_walk_honours_bypass() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stages: Vec<Box<dyn Interceptor>> = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                Box::new(Recorder {
                    name,
                    seen: seen.clone(),
                }) as Box<dyn Interceptor>
            })
            .collect();

        let config = TestConfiguration {
            interceptors: Some(stages),
            ..Default::default()
        };
        let server = setup_test(config);
        let session = server.admin_session();
        let dn = Dn::parse("dc=example,dc=com").expect("dn");

        let mut ctx = session.context(dn.clone(), HasEntryOp);
        assert_eq!(server.operation_manager().has_entry(&mut ctx), Ok(true));
        let mut ctx = session
            .context(dn, HasEntryOp)
            .with_bypass(Bypass::from_names(&["b"]));
        assert_eq!(server.operation_manager().has_entry(&mut ctx), Ok(true));

        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen, vec!["a", "b", "c", "a", "c"]);
        assert!(server.shutdown().is_ok());
    }

    #[test]
    fn test_nested_operation_causation() {
        let nested = NestedLookup::default();
        let seen = nested.seen.clone();
        let mut stages = default_interceptors();
        stages.insert(0, Box::new(nested));
        let config = TestConfiguration {
            interceptors: Some(stages),
            ..Default::default()
        };
        let server = setup_test(config);
        let session = server.admin_session();
        // Forget what startup did.
        if let Ok(mut s) = seen.lock() {
            s.clear();
        }

        let dn = Dn::parse("ou=widgets,dc=example,dc=com").expect("dn");
        let mut ctx = session.context(
            dn.clone(),
            AddOp {
                entry: entry_init!(
                    dn,
                    (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                    (Attribute::ObjectClass, EntryClass::OrganizationalUnit.as_ref()),
                    (Attribute::Ou, "widgets")
                ),
            },
        );
        assert!(ctx.is_first_operation());
        let add_id = ctx.id();
        assert!(server.operation_manager().add(&mut ctx).is_ok());

        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        // The nested lookup, which itself walks this stage again.
        assert!(!seen.is_empty());
        for (is_first, first, id) in seen {
            assert!(!is_first);
            assert_eq!(first, add_id);
            assert_ne!(id, add_id);
        }
        // Nothing is left on the session once the add completes.
        assert!(session.last_operation().is_none());
        assert!(server.shutdown().is_ok());
    }

    #[ds_test]
    fn test_bypass_normalization(server: &Arc<DirectoryService>) {
        let session = server.admin_session();
        let people = Dn::parse("ou=people,dc=example,dc=com").expect("dn");

        for (raw, bypass) in [
            ("cn=Ann   Smith,ou=people,dc=example,dc=com", Bypass::none()),
            (
                "cn=Bob   Jones,ou=people,dc=example,dc=com",
                Bypass::from_names(&[NORMALIZATION_INTERCEPTOR]),
            ),
        ] {
            let dn = Dn::parse(raw).expect("dn");
            let cn = dn.rdn().map(|r| r.ava().value.clone()).unwrap_or_default();
            let entry = entry_init!(
                dn.clone(),
                (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                (Attribute::ObjectClass, EntryClass::Person.as_ref()),
                (Attribute::Cn, cn.as_str()),
                (Attribute::Sn, "test")
            );
            let mut ctx = session.context(dn, AddOp { entry }).with_bypass(bypass);
            assert!(server.operation_manager().add(&mut ctx).is_ok());
        }

        let names: Vec<String> = session
            .list(&people)
            .expect("list")
            .into_iter()
            .map(|e| e.dn().to_string())
            .collect();
        // Normalised on the way in.
        assert!(names.contains(&"cn=ann smith,ou=people,dc=example,dc=com".to_string()));
        // Stored as given when the normalisation stage is skipped.
        assert!(names.contains(&"cn=Bob   Jones,ou=people,dc=example,dc=com".to_string()));
    }
}
