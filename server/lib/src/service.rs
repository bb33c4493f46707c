//! The directory service ties the pieces together: the partition holding the entries, the
//! schema registries, the subentry cache, the change log and the operation manager driving
//! the interceptor chain. It also owns the service lifecycle, from creating the base entries
//! and reloading stored state at startup to the final flush at shutdown.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::changelog::ChangeLog;
use crate::interceptor::{default_interceptors, Interceptor, InterceptorChain, CHANGELOG_INTERCEPTOR};
use crate::ldif::LdifEntry;
use crate::operation::OperationManager;
use crate::partition::PartitionNexus;
use crate::prelude::*;
use crate::schema::{factory, synchronizers, SchemaManager};
use crate::subentry::{Subentry, SubentryCache, SubentryCacheTransaction};

pub struct DirectoryServiceConfig {
    /// The naming contexts users may write to.
    pub suffixes: Vec<Dn>,
    pub changelog: bool,
    /// Seeded into the administrator entry when it's first created.
    pub admin_password: Option<String>,
    pub allow_anonymous_access: bool,
    /// The stages of the chain, in order. Taken by [`DirectoryService::new`].
    pub interceptors: Vec<Box<dyn Interceptor>>,
}

impl Default for DirectoryServiceConfig {
    fn default() -> Self {
        DirectoryServiceConfig {
            suffixes: Vec::new(),
            changelog: false,
            admin_password: None,
            allow_anonymous_access: true,
            interceptors: default_interceptors(),
        }
    }
}

impl fmt::Debug for DirectoryServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryServiceConfig")
            .field("suffixes", &self.suffixes)
            .field("changelog", &self.changelog)
            .field("allow_anonymous_access", &self.allow_anonymous_access)
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DirectoryServiceConfig {
    /// Every naming context the partition must hold: the configured suffixes, followed by
    /// the system and schema areas.
    pub fn partition_suffixes(&self) -> Result<Vec<Dn>, OperationError> {
        let mut suffixes = self.suffixes.clone();
        for system in [SYSTEM_DN, SCHEMA_DN] {
            let dn = Dn::parse(system)?;
            if !suffixes.contains(&dn) {
                suffixes.push(dn);
            }
        }
        Ok(suffixes)
    }
}

pub struct DirectoryService {
    config: DirectoryServiceConfig,
    nexus: Arc<dyn PartitionNexus>,
    schema: SchemaManager,
    subentries: SubentryCache,
    changelog: ChangeLog,
    operation_manager: OperationManager,
    started: AtomicBool,
}

/// The structural class for a naming context entry, chosen by its naming attribute.
fn suffix_entry(dn: &Dn) -> Result<Entry, OperationError> {
    let rdn = dn
        .rdn()
        .ok_or_else(|| OperationError::NamingViolation("a suffix can't be the root".to_string()))?;
    let class = match &rdn.ava().attr {
        Attribute::Dc => EntryClass::Domain,
        Attribute::Ou => EntryClass::OrganizationalUnit,
        Attribute::Custom(name) if name.as_str() == "o" => EntryClass::Organization,
        _ => EntryClass::ExtensibleObject,
    };
    let mut entry = entry_init!(
        dn.clone(),
        (Attribute::ObjectClass, EntryClass::Top.as_ref()),
        (Attribute::ObjectClass, class.as_ref())
    );
    for ava in rdn.avas() {
        entry.add_ava(ava.attr.clone(), ava.value.clone());
    }
    Ok(entry)
}

fn admin_entry(password: &str) -> Result<Entry, OperationError> {
    Ok(entry_init!(
        Dn::parse(ADMIN_DN)?,
        (Attribute::ObjectClass, EntryClass::Top.as_ref()),
        (Attribute::ObjectClass, EntryClass::Person.as_ref()),
        (Attribute::ObjectClass, EntryClass::OrganizationalPerson.as_ref()),
        (Attribute::ObjectClass, EntryClass::InetOrgPerson.as_ref()),
        (Attribute::Uid, "admin"),
        (Attribute::Cn, "system administrator"),
        (Attribute::Sn, "administrator"),
        (Attribute::from_str("displayName"), "Directory Superuser"),
        (Attribute::UserPassword, password)
    ))
}

/// Schema definitions first, then elements in the order their kinds depend on each other.
fn reload_rank(entry: &Entry) -> usize {
    if factory::is_schema_entry(entry) {
        0
    } else {
        factory::kind_of(entry)
            .map(|k| k as usize + 1)
            .unwrap_or(usize::MAX)
    }
}

impl DirectoryService {
    /// Build a stopped service over `nexus`. Call [`startup`](Self::startup) before use.
    pub fn new(
        mut config: DirectoryServiceConfig,
        nexus: Arc<dyn PartitionNexus>,
    ) -> Result<Arc<Self>, OperationError> {
        let held = nexus.suffixes();
        if let Some(missing) = config
            .partition_suffixes()?
            .into_iter()
            .find(|s| !held.contains(s))
        {
            admin_error!(suffix = %missing, "partition does not hold a required naming context");
            return Err(OperationError::NoSuchObject(missing.to_string()));
        }

        let schema = SchemaManager::bootstrap()?;
        let interceptors = std::mem::take(&mut config.interceptors);
        let chain = InterceptorChain::new(interceptors, nexus.clone());
        admin_info!(
            suffixes = ?config.suffixes.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            changelog = config.changelog,
            "directory service created"
        );
        Ok(Arc::new(DirectoryService {
            changelog: ChangeLog::new(config.changelog),
            config,
            nexus,
            schema,
            subentries: SubentryCache::new(),
            operation_manager: OperationManager::new(chain),
            started: AtomicBool::new(false),
        }))
    }

    pub fn config(&self) -> &DirectoryServiceConfig {
        &self.config
    }

    pub fn nexus(&self) -> &Arc<dyn PartitionNexus> {
        &self.nexus
    }

    pub fn schema(&self) -> &SchemaManager {
        &self.schema
    }

    pub fn subentries(&self) -> &SubentryCache {
        &self.subentries
    }

    pub fn changelog(&self) -> &ChangeLog {
        &self.changelog
    }

    pub fn operation_manager(&self) -> &OperationManager {
        &self.operation_manager
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn admin_session(self: &Arc<Self>) -> CoreSession {
        CoreSession::new(self.clone(), Principal::Admin)
    }

    pub fn anonymous_session(self: &Arc<Self>) -> CoreSession {
        CoreSession::new(self.clone(), Principal::Anonymous)
    }

    /// Bring the service up: create the naming context entries and the administrator that
    /// are missing, then reload the meta-schema and the subentry cache from what the
    /// partition already holds. Starting a started service does nothing.
    #[instrument(level = "debug", name = "service::startup", skip_all)]
    pub fn startup(self: &Arc<Self>) -> Result<(), OperationError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let res = self
            .create_base_entries()
            .and_then(|_| self.reload_schema())
            .and_then(|_| self.reload_subentries());
        if let Err(e) = &res {
            admin_error!(err = ?e, "directory service failed to start");
            self.started.store(false, Ordering::Release);
        } else {
            admin_info!("directory service started");
        }
        res
    }

    fn create_base_entries(self: &Arc<Self>) -> Result<(), OperationError> {
        let admin = self.admin_session();
        let bypass = Bypass::from_names(&[CHANGELOG_INTERCEPTOR]);
        let mut suffixes = self.nexus.suffixes();
        suffixes.sort_by_key(|s| s.size());

        let mut wanted = Vec::with_capacity(suffixes.len() + 1);
        for suffix in suffixes.iter() {
            wanted.push(suffix_entry(suffix)?);
        }
        let password = self
            .config
            .admin_password
            .as_deref()
            .unwrap_or(DEFAULT_ADMIN_PASSWORD);
        wanted.push(admin_entry(password)?);

        for entry in wanted {
            if self.nexus.fetch(entry.dn())?.is_some() {
                continue;
            }
            admin_info!(dn = %entry.dn(), "creating base entry");
            let mut ctx = admin
                .context(entry.dn().clone(), AddOp { entry })
                .with_bypass(bypass.clone());
            self.operation_manager.add(&mut ctx)?;
        }
        Ok(())
    }

    /// Entries in a subtree as stored, with no stage in between.
    fn stored_subtree(self: &Arc<Self>, base: &Dn, filter: Filter) -> Result<Vec<Entry>, OperationError> {
        if self.nexus.fetch(base)?.is_none() {
            return Ok(Vec::new());
        }
        let ctx = self.admin_session().context(
            base.clone(),
            SearchOp {
                scope: Scope::Subtree,
                filter,
                attrs: AttrSelection::all(),
            },
        );
        self.nexus.search(&ctx)?.collect_entries()
    }

    /// Replay the stored meta-schema entries on the registries. An entry whose
    /// dependencies aren't loaded yet is retried once the rest have been applied.
    fn reload_schema(self: &Arc<Self>) -> Result<(), OperationError> {
        let schema_dn = Dn::parse(SCHEMA_DN)?;
        let mut pending: Vec<Entry> = self
            .stored_subtree(&schema_dn, f_pres(Attribute::ObjectClass))?
            .into_iter()
            .filter(|e| e.dn() != &schema_dn)
            .collect();
        pending.sort_by_key(|e| (reload_rank(e), e.dn().size()));

        let mut txn = self.schema.write();
        let mut loaded = 0;
        loop {
            let before = pending.len();
            let mut failed = Vec::new();
            for entry in pending {
                match synchronizers::add(&mut txn, &entry) {
                    Ok(synchronizers::SchemaChange::Modified) => loaded += 1,
                    Ok(synchronizers::SchemaChange::Unchanged) => {}
                    Err(e) => failed.push((entry, e)),
                }
            }
            if failed.is_empty() || failed.len() == before {
                for (entry, err) in failed {
                    schema_error!(dn = %entry.dn(), ?err, "stored meta-schema entry could not be loaded");
                    txn.record_error(match err {
                        OperationError::SchemaViolation(se) => se,
                        other => SchemaError::InvalidSchemaEntry(format!("{}: {}", entry.dn(), other)),
                    });
                }
                break;
            }
            pending = failed.into_iter().map(|(e, _)| e).collect();
        }
        txn.commit()?;
        schema_info!(loaded, "meta-schema reloaded");
        Ok(())
    }

    /// Rebuild the subentry cache from every subentry stored in the partition.
    fn reload_subentries(self: &Arc<Self>) -> Result<(), OperationError> {
        let mut cw = self.subentries.write();
        cw.clear();
        for suffix in self.nexus.suffixes() {
            let found = self.stored_subtree(
                &suffix,
                f_eq(Attribute::ObjectClass, EntryClass::Subentry.as_ref()),
            )?;
            for entry in found {
                match Subentry::from_entry(&entry) {
                    Ok(subentry) => {
                        cw.insert(subentry);
                    }
                    Err(err) => {
                        admin_error!(dn = %entry.dn(), ?err, "stored subentry could not be cached");
                    }
                }
            }
        }
        admin_info!(count = cw.len(), "subentry cache rebuilt");
        cw.commit();
        Ok(())
    }

    /// Tag the current change log revision.
    pub fn tag(&self, description: Option<&str>) -> Result<crate::changelog::Tag, OperationError> {
        self.changelog.tag(description)
    }

    /// Undo every change made after `revision`, or after the latest tag when no revision
    /// is given. The undone changes are dropped from the log, and the revision reverted
    /// to becomes the current one.
    #[instrument(level = "debug", name = "service::revert", skip_all)]
    pub fn revert(self: &Arc<Self>, revision: Option<u64>) -> Result<u64, OperationError> {
        let target = self.changelog.revert_target(revision)?;
        let admin = self.admin_session();
        let bypass = Bypass::from_names(&[CHANGELOG_INTERCEPTOR]);

        let mut events = self.changelog.events_since(target);
        events.reverse();
        for event in events {
            admin_info!(revision = event.revision, dn = %event.forward.dn(), "reverting change");
            for ldif in event.reverse {
                self.apply(&admin, ldif, &bypass)?;
            }
        }
        self.changelog.truncate(target)?;
        admin_info!(revision = target, "directory reverted");
        Ok(target)
    }

    fn apply(&self, session: &CoreSession, ldif: LdifEntry, bypass: &Bypass) -> Result<(), OperationError> {
        let om = &self.operation_manager;
        match ldif {
            LdifEntry::Add(entry) => {
                let mut ctx = session
                    .context(entry.dn().clone(), AddOp { entry })
                    .with_bypass(bypass.clone());
                om.add(&mut ctx)
            }
            LdifEntry::Delete(dn) => {
                let mut ctx = session.context(dn, DeleteOp).with_bypass(bypass.clone());
                om.delete(&mut ctx)
            }
            LdifEntry::Modify { dn, mods } => {
                let mut ctx = session
                    .context(dn, ModifyOp { mods, altered: None })
                    .with_bypass(bypass.clone());
                om.modify(&mut ctx)
            }
            LdifEntry::ModDn {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior: Some(new_superior),
            } => {
                let mut ctx = session
                    .context(
                        dn,
                        MoveAndRenameOp {
                            new_superior,
                            new_rdn,
                            delete_old_rdn,
                        },
                    )
                    .with_bypass(bypass.clone());
                om.move_and_rename(&mut ctx)
            }
            LdifEntry::ModDn {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior: None,
            } => {
                let mut ctx = session
                    .context(
                        dn,
                        RenameOp {
                            new_rdn,
                            delete_old_rdn,
                        },
                    )
                    .with_bypass(bypass.clone());
                om.rename(&mut ctx)
            }
        }
    }

    /// Flush the partition.
    pub fn sync(&self) -> Result<(), OperationError> {
        let res = self.nexus.sync();
        perf_trace!(ok = res.is_ok(), "partition flushed");
        res
    }

    /// Flush and stop. Operations issued afterwards are refused.
    #[instrument(level = "debug", name = "service::shutdown", skip_all)]
    pub fn shutdown(&self) -> Result<(), OperationError> {
        if !self.started.load(Ordering::Acquire) {
            return Ok(());
        }
        self.sync()?;
        self.started.store(false, Ordering::Release);
        admin_info!("directory service stopped");
        Ok(())
    }

    /// Consistency checks of every stage. Empty when all is well.
    pub fn verify(&self) -> Vec<OperationError> {
        self.operation_manager
            .chain()
            .stages()
            .flat_map(|stage| stage.verify(self))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectoryService, DirectoryServiceConfig};
    use crate::partition::{MemoryPartition, PartitionNexus};
    use crate::prelude::*;
    use crate::schema::SchemaTransaction;
    use crate::subentry::SubentryCacheTransaction;

    fn person(cn: &str) -> Entry {
        entry_init!(
            Dn::parse(&format!("cn={},ou=people,dc=example,dc=com", cn)).expect("dn"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, cn),
            (Attribute::Sn, "tester")
        )
    }

    #[ds_test]
    fn test_startup_with_bootstrap_schema(server: &Arc<DirectoryService>) {
        assert!(server.is_started());
        assert!(server.schema().read().validate().is_empty());
        // The system schema's subentry class needs cn from core.
        assert!(server.schema().read().lookup_object_class("subentry").is_some());

        let admin = server.admin_session();
        assert_eq!(admin.has_entry(&Dn::parse(ADMIN_DN).expect("dn")), Ok(true));
        assert_eq!(
            admin.has_entry(&Dn::parse("ou=people,dc=example,dc=com").expect("dn")),
            Ok(true)
        );
        assert!(admin.add(person("lena")).is_ok());
    }

    #[ds_test(changelog = true)]
    fn test_revert_to_tag(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        let groups = Dn::parse("ou=groups,dc=example,dc=com").expect("dn");
        let hugo = Dn::parse("cn=hugo,ou=people,dc=example,dc=com").expect("dn");

        assert!(admin.add(person("hugo")).is_ok());
        let tag = server.tag(Some("baseline")).expect("tag");

        assert!(admin
            .modify(&hugo, ModifyList::new_append(Attribute::Description, "changed"))
            .is_ok());
        assert!(admin.rename(&hugo, Rdn::new(Attribute::Cn, "hugh"), true).is_ok());
        assert!(admin.delete(&groups).is_ok());
        assert!(admin.add(person("ida")).is_ok());

        assert_eq!(server.revert(None), Ok(tag.revision));
        assert_eq!(server.changelog().current_revision(), tag.revision);

        let e = admin.lookup(&hugo, AttrSelection::all()).expect("lookup");
        assert!(!e.attribute_pres(&Attribute::Description));
        assert!(!e.attribute_equality(&Attribute::Cn, "hugh"));
        assert_eq!(admin.has_entry(&groups), Ok(true));
        let ida = Dn::parse("cn=ida,ou=people,dc=example,dc=com").expect("dn");
        assert_eq!(admin.has_entry(&ida), Ok(false));

        // Nothing left to revert to.
        assert_eq!(
            server.revert(Some(tag.revision)),
            Err(OperationError::InvalidRevision {
                requested: tag.revision,
                current: tag.revision
            })
        );
        // The reverts themselves aren't logged.
        assert!(server.changelog().events_since(tag.revision).is_empty());
    }

    #[ds_test(changelog = true)]
    fn test_revert_to_revision(server: &Arc<DirectoryService>) {
        let admin = server.admin_session();
        assert_eq!(server.revert(None), Err(OperationError::NoSuchTag));

        let start = server.changelog().current_revision();
        assert!(admin.add(person("jack")).is_ok());
        let after_jack = server.changelog().current_revision();
        assert!(admin.add(person("kate")).is_ok());

        assert_eq!(server.revert(Some(after_jack)), Ok(after_jack));
        let kate = Dn::parse("cn=kate,ou=people,dc=example,dc=com").expect("dn");
        let jack = Dn::parse("cn=jack,ou=people,dc=example,dc=com").expect("dn");
        assert_eq!(admin.has_entry(&kate), Ok(false));
        assert_eq!(admin.has_entry(&jack), Ok(true));

        assert_eq!(server.revert(Some(start)), Ok(start));
        assert_eq!(admin.has_entry(&jack), Ok(false));
    }

    #[test]
    fn test_cold_start_reloads_state() {
        sketching::test_init();
        let config = || DirectoryServiceConfig {
            suffixes: vec![Dn::parse("dc=example,dc=com").expect("dn")],
            ..Default::default()
        };
        let partition = Arc::new(MemoryPartition::new(
            config().partition_suffixes().expect("suffixes"),
        ));

        let first = DirectoryService::new(config(), partition.clone()).expect("service");
        assert!(first.admin_session().has_entry(&Dn::root()).is_err());
        assert!(first.startup().is_ok());
        let admin = first.admin_session();
        let base = Dn::parse("dc=example,dc=com").expect("dn");
        assert!(admin
            .modify(
                &base,
                ModifyList::new_append(Attribute::AdministrativeRole, "collectiveAttributeSpecificArea")
            )
            .is_ok());
        assert!(admin
            .add(entry_init!(
                Dn::parse("cn=everyone,dc=example,dc=com").expect("dn"),
                (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                (Attribute::ObjectClass, EntryClass::Subentry.as_ref()),
                (Attribute::ObjectClass, EntryClass::CollectiveAttributeSubentry.as_ref()),
                (Attribute::Cn, "everyone"),
                (Attribute::SubtreeSpecification, "{}")
            ))
            .is_ok());
        assert!(admin
            .add(entry_init!(
                Dn::parse("cn=other,ou=schema").expect("dn"),
                (Attribute::ObjectClass, EntryClass::Top.as_ref()),
                (Attribute::ObjectClass, EntryClass::MetaSchema.as_ref()),
                (Attribute::Cn, "other"),
                (Attribute::MDependencies, SCHEMA_NAME_CORE)
            ))
            .is_ok());
        assert!(first.shutdown().is_ok());
        assert!(partition.sync_count() > 0);
        // Stopped services refuse work.
        assert!(matches!(
            admin.has_entry(&base),
            Err(OperationError::UnwillingToPerform(_))
        ));

        let entries = partition.len();
        let second = DirectoryService::new(config(), partition.clone()).expect("service");
        assert!(second.startup().is_ok());
        // The base entries are only created once.
        assert_eq!(partition.len(), entries);
        assert_eq!(second.subentries().read().len(), 1);
        assert!(second.schema().read().loaded_schema("other").is_some());
        assert!(second.verify().is_empty());
        assert!(second.shutdown().is_ok());
    }

    #[test]
    fn test_missing_naming_context() {
        sketching::test_init();
        let config = DirectoryServiceConfig {
            suffixes: vec![Dn::parse("dc=example,dc=com").expect("dn")],
            ..Default::default()
        };
        let partition: Arc<dyn PartitionNexus> =
            Arc::new(MemoryPartition::new(vec![Dn::parse("dc=example,dc=com").expect("dn")]));
        assert!(matches!(
            DirectoryService::new(config, partition),
            Err(OperationError::NoSuchObject(_))
        ));
    }
}
