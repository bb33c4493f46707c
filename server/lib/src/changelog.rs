//! The change log. When enabled, every successful first level mutation is recorded as a
//! numbered event holding the change itself and the changes that undo it, so that the
//! directory can be wound back to any earlier revision.

use concread::cowcell::CowCell;

use crate::ldif::LdifEntry;
use crate::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeLogEvent {
    pub revision: u64,
    pub principal: Principal,
    /// Generalized time of the change.
    pub timestamp: String,
    pub forward: LdifEntry,
    /// Applied in order, these undo `forward`.
    pub reverse: Vec<LdifEntry>,
}

/// A named point in the log to revert to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub revision: u64,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ChangeLogStore {
    revision: u64,
    events: Vec<ChangeLogEvent>,
    tags: Vec<Tag>,
}

pub struct ChangeLog {
    enabled: bool,
    store: CowCell<ChangeLogStore>,
}

impl ChangeLog {
    pub fn new(enabled: bool) -> Self {
        ChangeLog {
            enabled,
            store: CowCell::new(ChangeLogStore::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check_enabled(&self) -> Result<(), OperationError> {
        if self.enabled {
            Ok(())
        } else {
            admin_warn!("change log operation requested but the change log is disabled");
            Err(OperationError::ChangeLogDisabled)
        }
    }

    pub fn current_revision(&self) -> u64 {
        self.store.read().revision
    }

    /// Record a change, returning its revision.
    pub fn log(
        &self,
        principal: &Principal,
        timestamp: String,
        forward: LdifEntry,
        reverse: Vec<LdifEntry>,
    ) -> Result<u64, OperationError> {
        self.check_enabled()?;
        let mut store = self.store.write();
        store.revision += 1;
        let revision = store.revision;
        trace!(revision, dn = %forward.dn(), "change logged");
        store.events.push(ChangeLogEvent {
            revision,
            principal: principal.clone(),
            timestamp,
            forward,
            reverse,
        });
        store.commit();
        Ok(revision)
    }

    /// Tag the current revision.
    pub fn tag(&self, description: Option<&str>) -> Result<Tag, OperationError> {
        self.check_enabled()?;
        let mut store = self.store.write();
        let tag = Tag {
            revision: store.revision,
            description: description.map(str::to_string),
        };
        store.tags.push(tag.clone());
        store.commit();
        admin_info!(revision = tag.revision, description = ?tag.description, "change log tagged");
        Ok(tag)
    }

    pub fn latest_tag(&self) -> Option<Tag> {
        self.store.read().tags.last().cloned()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.store.read().tags.clone()
    }

    pub fn event(&self, revision: u64) -> Option<ChangeLogEvent> {
        self.store
            .read()
            .events
            .iter()
            .find(|e| e.revision == revision)
            .cloned()
    }

    /// Events recorded after `revision`, oldest first.
    pub fn events_since(&self, revision: u64) -> Vec<ChangeLogEvent> {
        self.store
            .read()
            .events
            .iter()
            .filter(|e| e.revision > revision)
            .cloned()
            .collect()
    }

    /// The revision a revert should return to: `revision` if given, else the latest tag.
    /// It must be older than the current revision.
    pub fn revert_target(&self, revision: Option<u64>) -> Result<u64, OperationError> {
        self.check_enabled()?;
        let target = match revision {
            Some(r) => r,
            None => self.latest_tag().ok_or(OperationError::NoSuchTag)?.revision,
        };
        let current = self.current_revision();
        if target >= current {
            return Err(OperationError::InvalidRevision {
                requested: target,
                current,
            });
        }
        Ok(target)
    }

    /// Forget everything after `revision`, tags included.
    pub fn truncate(&self, revision: u64) -> Result<(), OperationError> {
        self.check_enabled()?;
        let mut store = self.store.write();
        store.events.retain(|e| e.revision <= revision);
        store.tags.retain(|t| t.revision <= revision);
        store.revision = revision;
        store.commit();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeLog;
    use crate::ldif::LdifEntry;
    use crate::prelude::*;

    fn change(n: &str) -> (LdifEntry, Vec<LdifEntry>) {
        let dn = Dn::parse(&format!("cn={},dc=example,dc=com", n)).expect("dn");
        (
            LdifEntry::Delete(dn.clone()),
            vec![LdifEntry::Add(Entry::new(dn))],
        )
    }

    #[test]
    fn test_changelog_disabled() {
        let log = ChangeLog::new(false);
        let (fwd, rev) = change("a");
        assert_eq!(
            log.log(&Principal::Admin, String::new(), fwd, rev),
            Err(OperationError::ChangeLogDisabled)
        );
        assert_eq!(log.tag(None), Err(OperationError::ChangeLogDisabled));
        assert_eq!(log.revert_target(Some(0)), Err(OperationError::ChangeLogDisabled));
    }

    #[test]
    fn test_changelog_revisions_and_tags() {
        let log = ChangeLog::new(true);
        assert_eq!(log.current_revision(), 0);
        assert_eq!(log.revert_target(None), Err(OperationError::NoSuchTag));

        let (fwd, rev) = change("a");
        assert_eq!(log.log(&Principal::Admin, String::new(), fwd, rev), Ok(1));
        let tag = log.tag(Some("before b")).expect("tag");
        assert_eq!(tag.revision, 1);
        for n in ["b", "c"] {
            let (fwd, rev) = change(n);
            assert!(log.log(&Principal::Admin, String::new(), fwd, rev).is_ok());
        }
        assert_eq!(log.current_revision(), 3);
        assert_eq!(
            log.events_since(1).iter().map(|e| e.revision).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(log.revert_target(None), Ok(1));
        assert_eq!(
            log.revert_target(Some(3)),
            Err(OperationError::InvalidRevision {
                requested: 3,
                current: 3
            })
        );

        assert!(log.truncate(0).is_ok());
        assert_eq!(log.current_revision(), 0);
        assert!(log.latest_tag().is_none());
        assert!(log.event(1).is_none());
    }
}
