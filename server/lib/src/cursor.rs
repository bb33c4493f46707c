//! Search results. An [`EntryCursor`] yields the entries a search or list produced. It can
//! be abandoned from another thread through an [`AbandonHandle`], after which the next read
//! reports [`OperationError::Abandoned`] rather than ending as if the results were exhausted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::prelude::*;

#[derive(Clone, Debug, Default)]
pub struct AbandonHandle {
    abandoned: Arc<AtomicBool>,
}

impl AbandonHandle {
    pub fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default)]
pub struct EntryCursor {
    entries: VecDeque<Entry>,
    handle: AbandonHandle,
    reported: bool,
}

impl EntryCursor {
    pub fn new(entries: Vec<Entry>) -> Self {
        EntryCursor {
            entries: entries.into(),
            handle: AbandonHandle::default(),
            reported: false,
        }
    }

    pub fn abandon_handle(&self) -> AbandonHandle {
        self.handle.clone()
    }

    /// Entries not yet read.
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    pub fn retain<F: FnMut(&Entry) -> bool>(mut self, f: F) -> Self {
        self.entries.retain(f);
        self
    }

    pub fn map_entries<F: FnMut(Entry) -> Entry>(self, f: F) -> Self {
        EntryCursor {
            entries: self.entries.into_iter().map(f).collect(),
            handle: self.handle,
            reported: self.reported,
        }
    }

    /// Fallibly rewrite every entry, stopping at the first error.
    pub fn try_map_entries<F: FnMut(Entry) -> Result<Entry, OperationError>>(
        self,
        f: F,
    ) -> Result<Self, OperationError> {
        let entries = self
            .entries
            .into_iter()
            .map(f)
            .collect::<Result<VecDeque<_>, _>>()?;
        Ok(EntryCursor {
            entries,
            handle: self.handle,
            reported: self.reported,
        })
    }

    /// Drain the cursor. Fails if it was abandoned.
    pub fn collect_entries(self) -> Result<Vec<Entry>, OperationError> {
        self.collect()
    }
}

impl Iterator for EntryCursor {
    type Item = Result<Entry, OperationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.handle.is_abandoned() {
            // Report once, then end.
            self.entries.clear();
            if self.reported {
                return None;
            }
            self.reported = true;
            return Some(Err(OperationError::Abandoned));
        }
        self.entries.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::EntryCursor;
    use crate::prelude::*;

    fn entries() -> Vec<Entry> {
        ["cn=a,dc=com", "cn=b,dc=com", "cn=c,dc=com"]
            .iter()
            .map(|d| Entry::new(Dn::parse(d).expect("dn")))
            .collect()
    }

    #[test]
    fn test_cursor_collect() {
        let cursor = EntryCursor::new(entries())
            .retain(|e| e.dn().norm_string() != "cn=b,dc=com");
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.collect_entries().map(|v| v.len()), Ok(2));
    }

    #[test]
    fn test_cursor_abandon() {
        let mut cursor = EntryCursor::new(entries());
        let handle = cursor.abandon_handle();
        assert!(matches!(cursor.next(), Some(Ok(_))));
        handle.abandon();
        assert_eq!(cursor.next(), Some(Err(OperationError::Abandoned)));
        assert_eq!(cursor.next(), None);
    }
}
