// Identity-keyed working set for one reconciliation

use crate::domain::{IdentityKey, JobRecord};
use std::collections::HashMap;

/// Records in first-insertion order plus a key index.
///
/// Insertion order is the tie-breaker when two records share a first-seen
/// timestamp, which keeps the persisted file stable across runs.
#[derive(Default)]
pub(crate) struct Ledger {
    records: Vec<JobRecord>,
    index: HashMap<IdentityKey, usize>,
}

impl Ledger {
    /// Build from stored records. Returns the ledger and how many stored rows
    /// collapsed into an earlier row with the same key (last one wins).
    pub(crate) fn from_stored(stored: Vec<JobRecord>) -> (Self, usize) {
        let mut ledger = Self::default();
        let mut collapsed = 0;

        for record in stored {
            let key = record.identity_key();
            if ledger.contains(&key) {
                collapsed += 1;
                ledger.replace(&key, record);
            } else {
                ledger.insert(key, record);
            }
        }

        (ledger, collapsed)
    }

    pub(crate) fn contains(&self, key: &IdentityKey) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn get(&self, key: &IdentityKey) -> Option<&JobRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub(crate) fn insert(&mut self, key: IdentityKey, record: JobRecord) {
        self.index.insert(key, self.records.len());
        self.records.push(record);
    }

    pub(crate) fn replace(&mut self, key: &IdentityKey, record: JobRecord) {
        if let Some(&i) = self.index.get(key) {
            self.records[i] = record;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Newest first by first-seen timestamp
    pub(crate) fn into_sorted(self) -> Vec<JobRecord> {
        let mut records = self.records;
        records.sort_by(|a, b| b.first_seen_at.cmp(&a.first_seen_at));
        records
    }
}
