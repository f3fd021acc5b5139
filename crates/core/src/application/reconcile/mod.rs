// Reconciliation Engine
//
// Merges one batch of candidates into the persisted store:
// load -> merge by identity -> save store -> save delta.

mod ledger;

#[cfg(test)]
mod reconcile_test;

use crate::domain::JobRecord;
use crate::error::Result;
use crate::port::{RecordStore, TimeProvider};
use ledger::Ledger;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What one reconciliation produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    /// Full store contents as persisted, newest first
    pub all_records: Vec<JobRecord>,
    /// Postings whose identity was not in the store before this batch
    pub new_records: Vec<JobRecord>,
    /// Candidates that refreshed an existing posting
    pub updated: usize,
    /// Candidates dropped for failing minimal validity
    pub dropped: usize,
}

/// Reconciliation service
///
/// Holds no lock of its own: callers must not run two reconciliations against
/// the same store at once (see `CycleScheduler`).
pub struct ReconcileService {
    store: Arc<dyn RecordStore>,
    delta: Arc<dyn RecordStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ReconcileService {
    /// # Arguments
    /// * `store` - Authoritative record store (full collection)
    /// * `delta` - Delta export, rewritten with only this run's new records
    /// * `time_provider` - Source of the merge timestamp
    pub fn new(
        store: Arc<dyn RecordStore>,
        delta: Arc<dyn RecordStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            delta,
            time_provider,
        }
    }

    /// Merge `candidates` into the store.
    ///
    /// Candidates are processed in input order. A candidate whose identity is
    /// already known replaces that entry with `JobRecord::merge_into`; any other
    /// valid candidate is inserted as-is and reported as new. Invalid candidates
    /// are dropped without error.
    ///
    /// # Errors
    /// - `AppError::Codec` if the current store cannot be loaded. Nothing is
    ///   written in that case, so a corrupt store is never replaced by a
    ///   falsely empty one.
    /// - `AppError::Persist` if the store or delta write fails.
    pub async fn reconcile(&self, candidates: Vec<JobRecord>) -> Result<ReconcileOutcome> {
        let stored = self.store.load().await?;
        let stored_count = stored.len();

        let (mut ledger, collapsed) = Ledger::from_stored(stored);
        if collapsed > 0 {
            warn!(
                store = %self.store.location(),
                collapsed,
                "Store contained duplicate identities; kept the last row of each"
            );
        }

        let now = self.time_provider.now();
        let mut new_keys = Vec::new();
        let mut updated = 0;
        let mut dropped = 0;

        for candidate in candidates {
            if !candidate.is_valid() {
                debug!(
                    title = %candidate.title,
                    company = %candidate.company,
                    source = %candidate.source_name,
                    "Dropping invalid candidate"
                );
                dropped += 1;
                continue;
            }

            let key = candidate.identity_key();
            match ledger.get(&key) {
                Some(existing) => {
                    let merged = JobRecord::merge_into(existing, &candidate, now);
                    ledger.replace(&key, merged);
                    updated += 1;
                }
                None => {
                    ledger.insert(key.clone(), candidate);
                    new_keys.push(key);
                }
            }
        }

        // Resolve new records from the final state so a posting seen twice in
        // one batch is reported once, with its latest content.
        let new_records: Vec<JobRecord> = new_keys
            .iter()
            .filter_map(|key| ledger.get(key).cloned())
            .collect();

        let all_records = ledger.into_sorted();

        self.store.save(&all_records).await?;
        self.delta.save(&new_records).await?;

        info!(
            store = %self.store.location(),
            stored = stored_count,
            total = all_records.len(),
            new = new_records.len(),
            updated,
            dropped,
            "Reconciliation complete"
        );

        Ok(ReconcileOutcome {
            all_records,
            new_records,
            updated,
            dropped,
        })
    }
}
