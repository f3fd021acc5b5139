// Notifier Port
// Delivery (chat message, file push) is up to the adapter

use crate::domain::JobRecord;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce postings discovered in this cycle (never called with an empty slice)
    async fn notify_new_jobs(&self, records: &[JobRecord]) -> Result<()>;

    /// Report a cycle that aborted before its delta was produced
    async fn notify_cycle_failed(&self, reason: &str) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Keeps everything it is asked to send
    #[derive(Default)]
    pub struct RecordingNotifier {
        batches: Mutex<Vec<Vec<JobRecord>>>,
        failures: Mutex<Vec<String>>,
        broken: AtomicBool,
    }

    impl RecordingNotifier {
        /// Every call fails after recording
        pub fn broken() -> Self {
            let notifier = Self::default();
            notifier.broken.store(true, Ordering::SeqCst);
            notifier
        }

        pub fn batches(&self) -> Vec<Vec<JobRecord>> {
            self.batches.lock().unwrap().clone()
        }

        pub fn failures(&self) -> Vec<String> {
            self.failures.lock().unwrap().clone()
        }

        fn outcome(&self) -> Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                Err(AppError::Notify("channel unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_new_jobs(&self, records: &[JobRecord]) -> Result<()> {
            self.batches.lock().unwrap().push(records.to_vec());
            self.outcome()
        }

        async fn notify_cycle_failed(&self, reason: &str) -> Result<()> {
            self.failures.lock().unwrap().push(reason.to_string());
            self.outcome()
        }
    }
}
