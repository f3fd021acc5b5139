// Record Store Port (Interface)

use crate::domain::JobRecord;
use crate::error::Result;
use async_trait::async_trait;

/// Durable home of the full record collection.
///
/// Every `save` is a full rewrite; there is no append or partial write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load every record in stored order.
    ///
    /// An absent store is an empty collection, not an error.
    /// A store that exists but cannot be parsed fails with `AppError::Codec`.
    async fn load(&self) -> Result<Vec<JobRecord>>;

    /// Replace the stored collection with `records`
    ///
    /// # Errors
    /// - `AppError::Persist` when the write cannot complete
    async fn save(&self, records: &[JobRecord]) -> Result<()>;

    /// Human-readable location (path) for logs
    fn location(&self) -> String;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store. `None` contents model a store file that does not exist.
    pub struct InMemoryRecordStore {
        name: String,
        records: Mutex<Option<Vec<JobRecord>>>,
        load_failure: Mutex<Option<String>>,
        save_failure: Mutex<Option<String>>,
        save_count: AtomicUsize,
    }

    impl InMemoryRecordStore {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                records: Mutex::new(None),
                load_failure: Mutex::new(None),
                save_failure: Mutex::new(None),
                save_count: AtomicUsize::new(0),
            }
        }

        pub fn with_records(name: impl Into<String>, records: Vec<JobRecord>) -> Self {
            let store = Self::new(name);
            *store.records.lock().unwrap() = Some(records);
            store
        }

        /// Make the next loads fail as if the file were corrupt
        pub fn fail_loads(&self, message: impl Into<String>) {
            *self.load_failure.lock().unwrap() = Some(message.into());
        }

        /// Make the next saves fail as if the disk were full
        pub fn fail_saves(&self, message: impl Into<String>) {
            *self.save_failure.lock().unwrap() = Some(message.into());
        }

        pub fn snapshot(&self) -> Option<Vec<JobRecord>> {
            self.records.lock().unwrap().clone()
        }

        pub fn save_count(&self) -> usize {
            self.save_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordStore for InMemoryRecordStore {
        async fn load(&self) -> Result<Vec<JobRecord>> {
            if let Some(msg) = self.load_failure.lock().unwrap().clone() {
                return Err(AppError::Codec(msg));
            }
            Ok(self.records.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, records: &[JobRecord]) -> Result<()> {
            if let Some(msg) = self.save_failure.lock().unwrap().clone() {
                return Err(AppError::Persist(msg));
            }
            *self.records.lock().unwrap() = Some(records.to_vec());
            self.save_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn location(&self) -> String {
            format!("memory://{}", self.name)
        }
    }
}
