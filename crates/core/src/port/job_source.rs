// Job Source Port
// One implementation per career site (or per external scraper process)

use crate::domain::JobFields;
use async_trait::async_trait;
use thiserror::Error;

/// Source errors. A failing source never stops the other sources of a cycle.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Source timed out after {0}ms")]
    Timeout(u64),

    #[error("Source exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Job source capability
///
/// Implementations:
/// - CommandSource: runs an external scraper and reads candidates from stdout
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Stable name, used as the default `sourceName` of its candidates
    fn name(&self) -> &str;

    /// Produce this cycle's candidates
    ///
    /// Any scoped resource (browser, child process) must be released before
    /// returning, on success and on error.
    async fn scrape(&self) -> Result<Vec<JobFields>, SourceError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a fixed batch on every call; the batch can be swapped between cycles
    pub struct StaticSource {
        name: String,
        batch: Mutex<Vec<JobFields>>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        pub fn new(name: impl Into<String>, batch: Vec<JobFields>) -> Self {
            Self {
                name: name.into(),
                batch: Mutex::new(batch),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn replace_batch(&self, batch: Vec<JobFields>) {
            *self.batch.lock().unwrap() = batch;
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobSource for StaticSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn scrape(&self) -> Result<Vec<JobFields>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.batch.lock().unwrap().clone())
        }
    }

    /// Always fails, like a site whose layout changed
    pub struct FailingSource {
        name: String,
        message: String,
    }

    impl FailingSource {
        pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                message: message.into(),
            }
        }
    }

    #[async_trait]
    impl JobSource for FailingSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn scrape(&self) -> Result<Vec<JobFields>, SourceError> {
            Err(SourceError::InvalidOutput(self.message.clone()))
        }
    }

    /// Sleeps before answering; used to hold a cycle open in scheduler tests
    pub struct SlowSource {
        name: String,
        delay: std::time::Duration,
        batch: Vec<JobFields>,
    }

    impl SlowSource {
        pub fn new(name: impl Into<String>, delay: std::time::Duration, batch: Vec<JobFields>) -> Self {
            Self {
                name: name.into(),
                delay,
                batch,
            }
        }
    }

    #[async_trait]
    impl JobSource for SlowSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn scrape(&self) -> Result<Vec<JobFields>, SourceError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.batch.clone())
        }
    }
}
