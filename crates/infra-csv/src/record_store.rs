// CSV RecordStore Implementation

use crate::codec;
use async_trait::async_trait;
use jobwatch_core::domain::JobRecord;
use jobwatch_core::error::{AppError, Result};
use jobwatch_core::port::{RecordStore, TimeProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// One CSV file holding a full record collection.
///
/// File I/O runs on the blocking pool. There is no locking: callers must not
/// run two writers against the same path.
pub struct CsvRecordStore {
    path: PathBuf,
    time_provider: Arc<dyn TimeProvider>,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            path: path.into(),
            time_provider,
        }
    }
}

#[async_trait]
impl RecordStore for CsvRecordStore {
    async fn load(&self) -> Result<Vec<JobRecord>> {
        let path = self.path.clone();
        let now = self.time_provider.now();

        let records = tokio::task::spawn_blocking(move || codec::load(&path, now))
            .await
            .map_err(|e| AppError::Internal(format!("Store load task failed: {}", e)))??;

        debug!(path = %self.path.display(), records = records.len(), "Store loaded");
        Ok(records)
    }

    async fn save(&self, records: &[JobRecord]) -> Result<()> {
        let path = self.path.clone();
        let records = records.to_vec();

        tokio::task::spawn_blocking(move || codec::save(&path, &records))
            .await
            .map_err(|e| AppError::Internal(format!("Store save task failed: {}", e)))?
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
