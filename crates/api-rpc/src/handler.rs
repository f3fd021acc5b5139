//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{CycleSummary, GetJobRequest, HealthResponse};
use jobwatch_core::application::{
    CycleScheduler, JobEntry, JobPage, JobQuery, QueryService, StoreStats,
};
use jobwatch_core::domain::IdentityKey;
use jobwatch_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    query: QueryService,
    scheduler: Arc<CycleScheduler>,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(query: QueryService, scheduler: Arc<CycleScheduler>) -> Self {
        Self {
            query,
            scheduler,
            start_time: std::time::Instant::now(),
        }
    }

    /// jobs.list.v1
    pub async fn list_jobs(&self, query: JobQuery) -> Result<JobPage, ErrorObjectOwned> {
        self.query.list(&query).await.map_err(to_rpc_error)
    }

    /// jobs.get.v1
    pub async fn get_job(&self, params: GetJobRequest) -> Result<JobEntry, ErrorObjectOwned> {
        let key = IdentityKey::new(params.identity_key);
        if key.as_str().is_empty() {
            return Err(to_rpc_error(AppError::Validation(
                "identity_key must not be empty".to_string(),
            )));
        }

        self.query
            .find(&key)
            .await
            .map_err(to_rpc_error)?
            .map(JobEntry::from)
            .ok_or_else(|| to_rpc_error(AppError::NotFound(format!("Job {} not found", key))))
    }

    /// jobs.stats.v1
    pub async fn stats(&self) -> Result<StoreStats, ErrorObjectOwned> {
        self.query.stats().await.map_err(to_rpc_error)
    }

    /// cycle.run.v1
    pub async fn run_cycle(&self) -> Result<CycleSummary, ErrorObjectOwned> {
        info!("Manual cycle requested over RPC");
        let report = self.scheduler.trigger().await.map_err(to_rpc_error)?;
        Ok(CycleSummary::from(&report))
    }

    /// cycle.last.v1
    pub async fn last_cycle(&self) -> Result<Option<CycleSummary>, ErrorObjectOwned> {
        Ok(self
            .scheduler
            .last_report()
            .await
            .as_ref()
            .map(CycleSummary::from))
    }

    /// admin.health.v1
    pub async fn health(&self) -> Result<HealthResponse, ErrorObjectOwned> {
        Ok(HealthResponse {
            version: jobwatch_core::VERSION.to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            cycle_running: self.scheduler.is_running(),
            sources: self.scheduler.source_names(),
        })
    }
}
