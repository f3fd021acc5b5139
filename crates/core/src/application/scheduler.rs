//! Cycle Scheduler - recurring trigger with overlap protection
//!
//! - At most one cycle runs at a time; a trigger that arrives while a cycle
//!   is running is skipped (`AppError::Busy`)
//! - A started cycle always runs to completion: it executes on its own task,
//!   so dropping the caller (RPC client gone, shutdown) cannot abort a save
//! - Shutdown is observed only between cycles

use crate::application::cycle::{CycleReport, ScrapeCycle};
use crate::application::shutdown::ShutdownToken;
use crate::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

pub struct CycleScheduler {
    cycle: Arc<ScrapeCycle>,
    period: Duration,
    run_on_start: bool,
    running: Arc<Mutex<()>>,
    last_report: RwLock<Option<CycleReport>>,
}

impl CycleScheduler {
    /// # Arguments
    /// * `cycle` - The cycle to run
    /// * `period` - Spacing between scheduled cycles
    /// * `run_on_start` - Run one cycle immediately instead of waiting a full period
    pub fn new(cycle: Arc<ScrapeCycle>, period: Duration, run_on_start: bool) -> Self {
        Self {
            cycle,
            period,
            run_on_start,
            running: Arc::new(Mutex::new(())),
            last_report: RwLock::new(None),
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.cycle.source_names()
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Resolves once no cycle is running
    pub async fn wait_idle(&self) {
        let _guard = self.running.lock().await;
    }

    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }

    /// Run one cycle now.
    ///
    /// # Errors
    /// - `AppError::Busy` if a cycle is already running
    /// - Any error of the cycle itself
    pub async fn trigger(self: &Arc<Self>) -> Result<CycleReport> {
        let permit = Arc::clone(&self.running)
            .try_lock_owned()
            .map_err(|_| AppError::Busy("a scrape cycle is already running".to_string()))?;

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let result = this.cycle.run().await;
            if let Ok(report) = &result {
                *this.last_report.write().await = Some(report.clone());
            }
            result
        });

        handle
            .await
            .map_err(|e| AppError::Internal(format!("Cycle task failed: {}", e)))?
    }

    /// Scheduler loop (background task)
    ///
    /// Should be spawned in tokio::spawn
    pub async fn run(self: Arc<Self>, mut shutdown: ShutdownToken) {
        info!(
            period_secs = self.period.as_secs(),
            run_on_start = self.run_on_start,
            sources = ?self.cycle.source_names(),
            "Cycle scheduler started"
        );

        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if !self.run_on_start {
            // The first tick completes immediately
            tick.tick().await;
        }

        loop {
            tokio::select! {
                _ = tick.tick() => {},
                _ = shutdown.wait() => break,
            }
            if shutdown.is_shutdown() {
                break;
            }

            match self.trigger().await {
                Ok(report) => info!(
                    cycle_id = %report.cycle_id,
                    new = report.new_records.len(),
                    total = report.total_records,
                    "Scheduled cycle finished"
                ),
                Err(AppError::Busy(_)) => {
                    warn!("Previous cycle still running, skipping this slot")
                }
                Err(e) => error!(error = %e, "Scheduled cycle failed"),
            }
        }

        info!("Cycle scheduler stopped");
    }
}
