// Scrape Cycle - one full run of scrape -> reconcile -> notify

use crate::application::reconcile::ReconcileService;
use crate::domain::{JobFields, JobRecord};
use crate::error::Result;
use crate::port::{IdProvider, JobSource, Notifier, TimeProvider};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of one source within a cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: String,
    pub candidates: usize,
    pub duration_ms: i64,
    pub error: Option<String>,
}

/// Summary of a completed cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub candidates: usize,
    pub dropped: usize,
    pub updated: usize,
    pub total_records: usize,
    pub new_records: Vec<JobRecord>,
    /// Set when the store was saved but the notifier could not deliver
    pub notification_error: Option<String>,
}

impl CycleReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Scrape orchestrator
///
/// Runs every source, then reconciles exactly once with whatever the sources
/// that succeeded produced.
pub struct ScrapeCycle {
    sources: Vec<Arc<dyn JobSource>>,
    reconciler: Arc<ReconcileService>,
    notifier: Arc<dyn Notifier>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl ScrapeCycle {
    pub fn new(
        sources: Vec<Arc<dyn JobSource>>,
        reconciler: Arc<ReconcileService>,
        notifier: Arc<dyn Notifier>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            sources,
            reconciler,
            notifier,
            time_provider,
            id_provider,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Run one cycle.
    ///
    /// # Errors
    /// Reconciliation failures (`Codec`, `Persist`). They are reported through
    /// the notifier before being returned, and no new-jobs notification is sent.
    pub async fn run(&self) -> Result<CycleReport> {
        let cycle_id = self.id_provider.generate_id();
        let started_at = self.time_provider.now();

        info!(
            cycle_id = %cycle_id,
            sources = self.sources.len(),
            "Starting scrape cycle"
        );

        let scraped = join_all(self.sources.iter().map(|s| self.scrape_one(s.as_ref()))).await;

        // One shared timestamp for every candidate of the cycle
        let now = self.time_provider.now();
        let mut source_reports = Vec::with_capacity(scraped.len());
        let mut candidates = Vec::new();

        for (report, fields) in scraped {
            let source = report.source.clone();
            candidates.extend(fields.into_iter().map(|f| to_candidate(f, &source, now)));
            source_reports.push(report);
        }

        let candidate_count = candidates.len();

        let outcome = match self.reconciler.reconcile(candidates).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(cycle_id = %cycle_id, error = %e, "Reconciliation failed, cycle aborted");
                let reason = format!("cycle {} aborted: {}", cycle_id, e);
                if let Err(notify_err) = self.notifier.notify_cycle_failed(&reason).await {
                    warn!(cycle_id = %cycle_id, error = %notify_err, "Failed to report cycle failure");
                }
                return Err(e);
            }
        };

        let mut notification_error = None;
        if !outcome.new_records.is_empty() {
            if let Err(e) = self.notifier.notify_new_jobs(&outcome.new_records).await {
                warn!(cycle_id = %cycle_id, error = %e, "New-jobs notification failed");
                notification_error = Some(e.to_string());
            }
        }

        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at: self.time_provider.now(),
            sources: source_reports,
            candidates: candidate_count,
            dropped: outcome.dropped,
            updated: outcome.updated,
            total_records: outcome.all_records.len(),
            new_records: outcome.new_records,
            notification_error,
        };

        info!(
            cycle_id = %report.cycle_id,
            candidates = report.candidates,
            new = report.new_records.len(),
            total = report.total_records,
            failed_sources = report.failed_sources(),
            "Scrape cycle complete"
        );

        Ok(report)
    }

    /// Scrape a single source; failures become part of the report
    async fn scrape_one(&self, source: &dyn JobSource) -> (SourceReport, Vec<JobFields>) {
        let start = self.time_provider.now_millis();
        let result = source.scrape().await;
        let duration_ms = self.time_provider.now_millis() - start;

        match result {
            Ok(fields) => {
                info!(
                    source = %source.name(),
                    candidates = fields.len(),
                    duration_ms,
                    "Source scraped"
                );
                let report = SourceReport {
                    source: source.name().to_string(),
                    candidates: fields.len(),
                    duration_ms,
                    error: None,
                };
                (report, fields)
            }
            Err(e) => {
                warn!(
                    source = %source.name(),
                    duration_ms,
                    error = %e,
                    "Source failed, continuing with the others"
                );
                let report = SourceReport {
                    source: source.name().to_string(),
                    candidates: 0,
                    duration_ms,
                    error: Some(e.to_string()),
                };
                (report, Vec::new())
            }
        }
    }
}

/// Candidates without a source name inherit the name of the source that produced them
fn to_candidate(mut fields: JobFields, source: &str, now: DateTime<Utc>) -> JobRecord {
    let unnamed = fields
        .source_name
        .as_deref()
        .map_or(true, |s| s.trim().is_empty());
    if unnamed {
        fields.source_name = Some(source.to_string());
    }
    JobRecord::create(fields, now)
}
