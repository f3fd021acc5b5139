//! RPC Request/Response Types
//!
//! jobs.list.v1 takes `jobwatch_core::application::JobQuery` and returns
//! `JobPage`; jobs.stats.v1 returns `StoreStats`. The rest are defined here.
//! Every field on the wire is camelCase, like the records themselves.

use chrono::{DateTime, Utc};
use jobwatch_core::application::{CycleReport, SourceReport};
use serde::{Deserialize, Serialize};

/// jobs.get.v1 - One record by identity key
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJobRequest {
    pub identity_key: String,
}

/// New posting as listed in a cycle summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJobSummary {
    pub identity_key: String,
    pub company: String,
    pub title: String,
    pub apply_link: String,
}

/// cycle.run.v1 / cycle.last.v1
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub cycle_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub candidates: usize,
    pub dropped: usize,
    pub updated: usize,
    pub total_records: usize,
    pub new_count: usize,
    pub new_jobs: Vec<NewJobSummary>,
    pub sources: Vec<SourceReport>,
    pub notification_error: Option<String>,
}

impl From<&CycleReport> for CycleSummary {
    fn from(report: &CycleReport) -> Self {
        Self {
            cycle_id: report.cycle_id.clone(),
            started_at: report.started_at,
            finished_at: report.finished_at,
            candidates: report.candidates,
            dropped: report.dropped,
            updated: report.updated,
            total_records: report.total_records,
            new_count: report.new_records.len(),
            new_jobs: report
                .new_records
                .iter()
                .map(|r| NewJobSummary {
                    identity_key: r.identity_key().to_string(),
                    company: r.company.clone(),
                    title: r.title.clone(),
                    apply_link: r.apply_link.clone(),
                })
                .collect(),
            sources: report.sources.clone(),
            notification_error: report.notification_error.clone(),
        }
    }
}

/// admin.health.v1
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub cycle_running: bool,
    pub sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_core::domain::timestamp::from_millis;
    use jobwatch_core::domain::{JobFields, JobRecord};
    use serde_json::json;

    #[test]
    fn test_get_request_reads_camel_case_key() {
        let req: GetJobRequest = serde_json::from_value(json!({"identityKey": "AmazonSDE21"})).unwrap();
        assert_eq!(req.identity_key, "AmazonSDE21");
        assert!(serde_json::from_value::<GetJobRequest>(json!({"identity_key": "x"})).is_err());
    }

    #[test]
    fn test_cycle_summary_wire_names_match_records() {
        let record = JobRecord::create(
            JobFields::new("SDE2", "Amazon").with_link("https://a/1"),
            from_millis(1_000),
        );
        let report = CycleReport {
            cycle_id: "cycle-1".to_string(),
            started_at: from_millis(1_000),
            finished_at: from_millis(2_000),
            sources: vec![SourceReport {
                source: "amazon".to_string(),
                candidates: 1,
                duration_ms: 10,
                error: None,
            }],
            candidates: 1,
            dropped: 0,
            updated: 0,
            total_records: 1,
            new_records: vec![record],
            notification_error: None,
        };

        let value = serde_json::to_value(CycleSummary::from(&report)).unwrap();

        assert_eq!(value["cycleId"], "cycle-1");
        assert_eq!(value["newCount"], 1);
        assert_eq!(value["totalRecords"], 1);
        assert_eq!(value["newJobs"][0]["applyLink"], "https://a/1");
        assert_eq!(value["sources"][0]["durationMs"], 10);
        assert!(value.get("new_count").is_none());
    }
}
