// Query Service - read-only filter/sort/paginate over the persisted store

use crate::application::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::domain::{IdentityKey, JobRecord};
use crate::error::{AppError, Result};
use crate::port::RecordStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    FirstSeen,
    LastUpdated,
    Title,
    Company,
    Location,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// List request. Text filters are case-insensitive exact matches; `search` is a
/// case-insensitive substring over title, company, description and requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobQuery {
    pub company: Option<String>,
    pub source: Option<String>,
    pub location: Option<String>,
    pub work_type: Option<String>,
    pub employment_type: Option<String>,
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            company: None,
            source: None,
            location: None,
            work_type: None,
            employment_type: None,
            search: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A record together with its identity key
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEntry {
    pub identity_key: IdentityKey,
    #[serde(flatten)]
    pub record: JobRecord,
}

impl From<JobRecord> for JobEntry {
    fn from(record: JobRecord) -> Self {
        Self {
            identity_key: record.identity_key(),
            record,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPage {
    pub items: Vec<JobEntry>,
    pub page: usize,
    pub page_size: usize,
    /// Matches before pagination
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total: usize,
    pub by_company: Vec<GroupCount>,
    pub by_source: Vec<GroupCount>,
    pub newest_first_seen: Option<DateTime<Utc>>,
    pub latest_update: Option<DateTime<Utc>>,
}

pub struct QueryService {
    store: Arc<dyn RecordStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Filter, sort and paginate. An absent store yields an empty page.
    ///
    /// # Errors
    /// - `AppError::Validation` for page 0 or page size 0
    /// - `AppError::Codec` if the store cannot be read
    pub async fn list(&self, query: &JobQuery) -> Result<JobPage> {
        if query.page == 0 {
            return Err(AppError::Validation("page starts at 1".to_string()));
        }
        if query.page_size == 0 {
            return Err(AppError::Validation("page_size must be positive".to_string()));
        }
        let page_size = query.page_size.min(MAX_PAGE_SIZE);

        let mut matches: Vec<JobRecord> = self
            .store
            .load()
            .await?
            .into_iter()
            .filter(|r| matches_query(r, query))
            .collect();

        matches.sort_by(|a, b| {
            let ord = compare(a, b, query.sort);
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matches.len();
        let total_pages = total.div_ceil(page_size);
        let items: Vec<JobEntry> = matches
            .into_iter()
            .skip((query.page - 1).saturating_mul(page_size))
            .take(page_size)
            .map(JobEntry::from)
            .collect();

        debug!(total, page = query.page, returned = items.len(), "Job query served");

        Ok(JobPage {
            items,
            page: query.page,
            page_size,
            total,
            total_pages,
        })
    }

    pub async fn find(&self, key: &IdentityKey) -> Result<Option<JobRecord>> {
        let records = self.store.load().await?;
        Ok(records.into_iter().find(|r| &r.identity_key() == key))
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let records = self.store.load().await?;

        Ok(StoreStats {
            total: records.len(),
            by_company: group_counts(records.iter().map(|r| r.company.as_str())),
            by_source: group_counts(records.iter().map(|r| r.source_name.as_str())),
            newest_first_seen: records.iter().map(|r| r.first_seen_at).max(),
            latest_update: records.iter().map(|r| r.last_updated_at).max(),
        })
    }
}

fn eq_ignore_case(filter: &Option<String>, value: &str) -> bool {
    match filter.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(wanted) => wanted.to_lowercase() == value.trim().to_lowercase(),
    }
}

fn matches_query(record: &JobRecord, query: &JobQuery) -> bool {
    if !(eq_ignore_case(&query.company, &record.company)
        && eq_ignore_case(&query.source, &record.source_name)
        && eq_ignore_case(&query.location, &record.location)
        && eq_ignore_case(&query.work_type, &record.work_type)
        && eq_ignore_case(&query.employment_type, &record.employment_type))
    {
        return false;
    }

    match query.search.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(needle) => {
            let needle = needle.to_lowercase();
            [
                &record.title,
                &record.company,
                &record.description,
                &record.requirements,
            ]
            .iter()
            .any(|haystack| haystack.to_lowercase().contains(&needle))
        }
    }
}

fn compare(a: &JobRecord, b: &JobRecord, field: SortField) -> Ordering {
    match field {
        SortField::FirstSeen => a.first_seen_at.cmp(&b.first_seen_at),
        SortField::LastUpdated => a.last_updated_at.cmp(&b.last_updated_at),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Company => a.company.to_lowercase().cmp(&b.company.to_lowercase()),
        SortField::Location => a.location.to_lowercase().cmp(&b.location.to_lowercase()),
    }
}

/// Count by value, largest group first, ties by name
fn group_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<GroupCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }

    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(name, count)| GroupCount {
            name: name.to_string(),
            count,
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timestamp::from_millis;
    use crate::domain::JobFields;
    use crate::port::record_store::mocks::InMemoryRecordStore;

    fn record(title: &str, company: &str, id: &str, seen: i64) -> JobRecord {
        let mut fields = JobFields::new(title, company)
            .with_job_id(id)
            .with_source(company.to_lowercase());
        fields.location = Some(if company == "Amazon" { "Seattle" } else { "Remote" }.to_string());
        JobRecord::create(fields, from_millis(seen))
    }

    fn service() -> QueryService {
        let records = vec![
            record("SDE2", "Amazon", "1", 100),
            record("Data Engineer", "Amazon", "2", 300),
            record("SRE", "Google", "3", 200),
            record("Backend Developer", "Meta", "4", 400),
        ];
        QueryService::new(Arc::new(InMemoryRecordStore::with_records("store", records)))
    }

    fn titles(page: &JobPage) -> Vec<&str> {
        page.items.iter().map(|e| e.record.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_default_query_is_newest_first() {
        let page = service().list(&JobQuery::default()).await.unwrap();
        assert_eq!(titles(&page), vec!["Backend Developer", "Data Engineer", "SRE", "SDE2"]);
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_company_filter_is_case_insensitive() {
        let query = JobQuery {
            company: Some("amazon".to_string()),
            ..Default::default()
        };
        let page = service().list(&query).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|e| e.record.company == "Amazon"));
    }

    #[tokio::test]
    async fn test_search_and_sort_by_title() {
        let query = JobQuery {
            search: Some("ENGINEER".to_string()),
            ..Default::default()
        };
        let page = service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Data Engineer"]);

        let query = JobQuery {
            sort: SortField::Title,
            order: SortOrder::Asc,
            ..Default::default()
        };
        let page = service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Backend Developer", "Data Engineer", "SDE2", "SRE"]);
    }

    #[tokio::test]
    async fn test_pagination() {
        let query = JobQuery {
            page: 2,
            page_size: 3,
            ..Default::default()
        };
        let page = service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["SDE2"]);
        assert_eq!(page.total_pages, 2);

        let beyond = JobQuery {
            page: 9,
            page_size: 3,
            ..Default::default()
        };
        let page = service().list(&beyond).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_page_size_is_clamped_and_zero_rejected() {
        let query = JobQuery {
            page_size: 5_000,
            ..Default::default()
        };
        assert_eq!(service().list(&query).await.unwrap().page_size, MAX_PAGE_SIZE);

        let zero = JobQuery {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(service().list(&zero).await, Err(AppError::Validation(_))));

        let page_zero = JobQuery {
            page: 0,
            ..Default::default()
        };
        assert!(service().list(&page_zero).await.is_err());
    }

    #[tokio::test]
    async fn test_absent_store_is_empty() {
        let service = QueryService::new(Arc::new(InMemoryRecordStore::new("missing")));
        let page = service.list(&JobQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.newest_first_seen.is_none());
    }

    #[tokio::test]
    async fn test_stats_groups() {
        let stats = service().stats().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(
            stats.by_company[0],
            GroupCount {
                name: "Amazon".to_string(),
                count: 2
            }
        );
        assert_eq!(stats.by_company[1].name, "Google");
        assert_eq!(stats.newest_first_seen, Some(from_millis(400)));
    }

    #[tokio::test]
    async fn test_find_by_identity_key() {
        let service = service();
        let key = record("SRE", "Google", "3", 0).identity_key();
        let found = service.find(&key).await.unwrap().unwrap();
        assert_eq!(found.title, "SRE");

        assert!(service
            .find(&IdentityKey::new("nope"))
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_query_deserializes_with_defaults() {
        let query: JobQuery = serde_json::from_value(serde_json::json!({
            "company": "Amazon",
            "sort": "last_updated",
            "order": "asc"
        }))
        .unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.sort, SortField::LastUpdated);
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn test_query_uses_camel_case_field_names() {
        let query: JobQuery = serde_json::from_value(serde_json::json!({
            "workType": "Remote",
            "employmentType": "Contract",
            "pageSize": 5
        }))
        .unwrap();
        assert_eq!(query.work_type.as_deref(), Some("Remote"));
        assert_eq!(query.employment_type.as_deref(), Some("Contract"));
        assert_eq!(query.page_size, 5);

        let page = serde_json::to_value(JobPage {
            items: Vec::new(),
            page: 1,
            page_size: 5,
            total: 0,
            total_pages: 0,
        })
        .unwrap();
        assert_eq!(page["totalPages"], 0);
        assert_eq!(page["pageSize"], 5);
    }

    /// Postings that differ in every filterable column
    fn varied_service() -> QueryService {
        let posting = |title: &str, source: &str, location: &str, work: &str, employment: &str| {
            let mut fields = JobFields::new(title, "Acme")
                .with_job_id(title)
                .with_source(source)
                .with_location(location);
            fields.work_type = Some(work.to_string());
            fields.employment_type = Some(employment.to_string());
            fields
        };
        let mut records = vec![
            JobRecord::create(posting("Alpha", "greenhouse", "Berlin", "Remote", "Full-time"), from_millis(100)),
            JobRecord::create(posting("Bravo", "lever", "austin", "Onsite", "Contract"), from_millis(200)),
            JobRecord::create(posting("Charlie", "Lever", "Chicago", "Hybrid", "full-time"), from_millis(300)),
        ];
        // Bravo was updated last, Alpha second
        records[0].last_updated_at = from_millis(500);
        records[1].last_updated_at = from_millis(900);
        QueryService::new(Arc::new(InMemoryRecordStore::with_records("store", records)))
    }

    #[tokio::test]
    async fn test_source_filter() {
        let query = JobQuery {
            source: Some("LEVER".to_string()),
            ..Default::default()
        };
        let page = varied_service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Charlie", "Bravo"]);
    }

    #[tokio::test]
    async fn test_work_type_filter() {
        let query = JobQuery {
            work_type: Some("remote".to_string()),
            ..Default::default()
        };
        let page = varied_service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Alpha"]);
    }

    #[tokio::test]
    async fn test_employment_type_filter() {
        let query = JobQuery {
            employment_type: Some("Full-Time".to_string()),
            ..Default::default()
        };
        let page = varied_service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Charlie", "Alpha"]);

        let none = JobQuery {
            employment_type: Some("Internship".to_string()),
            ..Default::default()
        };
        assert_eq!(varied_service().list(&none).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_sort_by_last_updated() {
        let query = JobQuery {
            sort: SortField::LastUpdated,
            ..Default::default()
        };
        let page = varied_service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Bravo", "Alpha", "Charlie"]);
    }

    #[tokio::test]
    async fn test_sort_by_location_ignores_case() {
        let query = JobQuery {
            sort: SortField::Location,
            order: SortOrder::Asc,
            ..Default::default()
        };
        let page = varied_service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Bravo", "Alpha", "Charlie"]);
    }

    #[tokio::test]
    async fn test_descending_text_sort() {
        let query = JobQuery {
            sort: SortField::Title,
            order: SortOrder::Desc,
            ..Default::default()
        };
        let page = varied_service().list(&query).await.unwrap();
        assert_eq!(titles(&page), vec!["Charlie", "Bravo", "Alpha"]);
    }
}
