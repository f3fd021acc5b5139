// Job Record Domain Model

use super::timestamp;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a posting: company, title, external job id and apply link
/// concatenated, then trimmed. No other normalization (case, inner whitespace)
/// is applied, so "Amazon Inc." and "Amazon  Inc." are different postings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn derive(company: &str, title: &str, external_job_id: &str, apply_link: &str) -> Self {
        let joined = format!("{company}{title}{external_job_id}{apply_link}");
        Self(joined.trim().to_string())
    }

    /// Wrap a key received from outside (RPC, CLI)
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Candidate fields as a source emits them. Every field is optional;
/// `JobRecord::create` fills the gaps.
///
/// Accepts both the in-memory names (`externalJobId`, `applyLink`, ...) and the
/// store column labels (`jobId`, `link`, `source`, `scrapedAt`, `lastUpdated`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobFields {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "jobId")]
    pub external_job_id: Option<String>,
    pub posted_date: Option<String>,
    pub work_type: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary: Option<String>,
    pub experience: Option<String>,
    pub employment_type: Option<String>,
    #[serde(alias = "link")]
    pub apply_link: Option<String>,
    #[serde(alias = "source")]
    pub source_name: Option<String>,
    #[serde(alias = "scrapedAt")]
    pub first_seen_at: Option<DateTime<Utc>>,
    #[serde(alias = "lastUpdated")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl JobFields {
    pub fn new(title: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            company: Some(company.into()),
            ..Default::default()
        }
    }

    pub fn with_job_id(mut self, id: impl Into<String>) -> Self {
        self.external_job_id = Some(id.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.apply_link = Some(link.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_name = Some(source.into());
        self
    }

    pub fn with_first_seen(mut self, ts: DateTime<Utc>) -> Self {
        self.first_seen_at = Some(ts);
        self
    }
}

/// One observed job posting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub external_job_id: String,
    /// Free-form, as displayed by the career site
    pub posted_date: String,
    pub work_type: String,
    pub description: String,
    pub requirements: String,
    pub salary: String,
    pub experience: String,
    pub employment_type: String,
    pub apply_link: String,
    pub source_name: String,

    /// Set once when the posting is first observed
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Build a record from raw fields. Never fails.
    ///
    /// Missing text becomes the empty string, `first_seen_at` defaults to `now`
    /// and `last_updated_at` defaults to `first_seen_at`. `last_updated_at` is
    /// never earlier than `first_seen_at`.
    pub fn create(fields: JobFields, now: DateTime<Utc>) -> Self {
        let first_seen_at = timestamp::normalize(fields.first_seen_at.unwrap_or(now));
        let last_updated_at = fields
            .last_updated_at
            .map(timestamp::normalize)
            .map_or(first_seen_at, |ts| ts.max(first_seen_at));

        Self {
            title: fields.title.unwrap_or_default(),
            company: fields.company.unwrap_or_default(),
            location: fields.location.unwrap_or_default(),
            external_job_id: fields.external_job_id.unwrap_or_default(),
            posted_date: fields.posted_date.unwrap_or_default(),
            work_type: fields.work_type.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            requirements: fields.requirements.unwrap_or_default(),
            salary: fields.salary.unwrap_or_default(),
            experience: fields.experience.unwrap_or_default(),
            employment_type: fields.employment_type.unwrap_or_default(),
            apply_link: fields.apply_link.unwrap_or_default(),
            source_name: fields.source_name.unwrap_or_default(),
            first_seen_at,
            last_updated_at,
        }
    }

    /// Derived on every call, so it can never go stale after a field edit
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::derive(
            &self.company,
            &self.title,
            &self.external_job_id,
            &self.apply_link,
        )
    }

    /// Non-empty title and at least one of job id / apply link
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && (!self.external_job_id.trim().is_empty() || !self.apply_link.trim().is_empty())
    }

    /// Refresh an existing posting with a newer observation.
    ///
    /// Every content field comes from `incoming`; `first_seen_at` stays with
    /// `existing`. `last_updated_at` becomes `now`, bumped one millisecond past
    /// the previous value when the clock has not moved, so it strictly increases.
    pub fn merge_into(existing: &JobRecord, incoming: &JobRecord, now: DateTime<Utc>) -> JobRecord {
        let now = timestamp::normalize(now);
        let last_updated_at = if now > existing.last_updated_at {
            now
        } else {
            existing.last_updated_at + Duration::milliseconds(1)
        };

        JobRecord {
            first_seen_at: existing.first_seen_at,
            last_updated_at,
            ..incoming.clone()
        }
    }
}
