// Store Codec - JobRecord collection <-> CSV file
//
// Header labels are fixed. Columns are matched by label on load, so column
// order, unknown columns and missing columns are all tolerated. The identity
// key is never stored; it is recomputed from the loaded fields.

use chrono::{DateTime, Utc};
use jobwatch_core::domain::{timestamp, JobFields, JobRecord};
use jobwatch_core::error::{AppError, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Store columns, in file order
pub const COLUMNS: [&str; 15] = [
    "title",
    "company",
    "location",
    "jobId",
    "postedDate",
    "workType",
    "description",
    "requirements",
    "salary",
    "experience",
    "employmentType",
    "link",
    "source",
    "scrapedAt",
    "lastUpdated",
];

/// Load a store file. A missing file is an empty collection.
///
/// Rows without a `scrapedAt` value are stamped with `now`.
///
/// # Errors
/// - `AppError::Codec` if the file exists but cannot be read or parsed
pub fn load(path: &Path, now: DateTime<Utc>) -> Result<Vec<JobRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Store file absent, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(AppError::Codec(format!(
                "cannot open {}: {}",
                path.display(),
                e
            )))
        }
    };

    read_from(file, now).map_err(|e| match e {
        AppError::Codec(msg) => AppError::Codec(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Parse CSV content into records, in row order
pub fn read_from<R: Read>(reader: R, now: DateTime<Utc>) -> Result<Vec<JobRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = rdr.headers().map_err(codec_error)?.clone();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(codec_error)?;
        let line = row.position().map_or(0, |p| p.line());

        let text = |column: &str| {
            index
                .get(column)
                .and_then(|&i| row.get(i))
                .map(str::to_string)
        };
        let stamp = |column: &str| -> Result<Option<DateTime<Utc>>> {
            let raw = text(column).unwrap_or_default();
            timestamp::parse(&raw)
                .map_err(|e| AppError::Codec(format!("line {}: column {}: {}", line, column, e)))
        };

        let fields = JobFields {
            title: text("title"),
            company: text("company"),
            location: text("location"),
            external_job_id: text("jobId"),
            posted_date: text("postedDate"),
            work_type: text("workType"),
            description: text("description"),
            requirements: text("requirements"),
            salary: text("salary"),
            experience: text("experience"),
            employment_type: text("employmentType"),
            apply_link: text("link"),
            source_name: text("source"),
            first_seen_at: stamp("scrapedAt")?,
            last_updated_at: stamp("lastUpdated")?,
        };
        records.push(JobRecord::create(fields, now));
    }

    Ok(records)
}

/// Serialize records with the header row. Zero records still produce a header.
pub fn write_to<W: Write>(writer: W, records: &[JobRecord]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(COLUMNS)?;

    for r in records {
        let scraped_at = timestamp::format(&r.first_seen_at);
        let last_updated = timestamp::format(&r.last_updated_at);
        wtr.write_record([
            r.title.as_str(),
            r.company.as_str(),
            r.location.as_str(),
            r.external_job_id.as_str(),
            r.posted_date.as_str(),
            r.work_type.as_str(),
            r.description.as_str(),
            r.requirements.as_str(),
            r.salary.as_str(),
            r.experience.as_str(),
            r.employment_type.as_str(),
            r.apply_link.as_str(),
            r.source_name.as_str(),
            scraped_at.as_str(),
            last_updated.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Replace the file at `path` with `records`.
///
/// The content goes to a temp file in the same directory, is synced, then
/// renamed over the target, so readers see either the old or the new file.
/// The temp file is removed if any step fails.
///
/// # Errors
/// - `AppError::Persist` on any filesystem failure
pub fn save(path: &Path, records: &[JobRecord]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| persist_error(path, "create directory", e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| persist_error(path, "create temp file", e))?;

    write_to(tmp.as_file_mut(), records)
        .map_err(|e| AppError::Persist(format!("{}: write: {}", path.display(), e)))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| persist_error(path, "sync", e))?;

    tmp.persist(path)
        .map_err(|e| persist_error(path, "rename", e.error))?;

    debug!(path = %path.display(), records = records.len(), "Store file written");
    Ok(())
}

fn codec_error(err: csv::Error) -> AppError {
    AppError::Codec(err.to_string())
}

fn persist_error(path: &Path, step: &str, err: io::Error) -> AppError {
    AppError::Persist(format!("{}: {}: {}", path.display(), step, err))
}
