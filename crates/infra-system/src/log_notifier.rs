// Notifier that writes to the tracing pipeline
// Stands in for chat/webhook delivery; the delta file carries the full rows

use async_trait::async_trait;
use jobwatch_core::domain::JobRecord;
use jobwatch_core::error::Result;
use jobwatch_core::port::Notifier;
use tracing::{error, info};

/// Logs one summary line per cycle and one line per new posting
pub struct LogNotifier {
    /// Per-posting lines beyond this count are summarized
    max_listed: usize,
}

impl LogNotifier {
    pub fn new(max_listed: usize) -> Self {
        Self { max_listed }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_new_jobs(&self, records: &[JobRecord]) -> Result<()> {
        info!(count = records.len(), "New job postings found");

        for record in records.iter().take(self.max_listed) {
            info!(
                company = %record.company,
                title = %record.title,
                location = %record.location,
                link = %record.apply_link,
                source = %record.source_name,
                "New posting"
            );
        }
        if records.len() > self.max_listed {
            info!(
                omitted = records.len() - self.max_listed,
                "More new postings not listed"
            );
        }
        Ok(())
    }

    async fn notify_cycle_failed(&self, reason: &str) -> Result<()> {
        error!(reason = %reason, "Scrape cycle failed");
        Ok(())
    }
}
