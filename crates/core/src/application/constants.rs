// Application constants (no magic values)
use std::time::Duration;

/// Default spacing between scheduled cycles (6 hours)
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Default per-source timeout for external scrapers (5 minutes)
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 300;

/// Query pagination
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Max stderr bytes kept in a source error message
pub const SOURCE_STDERR_TAIL_BYTES: usize = 2048;
