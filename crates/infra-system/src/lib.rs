// Jobwatch Infrastructure - System Adapters
// Implements: JobSource (external scraper processes), Notifier (log output)

pub mod command_source;
pub mod log_notifier;

pub use command_source::{CommandSource, CommandSpec, DEFAULT_ENV_ALLOWLIST};
pub use log_notifier::LogNotifier;
