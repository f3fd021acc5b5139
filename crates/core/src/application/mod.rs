// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod cycle;
pub mod query;
pub mod reconcile;
pub mod scheduler;
pub mod shutdown;

// Re-exports
pub use cycle::{CycleReport, ScrapeCycle, SourceReport};
pub use query::{JobEntry, JobPage, JobQuery, QueryService, SortField, SortOrder, StoreStats};
pub use reconcile::{ReconcileOutcome, ReconcileService};
pub use scheduler::CycleScheduler;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
