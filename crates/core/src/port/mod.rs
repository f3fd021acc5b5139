// Port Layer - Interfaces for external dependencies

pub mod id_provider;
pub mod job_source;
pub mod notifier;
pub mod record_store;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use job_source::{JobSource, SourceError};
pub use notifier::Notifier;
pub use record_store::RecordStore;
pub use time_provider::TimeProvider;
