// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job_record;
pub mod timestamp;

// Re-exports
pub use error::DomainError;
pub use job_record::{IdentityKey, JobFields, JobRecord};
