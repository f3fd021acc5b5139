// Jobwatch Core - Record Model, Ports & Use Cases
// NO infrastructure dependencies: file formats, processes and RPC live in adapter crates

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
