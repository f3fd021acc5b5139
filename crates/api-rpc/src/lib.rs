//! JSON-RPC API Layer
//!
//! Read-only queries over the job store plus manual cycle control.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
