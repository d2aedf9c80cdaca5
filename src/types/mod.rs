//! Core types for the MCore kernel.
//!
//! - **IDs**: Jupyter message and session identifiers
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Interpreter and observability configuration

mod config;
mod errors;
mod ids;

pub use config::{Config, ObservabilityConfig, ReplConfig};
pub use errors::{Error, Result};
pub use ids::{MessageId, SessionId};
