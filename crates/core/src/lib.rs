//! Shared identifiers, JSON helpers and error types used by every
//! `loomwork-*` crate.

mod error;
pub mod id;
pub mod json_path;

pub use error::CoreError;
pub use id::{ExecutionId, NodeId, WorkflowId};
pub use json_path::lookup_path;

/// Result type alias used throughout `loomwork-core`.
pub type Result<T> = std::result::Result<T, CoreError>;
