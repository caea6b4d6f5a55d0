//! Crate-wide error type for `loomwork-core`.

use thiserror::Error;

/// Errors produced by core identifier/JSON utilities.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A string could not be parsed as one of the crate's identifier types.
    #[error("invalid identifier `{value}`: {reason}")]
    InvalidId {
        /// The value that failed to parse.
        value: String,
        /// Why it failed to parse.
        reason: String,
    },
}
