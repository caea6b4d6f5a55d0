//! The closed error taxonomy every node handler reports through.

use thiserror::Error;

/// The discriminant for a [`NodeError`], exposed separately so the engine
/// can serialize/compare it without matching on the full error (which
/// carries a message and stays `#[non_exhaustive]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeErrorKind {
    Validation,
    Permission,
    NotFound,
    RateLimit,
    ServerError,
    SafetyBlock,
    Timeout,
    Cancelled,
    Unknown,
}

impl NodeErrorKind {
    /// Whether errors of this kind are retryable by default.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError | Self::Timeout)
    }
}

/// Error returned by a node handler, or raised internally by the
/// dispatcher (safety blocks, cancellation, timeouts).
///
/// `#[non_exhaustive]`: embedders match on `.kind()` rather than the
/// variant directly, so new diagnostic fields can be added without a
/// breaking change.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NodeError {
    /// Input failed validation before dispatch.
    #[error("validation: {message}")]
    Validation {
        /// Human-readable explanation.
        message: String,
    },
    /// The caller lacked permission to perform this operation.
    #[error("permission: {message}")]
    Permission {
        /// Human-readable explanation.
        message: String,
    },
    /// A referenced resource did not exist.
    #[error("not_found: {message}")]
    NotFound {
        /// Human-readable explanation.
        message: String,
    },
    /// A transient rate limit was hit; retryable.
    #[error("rate_limit: {message}")]
    RateLimit {
        /// Human-readable explanation.
        message: String,
    },
    /// A transient server-side failure; retryable.
    #[error("server_error: {message}")]
    ServerError {
        /// Human-readable explanation.
        message: String,
    },
    /// The safety pipeline blocked this node's input or output.
    #[error("safety_block: {message}")]
    SafetyBlock {
        /// Human-readable explanation.
        message: String,
    },
    /// The node exceeded its configured timeout; retryable.
    #[error("timeout: {message}")]
    Timeout {
        /// Human-readable explanation.
        message: String,
    },
    /// The execution was cancelled.
    #[error("cancelled")]
    Cancelled,
    /// An error that doesn't fit any other kind.
    #[error("unknown: {message}")]
    Unknown {
        /// Human-readable explanation.
        message: String,
    },
}

impl NodeError {
    /// Construct a [`Self::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Construct a [`Self::Permission`] error.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission { message: message.into() }
    }

    /// Construct a [`Self::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    /// Construct a [`Self::RateLimit`] error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit { message: message.into() }
    }

    /// Construct a [`Self::ServerError`] error.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::ServerError { message: message.into() }
    }

    /// Construct a [`Self::SafetyBlock`] error.
    pub fn safety_block(message: impl Into<String>) -> Self {
        Self::SafetyBlock { message: message.into() }
    }

    /// Construct a [`Self::Timeout`] error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    /// Construct a [`Self::Unknown`] error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown { message: message.into() }
    }

    /// This error's closed-set kind.
    #[must_use]
    pub fn kind(&self) -> NodeErrorKind {
        match self {
            Self::Validation { .. } => NodeErrorKind::Validation,
            Self::Permission { .. } => NodeErrorKind::Permission,
            Self::NotFound { .. } => NodeErrorKind::NotFound,
            Self::RateLimit { .. } => NodeErrorKind::RateLimit,
            Self::ServerError { .. } => NodeErrorKind::ServerError,
            Self::SafetyBlock { .. } => NodeErrorKind::SafetyBlock,
            Self::Timeout { .. } => NodeErrorKind::Timeout,
            Self::Cancelled => NodeErrorKind::Cancelled,
            Self::Unknown { .. } => NodeErrorKind::Unknown,
        }
    }

    /// Whether the scheduler should consider retrying the node that
    /// produced this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds_are_exactly_three() {
        assert!(NodeErrorKind::RateLimit.is_retryable());
        assert!(NodeErrorKind::ServerError.is_retryable());
        assert!(NodeErrorKind::Timeout.is_retryable());
        assert!(!NodeErrorKind::Validation.is_retryable());
        assert!(!NodeErrorKind::Permission.is_retryable());
        assert!(!NodeErrorKind::NotFound.is_retryable());
        assert!(!NodeErrorKind::SafetyBlock.is_retryable());
        assert!(!NodeErrorKind::Cancelled.is_retryable());
        assert!(!NodeErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn error_is_retryable_matches_its_kind() {
        assert!(NodeError::rate_limit("too fast").is_retryable());
        assert!(!NodeError::validation("bad input").is_retryable());
    }

    #[test]
    fn display_preserves_message_verbatim() {
        let err = NodeError::server_error("db said: \"timeout\" \u{2014} retry?");
        assert!(err.to_string().contains("db said: \"timeout\" \u{2014} retry?"));
    }

    #[test]
    fn cancelled_has_no_message_field() {
        assert_eq!(NodeError::Cancelled.to_string(), "cancelled");
        assert_eq!(NodeError::Cancelled.kind(), NodeErrorKind::Cancelled);
    }
}
