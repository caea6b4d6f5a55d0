//! Errors produced while parsing or rendering templates.

use thiserror::Error;

/// Errors from template parsing and rendering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// A `${` or `{{` was opened but never closed.
    #[error("unclosed placeholder starting at byte {offset} in template")]
    UnclosedPlaceholder {
        /// Byte offset where the unclosed placeholder starts.
        offset: usize,
    },

    /// A template contains more placeholders than
    /// [`MAX_TEMPLATE_EXPRESSIONS`](crate::MAX_TEMPLATE_EXPRESSIONS) allows.
    #[error("template has too many expressions ({count}, limit is {limit})")]
    TooManyExpressions {
        /// How many placeholders were found.
        count: usize,
        /// The configured limit.
        limit: usize,
    },

    /// A placeholder referenced a path that could not be resolved, and
    /// strict-variables mode was requested.
    #[error("unresolved variable `{path}`")]
    UnresolvedVariable {
        /// The path that failed to resolve.
        path: String,
    },
}
