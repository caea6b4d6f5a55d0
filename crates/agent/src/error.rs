//! Errors the agent loop itself can raise, distinct from a tool's own
//! [`NodeError`] (which is carried through unchanged when surfaced).

use loomwork_action::NodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The model adapter itself failed (not a tool invocation).
    #[error("model adapter error: {0}")]
    Adapter(String),

    /// A tool name the model referenced isn't in this agent's catalogue.
    #[error("unknown tool \"{0}\"")]
    UnknownTool(String),

    /// A tool invocation failed in a way the loop decided not to
    /// recover from.
    #[error(transparent)]
    Tool(#[from] NodeError),

    /// The safety pipeline blocked inbound or outbound content.
    #[error("safety pipeline blocked content: {0}")]
    SafetyBlocked(String),
}

impl AgentError {
    /// Whether the underlying condition is one the scheduler's retry
    /// path could plausibly resolve by trying again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Tool(err) => err.is_retryable(),
            _ => false,
        }
    }
}
