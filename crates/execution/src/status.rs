//! The execution-level status, distinct from any single node's state.

use serde::{Deserialize, Serialize};

/// Where one execution stands as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionStatus {
    /// Accepted but not yet dispatched.
    Pending,
    /// At least one node has been dispatched.
    Running,
    /// Paused by a hook (e.g. awaiting human approval); resumable.
    Paused,
    /// Every reachable node reached a terminal state and at least one
    /// output node completed.
    Completed,
    /// Every reachable node reached a terminal state and no output node
    /// completed.
    Failed,
    /// Cancellation was requested and the scheduler stopped dispatching.
    Cancelled,
}

impl ExecutionStatus {
    /// Whether this status is terminal — no further transitions expected.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_failed_and_cancelled_are_terminal() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Paused.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
    }
}
