//! A point-in-time tally of the queue, for progress reporting and for
//! deciding whether an execution is finished.

use serde::{Deserialize, Serialize};

/// Counts of nodes in each state, plus the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub pending: usize,
    pub ready: usize,
    pub executing: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl ExecutionSummary {
    /// Whether the execution, taken as a whole, should be reported as
    /// having failed: at least one node failed and nothing is still
    /// pending, ready, or executing.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
