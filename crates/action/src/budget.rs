//! Resource limits enforced by the engine across an entire execution.
//!
//! Individual node handlers never see or enforce these — the scheduler
//! does, the same separation of concerns the reference implementation
//! draws between an action and its runtime.

use std::time::Duration;

/// Resource budget for one workflow execution.
#[derive(Debug, Clone)]
pub struct ExecutionBudget {
    /// Maximum nodes executing concurrently within this execution.
    pub max_concurrent_nodes: usize,
    /// Maximum total retry attempts across all nodes.
    pub max_total_retries: u32,
    /// Maximum wall-clock time for the entire execution.
    pub max_wall_time: Duration,
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: 10,
            max_total_retries: 50,
            max_wall_time: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_matches_spec_defaults() {
        let budget = ExecutionBudget::default();
        assert_eq!(budget.max_concurrent_nodes, 10);
        assert_eq!(budget.max_wall_time, Duration::from_secs(3600));
    }
}
