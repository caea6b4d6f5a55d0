//! Combining a node error's retryability with the policy's attempt
//! budget into one go/no-go decision.

use loomwork_action::NodeError;

use crate::policy::RetryPolicy;

/// Whether the scheduler (or the agent tool loop) should retry, given
/// the error just raised and how many attempts have already been made.
#[must_use]
pub fn should_retry(error: &NodeError, attempts_made: u32, policy: &RetryPolicy) -> bool {
    error.is_retryable() && policy.allows_retry(attempts_made)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_retryable_error_never_retries() {
        let policy = RetryPolicy::new(5, std::time::Duration::from_millis(1));
        assert!(!should_retry(&NodeError::validation("bad"), 1, &policy));
    }

    #[test]
    fn retryable_error_retries_until_budget_exhausted() {
        let policy = RetryPolicy::new(2, std::time::Duration::from_millis(1));
        assert!(should_retry(&NodeError::timeout("slow"), 1, &policy));
        assert!(!should_retry(&NodeError::timeout("slow"), 2, &policy));
    }
}
