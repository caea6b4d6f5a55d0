//! Per-execution overrides (§6): everything here has a workable default,
//! so callers only set what they need to.

use loomwork_core::{ExecutionId, NodeId};
use loomwork_resilience::RetryPolicy;
use loomwork_safety::SafetyConfig;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Overrides accepted by [`crate::execute`].
///
/// `execution_id` and `cancel_token` default to fresh values when not
/// supplied; every other field falls back to the corresponding
/// sub-crate default.
#[non_exhaustive]
pub struct ExecutionOptions {
    pub max_concurrent_nodes: Option<usize>,
    pub safety_config: Option<SafetyConfig>,
    pub retry_policies: HashMap<NodeId, RetryPolicy>,
    pub default_retry_policy: RetryPolicy,
    pub node_timeout: Option<Duration>,
    pub execution_id: ExecutionId,
    pub cancel_token: CancellationToken,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: None,
            safety_config: None,
            retry_policies: HashMap::new(),
            default_retry_policy: RetryPolicy::none(),
            node_timeout: None,
            execution_id: ExecutionId::v4(),
            cancel_token: CancellationToken::new(),
        }
    }
}

impl ExecutionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_concurrent_nodes(mut self, n: usize) -> Self {
        self.max_concurrent_nodes = Some(n);
        self
    }

    #[must_use]
    pub fn with_safety_config(mut self, config: SafetyConfig) -> Self {
        self.safety_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_retry_policy_for(mut self, node_id: NodeId, policy: RetryPolicy) -> Self {
        self.retry_policies.insert(node_id, policy);
        self
    }

    #[must_use]
    pub fn with_default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_retry_policy = policy;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    #[must_use]
    pub fn with_execution_id(mut self, id: ExecutionId) -> Self {
        self.execution_id = id;
        self
    }

    pub(crate) fn retry_policy_for(&self, node_id: &NodeId) -> &RetryPolicy {
        self.retry_policies.get(node_id).unwrap_or(&self.default_retry_policy)
    }
}
