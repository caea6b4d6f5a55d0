//! An agent node's configuration (§4.F): model/provider, system prompt,
//! tool catalogue, iteration budget, and how to react to a retryable
//! tool error.

use loomwork_resilience::RetryPolicy;
use loomwork_safety::SafetyConfig;

use crate::llm::ModelRef;
use crate::tool::ToolDefinition;

/// What the loop does when a tool invocation fails with a retryable
/// [`NodeError`](loomwork_action::NodeError) kind (`rate_limit` /
/// `server_error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorStrategy {
    /// Retry the same tool call with backoff per the configured
    /// [`RetryPolicy`], up to its attempt budget, before surfacing.
    RetryWithBackoff,
    /// Skip retrying; feed the error back to the model as a tool-error
    /// message and let it decide how to recover.
    SurfaceToModel,
}

/// Full configuration for one agent tool-loop invocation.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub system_prompt: Option<String>,
    pub model: ModelRef,
    pub tools: Vec<ToolDefinition>,
    /// Hard cap on reasoning/acting cycles. Default 10 per §4.F.
    pub max_iterations: u32,
    pub safety: Option<SafetyConfig>,
    pub retry_policy: RetryPolicy,
    pub tool_error_strategy: ToolErrorStrategy,
}

impl AgentConfig {
    #[must_use]
    pub fn new(model: ModelRef, tools: Vec<ToolDefinition>) -> Self {
        Self {
            system_prompt: None,
            model,
            tools,
            max_iterations: 10,
            safety: None,
            retry_policy: RetryPolicy::default(),
            tool_error_strategy: ToolErrorStrategy::SurfaceToModel,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_safety(mut self, safety: SafetyConfig) -> Self {
        self.safety = Some(safety);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[must_use]
    pub fn with_tool_error_strategy(mut self, strategy: ToolErrorStrategy) -> Self {
        self.tool_error_strategy = strategy;
        self
    }

    pub(crate) fn find_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_iterations_is_ten() {
        let config = AgentConfig::new(ModelRef::new("openai", "gpt-4o"), Vec::new());
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.tool_error_strategy, ToolErrorStrategy::SurfaceToModel);
    }
}
