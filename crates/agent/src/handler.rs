//! Adapts [`run_agent`] to the [`NodeHandler`] contract, so
//! `loomwork-engine` can register an `agent` node exactly like any
//! other node type.

use async_trait::async_trait;
use loomwork_action::{NodeContext, NodeError, NodeHandler, NodeOutcome};
use loomwork_safety::SafetyPipeline;
use serde_json::Value;
use std::sync::Arc;

use crate::agent_loop::run_agent;
use crate::config::AgentConfig;
use crate::dispatcher::ToolExecutor;
use crate::hooks::AgentHooks;
use crate::llm::LlmAdapter;

/// A [`NodeHandler`] for `agent`-typed nodes, wiring a fixed
/// [`AgentConfig`]/adapter/executor/hooks set into the generic node
/// dispatch contract.
///
/// The resolved node input's `message` field (or, absent that, the
/// whole resolved input stringified) becomes the agent's user turn.
pub struct AgentNodeHandler {
    config: AgentConfig,
    adapter: Arc<dyn LlmAdapter>,
    executor: Arc<dyn ToolExecutor>,
    hooks: Arc<dyn AgentHooks>,
    safety: Option<SafetyPipeline>,
}

impl AgentNodeHandler {
    #[must_use]
    pub fn new(
        config: AgentConfig,
        adapter: Arc<dyn LlmAdapter>,
        executor: Arc<dyn ToolExecutor>,
        hooks: Arc<dyn AgentHooks>,
        safety: Option<SafetyPipeline>,
    ) -> Self {
        Self { config, adapter, executor, hooks, safety }
    }

    fn extract_user_message(input: &Value) -> String {
        input
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(|| input.to_string())
    }
}

#[async_trait]
impl NodeHandler for AgentNodeHandler {
    async fn execute(&self, input: Value, ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        ctx.check_cancelled()?;
        let user_message = Self::extract_user_message(&input);
        let outcome = run_agent(
            &self.config,
            self.adapter.as_ref(),
            self.executor.as_ref(),
            Some(self.hooks.as_ref()),
            self.safety.as_ref(),
            &user_message,
        )
        .await?;

        let output = serde_json::to_value(&outcome)
            .map_err(|err| NodeError::unknown(format!("failed to serialize agent outcome: {err}")))?;
        Ok(NodeOutcome::new(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests_support::StubToolExecutor;
    use crate::hooks::NoopAgentHooks;
    use crate::llm::ModelRef;
    use crate::message::Message;
    use async_trait::async_trait;
    use loomwork_core::{ExecutionId, NodeId, WorkflowId};
    use loomwork_expression::EmptyResolver;
    use tokio_util::sync::CancellationToken;

    struct EchoAdapter;

    #[async_trait]
    impl LlmAdapter for EchoAdapter {
        async fn complete(
            &self,
            _model: &ModelRef,
            _messages: &[Message],
            _tools: &[crate::tool::ToolDefinition],
        ) -> Result<Message, crate::error::AgentError> {
            Ok(Message::assistant("done"))
        }
    }

    #[tokio::test]
    async fn handler_produces_serialized_agent_outcome() {
        let handler = AgentNodeHandler::new(
            AgentConfig::new(ModelRef::new("openai", "gpt-4o"), vec![]),
            Arc::new(EchoAdapter),
            Arc::new(StubToolExecutor::new()),
            Arc::new(NoopAgentHooks),
            None,
        );
        let ctx = NodeContext::new(
            NodeId::new("agent-1"),
            "agent",
            ExecutionId::v4(),
            WorkflowId::v4(),
            CancellationToken::new(),
            Arc::new(EmptyResolver),
        );

        let outcome = handler
            .execute(serde_json::json!({"message": "hello"}), ctx)
            .await
            .unwrap();
        assert_eq!(outcome.output["success"], true);
        assert_eq!(outcome.output["finalMessage"], serde_json::Value::Null);
    }
}
