//! The seam between the agent loop and a concrete model provider.
//!
//! `loomwork-agent` never talks to a real LLM API — that's an external
//! collaborator, same as the HTTP/DB executors the node dispatcher
//! delegates to. A caller registers one [`LlmAdapter`] per model/provider
//! pair the same way the engine registers a `NodeHandler` per node type.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::message::Message;
use crate::tool::ToolDefinition;

/// One turn's worth of model configuration, resolved and handed to the
/// adapter alongside the conversation so far.
#[derive(Debug, Clone)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// A registered model adapter: given the conversation so far and the
/// tool catalogue, produce the next assistant turn.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(
        &self,
        model: &ModelRef,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAdapter;

    #[async_trait]
    impl LlmAdapter for EchoAdapter {
        async fn complete(
            &self,
            _model: &ModelRef,
            _messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<Message, AgentError> {
            Ok(Message::assistant("ok"))
        }
    }

    #[tokio::test]
    async fn adapter_can_be_invoked_through_the_trait_object() {
        let adapter: Box<dyn LlmAdapter> = Box::new(EchoAdapter);
        let model = ModelRef::new("openai", "gpt-4o");
        let response = adapter.complete(&model, &[], &[]).await.unwrap();
        assert!(response.is_terminal_assistant());
    }
}
