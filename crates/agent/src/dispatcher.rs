//! The seam between the agent loop and tool execution.
//!
//! Mirrors the node dispatcher's `provider + operation` delegation
//! (§4.E's `integration` node type): the agent loop never invokes a tool
//! directly, it asks a registered [`ToolExecutor`] to, the same
//! separation the scheduler keeps between itself and concrete node
//! handlers.

use async_trait::async_trait;
use loomwork_action::NodeError;
use serde_json::Value;

/// Invokes one named tool with already-validated arguments.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn invoke(&self, tool_name: &str, arguments: Value) -> Result<Value, NodeError>;
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// A fixed-response tool executor for exercising the loop without a
    /// real integration dispatcher.
    pub struct StubToolExecutor {
        responses: Mutex<HashMap<String, Result<Value, NodeError>>>,
    }

    impl StubToolExecutor {
        pub fn new() -> Self {
            Self { responses: Mutex::new(HashMap::new()) }
        }

        pub async fn set(&self, tool_name: impl Into<String>, response: Result<Value, NodeError>) {
            self.responses.lock().await.insert(tool_name.into(), response);
        }
    }

    #[async_trait]
    impl ToolExecutor for StubToolExecutor {
        async fn invoke(&self, tool_name: &str, _arguments: Value) -> Result<Value, NodeError> {
            self.responses
                .lock()
                .await
                .remove(tool_name)
                .unwrap_or_else(|| Err(NodeError::not_found(format!("no stubbed response for {tool_name}"))))
        }
    }
}
