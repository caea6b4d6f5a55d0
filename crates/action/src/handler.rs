//! The node handler contract (§6): the one trait every node
//! implementation — built in or provided by an embedding application —
//! must satisfy.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::NodeContext;
use crate::error::NodeError;
use crate::result::NodeOutcome;

/// A node handler executes one node's logic given its already-templated
/// input and a read-only view of the execution context.
///
/// Registered against a [`NodeType`](loomwork_workflow::NodeType) in the
/// registry the engine is constructed with — the scheduler never names a
/// concrete handler, only the type it's dispatching.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Execute the node.
    async fn execute(&self, input: Value, ctx: NodeContext) -> Result<NodeOutcome, NodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomwork_core::{ExecutionId, NodeId, WorkflowId};
    use loomwork_expression::EmptyResolver;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct Echo;

    #[async_trait]
    impl NodeHandler for Echo {
        async fn execute(&self, input: Value, _ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
            Ok(NodeOutcome::new(input))
        }
    }

    #[tokio::test]
    async fn handler_can_be_invoked_through_the_trait_object() {
        let handler: Arc<dyn NodeHandler> = Arc::new(Echo);
        let ctx = NodeContext::new(
            NodeId::new("n1"),
            "echo",
            ExecutionId::v4(),
            WorkflowId::v4(),
            CancellationToken::new(),
            Arc::new(EmptyResolver),
        );
        let outcome = handler
            .execute(serde_json::json!({"hi": "there"}), ctx)
            .await
            .unwrap();
        assert_eq!(outcome.output, serde_json::json!({"hi": "there"}));
    }
}
