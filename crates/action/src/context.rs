//! The runtime context every node handler receives alongside its
//! (already-templated) input.

use std::fmt;
use std::sync::Arc;

use loomwork_core::{ExecutionId, NodeId, WorkflowId};
use loomwork_expression::PathResolver;
use tokio_util::sync::CancellationToken;

use crate::error::NodeError;

/// Read-only, point-in-time access to the execution context as seen at
/// the moment a node was dispatched. Implemented by
/// `loomwork_execution::ContextSnapshot`.
pub type ContextRef = Arc<dyn PathResolver + Send + Sync>;

/// Identity and control-flow information passed to every node handler.
///
/// Mirrors the reference implementation's per-action runtime context:
/// identity fields the handler may log or tag metrics with, a read-only
/// view of the execution context, and a cooperative cancellation token.
#[non_exhaustive]
pub struct NodeContext {
    /// Which node this invocation is for.
    pub node_id: NodeId,
    /// Display name of the node, for logging.
    pub node_name: String,
    /// Which execution this node belongs to.
    pub execution_id: ExecutionId,
    /// Which workflow this execution is running.
    pub workflow_id: WorkflowId,
    /// Cooperative cancellation signal.
    pub cancellation: CancellationToken,
    /// Read-only view of the execution context as of dispatch time.
    context: ContextRef,
}

impl NodeContext {
    /// Construct a new node context.
    pub fn new(
        node_id: NodeId,
        node_name: impl Into<String>,
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        cancellation: CancellationToken,
        context: ContextRef,
    ) -> Self {
        Self {
            node_id,
            node_name: node_name.into(),
            execution_id,
            workflow_id,
            cancellation,
            context,
        }
    }

    /// Look up a dotted path against the execution context as it stood
    /// when this node was dispatched.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<serde_json::Value> {
        self.context.resolve(path)
    }

    /// Check whether the execution has been cancelled.
    ///
    /// # Errors
    /// Returns [`NodeError::Cancelled`] if cancellation has been
    /// requested. Long-running handlers should call this periodically.
    pub fn check_cancelled(&self) -> Result<(), NodeError> {
        if self.cancellation.is_cancelled() {
            Err(NodeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("node_id", &self.node_id)
            .field("execution_id", &self.execution_id)
            .field("workflow_id", &self.workflow_id)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomwork_expression::EmptyResolver;

    fn test_ctx() -> NodeContext {
        NodeContext::new(
            NodeId::new("n1"),
            "test node",
            ExecutionId::v4(),
            WorkflowId::v4(),
            CancellationToken::new(),
            Arc::new(EmptyResolver),
        )
    }

    #[test]
    fn check_cancelled_ok_by_default() {
        assert!(test_ctx().check_cancelled().is_ok());
    }

    #[test]
    fn check_cancelled_after_cancel() {
        let ctx = test_ctx();
        ctx.cancellation.cancel();
        assert!(matches!(
            ctx.check_cancelled().unwrap_err(),
            NodeError::Cancelled
        ));
    }

    #[test]
    fn lookup_delegates_to_resolver() {
        let ctx = test_ctx();
        assert_eq!(ctx.lookup("anything"), None);
    }

    #[test]
    fn debug_does_not_panic() {
        let ctx = test_ctx();
        let text = format!("{ctx:?}");
        assert!(text.contains("NodeContext"));
    }
}
