//! The engine's closed error taxonomy, wrapping every sub-crate error it
//! can surface behind one type.

use loomwork_action::NodeError;
use loomwork_core::NodeId;
use loomwork_execution::QueueError;
use loomwork_expression::ExpressionError;
use loomwork_workflow::BuildError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("workflow failed to build: {0:?}")]
    Build(Vec<BuildError>),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("node '{node_id}' has no registered handler for type {node_type}")]
    HandlerNotFound { node_id: NodeId, node_type: String },

    #[error("node '{node_id}' failed: {error}")]
    NodeFailed { node_id: NodeId, error: NodeError },

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("execution cancelled")]
    Cancelled,

    #[error("execution exceeded its wall-time budget")]
    WallTimeExceeded,

    #[error("loop node '{node_id}' is missing a resolved loop context")]
    LoopContextMissing { node_id: NodeId },

    #[error("loop node '{node_id}' config is invalid: {reason}")]
    InvalidLoopConfig { node_id: NodeId, reason: String },

    #[error("transform node '{node_id}' config is invalid: {reason}")]
    InvalidTransformConfig { node_id: NodeId, reason: String },
}

impl From<Vec<BuildError>> for EngineError {
    fn from(errors: Vec<BuildError>) -> Self {
        Self::Build(errors)
    }
}
