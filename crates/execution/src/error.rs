//! Errors the queue state machine can raise.

use loomwork_core::NodeId;
use thiserror::Error;

use crate::state::NodeState;

/// An attempted queue transition that violates the state machine's
/// invariants.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueueError {
    /// The node wasn't in the state the requested transition starts from.
    #[error("node {node_id} is {actual:?}, expected {expected:?} to {attempted:?}")]
    InvalidTransition {
        node_id: NodeId,
        actual: NodeState,
        expected: NodeState,
        attempted: NodeState,
    },

    /// The node id isn't part of this workflow.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}
