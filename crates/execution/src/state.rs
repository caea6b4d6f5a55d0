//! The per-node state a [`crate::queue::QueueState`] tracks.

use chrono::{DateTime, Utc};
use loomwork_action::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of states a node can be in during one execution.
///
/// Exactly six variants, matching the queue's six disjoint id-sets —
/// there is no separate "retrying" or "cancelled" node state. A retry
/// re-enters `Ready` from `Failed`; cancellation is handled at the
/// execution level, not per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeState {
    Pending,
    Ready,
    Executing,
    Completed,
    Failed,
    Skipped,
}

/// Everything the queue knows about one node at a point in time.
#[derive(Debug, Clone)]
pub struct NodeRuntimeState {
    pub status: NodeState,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output: Option<Value>,
    pub error: Option<NodeError>,
    pub retry_count: u32,
}

impl NodeRuntimeState {
    pub(crate) fn new(status: NodeState) -> Self {
        Self {
            status,
            started_at: None,
            completed_at: None,
            output: None,
            error: None,
            retry_count: 0,
        }
    }
}
