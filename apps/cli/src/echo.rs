//! A trivial `echo`-typed [`NodeHandler`]: returns its resolved input
//! unchanged. Registered by default so a workflow definition can be run
//! end to end without an embedder supplying any side-effecting handlers.

use async_trait::async_trait;
use loomwork_action::{NodeContext, NodeError, NodeHandler, NodeOutcome};
use serde_json::Value;

pub struct EchoHandler;

#[async_trait]
impl NodeHandler for EchoHandler {
    async fn execute(&self, input: Value, _ctx: NodeContext) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::new(input))
    }
}
