//! Execution-time state (component C of the execution engine): the
//! context snapshot every node reads from, and the pure queue state
//! machine the scheduler drives.

mod context;
mod error;
mod queue;
mod state;
mod status;
mod summary;

pub use context::ContextSnapshot;
pub use error::QueueError;
pub use queue::QueueState;
pub use state::{NodeRuntimeState, NodeState};
pub use status::ExecutionStatus;
pub use summary::ExecutionSummary;
