//! The node handler contract: the boundary between the scheduler (in
//! `loomwork-engine`) and concrete node implementations.

mod budget;
mod context;
mod error;
mod handler;
mod result;

pub use budget::ExecutionBudget;
pub use context::{ContextRef, NodeContext};
pub use error::{NodeError, NodeErrorKind};
pub use handler::NodeHandler;
pub use result::{NodeMetrics, NodeOutcome, Signals};
