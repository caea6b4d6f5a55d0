//! Workflow definitions, the dependency graph, and the workflow builder
//! (component A of the execution engine).
//!
//! A [`WorkflowDefinition`] is what a user authors: nodes, edges, and
//! metadata. [`build`] validates it and produces a [`BuiltWorkflow`], the
//! only form the scheduler (in `loomwork-engine`) ever runs.

mod built;
mod builder;
mod definition;
mod error;
mod graph;

pub use built::{BuiltWorkflow, ExecutableNode, LoopContext};
pub use builder::build;
pub use definition::{Edge, HandleType, NodeDefinition, NodeType, WorkflowConfig, WorkflowDefinition};
pub use error::BuildError;
pub use graph::DependencyGraph;
