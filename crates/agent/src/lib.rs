//! The Agent Tool Loop (`SPEC_FULL.md` §4.F): a bounded LLM
//! tool-calling iteration — call the model, execute any tools it
//! requests, append results, repeat until a terminal message or
//! `max_iterations`.

mod agent_loop;
mod config;
mod dispatcher;
mod error;
mod handler;
mod hooks;
mod llm;
mod message;
mod tool;

pub use agent_loop::{run_agent, AgentOutcome, StopReason, ToolCallRecord};
pub use config::{AgentConfig, ToolErrorStrategy};
pub use dispatcher::ToolExecutor;
pub use error::AgentError;
pub use handler::AgentNodeHandler;
pub use hooks::{AgentHooks, AgentToolEvent, NoopAgentHooks};
pub use llm::{LlmAdapter, ModelRef};
pub use message::{Message, ToolCall};
pub use tool::{validate_and_coerce, ArgumentError, ToolDefinition};
