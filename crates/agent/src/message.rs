//! The conversation the agent loop maintains: system/user/assistant
//! turns plus tool calls and their results, threaded straight into the
//! next LLM adapter call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call the model asked to make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates this call with its eventual [`Message::Tool`] result.
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One turn of the conversation sent to, or received from, the LLM
/// adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System { content: String },
    User { content: String },
    /// A model turn. Terminal (no further tool calls to make) iff
    /// `tool_calls` is empty.
    Assistant {
        content: String,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    /// The result of invoking one tool call, fed back for the model's
    /// next turn.
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    #[must_use]
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    #[must_use]
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Whether this is an assistant message with no further tool calls —
    /// the agent loop's stop condition.
    #[must_use]
    pub fn is_terminal_assistant(&self) -> bool {
        matches!(self, Self::Assistant { tool_calls, .. } if tool_calls.is_empty())
    }

    /// The tool calls this message requested, if any.
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}
