//! Conversation item model.
//!
//! A run's transcript is an ordered list of [`RunItem`]s. The set of item
//! kinds is closed and every consumer matches on it exhaustively.
//!
//! # Pairing invariant
//!
//! Every [`RunItem::ToolCall`] and [`RunItem::HandoffCall`] must eventually be
//! followed by exactly one [`RunItem::ToolCallOutput`] with the same call id.
//! A run has a final output only when the last item is an assistant message
//! and no call is left unpaired (see [`has_final_output`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool call issued by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallItem {
    /// Provider-assigned call identifier.
    pub id: String,
    /// Name of the called tool.
    pub name: String,
    /// Raw JSON arguments as emitted by the model.
    pub arguments: String,
}

impl ToolCallItem {
    /// Create a tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the raw arguments as JSON.
    ///
    /// Empty arguments are treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the arguments are not valid JSON.
    pub fn arguments_json(&self) -> serde_json::Result<Value> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.arguments)
    }
}

/// The result paired with a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallOutputItem {
    /// Identifier of the call this result answers.
    pub call_id: String,
    /// Model-visible result text (the formatted error on failure).
    pub output: String,
    /// Whether the call failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallOutputItem {
    /// A successful result.
    #[must_use]
    pub fn success(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            is_error: false,
        }
    }

    /// A failed result.
    #[must_use]
    pub fn error(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            is_error: true,
        }
    }
}

/// The outcome of resolving a hand-off call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffOutputItem {
    /// Identifier of the hand-off call.
    pub call_id: String,
    /// Source agent name.
    pub from: String,
    /// Target agent name, `None` when resolution failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Resolution error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandoffOutputItem {
    /// Returns `true` if the hand-off switched agents.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.to.is_some() && self.error.is_none()
    }
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunItem {
    /// Caller-supplied user message.
    UserMessage {
        /// Message text.
        content: String,
    },
    /// Assistant message produced by an agent.
    AssistantMessage {
        /// Message text.
        content: String,
        /// Name of the agent that produced it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
    },
    /// An ordinary tool call.
    ToolCall(ToolCallItem),
    /// The result of a tool or hand-off call.
    ToolCallOutput(ToolCallOutputItem),
    /// A call of a synthesized hand-off tool.
    HandoffCall {
        /// The underlying tool call.
        call: ToolCallItem,
        /// Name of the agent that issued it.
        from: String,
    },
    /// The outcome of a hand-off.
    HandoffOutput(HandoffOutputItem),
    /// Model reasoning summary.
    Reasoning {
        /// Reasoning text.
        content: String,
    },
    /// A tool call waiting for a human decision.
    ApprovalRequest {
        /// The call that needs approval.
        call: ToolCallItem,
        /// Name of the agent that issued it.
        agent: String,
    },
}

impl RunItem {
    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
        }
    }

    /// An assistant message without agent attribution.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::AssistantMessage {
            content: content.into(),
            agent: None,
        }
    }

    /// Returns the item kind as a static string.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserMessage { .. } => "user_message",
            Self::AssistantMessage { .. } => "assistant_message",
            Self::ToolCall(_) => "tool_call",
            Self::ToolCallOutput(_) => "tool_call_output",
            Self::HandoffCall { .. } => "handoff_call",
            Self::HandoffOutput(_) => "handoff_output",
            Self::Reasoning { .. } => "reasoning",
            Self::ApprovalRequest { .. } => "approval_request",
        }
    }

    /// Text content of message and reasoning items.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::UserMessage { content }
            | Self::AssistantMessage { content, .. }
            | Self::Reasoning { content } => Some(content),
            Self::ToolCall(_)
            | Self::ToolCallOutput(_)
            | Self::HandoffCall { .. }
            | Self::HandoffOutput(_)
            | Self::ApprovalRequest { .. } => None,
        }
    }

    /// The call carried by a tool-call or hand-off-call item.
    ///
    /// Approval requests are not calls of their own; they refer to a call
    /// already in the log.
    #[must_use]
    pub const fn as_call(&self) -> Option<&ToolCallItem> {
        match self {
            Self::ToolCall(call) | Self::HandoffCall { call, .. } => Some(call),
            Self::UserMessage { .. }
            | Self::AssistantMessage { .. }
            | Self::ToolCallOutput(_)
            | Self::HandoffOutput(_)
            | Self::Reasoning { .. }
            | Self::ApprovalRequest { .. } => None,
        }
    }

    /// Returns `true` for assistant messages.
    #[must_use]
    pub const fn is_assistant_message(&self) -> bool {
        matches!(self, Self::AssistantMessage { .. })
    }
}

/// Returns `true` if every call in `items` has exactly one paired result.
#[must_use]
pub fn calls_are_paired(items: &[RunItem]) -> bool {
    let mut outputs: HashMap<&str, usize> = HashMap::new();
    for item in items {
        if let RunItem::ToolCallOutput(out) = item {
            *outputs.entry(out.call_id.as_str()).or_default() += 1;
        }
    }
    items
        .iter()
        .filter_map(RunItem::as_call)
        .all(|call| outputs.get(call.id.as_str()) == Some(&1))
}

/// The termination predicate of the turn loop.
///
/// Holds when the most recent item is an assistant message and every call
/// in the log has exactly one result.
#[must_use]
pub fn has_final_output(items: &[RunItem]) -> bool {
    items.last().is_some_and(RunItem::is_assistant_message) && calls_are_paired(items)
}

/// Input of a run: plain text or a prepared item list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunInput {
    /// A single user message.
    Text(String),
    /// A list of items, for example [`RunResult::to_input_list`](crate::agent::RunResult::to_input_list)
    /// of a previous run.
    Items(Vec<RunItem>),
}

impl RunInput {
    /// Convert into the item list the run starts from.
    #[must_use]
    pub fn into_items(self) -> Vec<RunItem> {
        match self {
            Self::Text(text) => vec![RunItem::user(text)],
            Self::Items(items) => items,
        }
    }
}

impl From<&str> for RunInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for RunInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<RunItem>> for RunInput {
    fn from(items: Vec<RunItem>) -> Self {
        Self::Items(items)
    }
}
