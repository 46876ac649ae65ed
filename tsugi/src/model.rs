//! Model seam: the provider-facing request/response types and traits.
//!
//! The engine never talks to a wire protocol. It builds a [`ModelRequest`]
//! per turn and hands it to a [`Model`] obtained from a [`ModelProvider`].
//! Transport, retries and streaming belong to the implementations.
//!
//! [`mock`] contains a scripted implementation used by the test suite.

pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::OutputSchema;
use crate::error::Result;
use crate::items::{RunItem, ToolCallItem, ToolCallOutputItem};
use crate::tool::ToolDefinition;
use crate::usage::Usage;

/// Controls how the model uses tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides whether to use tools.
    #[default]
    Auto,
    /// Model must use at least one tool.
    Required,
    /// Model cannot use any tools.
    None,
    /// Model must use the named tool.
    Tool(String),
}

impl ToolChoice {
    /// Converts to the common JSON representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Auto => Value::String("auto".to_owned()),
            Self::Required => Value::String("required".to_owned()),
            Self::None => Value::String("none".to_owned()),
            Self::Tool(name) => serde_json::json!({
                "type": "function",
                "function": {"name": name}
            }),
        }
    }
}

impl From<&str> for ToolChoice {
    fn from(s: &str) -> Self {
        match s {
            "auto" => Self::Auto,
            "required" => Self::Required,
            "none" => Self::None,
            name => Self::Tool(name.to_owned()),
        }
    }
}

/// Sampling and tool-use settings for a model call.
///
/// Every field is optional; unset fields fall back to the provider default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Maximum number of output tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool choice policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether the model may emit several tool calls per response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
}

impl ModelSettings {
    /// Empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-p.
    #[must_use]
    pub const fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the output token limit.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the tool choice.
    #[must_use]
    pub fn tool_choice(mut self, choice: impl Into<ToolChoice>) -> Self {
        self.tool_choice = Some(choice.into());
        self
    }

    /// Allow or forbid parallel tool calls.
    #[must_use]
    pub const fn parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    /// Overlay `overrides` on top of these settings.
    ///
    /// Fields set in `overrides` win; unset fields keep this value.
    #[must_use]
    pub fn resolve(&self, overrides: Option<&Self>) -> Self {
        let Some(o) = overrides else {
            return self.clone();
        };
        Self {
            temperature: o.temperature.or(self.temperature),
            top_p: o.top_p.or(self.top_p),
            max_tokens: o.max_tokens.or(self.max_tokens),
            tool_choice: o.tool_choice.clone().or_else(|| self.tool_choice.clone()),
            parallel_tool_calls: o.parallel_tool_calls.or(self.parallel_tool_calls),
        }
    }
}

/// Everything a model needs for one turn.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model name.
    pub model: String,
    /// System instructions of the active agent.
    pub instructions: Option<String>,
    /// The full ordered item log: original input plus generated items.
    pub input: Vec<RunItem>,
    /// Resolved model settings.
    pub settings: ModelSettings,
    /// Agent tools plus one synthesized tool per hand-off target.
    pub tools: Vec<ToolDefinition>,
    /// Structured output descriptor, if the agent declares one.
    pub output_schema: Option<OutputSchema>,
}

impl ModelRequest {
    /// Returns the tool names offered in this request.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDefinition::name).collect()
    }
}

/// One element of a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Assistant text.
    Message {
        /// Message text.
        content: String,
    },
    /// A tool call to be executed by the engine.
    ToolCall(ToolCallItem),
    /// A tool result produced by the provider itself (hosted tools).
    ToolCallOutput(ToolCallOutputItem),
    /// Reasoning summary.
    Reasoning {
        /// Reasoning text.
        content: String,
    },
}

impl OutputItem {
    /// An assistant message.
    #[must_use]
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    /// A tool call.
    #[must_use]
    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::ToolCall(ToolCallItem::new(id, name, arguments))
    }
}

/// A complete model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Output elements in emission order.
    pub output: Vec<OutputItem>,
    /// Usage delta of this call.
    #[serde(default)]
    pub usage: Usage,
    /// Opaque provider response identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    /// Provider-specific metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ModelResponse {
    /// A response with the given output elements.
    #[must_use]
    pub fn new(output: Vec<OutputItem>) -> Self {
        Self {
            output,
            ..Self::default()
        }
    }

    /// A response carrying one assistant message.
    #[must_use]
    pub fn message(content: impl Into<String>) -> Self {
        Self::new(vec![OutputItem::message(content)])
    }

    /// Set the usage delta.
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Set the response identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    /// Attach provider metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Tool calls in this response.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallItem> {
        self.output.iter().filter_map(|o| match o {
            OutputItem::ToolCall(call) => Some(call),
            _ => None,
        })
    }

    /// Text of the last output element, if it is a message.
    #[must_use]
    pub fn final_text(&self) -> Option<&str> {
        match self.output.last()? {
            OutputItem::Message { content } => Some(content),
            _ => None,
        }
    }
}

/// A language model.
#[async_trait]
pub trait Model: Send + Sync {
    /// Perform one model call.
    ///
    /// # Errors
    ///
    /// Transport failures are reported as [`Error::System`](crate::Error::System).
    async fn get_response(&self, request: &ModelRequest) -> Result<ModelResponse>;
}

/// Resolves model names to [`Model`] handles.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Look up a model by name.
    ///
    /// # Errors
    ///
    /// Unknown names are reported as [`Error::UserError`](crate::Error::UserError).
    async fn get_model(&self, name: &str) -> Result<SharedModel>;
}

/// A shared, thread-safe [`Model`] trait object.
pub type SharedModel = Arc<dyn Model>;

/// A shared, thread-safe [`ModelProvider`] trait object.
pub type SharedModelProvider = Arc<dyn ModelProvider>;
