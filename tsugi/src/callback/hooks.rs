//! Core listener traits for run lifecycle events.
//!
//! - [`RunHooks`]: run-level listeners that observe **all** agents in a run.
//! - [`AgentHooks`]: listeners bound to one agent.
//!
//! Both traits use `async_trait` for object safety and provide no-op
//! defaults for every method.
//!
//! # Lifecycle Events
//!
//! 1. **`on_agent_start`**: an agent becomes active (run start, or after a
//!    hand-off)
//! 2. **Turn loop** (repeats until done):
//!    - `on_llm_start` → *model call* → `on_llm_end`
//!    - `on_tool_start` → *tool execution* → `on_tool_end`
//!    - `on_handoff` when the active agent changes
//! 3. **`on_agent_end`** with the final output, or **`on_error`** with a
//!    snapshot of the partial state

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::RunSnapshot;
use crate::context::RunContext;
use crate::error::Error;
use crate::items::ToolCallItem;
use crate::model::{ModelRequest, ModelResponse};

/// A shared, thread-safe [`RunHooks`] trait object.
pub type SharedRunHooks = std::sync::Arc<dyn RunHooks>;

/// A shared, thread-safe [`AgentHooks`] trait object.
pub type SharedAgentHooks = std::sync::Arc<dyn AgentHooks>;

/// Run-level lifecycle listener.
///
/// Every method receives the agent name so listeners can tell agents apart
/// in multi-agent runs.
#[async_trait]
pub trait RunHooks: Send + Sync {
    /// Called when an agent becomes active.
    async fn on_agent_start(&self, _ctx: &RunContext, _agent_name: &str) {}

    /// Called after the final output passed the output guardrails.
    async fn on_agent_end(&self, _ctx: &RunContext, _agent_name: &str, _output: &Value) {}

    /// Called just before a model call.
    async fn on_llm_start(&self, _ctx: &RunContext, _agent_name: &str, _request: &ModelRequest) {}

    /// Called after a model call returned.
    async fn on_llm_end(&self, _ctx: &RunContext, _agent_name: &str, _response: &ModelResponse) {}

    /// Called immediately before a tool is invoked.
    async fn on_tool_start(&self, _ctx: &RunContext, _agent_name: &str, _call: &ToolCallItem) {}

    /// Called after a tool call produced its result text.
    async fn on_tool_end(
        &self,
        _ctx: &RunContext,
        _agent_name: &str,
        _call: &ToolCallItem,
        _result: &str,
    ) {
    }

    /// Called when control moves from one agent to another.
    async fn on_handoff(&self, _ctx: &RunContext, _from_agent: &str, _to_agent: &str) {}

    /// Called once when the run fails with a terminal error.
    async fn on_error(
        &self,
        _ctx: &RunContext,
        _agent_name: &str,
        _error: &Error,
        _snapshot: &RunSnapshot,
    ) {
    }
}

/// Per-agent lifecycle listener.
///
/// Receives only the events of the agent it is attached to.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    /// Called when this agent becomes active.
    async fn on_start(&self, _ctx: &RunContext) {}

    /// Called with this agent's final output.
    async fn on_end(&self, _ctx: &RunContext, _output: &Value) {}

    /// Called just before a model call for this agent.
    async fn on_llm_start(&self, _ctx: &RunContext, _request: &ModelRequest) {}

    /// Called after a model call for this agent returned.
    async fn on_llm_end(&self, _ctx: &RunContext, _response: &ModelResponse) {}

    /// Called immediately before this agent invokes a tool.
    async fn on_tool_start(&self, _ctx: &RunContext, _call: &ToolCallItem) {}

    /// Called after a tool call of this agent produced its result.
    async fn on_tool_end(&self, _ctx: &RunContext, _call: &ToolCallItem, _result: &str) {}

    /// Called when this agent hands off to `to_agent`.
    async fn on_handoff(&self, _ctx: &RunContext, _to_agent: &str) {}

    /// Called when the run fails while this agent is active.
    async fn on_error(&self, _ctx: &RunContext, _error: &Error) {}
}
