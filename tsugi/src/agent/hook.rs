//! Dispatch of lifecycle events to run-level and agent-level listeners.

use serde_json::Value;

use super::config::Agent;
use super::result::RunSnapshot;
use crate::callback::{AgentHooks, NoopRunHooks, RunHooks};
use crate::context::RunContext;
use crate::error::Error;
use crate::items::ToolCallItem;
use crate::model::{ModelRequest, ModelResponse};

static NOOP_RUN_HOOKS: NoopRunHooks = NoopRunHooks;

/// The run's listener paired with the active agent's own listener.
///
/// Every event goes to the run hooks first, then to the agent hooks.
#[derive(Clone, Copy)]
pub(crate) struct HookPair<'a> {
    run: &'a dyn RunHooks,
    agent: Option<&'a dyn AgentHooks>,
    agent_name: &'a str,
}

impl<'a> HookPair<'a> {
    pub(crate) fn new(run: Option<&'a dyn RunHooks>, agent: &'a Agent) -> Self {
        Self {
            run: run.unwrap_or(&NOOP_RUN_HOOKS),
            agent: agent.hooks.as_deref(),
            agent_name: &agent.name,
        }
    }

    pub(crate) async fn agent_start(&self, ctx: &RunContext) {
        self.run.on_agent_start(ctx, self.agent_name).await;
        if let Some(h) = self.agent {
            h.on_start(ctx).await;
        }
    }

    pub(crate) async fn agent_end(&self, ctx: &RunContext, output: &Value) {
        self.run.on_agent_end(ctx, self.agent_name, output).await;
        if let Some(h) = self.agent {
            h.on_end(ctx, output).await;
        }
    }

    pub(crate) async fn llm_start(&self, ctx: &RunContext, request: &ModelRequest) {
        self.run.on_llm_start(ctx, self.agent_name, request).await;
        if let Some(h) = self.agent {
            h.on_llm_start(ctx, request).await;
        }
    }

    pub(crate) async fn llm_end(&self, ctx: &RunContext, response: &ModelResponse) {
        self.run.on_llm_end(ctx, self.agent_name, response).await;
        if let Some(h) = self.agent {
            h.on_llm_end(ctx, response).await;
        }
    }

    pub(crate) async fn tool_start(&self, ctx: &RunContext, call: &ToolCallItem) {
        self.run.on_tool_start(ctx, self.agent_name, call).await;
        if let Some(h) = self.agent {
            h.on_tool_start(ctx, call).await;
        }
    }

    pub(crate) async fn tool_end(&self, ctx: &RunContext, call: &ToolCallItem, result: &str) {
        self.run.on_tool_end(ctx, self.agent_name, call, result).await;
        if let Some(h) = self.agent {
            h.on_tool_end(ctx, call, result).await;
        }
    }

    /// Hand-off from this pair's agent to `to`.
    pub(crate) async fn handoff(&self, ctx: &RunContext, to: &str) {
        self.run.on_handoff(ctx, self.agent_name, to).await;
        if let Some(h) = self.agent {
            h.on_handoff(ctx, to).await;
        }
    }

    pub(crate) async fn error(&self, ctx: &RunContext, error: &Error, snapshot: &RunSnapshot) {
        self.run
            .on_error(ctx, self.agent_name, error, snapshot)
            .await;
        if let Some(h) = self.agent {
            h.on_error(ctx, error).await;
        }
    }
}
