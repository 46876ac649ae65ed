//! Channel-backed listener.
//!
//! [`ChannelRunHooks`] turns every lifecycle event into a [`RunEvent`] and
//! sends it into an unbounded `tokio` mpsc channel, so consumers subscribe
//! to a stream of events instead of implementing a trait. Events sent after
//! the receiver was dropped are discarded.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::hooks::RunHooks;
use crate::agent::RunSnapshot;
use crate::context::RunContext;
use crate::error::Error;
use crate::items::ToolCallItem;
use crate::model::{ModelRequest, ModelResponse};
use crate::usage::Usage;

/// A lifecycle event of a run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum RunEvent {
    /// An agent became active.
    AgentStarted {
        /// Agent name.
        agent: String,
        /// Turn number.
        turn: usize,
    },
    /// The run produced its final output.
    AgentEnded {
        /// Agent name.
        agent: String,
        /// Final output.
        output: Value,
    },
    /// A model call is about to start.
    LlmStarted {
        /// Agent name.
        agent: String,
        /// Turn number.
        turn: usize,
        /// Model name.
        model: String,
    },
    /// A model call returned.
    LlmEnded {
        /// Agent name.
        agent: String,
        /// Provider response id.
        response_id: Option<String>,
        /// Usage delta of the call.
        usage: Usage,
    },
    /// A tool is about to run.
    ToolStarted {
        /// Agent name.
        agent: String,
        /// The call.
        call: ToolCallItem,
    },
    /// A tool produced its result.
    ToolEnded {
        /// Agent name.
        agent: String,
        /// The call.
        call: ToolCallItem,
        /// Model-visible result text.
        result: String,
    },
    /// Control moved to another agent.
    Handoff {
        /// Source agent.
        from: String,
        /// Target agent.
        to: String,
    },
    /// The run failed.
    Error {
        /// Agent active at the time.
        agent: String,
        /// Rendered error.
        error: String,
        /// Partial state at the time of failure.
        snapshot: Box<RunSnapshot>,
    },
}

/// A [`RunHooks`] forwarding events into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelRunHooks {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelRunHooks {
    /// Create the listener and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Create a listener sending into an existing channel.
    #[must_use]
    pub const fn from_sender(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: RunEvent) {
        // The receiver going away is not an error for the run.
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl RunHooks for ChannelRunHooks {
    async fn on_agent_start(&self, ctx: &RunContext, agent_name: &str) {
        self.emit(RunEvent::AgentStarted {
            agent: agent_name.to_owned(),
            turn: ctx.turn(),
        });
    }

    async fn on_agent_end(&self, _ctx: &RunContext, agent_name: &str, output: &Value) {
        self.emit(RunEvent::AgentEnded {
            agent: agent_name.to_owned(),
            output: output.clone(),
        });
    }

    async fn on_llm_start(&self, ctx: &RunContext, agent_name: &str, request: &ModelRequest) {
        self.emit(RunEvent::LlmStarted {
            agent: agent_name.to_owned(),
            turn: ctx.turn(),
            model: request.model.clone(),
        });
    }

    async fn on_llm_end(&self, _ctx: &RunContext, agent_name: &str, response: &ModelResponse) {
        self.emit(RunEvent::LlmEnded {
            agent: agent_name.to_owned(),
            response_id: response.response_id.clone(),
            usage: response.usage.clone(),
        });
    }

    async fn on_tool_start(&self, _ctx: &RunContext, agent_name: &str, call: &ToolCallItem) {
        self.emit(RunEvent::ToolStarted {
            agent: agent_name.to_owned(),
            call: call.clone(),
        });
    }

    async fn on_tool_end(
        &self,
        _ctx: &RunContext,
        agent_name: &str,
        call: &ToolCallItem,
        result: &str,
    ) {
        self.emit(RunEvent::ToolEnded {
            agent: agent_name.to_owned(),
            call: call.clone(),
            result: result.to_owned(),
        });
    }

    async fn on_handoff(&self, _ctx: &RunContext, from_agent: &str, to_agent: &str) {
        self.emit(RunEvent::Handoff {
            from: from_agent.to_owned(),
            to: to_agent.to_owned(),
        });
    }

    async fn on_error(
        &self,
        _ctx: &RunContext,
        agent_name: &str,
        error: &Error,
        snapshot: &RunSnapshot,
    ) {
        self.emit(RunEvent::Error {
            agent: agent_name.to_owned(),
            error: error.to_string(),
            snapshot: Box::new(snapshot.clone()),
        });
    }
}
