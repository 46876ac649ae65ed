//! Tracing-based logging listeners.
//!
//! [`LoggingRunHooks`] and [`LoggingAgentHooks`] emit one structured
//! `tracing` event per lifecycle event at a configurable [`LogLevel`].
//! Errors are always logged at `WARN`.

use async_trait::async_trait;
use serde_json::Value;

use super::hooks::{AgentHooks, RunHooks};
use crate::agent::RunSnapshot;
use crate::context::RunContext;
use crate::error::Error;
use crate::items::ToolCallItem;
use crate::model::{ModelRequest, ModelResponse};

/// Log verbosity level for lifecycle events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace-level logging (most verbose).
    Trace,
    /// Debug-level logging.
    Debug,
    /// Info-level logging (default).
    #[default]
    Info,
    /// Warn-level logging.
    Warn,
}

/// Emit a log event at the specified level using `tracing` macros.
macro_rules! log_at_level {
    ($level:expr, $($arg:tt)*) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)*),
            LogLevel::Debug => tracing::debug!($($arg)*),
            LogLevel::Info  => tracing::info!($($arg)*),
            LogLevel::Warn  => tracing::warn!($($arg)*),
        }
    };
}

/// A [`RunHooks`] that logs every event via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRunHooks {
    level: LogLevel,
}

impl LoggingRunHooks {
    /// Log at INFO.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at `level`.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }

    /// The configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

#[async_trait]
impl RunHooks for LoggingRunHooks {
    async fn on_agent_start(&self, ctx: &RunContext, agent_name: &str) {
        log_at_level!(
            self.level,
            run_id = %ctx.run_id(),
            agent = agent_name,
            turn = ctx.turn(),
            "Agent started"
        );
    }

    async fn on_agent_end(&self, ctx: &RunContext, agent_name: &str, output: &Value) {
        let usage = ctx.usage();
        log_at_level!(self.level,
            run_id = %ctx.run_id(),
            agent = agent_name,
            turn = ctx.turn(),
            requests = usage.requests,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            total_tokens = usage.total_tokens,
            output = %output,
            "Agent completed"
        );
    }

    async fn on_llm_start(&self, ctx: &RunContext, agent_name: &str, request: &ModelRequest) {
        log_at_level!(
            self.level,
            agent = agent_name,
            turn = ctx.turn(),
            model = %request.model,
            items = request.input.len(),
            tools = request.tools.len(),
            "Model request started"
        );
    }

    async fn on_llm_end(&self, ctx: &RunContext, agent_name: &str, response: &ModelResponse) {
        log_at_level!(self.level,
            agent = agent_name,
            turn = ctx.turn(),
            response_id = ?response.response_id,
            outputs = response.output.len(),
            usage = %response.usage,
            "Model request completed"
        );
    }

    async fn on_tool_start(&self, ctx: &RunContext, agent_name: &str, call: &ToolCallItem) {
        log_at_level!(
            self.level,
            agent = agent_name,
            turn = ctx.turn(),
            tool = %call.name,
            call_id = %call.id,
            "Tool execution started"
        );
    }

    async fn on_tool_end(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        call: &ToolCallItem,
        result: &str,
    ) {
        log_at_level!(
            self.level,
            agent = agent_name,
            turn = ctx.turn(),
            tool = %call.name,
            call_id = %call.id,
            result_len = result.len(),
            "Tool execution completed"
        );
    }

    async fn on_handoff(&self, ctx: &RunContext, from_agent: &str, to_agent: &str) {
        log_at_level!(
            self.level,
            from = from_agent,
            to = to_agent,
            turn = ctx.turn(),
            "Agent handoff"
        );
    }

    async fn on_error(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        error: &Error,
        snapshot: &RunSnapshot,
    ) {
        tracing::warn!(
            run_id = %ctx.run_id(),
            agent = agent_name,
            turns = snapshot.turns,
            items = snapshot.new_items.len(),
            error = %error,
            "Run failed"
        );
    }
}

/// An [`AgentHooks`] that logs the events of one agent via `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAgentHooks {
    level: LogLevel,
}

impl LoggingAgentHooks {
    /// Log at INFO.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at `level`.
    #[must_use]
    pub const fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

#[async_trait]
impl AgentHooks for LoggingAgentHooks {
    async fn on_start(&self, ctx: &RunContext) {
        log_at_level!(self.level, turn = ctx.turn(), "Agent started");
    }

    async fn on_end(&self, ctx: &RunContext, output: &Value) {
        log_at_level!(self.level, turn = ctx.turn(), output = %output, "Agent completed");
    }

    async fn on_tool_start(&self, ctx: &RunContext, call: &ToolCallItem) {
        log_at_level!(
            self.level,
            turn = ctx.turn(),
            tool = %call.name,
            "Tool execution started"
        );
    }

    async fn on_tool_end(&self, ctx: &RunContext, call: &ToolCallItem, result: &str) {
        log_at_level!(
            self.level,
            turn = ctx.turn(),
            tool = %call.name,
            result_len = result.len(),
            "Tool execution completed"
        );
    }

    async fn on_handoff(&self, ctx: &RunContext, to_agent: &str) {
        log_at_level!(self.level, to = to_agent, turn = ctx.turn(), "Agent handoff");
    }

    async fn on_error(&self, ctx: &RunContext, error: &Error) {
        tracing::warn!(turn = ctx.turn(), error = %error, "Agent error");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LoggingRunHooks::new().level(), LogLevel::Info);
        assert_eq!(
            LoggingRunHooks::with_level(LogLevel::Debug).level(),
            LogLevel::Debug
        );
    }

    #[tokio::test]
    async fn logs_under_a_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let ctx = RunContext::new().with_agent_name("a");
        let call = ToolCallItem::new("c", "t", "{}");
        for level in [LogLevel::Trace, LogLevel::Debug, LogLevel::Info, LogLevel::Warn] {
            let hooks = LoggingRunHooks::with_level(level);
            hooks.on_agent_start(&ctx, "a").await;
            hooks.on_tool_start(&ctx, "a", &call).await;
            hooks.on_tool_end(&ctx, "a", &call, "done").await;
            hooks.on_handoff(&ctx, "a", "b").await;
            hooks
                .on_error(&ctx, "a", &Error::Cancelled, &RunSnapshot::default())
                .await;

            let agent_hooks = LoggingAgentHooks::with_level(level);
            agent_hooks.on_start(&ctx).await;
            agent_hooks.on_end(&ctx, &Value::Null).await;
        }
    }
}
