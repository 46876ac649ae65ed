//! Per-run configuration.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::approval::SharedApprovalHandler;
use crate::callback::SharedRunHooks;
use crate::context::ContextPayload;
use crate::guardrail::{InputGuardrail, OutputGuardrail};
use crate::model::{ModelSettings, SharedModelProvider};
use crate::session::SharedSession;

/// Order in which the results of one turn's concurrent tool calls are
/// appended to the item log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ToolResultOrder {
    /// Append each result as soon as its call finishes.
    #[default]
    Completion,
    /// Buffer results and append them in the order the model issued the calls.
    Submission,
}

/// Run-level configuration.
///
/// Immutable for the duration of a run. Everything has a usable default
/// except the model provider, which a run cannot do without.
#[derive(Clone)]
pub struct RunConfig {
    pub(crate) max_turns: usize,
    pub(crate) run_timeout: Option<Duration>,
    pub(crate) model_timeout: Option<Duration>,
    pub(crate) provider: Option<SharedModelProvider>,
    pub(crate) model: Option<String>,
    pub(crate) model_settings: Option<ModelSettings>,
    pub(crate) session: Option<SharedSession>,
    pub(crate) session_limit: Option<usize>,
    pub(crate) context: Option<ContextPayload>,
    pub(crate) input_guardrails: Vec<InputGuardrail>,
    pub(crate) output_guardrails: Vec<OutputGuardrail>,
    pub(crate) hooks: Option<SharedRunHooks>,
    pub(crate) max_tool_concurrency: Option<usize>,
    pub(crate) tool_result_order: ToolResultOrder,
    pub(crate) escalate_tool_tripwires: bool,
    pub(crate) approval_handler: Option<SharedApprovalHandler>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: Self::DEFAULT_MAX_TURNS,
            run_timeout: None,
            model_timeout: Some(Self::DEFAULT_MODEL_TIMEOUT),
            provider: None,
            model: None,
            model_settings: None,
            session: None,
            session_limit: None,
            context: None,
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            hooks: None,
            max_tool_concurrency: None,
            tool_result_order: ToolResultOrder::default(),
            escalate_tool_tripwires: true,
            approval_handler: None,
            cancellation: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("max_turns", &self.max_turns)
            .field("run_timeout", &self.run_timeout)
            .field("model_timeout", &self.model_timeout)
            .field("provider", &self.provider.is_some())
            .field("model", &self.model)
            .field("model_settings", &self.model_settings)
            .field("session", &self.session.as_ref().map(|s| s.id().to_owned()))
            .field("session_limit", &self.session_limit)
            .field("context", &self.context.is_some())
            .field("input_guardrails", &self.input_guardrails)
            .field("output_guardrails", &self.output_guardrails)
            .field("hooks", &self.hooks.is_some())
            .field("max_tool_concurrency", &self.max_tool_concurrency)
            .field("tool_result_order", &self.tool_result_order)
            .field("escalate_tool_tripwires", &self.escalate_tool_tripwires)
            .field("approval_handler", &self.approval_handler.is_some())
            .field("cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl RunConfig {
    /// Default turn budget.
    pub const DEFAULT_MAX_TURNS: usize = 10;

    /// Default per-model-call timeout.
    pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the turn budget.
    #[must_use]
    pub const fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Bound the whole turn loop.
    #[must_use]
    pub const fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Bound every single model call.
    #[must_use]
    pub const fn model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    /// Let model calls run without a per-call bound.
    #[must_use]
    pub const fn without_model_timeout(mut self) -> Self {
        self.model_timeout = None;
        self
    }

    /// Set the model provider.
    #[must_use]
    pub fn provider(mut self, provider: SharedModelProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `model` for every agent in this run.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Settings merged over each agent's own settings.
    #[must_use]
    pub fn model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = Some(settings);
        self
    }

    /// Load history from and save new items to `session`.
    #[must_use]
    pub fn session(mut self, session: SharedSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Load at most `limit` history items from the session.
    #[must_use]
    pub const fn session_limit(mut self, limit: usize) -> Self {
        self.session_limit = Some(limit);
        self
    }

    /// Caller data available to tools and guardrails through
    /// [`RunContext::payload`](crate::context::RunContext::payload).
    #[must_use]
    pub fn context<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.context = Some(Arc::new(payload));
        self
    }

    /// Add an input guardrail that applies to every run with this config.
    #[must_use]
    pub fn input_guardrail(mut self, guardrail: InputGuardrail) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    /// Add an output guardrail that applies to every run with this config.
    #[must_use]
    pub fn output_guardrail(mut self, guardrail: OutputGuardrail) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    /// Set run-level lifecycle hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: SharedRunHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Run at most `limit` tool calls of one turn at the same time.
    #[must_use]
    pub const fn max_tool_concurrency(mut self, limit: usize) -> Self {
        self.max_tool_concurrency = Some(limit);
        self
    }

    /// Set the order tool results are appended in.
    #[must_use]
    pub const fn tool_result_order(mut self, order: ToolResultOrder) -> Self {
        self.tool_result_order = order;
        self
    }

    /// Whether a tool guardrail `raise` fails the run (`true`, the default)
    /// or becomes an error result for that call.
    #[must_use]
    pub const fn escalate_tool_tripwires(mut self, escalate: bool) -> Self {
        self.escalate_tool_tripwires = escalate;
        self
    }

    /// Ask `handler` about tool calls the approval ledger has no decision for.
    #[must_use]
    pub fn approval_handler(mut self, handler: SharedApprovalHandler) -> Self {
        self.approval_handler = Some(handler);
        self
    }

    /// Stop the run with [`Error::Cancelled`](crate::Error::Cancelled) once
    /// `token` is cancelled.
    #[must_use]
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns the turn budget.
    #[must_use]
    pub const fn get_max_turns(&self) -> usize {
        self.max_turns
    }

    /// Returns the overall run timeout.
    #[must_use]
    pub const fn get_run_timeout(&self) -> Option<Duration> {
        self.run_timeout
    }

    /// Returns the per-model-call timeout.
    #[must_use]
    pub const fn get_model_timeout(&self) -> Option<Duration> {
        self.model_timeout
    }

    /// Returns the tool result order.
    #[must_use]
    pub const fn get_tool_result_order(&self) -> ToolResultOrder {
        self.tool_result_order
    }
}
