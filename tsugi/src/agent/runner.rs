//! Runner, the agent execution engine.
//!
//! The [`Runner`] drives an [`Agent`] through its turn loop:
//!
//! 1. Load session history and run blocking input guardrails
//! 2. Build a model request from the item log and the active agent
//! 3. Call the model (racing parallel input guardrails on the first turn)
//! 4. Classify the response into items; split hand-off calls from ordinary calls
//! 5. Resolve the first hand-off, or execute the ordinary calls
//! 6. Loop until the log ends in an assistant message with every call answered
//!
//! All per-run state lives in [`RunState`]. The state stays outside the
//! overall timeout so a failed run can still hand its partial state to the
//! error listeners.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span};

use super::config::Agent;
use super::guardrails;
use super::handoff::{self, EXTRA_HANDOFF_SKIPPED, TOOL_SKIPPED_FOR_HANDOFF};
use super::hook::HookPair;
use super::invoker::ToolInvoker;
use super::options::RunConfig;
use super::result::{RunResult, RunSnapshot};
use crate::callback::RunHooks;
use crate::context::RunContext;
use crate::error::{Error, Result, TimeoutScope};
use crate::guardrail::{InputGuardrail, InputGuardrailResult, OutputGuardrail};
use crate::items::{RunInput, RunItem, ToolCallItem, has_final_output};
use crate::model::{Model, ModelRequest, ModelResponse, OutputItem, SharedModel};

/// A model response split into log items and the calls that need handling.
#[derive(Debug, Default)]
struct Classified {
    items: Vec<RunItem>,
    handoffs: Vec<ToolCallItem>,
    calls: Vec<ToolCallItem>,
}

/// Split `response` into log items, hand-off calls and ordinary calls.
///
/// Calls the provider already answered within the same response (hosted
/// tools) are logged but not executed.
fn classify(agent: &Agent, response: &ModelResponse) -> Classified {
    let answered: HashSet<&str> = response
        .output
        .iter()
        .filter_map(|o| match o {
            OutputItem::ToolCallOutput(out) => Some(out.call_id.as_str()),
            _ => None,
        })
        .collect();

    let mut classified = Classified::default();
    for output in &response.output {
        match output {
            OutputItem::Message { content } => classified.items.push(RunItem::AssistantMessage {
                content: content.clone(),
                agent: Some(agent.name.clone()),
            }),
            OutputItem::ToolCall(call) if agent.is_handoff_call(&call.name) => {
                classified.items.push(RunItem::HandoffCall {
                    call: call.clone(),
                    from: agent.name.clone(),
                });
                classified.handoffs.push(call.clone());
            }
            OutputItem::ToolCall(call) => {
                classified.items.push(RunItem::ToolCall(call.clone()));
                if !answered.contains(call.id.as_str()) {
                    classified.calls.push(call.clone());
                }
            }
            OutputItem::ToolCallOutput(out) => {
                classified.items.push(RunItem::ToolCallOutput(out.clone()));
            }
            OutputItem::Reasoning { content } => classified.items.push(RunItem::Reasoning {
                content: content.clone(),
            }),
        }
    }
    classified
}

/// Every piece of mutable state of a single run.
struct RunState<'a> {
    config: &'a RunConfig,
    run_hooks: Option<&'a dyn RunHooks>,
    agent: &'a Agent,
    context: RunContext,
    history: Vec<RunItem>,
    input: Vec<RunItem>,
    new_items: Vec<RunItem>,
    raw_responses: Vec<ModelResponse>,
    turn: usize,
    models: HashMap<String, SharedModel>,
    input_guardrail_results: Vec<InputGuardrailResult>,
    parallel_guardrails: Vec<&'a InputGuardrail>,
}

impl<'a> RunState<'a> {
    fn new(agent: &'a Agent, input: Vec<RunItem>, config: &'a RunConfig) -> Self {
        let context =
            RunContext::with_payload(config.context.clone()).with_agent_name(&agent.name);
        Self {
            config,
            run_hooks: config.hooks.as_deref(),
            agent,
            context,
            history: Vec::new(),
            input,
            new_items: Vec::new(),
            raw_responses: Vec::new(),
            turn: 0,
            models: HashMap::new(),
            input_guardrail_results: Vec::new(),
            parallel_guardrails: Vec::new(),
        }
    }

    fn hooks(&self) -> HookPair<'a> {
        HookPair::new(self.run_hooks, self.agent)
    }

    /// The first request's item list: session history plus caller input.
    fn initial_items(&self) -> Vec<RunItem> {
        self.history.iter().chain(&self.input).cloned().collect()
    }

    /// Load session history and run the blocking input guardrails.
    async fn prepare(&mut self) -> Result<()> {
        let (agent, config) = (self.agent, self.config);
        if let Some(session) = &config.session {
            self.history = session.get_items(config.session_limit).await?;
            debug!(session = session.id(), items = self.history.len(), "Loaded session history");
        }

        let all: Vec<&'a InputGuardrail> = agent
            .input_guardrails
            .iter()
            .chain(&config.input_guardrails)
            .collect();
        let (parallel, blocking): (Vec<_>, Vec<_>) = all.into_iter().partition(|g| g.is_parallel());
        self.parallel_guardrails = parallel;

        if !blocking.is_empty() {
            let items = self.initial_items();
            let results =
                guardrails::run_blocking_input(&blocking, &self.context, &self.agent.name, &items)
                    .await?;
            self.input_guardrail_results.extend(results);
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.config.cancellation {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    /// Model name for the active agent; the run-level override wins.
    fn model_name(&self) -> &'a str {
        let (config, agent) = (self.config, self.agent);
        config.model.as_deref().unwrap_or(&agent.model)
    }

    /// Resolve the model for the active agent, caching handles by name.
    async fn resolve_model(&mut self) -> Result<SharedModel> {
        let name = self.model_name();
        if name.is_empty() {
            return Err(Error::user(format!(
                "Agent '{}' has no model configured",
                self.agent.name
            )));
        }
        if let Some(model) = self.models.get(name) {
            return Ok(SharedModel::clone(model));
        }

        let provider = self.config.provider.as_deref().ok_or_else(|| {
            Error::user(format!(
                "No model provider configured. Call RunConfig::provider() before running '{}'.",
                self.agent.name
            ))
        })?;
        let model = provider.get_model(name).await?;
        self.models.insert(name.to_owned(), SharedModel::clone(&model));
        Ok(model)
    }

    fn build_request(&self, model: String) -> ModelRequest {
        let agent = self.agent;
        ModelRequest {
            model,
            instructions: agent.instructions.clone(),
            input: self
                .history
                .iter()
                .chain(&self.input)
                .chain(&self.new_items)
                .cloned()
                .collect(),
            settings: agent.model_settings.resolve(self.config.model_settings.as_ref()),
            tools: agent.tool_definitions(&self.context),
            output_schema: agent.output_schema.clone(),
        }
    }

    /// One model call bounded by the per-call timeout and the cancellation token.
    async fn call_model(&self, model: &dyn Model, request: &ModelRequest) -> Result<ModelResponse> {
        let call = async {
            match self.config.model_timeout {
                Some(limit) => tokio::time::timeout(limit, model.get_response(request))
                    .await
                    .map_err(|_| Error::timeout(TimeoutScope::ModelCall, limit))?,
                None => model.get_response(request).await,
            }
        };

        match &self.config.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(Error::Cancelled),
                response = call => response,
            },
            None => call.await,
        }
    }

    /// Perform exactly one turn.
    async fn execute_turn(&mut self) -> Result<()> {
        self.turn = self.context.advance_turn();
        let turn = self.turn;
        let agent = self.agent;
        let hooks = self.hooks();
        debug!(agent = %agent.name, turn, "Starting turn");

        let model = self.resolve_model().await?;
        let request = self.build_request(self.model_name().to_owned());

        hooks.llm_start(&self.context, &request).await;

        let response = if turn == 1 && !self.parallel_guardrails.is_empty() {
            let (guardrail_results, response) = tokio::join!(
                guardrails::run_parallel_input(
                    &self.parallel_guardrails,
                    &self.context,
                    &agent.name,
                    &request.input,
                ),
                self.call_model(model.as_ref(), &request),
            );
            // A tripwire wins over whatever the model returned.
            self.input_guardrail_results.extend(guardrail_results?);
            response
        } else {
            self.call_model(model.as_ref(), &request).await
        }
        .map_err(|e| {
            error!(error = %e, agent = %agent.name, turn, "Model call failed");
            e
        })?;

        hooks.llm_end(&self.context, &response).await;
        // Every model call counts as a request, whatever the provider reports.
        let mut delta = response.usage.clone();
        delta.requests = delta.requests.max(1);
        self.context.add_usage(&delta.with_request_entry());

        let classified = classify(agent, &response);
        self.new_items.extend(classified.items);
        self.raw_responses.push(response);

        if let Some((first, rest)) = classified.handoffs.split_first() {
            let outcome = handoff::resolve(agent, first);
            self.new_items.extend(outcome.items);
            self.new_items.extend(
                rest.iter()
                    .map(|call| handoff::skipped(call, EXTRA_HANDOFF_SKIPPED)),
            );
            self.new_items.extend(
                classified
                    .calls
                    .iter()
                    .map(|call| handoff::skipped(call, TOOL_SKIPPED_FOR_HANDOFF)),
            );

            if let Some(target) = outcome.target {
                hooks.handoff(&self.context, &target.name).await;
                self.agent = target;
                self.context.set_agent_name(&target.name);
                self.hooks().agent_start(&self.context).await;
            }
            return Ok(());
        }

        if !classified.calls.is_empty() {
            let invoker = ToolInvoker::new(
                agent,
                &self.context,
                hooks,
                self.config.approval_handler.as_deref(),
                self.config.escalate_tool_tripwires,
            );
            let calls: Vec<&ToolCallItem> = classified.calls.iter().collect();
            let produced = invoker
                .invoke_all(
                    &calls,
                    self.config.max_tool_concurrency,
                    self.config.tool_result_order,
                )
                .await?;
            self.new_items.extend(produced);
        }
        Ok(())
    }

    /// Drive the loop to completion and assemble the result.
    async fn drive(&mut self) -> Result<RunResult> {
        self.prepare().await?;
        self.hooks().agent_start(&self.context).await;

        let max_turns = self.config.max_turns;
        while !has_final_output(&self.new_items) && self.turn < max_turns {
            self.check_cancelled()?;
            self.execute_turn().await?;
        }

        if !has_final_output(&self.new_items) {
            return Err(Error::max_turns(max_turns, self.turn));
        }
        self.finish().await
    }

    async fn finish(&mut self) -> Result<RunResult> {
        let agent = self.agent;
        let text = self
            .raw_responses
            .last()
            .and_then(ModelResponse::final_text)
            .ok_or_else(|| Error::model_behavior("Final model response carries no message"))?;
        let final_output = match &agent.output_schema {
            Some(schema) => schema.parse(text)?,
            None => Value::String(text.to_owned()),
        };

        let output_guardrails: Vec<&OutputGuardrail> = agent
            .output_guardrails
            .iter()
            .chain(&self.config.output_guardrails)
            .collect();
        let output_guardrail_results =
            guardrails::run_output(&output_guardrails, &self.context, &agent.name, &final_output)
                .await?;

        self.hooks().agent_end(&self.context, &final_output).await;

        if let Some(session) = &self.config.session {
            let to_save: Vec<RunItem> = self.input.iter().chain(&self.new_items).cloned().collect();
            session.add_items(&to_save).await?;
        }

        let usage = self.context.usage();
        tracing::Span::current().record("run.turns", self.turn);
        info!(
            agent = %agent.name,
            turns = self.turn,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Agent run completed",
        );

        Ok(RunResult {
            final_output,
            input: std::mem::take(&mut self.input),
            new_items: std::mem::take(&mut self.new_items),
            raw_responses: std::mem::take(&mut self.raw_responses),
            usage,
            last_agent: agent.name.clone(),
            turns: self.turn,
            input_guardrail_results: std::mem::take(&mut self.input_guardrail_results),
            output_guardrail_results,
        })
    }

    fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            agent: self.agent.name.clone(),
            input: self.input.clone(),
            new_items: self.new_items.clone(),
            raw_responses: self.raw_responses.clone(),
            usage: self.context.usage(),
            turns: self.turn,
        }
    }

    /// Report a terminal failure to the span and the listeners.
    async fn fail(&self, err: &Error, snapshot: &RunSnapshot) {
        error!(error = %err, agent = %self.agent.name, turn = self.turn, "Agent run failed");
        let span = tracing::Span::current();
        span.record("run.turns", self.turn);
        span.record("error", tracing::field::display(err));
        self.hooks().error(&self.context, err, snapshot).await;
    }
}

/// Stateless execution engine that drives an [`Agent`] through its turn loop.
///
/// All per-run state lives inside the run future, so `run` may be called
/// concurrently for any number of agents and inputs.
#[derive(Debug, Clone, Copy)]
pub struct Runner;

impl Runner {
    /// Execute an agent run to completion.
    ///
    /// # Errors
    ///
    /// Returns exactly one terminal error:
    /// [`Error::MaxTurnsExceeded`] when the turn budget runs out,
    /// [`Error::Timeout`] when a model call or the whole run takes too long,
    /// a guardrail tripwire variant, [`Error::ModelBehavior`] for unusable
    /// model output, [`Error::Cancelled`], [`Error::UserError`] for missing
    /// configuration, or any error raised by the model or session.
    pub fn run<'a>(
        agent: &'a Agent,
        input: impl Into<RunInput>,
        config: RunConfig,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        let input: RunInput = input.into();
        let span = info_span!(
            "agent_run",
            agent.name = %agent.name,
            agent.model = %agent.model,
            run.max_turns = config.max_turns,
            run.turns = tracing::field::Empty,
            error = tracing::field::Empty,
        );
        Box::pin(Self::run_inner(agent, input.into_items(), config).instrument(span))
    }

    async fn run_inner(agent: &Agent, input: Vec<RunItem>, config: RunConfig) -> Result<RunResult> {
        let mut state = RunState::new(agent, input, &config);

        let outcome = match config.run_timeout {
            Some(limit) => tokio::time::timeout(limit, state.drive())
                .await
                .unwrap_or_else(|_| Err(Error::timeout(TimeoutScope::Run, limit))),
            None => state.drive().await,
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(err) => {
                let snapshot = state.snapshot();
                state.fail(&err, &snapshot).await;
                Err(err.with_partial(snapshot))
            }
        }
    }
}

impl Agent {
    /// Run this agent; shorthand for [`Runner::run`].
    ///
    /// # Errors
    ///
    /// See [`Runner::run`].
    pub fn run<'a>(
        &'a self,
        input: impl Into<RunInput>,
        config: RunConfig,
    ) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + 'a>> {
        Runner::run(self, input, config)
    }
}
