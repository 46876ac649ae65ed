//! Tool invocation.
//!
//! Every ordinary tool call of a turn goes through [`ToolInvoker::invoke`]:
//!
//! 1. Resolve the named tool among the agent's enabled tools
//! 2. Parse the arguments
//! 3. Consult the approval ledger (and the approval handler when undecided)
//! 4. Run tool input guardrails
//! 5. Call the tool
//! 6. Run tool output guardrails on the result text
//!
//! Calls of one turn run concurrently, but only one guardrail chain runs at
//! a time across them.
//!
//! Each step that fails produces a paired error result instead of failing
//! the run. The only terminal outcomes are tool guardrail raises when
//! escalation is on, and errors returned by guardrail checks themselves.

use futures::StreamExt as _;
use futures::stream;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info_span, warn};

use super::config::Agent;
use super::guardrails::{self, ToolVerdict};
use super::hook::HookPair;
use super::options::ToolResultOrder;
use crate::approval::{ApprovalHandler, ApprovalStatus};
use crate::context::RunContext;
use crate::error::{Error, Result, ToolError};
use crate::items::{RunItem, ToolCallItem, ToolCallOutputItem};
use crate::tool::{SharedTool, default_format_error, render_output};

/// Result text of a rejected call.
pub(crate) const APPROVAL_REJECTED: &str = "Tool execution was not approved.";

/// Result text of a call left undecided for lack of an approval handler.
pub(crate) const APPROVAL_PENDING: &str =
    "Tool execution requires approval, but no approval handler is configured.";

/// Executes the ordinary tool calls of one turn for one agent.
pub(crate) struct ToolInvoker<'a> {
    pub(crate) agent: &'a Agent,
    pub(crate) ctx: &'a RunContext,
    pub(crate) hooks: HookPair<'a>,
    pub(crate) approval_handler: Option<&'a dyn ApprovalHandler>,
    pub(crate) escalate_tripwires: bool,
    /// Held for the duration of every tool guardrail chain.
    pub(crate) guardrail_gate: Mutex<()>,
}

impl<'a> ToolInvoker<'a> {
    pub(crate) fn new(
        agent: &'a Agent,
        ctx: &'a RunContext,
        hooks: HookPair<'a>,
        approval_handler: Option<&'a dyn ApprovalHandler>,
        escalate_tripwires: bool,
    ) -> Self {
        Self {
            agent,
            ctx,
            hooks,
            approval_handler,
            escalate_tripwires,
            guardrail_gate: Mutex::new(()),
        }
    }

    /// Invoke `calls` concurrently, at most `limit` at a time.
    ///
    /// Returns the produced items in the requested order. When a call fails
    /// terminally the remaining calls still finish before the first such
    /// error is returned.
    pub(crate) async fn invoke_all(
        &self,
        calls: &[&ToolCallItem],
        limit: Option<usize>,
        order: ToolResultOrder,
    ) -> Result<Vec<RunItem>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.unwrap_or(calls.len()).max(1);
        let futures: Vec<_> = calls.iter().map(|call| self.invoke(call)).collect();
        let pending = stream::iter(futures);
        let outcomes: Vec<Result<Vec<RunItem>>> = match order {
            ToolResultOrder::Completion => pending.buffer_unordered(limit).collect().await,
            ToolResultOrder::Submission => pending.buffered(limit).collect().await,
        };

        let mut items = Vec::with_capacity(outcomes.len() * 2);
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(produced) => items.extend(produced),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(items), Err)
    }

    /// Invoke one call, returning any auxiliary items followed by the
    /// paired result.
    pub(crate) async fn invoke(&self, call: &ToolCallItem) -> Result<Vec<RunItem>> {
        let span = info_span!(
            "tool",
            tool.name = %call.name,
            tool.id = %call.id,
            tool.input = %call.arguments,
            tool.output = tracing::field::Empty,
            tool.success = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        async {
            self.hooks.tool_start(self.ctx, call).await;

            let (mut items, output) = self.execute(call).await?;

            let current = tracing::Span::current();
            current.record("tool.success", !output.is_error);
            current.record("tool.output", output.output.as_str());
            if output.is_error {
                current.record("error", output.output.as_str());
            }

            self.hooks.tool_end(self.ctx, call, &output.output).await;
            items.push(RunItem::ToolCallOutput(output));
            Ok(items)
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, call: &ToolCallItem) -> Result<(Vec<RunItem>, ToolCallOutputItem)> {
        let Some(tool) = self.agent.find_tool(self.ctx, &call.name) else {
            warn!(tool = %call.name, agent = %self.agent.name, "Tool not found");
            let error = ToolError::not_found(&call.name);
            return Ok((Vec::new(), ToolCallOutputItem::error(&call.id, default_format_error(&error))));
        };

        let args = match call.arguments_json() {
            Ok(args) => args,
            Err(e) => return Ok((Vec::new(), self.failure(tool, call, &ToolError::from(e)))),
        };

        match tool.needs_approval(self.ctx, &args).await {
            Ok(false) => {}
            Ok(true) => match self.approval(call).await {
                ApprovalStatus::Approved => {}
                ApprovalStatus::Rejected => {
                    debug!(tool = %call.name, call_id = %call.id, "Tool call rejected");
                    return Ok((Vec::new(), ToolCallOutputItem::error(&call.id, APPROVAL_REJECTED)));
                }
                ApprovalStatus::Undecided => {
                    warn!(tool = %call.name, call_id = %call.id, "Tool call awaits approval");
                    let request = RunItem::ApprovalRequest {
                        call: call.clone(),
                        agent: self.agent.name.clone(),
                    };
                    return Ok((vec![request], ToolCallOutputItem::error(&call.id, APPROVAL_PENDING)));
                }
            },
            Err(e) => return Ok((Vec::new(), self.failure(tool, call, &e))),
        }

        let verdict = {
            let _chain = self.guardrail_gate.lock().await;
            guardrails::run_tool_input(
                &self.agent.tool_input_guardrails,
                self.ctx,
                &self.agent.name,
                call,
            )
            .await?
        };
        match verdict {
            ToolVerdict::Allow => {}
            ToolVerdict::Replace { guardrail, message } => {
                debug!(tool = %call.name, %guardrail, "Tool call replaced by guardrail");
                return Ok((Vec::new(), ToolCallOutputItem::success(&call.id, message)));
            }
            ToolVerdict::Raise { guardrail, info } => {
                let err = Error::ToolInputGuardrailTriggered {
                    guardrail,
                    tool: call.name.clone(),
                    info,
                };
                return self.raised(call, err).map(|out| (Vec::new(), out));
            }
        }

        let output = match tool.call_json(self.ctx, args).await {
            Ok(value) => render_output(&value),
            Err(e) => return Ok((Vec::new(), self.failure(tool, call, &e))),
        };

        let verdict = {
            let _chain = self.guardrail_gate.lock().await;
            guardrails::run_tool_output(
                &self.agent.tool_output_guardrails,
                self.ctx,
                &self.agent.name,
                call,
                &output,
            )
            .await?
        };
        let result = match verdict {
            ToolVerdict::Allow => ToolCallOutputItem::success(&call.id, output),
            ToolVerdict::Replace { guardrail, message } => {
                debug!(tool = %call.name, %guardrail, "Tool result replaced by guardrail");
                ToolCallOutputItem::success(&call.id, message)
            }
            ToolVerdict::Raise { guardrail, info } => {
                let err = Error::ToolOutputGuardrailTriggered {
                    guardrail,
                    tool: call.name.clone(),
                    info,
                };
                self.raised(call, err)?
            }
        };
        Ok((Vec::new(), result))
    }

    /// Look up the ledger, asking the handler when undecided.
    async fn approval(&self, call: &ToolCallItem) -> ApprovalStatus {
        let ledger = self.ctx.approvals();
        let status = ledger.status(&call.name, &call.id);
        if !status.is_undecided() {
            return status;
        }
        let Some(handler) = self.approval_handler else {
            return status;
        };
        let decision = handler.decide(self.ctx, &self.agent.name, call).await;
        debug!(tool = %call.name, call_id = %call.id, %decision, "Approval decision");
        decision.record(ledger, call);
        ledger.status(&call.name, &call.id)
    }

    fn failure(&self, tool: &SharedTool, call: &ToolCallItem, error: &ToolError) -> ToolCallOutputItem {
        warn!(tool = %call.name, call_id = %call.id, error = %error, "Tool execution failed");
        ToolCallOutputItem::error(&call.id, tool.format_error(self.ctx, error))
    }

    /// Escalate a guardrail raise, or recover it as an error result.
    fn raised(&self, call: &ToolCallItem, err: Error) -> Result<ToolCallOutputItem> {
        if self.escalate_tripwires {
            return Err(err);
        }
        warn!(tool = %call.name, error = %err, "Tool guardrail raised");
        Ok(ToolCallOutputItem::error(&call.id, err.to_string()))
    }
}
