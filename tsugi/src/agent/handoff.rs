//! Hand-off resolution.
//!
//! A hand-off call is a call of a synthesized `transfer_to_<name>` tool.
//! Resolution strips the prefix, looks the name up among the source agent's
//! targets and yields the items that answer the call. An unknown target is
//! not a run failure: the model sees an error result and may try again.

use serde_json::json;
use tracing::{info, warn};

use super::config::{Agent, HANDOFF_TOOL_PREFIX};
use crate::items::{HandoffOutputItem, RunItem, ToolCallItem, ToolCallOutputItem};

/// Result text for hand-off calls beyond the first one of a turn.
pub(crate) const EXTRA_HANDOFF_SKIPPED: &str =
    "Multiple handoffs requested in one turn. Only the first one was executed.";

/// Result text for ordinary calls issued in the same turn as a hand-off.
pub(crate) const TOOL_SKIPPED_FOR_HANDOFF: &str =
    "Tool call skipped because a handoff was requested in the same turn.";

/// The outcome of one hand-off call.
#[derive(Debug)]
pub(crate) struct HandoffOutcome<'a> {
    /// The agent to switch to, `None` if resolution failed.
    pub(crate) target: Option<&'a Agent>,
    /// Hand-off result followed by the paired tool-call result.
    pub(crate) items: Vec<RunItem>,
}

/// Target name carried in a hand-off tool name.
pub(crate) fn requested_agent(tool_name: &str) -> &str {
    tool_name
        .strip_prefix(HANDOFF_TOOL_PREFIX)
        .unwrap_or(tool_name)
}

/// Resolve `call` against the hand-off targets of `source`.
pub(crate) fn resolve<'a>(source: &'a Agent, call: &ToolCallItem) -> HandoffOutcome<'a> {
    let requested = requested_agent(&call.name);

    let Some(target) = source.find_handoff(requested) else {
        let error = format!("Agent not found: {requested}");
        warn!(from = %source.name, requested, "Handoff target not found");
        return HandoffOutcome {
            target: None,
            items: vec![
                RunItem::HandoffOutput(HandoffOutputItem {
                    call_id: call.id.clone(),
                    from: source.name.clone(),
                    to: None,
                    error: Some(error.clone()),
                }),
                RunItem::ToolCallOutput(ToolCallOutputItem::error(&call.id, error)),
            ],
        };
    };

    info!(from = %source.name, to = %target.name, "Handoff");
    HandoffOutcome {
        target: Some(target),
        items: vec![
            RunItem::HandoffOutput(HandoffOutputItem {
                call_id: call.id.clone(),
                from: source.name.clone(),
                to: Some(target.name.clone()),
                error: None,
            }),
            RunItem::ToolCallOutput(ToolCallOutputItem::success(
                &call.id,
                json!({ "assistant": target.name }).to_string(),
            )),
        ],
    }
}

/// Paired result for a call that was not executed because of a hand-off.
pub(crate) fn skipped(call: &ToolCallItem, reason: &str) -> RunItem {
    RunItem::ToolCallOutput(ToolCallOutputItem::error(&call.id, reason))
}
