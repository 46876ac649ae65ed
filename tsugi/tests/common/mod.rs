//! Shared helpers for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use tsugi::error::ToolError;
use tsugi::model::mock::{MockModel, MockProvider};
use tsugi::prelude::*;

/// A response carrying one tool call.
pub fn call(id: &str, name: &str, arguments: &str) -> ModelResponse {
    ModelResponse::new(vec![OutputItem::tool_call(id, name, arguments)])
}

/// A config whose provider answers every model name with `model`.
pub fn config_for(model: &Arc<MockModel>) -> RunConfig {
    RunConfig::new().provider(Arc::new(MockProvider::new(Arc::clone(model))))
}

/// An `add` tool counting its invocations.
pub fn add_tool(calls: &Arc<AtomicUsize>) -> SharedTool {
    let calls = Arc::clone(calls);
    FunctionTool::new(
        "add",
        "Add two integers",
        json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
            "required": ["a", "b"]
        }),
        move |_ctx, args: Value| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let a = args["a"].as_i64().ok_or_else(|| ToolError::invalid_args("a"))?;
                let b = args["b"].as_i64().ok_or_else(|| ToolError::invalid_args("b"))?;
                Ok(json!(a + b))
            }
        },
    )
    .shared()
}

/// Every tool-call result in `items`, as `(call_id, output)`.
pub fn results(items: &[RunItem]) -> Vec<(&str, &str)> {
    items
        .iter()
        .filter_map(|item| match item {
            RunItem::ToolCallOutput(out) => Some((out.call_id.as_str(), out.output.as_str())),
            _ => None,
        })
        .collect()
}

/// The single hand-off result in `items`.
pub fn handoff_output(items: &[RunItem]) -> &HandoffOutputItem {
    let mut outputs = items.iter().filter_map(|item| match item {
        RunItem::HandoffOutput(out) => Some(out),
        _ => None,
    });
    let out = outputs.next().unwrap();
    assert!(outputs.next().is_none(), "more than one hand-off result");
    out
}
