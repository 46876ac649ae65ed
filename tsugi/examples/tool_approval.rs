//! Tool calls gated behind a human approval step.
//!
//! The `deploy` tool requires approval. The handler approves it for the
//! rest of the run on first use, so the second call is not asked again.
//!
//! ```bash
//! cargo run --example tool_approval
//! ```

#![allow(clippy::print_stdout)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tsugi::model::mock::{MockModel, MockProvider};
use tsugi::prelude::*;

/// Approves every tool permanently and prints what it was asked.
struct Operator;

#[async_trait]
impl ApprovalHandler for Operator {
    async fn decide(&self, _ctx: &RunContext, agent: &str, call: &ToolCallItem) -> ApprovalDecision {
        println!("[approval] {agent} wants {}({})", call.name, call.arguments);
        ApprovalDecision::ApproveAlways
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("tsugi=info").init();

    let deploy = FunctionTool::new(
        "deploy",
        "Deploy a service to production",
        json!({
            "type": "object",
            "properties": {"service": {"type": "string"}},
            "required": ["service"]
        }),
        |_ctx, args| async move {
            let service = args["service"].as_str().unwrap_or("unknown").to_owned();
            Ok(json!(format!("{service} deployed")))
        },
    )
    .needs_approval(true)
    .shared();

    let agent = Agent::new("ops")
        .instructions("Deploy what the user asks for.")
        .model("mock")
        .tool(deploy);

    let model = Arc::new(MockModel::with_responses([
        ModelResponse::new(vec![OutputItem::tool_call("c1", "deploy", r#"{"service": "api"}"#)]),
        ModelResponse::new(vec![OutputItem::tool_call("c2", "deploy", r#"{"service": "web"}"#)]),
        ModelResponse::message("Both services are live."),
    ]));

    let config = RunConfig::new()
        .provider(Arc::new(MockProvider::new(model)))
        .approval_handler(Arc::new(Operator));

    let result = agent.run("Ship api and web", config).await?;

    for item in &result.new_items {
        if let RunItem::ToolCallOutput(out) = item {
            println!("[tool] {} -> {}", out.call_id, out.output);
        }
    }
    println!("\n{}", result.text().unwrap_or_default());

    Ok(())
}
