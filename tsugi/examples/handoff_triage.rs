//! Triage agent handing a conversation off to a specialist.
//!
//! Uses scripted mock models so the run needs no network access. Set
//! `RUST_LOG=tsugi=debug` to watch the run, turn and tool spans.
//!
//! ```bash
//! cargo run --example handoff_triage
//! ```

#![allow(clippy::print_stdout)]

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tsugi::model::mock::{MockModel, MockProvider};
use tsugi::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tsugi=info")))
        .init();

    let support = Agent::new("Technical Support")
        .instructions("Resolve networking problems step by step.")
        .handoff_description("Handles routers, modems and outages")
        .model("support-model");

    let triage = Agent::new("Triage")
        .instructions("Route the user to the right team.")
        .model("triage-model")
        .handoff(support);

    let triage_model = Arc::new(MockModel::with_responses([ModelResponse::new(vec![
        OutputItem::tool_call("h1", "transfer_to_Technical_Support", r#"{"reason": "router"}"#),
    ])]));
    let support_model = Arc::new(MockModel::with_responses([ModelResponse::message(
        "Unplug the router for thirty seconds, then plug it back in.",
    )]));
    let provider = MockProvider::empty()
        .with_model("triage-model", triage_model)
        .with_model("support-model", support_model);

    let config = RunConfig::new()
        .provider(Arc::new(provider))
        .hooks(Arc::new(LoggingRunHooks::new()))
        .max_turns(5);

    let result = triage.run("My router keeps rebooting", config).await?;

    println!("answered by: {}", result.last_agent);
    println!("turns:       {}", result.turns);
    println!("tokens:      {}", result.usage.total_tokens);
    println!("\n{}", result.text().unwrap_or_default());

    Ok(())
}
