//! Integration tests for hand-offs between agents.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tsugi::model::mock::{MockModel, MockProvider};
use tsugi::prelude::*;

use common::{add_tool, call, handoff_output, results};

struct Fixture {
    triage: Agent,
    triage_model: Arc<MockModel>,
    support_model: Arc<MockModel>,
}

impl Fixture {
    fn new(triage_script: Vec<ModelResponse>, support_script: Vec<ModelResponse>) -> Self {
        let support = Agent::new("Technical Support")
            .instructions("Fix technical problems.")
            .handoff_description("Handles routers, modems and outages")
            .model("support-model");
        let billing = Agent::new("Billing").model("billing-model");
        let triage = Agent::new("Triage")
            .instructions("Route the user.")
            .model("triage-model")
            .handoff(support)
            .handoff(billing);
        Self {
            triage,
            triage_model: Arc::new(MockModel::with_responses(triage_script)),
            support_model: Arc::new(MockModel::with_responses(support_script)),
        }
    }

    fn config(&self) -> RunConfig {
        let provider = MockProvider::empty()
            .with_model("triage-model", Arc::clone(&self.triage_model))
            .with_model("support-model", Arc::clone(&self.support_model));
        RunConfig::new().provider(Arc::new(provider))
    }
}

#[tokio::test]
async fn transfers_control_to_the_target() {
    let fx = Fixture::new(
        vec![call("h1", "transfer_to_Technical_Support", r#"{"reason": "router"}"#)],
        vec![ModelResponse::message("Please restart the router.")],
    );

    let result = fx.triage.run("My router is down", fx.config()).await.unwrap();

    assert_eq!(result.last_agent, "Technical Support");
    assert_eq!(result.text(), Some("Please restart the router."));
    assert_eq!(result.turns, 2);

    let out = handoff_output(&result.new_items);
    assert_eq!(out.from, "Triage");
    assert_eq!(out.to.as_deref(), Some("Technical Support"));
    assert!(out.error.is_none());
    assert!(matches!(
        &result.new_items[0],
        RunItem::HandoffCall { call, from } if call.id == "h1" && from == "Triage"
    ));
    assert!(tsugi::items::calls_are_paired(&result.new_items));

    assert_eq!(fx.triage_model.calls(), 1);
    let next = fx.support_model.last_request().unwrap();
    assert_eq!(next.model, "support-model");
    assert_eq!(next.instructions.as_deref(), Some("Fix technical problems."));
    assert!(next.tool_names().is_empty());
    assert!(next.input.iter().any(|item| matches!(item, RunItem::HandoffOutput(_))));
}

#[tokio::test]
async fn triage_request_offers_one_tool_per_target() {
    let fx = Fixture::new(vec![ModelResponse::message("Hello")], Vec::new());

    fx.triage.run("hi", fx.config()).await.unwrap();

    let request = fx.triage_model.last_request().unwrap();
    assert_eq!(
        request.tool_names(),
        ["transfer_to_Technical_Support", "transfer_to_Billing"]
    );
    let support = &request.tools[0];
    assert!(support.description().contains("routers"));
}

#[tokio::test]
async fn unknown_target_is_visible_to_the_model() {
    let fx = Fixture::new(
        vec![
            call("h1", "transfer_to_Sales", "{}"),
            ModelResponse::message("I cannot reach Sales, how else can I help?"),
        ],
        Vec::new(),
    );

    let result = fx.triage.run("Buy plan", fx.config()).await.unwrap();

    assert_eq!(result.last_agent, "Triage");
    assert_eq!(result.turns, 2);
    let out = handoff_output(&result.new_items);
    assert_eq!(out.error.as_deref(), Some("Agent not found: Sales"));
    assert!(out.to.is_none());
    assert_eq!(fx.support_model.calls(), 0);
}

#[tokio::test]
async fn target_name_with_spaces_is_accepted() {
    let fx = Fixture::new(
        vec![call("h1", "transfer_to_Technical Support", "{}")],
        vec![ModelResponse::message("On it.")],
    );

    let result = fx.triage.run("help", fx.config()).await.unwrap();
    assert_eq!(result.last_agent, "Technical Support");
}

#[tokio::test]
async fn only_the_first_handoff_of_a_turn_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let support = Agent::new("Technical Support").model("support-model");
    let triage = Agent::new("Triage")
        .model("triage-model")
        .tool(add_tool(&calls))
        .handoff(support)
        .handoff(Agent::new("Billing").model("billing-model"));
    let triage_model = Arc::new(MockModel::with_responses([ModelResponse::new(vec![
        OutputItem::tool_call("h1", "transfer_to_Technical_Support", "{}"),
        OutputItem::tool_call("h2", "transfer_to_Billing", "{}"),
        OutputItem::tool_call("c1", "add", r#"{"a": 1, "b": 2}"#),
    ])]));
    let support_model = Arc::new(MockModel::with_responses([ModelResponse::message("done")]));
    let provider = MockProvider::empty()
        .with_model("triage-model", Arc::clone(&triage_model))
        .with_model("support-model", Arc::clone(&support_model));

    let result = triage
        .run("help", RunConfig::new().provider(Arc::new(provider)))
        .await
        .unwrap();

    assert_eq!(result.last_agent, "Technical Support");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(tsugi::items::calls_are_paired(&result.new_items));

    let paired = results(&result.new_items);
    assert_eq!(paired.len(), 3);
    assert_eq!(paired[0].0, "h1");
    assert_eq!(
        paired[1],
        (
            "h2",
            "Multiple handoffs requested in one turn. Only the first one was executed."
        )
    );
    assert_eq!(
        paired[2],
        (
            "c1",
            "Tool call skipped because a handoff was requested in the same turn."
        )
    );
}

#[tokio::test]
async fn listeners_observe_the_switch() {
    let fx = Fixture::new(
        vec![call("h1", "transfer_to_Technical_Support", "{}")],
        vec![ModelResponse::message("Fixed.")],
    );
    let (hooks, mut rx) = ChannelRunHooks::new();

    fx.triage
        .run("help", fx.config().hooks(Arc::new(hooks)))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(match event {
            RunEvent::AgentStarted { agent, .. } => format!("start:{agent}"),
            RunEvent::LlmStarted { agent, .. } => format!("llm:{agent}"),
            RunEvent::LlmEnded { .. } => "llm_end".to_owned(),
            RunEvent::Handoff { from, to } => format!("handoff:{from}->{to}"),
            RunEvent::AgentEnded { agent, .. } => format!("end:{agent}"),
            _ => "other".to_owned(),
        });
    }
    assert_eq!(
        seen,
        [
            "start:Triage",
            "llm:Triage",
            "llm_end",
            "handoff:Triage->Technical Support",
            "start:Technical Support",
            "llm:Technical Support",
            "llm_end",
            "end:Technical Support",
        ]
    );
}
