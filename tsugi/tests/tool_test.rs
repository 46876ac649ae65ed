//! Integration tests for tool invocation and approval.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tsugi::model::mock::MockModel;
use tsugi::prelude::*;

use common::{call, config_for, results};

#[derive(Debug, Clone, Copy, Default)]
struct Weather;

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
}

#[async_trait]
impl Tool for Weather {
    const NAME: &'static str = "weather";
    type Args = WeatherArgs;
    type Output = String;
    type Error = ToolError;

    fn description(&self) -> String {
        "Current weather for a city".to_owned()
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        })
    }

    async fn call(&self, _ctx: &RunContext, args: WeatherArgs) -> std::result::Result<String, ToolError> {
        if args.city.is_empty() {
            return Err(ToolError::execution("city must not be empty"));
        }
        Ok(format!("Sunny in {}", args.city))
    }
}

fn weather_agent() -> Agent {
    Agent::new("forecaster").model("mock").tool(Arc::new(Weather))
}

mod typed_tools {
    use super::*;

    #[tokio::test]
    async fn typed_arguments_are_deserialized() {
        let model = Arc::new(MockModel::with_responses([
            call("c1", "weather", r#"{"city": "Kyoto"}"#),
            ModelResponse::message("It is sunny."),
        ]));

        let result = weather_agent().run("Kyoto?", config_for(&model)).await.unwrap();
        assert_eq!(results(&result.new_items), [("c1", "Sunny in Kyoto")]);
    }

    #[tokio::test]
    async fn bad_arguments_become_an_error_result() {
        let model = Arc::new(MockModel::with_responses([
            call("c1", "weather", r#"{"town": "Kyoto"}"#),
            ModelResponse::message("Sorry."),
        ]));

        let result = weather_agent().run("Kyoto?", config_for(&model)).await.unwrap();
        let out = results(&result.new_items);
        assert!(out[0].1.starts_with("An error occurred while running the tool"));
        assert!(out[0].1.contains("Invalid arguments"));
    }

    #[tokio::test]
    async fn execution_failure_becomes_an_error_result() {
        let model = Arc::new(MockModel::with_responses([
            call("c1", "weather", r#"{"city": ""}"#),
            ModelResponse::message("Which city?"),
        ]));

        let result = weather_agent().run("weather", config_for(&model)).await.unwrap();
        assert!(result.new_items.iter().any(|item| matches!(
            item,
            RunItem::ToolCallOutput(out) if out.is_error && out.output.contains("city must not be empty")
        )));
        assert_eq!(result.text(), Some("Which city?"));
    }

    #[tokio::test]
    async fn disabled_tools_are_hidden_and_unresolvable() {
        let hidden = FunctionTool::new("secret", "", json!({}), |_ctx, _args| async move {
            Ok(json!("leaked"))
        })
        .enabled(false)
        .shared();
        let agent = Agent::new("a").model("mock").tool(hidden);
        let model = Arc::new(MockModel::with_responses([
            call("c1", "secret", "{}"),
            ModelResponse::message("ok"),
        ]));

        let result = agent.run("hi", config_for(&model)).await.unwrap();

        assert!(model.requests()[0].tools.is_empty());
        let out = results(&result.new_items);
        assert!(out[0].1.contains("Tool not found: secret"));
    }
}

mod approval {
    use super::*;

    fn guarded(runs: &Arc<AtomicUsize>) -> Agent {
        let runs = Arc::clone(runs);
        let tool = FunctionTool::new("deploy", "Deploy to production", json!({}), move |_ctx, _args| {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(json!("deployed"))
            }
        })
        .needs_approval(true)
        .shared();
        Agent::new("ops").model("mock").tool(tool)
    }

    struct Counting {
        decision: ApprovalDecision,
        asked: AtomicUsize,
    }

    #[async_trait]
    impl ApprovalHandler for Counting {
        async fn decide(&self, _: &RunContext, agent: &str, call: &ToolCallItem) -> ApprovalDecision {
            assert_eq!(agent, "ops");
            assert_eq!(call.name, "deploy");
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.decision
        }
    }

    #[tokio::test]
    async fn without_handler_an_approval_request_is_logged() {
        let runs = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(MockModel::with_responses([
            call("c1", "deploy", "{}"),
            ModelResponse::message("Waiting for approval."),
        ]));

        let result = guarded(&runs).run("ship it", config_for(&model)).await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(result.new_items.iter().any(|item| matches!(
            item,
            RunItem::ApprovalRequest { call, agent } if call.id == "c1" && agent == "ops"
        )));
        let out = results(&result.new_items);
        assert_eq!(
            out,
            [(
                "c1",
                "Tool execution requires approval, but no approval handler is configured."
            )]
        );
        assert!(tsugi::items::calls_are_paired(&result.new_items));
    }

    #[tokio::test]
    async fn rejection_is_reported_to_the_model() {
        let runs = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(MockModel::with_responses([
            call("c1", "deploy", "{}"),
            ModelResponse::message("Deployment was rejected."),
        ]));
        let config = config_for(&model).approval_handler(Arc::new(AlwaysRejectHandler));

        let result = guarded(&runs).run("ship it", config).await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(
            results(&result.new_items),
            [("c1", "Tool execution was not approved.")]
        );
    }

    #[tokio::test]
    async fn permanent_approval_is_asked_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Counting {
            decision: ApprovalDecision::ApproveAlways,
            asked: AtomicUsize::new(0),
        });
        let model = Arc::new(MockModel::with_responses([
            call("c1", "deploy", "{}"),
            call("c2", "deploy", "{}"),
            ModelResponse::message("Deployed twice."),
        ]));
        let config = config_for(&model).approval_handler(Arc::clone(&handler) as SharedApprovalHandler);

        let result = guarded(&runs).run("ship it twice", config).await.unwrap();

        assert_eq!(result.turns, 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(handler.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn per_call_approval_is_asked_every_time() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Counting {
            decision: ApprovalDecision::Approve,
            asked: AtomicUsize::new(0),
        });
        let model = Arc::new(MockModel::with_responses([
            call("c1", "deploy", "{}"),
            call("c2", "deploy", "{}"),
            ModelResponse::message("Deployed twice."),
        ]));
        let config = config_for(&model).approval_handler(Arc::clone(&handler) as SharedApprovalHandler);

        guarded(&runs).run("ship it twice", config).await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(handler.asked.load(Ordering::SeqCst), 2);
    }
}

mod fan_out {
    use super::*;

    fn sleeper(name: &'static str, millis: u64, active: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> SharedTool {
        let (active, peak) = (Arc::clone(active), Arc::clone(peak));
        FunctionTool::new(name, "", json!({}), move |_ctx, _args| {
            let (active, peak) = (Arc::clone(&active), Arc::clone(&peak));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(json!(name))
            }
        })
        .shared()
    }

    struct Setup {
        agent: Agent,
        model: Arc<MockModel>,
        peak: Arc<AtomicUsize>,
    }

    fn setup() -> Setup {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let agent = Agent::new("a")
            .model("mock")
            .tool(sleeper("slow", 300, &active, &peak))
            .tool(sleeper("medium", 200, &active, &peak))
            .tool(sleeper("fast", 100, &active, &peak));
        let model = Arc::new(MockModel::with_responses([
            ModelResponse::new(vec![
                OutputItem::tool_call("c1", "slow", "{}"),
                OutputItem::tool_call("c2", "medium", "{}"),
                OutputItem::tool_call("c3", "fast", "{}"),
            ]),
            ModelResponse::message("all done"),
        ]));
        Setup { agent, model, peak }
    }

    fn order(items: &[RunItem]) -> Vec<&str> {
        results(items).into_iter().map(|(id, _)| id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn results_follow_completion_order_by_default() {
        let s = setup();
        let result = s.agent.run("go", config_for(&s.model)).await.unwrap();
        assert_eq!(order(&result.new_items), ["c3", "c2", "c1"]);
        assert_eq!(s.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_order_on_request() {
        let s = setup();
        let config = config_for(&s.model).tool_result_order(ToolResultOrder::Submission);
        let result = s.agent.run("go", config).await.unwrap();
        assert_eq!(order(&result.new_items), ["c1", "c2", "c3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_limit_is_honored() {
        let s = setup();
        let config = config_for(&s.model).max_tool_concurrency(2);
        let result = s.agent.run("go", config).await.unwrap();
        assert_eq!(result.text(), Some("all done"));
        assert_eq!(s.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_see_every_tool() {
        let s = setup();
        let (hooks, mut rx) = ChannelRunHooks::new();
        s.agent
            .run("go", config_for(&s.model).hooks(Arc::new(hooks)))
            .await
            .unwrap();

        let mut started = 0;
        let mut ended = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                RunEvent::ToolStarted { .. } => started += 1,
                RunEvent::ToolEnded { call, result, .. } => ended.push((call.id, result)),
                _ => {}
            }
        }
        assert_eq!(started, 3);
        assert_eq!(ended.len(), 3);
        assert!(ended.contains(&("c1".to_owned(), "slow".to_owned())));
    }
}
