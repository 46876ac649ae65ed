//! Guardrail execution policies.
//!
//! - **Blocking input guardrails** run one after another; the first tripwire
//!   stops the chain.
//! - **Parallel input guardrails** and **output guardrails** all run
//!   concurrently; once every one has finished, the first tripwire in list
//!   order fails the run.
//! - **Tool guardrails** run one after another around a single tool call.
//!   `allow` continues the chain, a rejection replaces the tool result and a
//!   raise is handed back to the caller to escalate or recover.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::guardrail::{
    InputGuardrail, InputGuardrailResult, OutputGuardrail, OutputGuardrailResult,
    ToolGuardrailBehavior, ToolInputGuardrail, ToolOutputGuardrail,
};
use crate::items::{RunItem, ToolCallItem};

/// Run blocking input guardrails in list order.
pub(crate) async fn run_blocking_input(
    guardrails: &[&InputGuardrail],
    ctx: &RunContext,
    agent_name: &str,
    input: &[RunItem],
) -> Result<Vec<InputGuardrailResult>> {
    let mut results = Vec::with_capacity(guardrails.len());
    for guardrail in guardrails {
        let result = guardrail.run(ctx, agent_name, input).await?;
        if result.is_triggered() {
            warn!(guardrail = %result.guardrail_name, agent = agent_name, "Input guardrail tripwire");
            return Err(Error::input_guardrail(
                result.guardrail_name,
                result.output.output_info,
            ));
        }
        results.push(result);
    }
    Ok(results)
}

/// Run parallel input guardrails concurrently.
pub(crate) async fn run_parallel_input(
    guardrails: &[&InputGuardrail],
    ctx: &RunContext,
    agent_name: &str,
    input: &[RunItem],
) -> Result<Vec<InputGuardrailResult>> {
    if guardrails.is_empty() {
        return Ok(Vec::new());
    }
    let outcomes = join_all(guardrails.iter().map(|g| g.run(ctx, agent_name, input))).await;

    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let result = outcome?;
        if result.is_triggered() {
            warn!(guardrail = %result.guardrail_name, agent = agent_name, "Input guardrail tripwire");
            return Err(Error::input_guardrail(
                result.guardrail_name,
                result.output.output_info,
            ));
        }
        results.push(result);
    }
    Ok(results)
}

/// Run output guardrails concurrently against the final output.
pub(crate) async fn run_output(
    guardrails: &[&OutputGuardrail],
    ctx: &RunContext,
    agent_name: &str,
    output: &Value,
) -> Result<Vec<OutputGuardrailResult>> {
    if guardrails.is_empty() {
        return Ok(Vec::new());
    }
    let outcomes = join_all(guardrails.iter().map(|g| g.run(ctx, agent_name, output))).await;

    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let result = outcome?;
        if result.is_triggered() {
            warn!(guardrail = %result.guardrail_name, agent = agent_name, "Output guardrail tripwire");
            return Err(Error::output_guardrail(
                result.guardrail_name,
                result.output.output_info,
            ));
        }
        results.push(result);
    }
    Ok(results)
}

/// Combined decision of a tool guardrail chain.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ToolVerdict {
    /// Every guardrail allowed the call.
    Allow,
    /// A guardrail replaced the result with `message`.
    Replace { guardrail: String, message: String },
    /// A guardrail raised.
    Raise { guardrail: String, info: Value },
}

impl ToolVerdict {
    fn from_behavior(guardrail: String, behavior: ToolGuardrailBehavior, info: Value) -> Self {
        match behavior {
            ToolGuardrailBehavior::Allow => Self::Allow,
            ToolGuardrailBehavior::RejectContent { message } => Self::Replace { guardrail, message },
            ToolGuardrailBehavior::Raise => Self::Raise { guardrail, info },
        }
    }
}

/// Run tool input guardrails in list order.
pub(crate) async fn run_tool_input(
    guardrails: &[ToolInputGuardrail],
    ctx: &RunContext,
    agent_name: &str,
    call: &ToolCallItem,
) -> Result<ToolVerdict> {
    for guardrail in guardrails {
        let result = guardrail.run(ctx, agent_name, call).await?;
        debug!(guardrail = %result.guardrail_name, tool = %call.name, behavior = ?result.output.behavior, "Tool input guardrail");
        let verdict = ToolVerdict::from_behavior(
            result.guardrail_name,
            result.output.behavior,
            result.output.output_info,
        );
        if verdict != ToolVerdict::Allow {
            return Ok(verdict);
        }
    }
    Ok(ToolVerdict::Allow)
}

/// Run tool output guardrails in list order against the result text.
pub(crate) async fn run_tool_output(
    guardrails: &[ToolOutputGuardrail],
    ctx: &RunContext,
    agent_name: &str,
    call: &ToolCallItem,
    output: &str,
) -> Result<ToolVerdict> {
    for guardrail in guardrails {
        let result = guardrail.run(ctx, agent_name, call, output).await?;
        debug!(guardrail = %result.guardrail_name, tool = %call.name, behavior = ?result.output.behavior, "Tool output guardrail");
        let verdict = ToolVerdict::from_behavior(
            result.guardrail_name,
            result.output.behavior,
            result.output.output_info,
        );
        if verdict != ToolVerdict::Allow {
            return Ok(verdict);
        }
    }
    Ok(ToolVerdict::Allow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::guardrail::{
        GuardrailOutput, InputGuardrailCheck, OutputGuardrailCheck, ToolGuardrailOutput,
        ToolInputGuardrailCheck, ToolOutputGuardrailCheck,
    };

    struct Counted {
        trip: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl InputGuardrailCheck for Counted {
        async fn check(&self, _: &RunContext, _: &str, _: &[RunItem]) -> Result<GuardrailOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if self.trip {
                GuardrailOutput::tripwire(json!({"by": "counted"}))
            } else {
                GuardrailOutput::pass()
            })
        }
    }

    #[async_trait]
    impl OutputGuardrailCheck for Counted {
        async fn check(&self, _: &RunContext, _: &str, _: &Value) -> Result<GuardrailOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if self.trip {
                GuardrailOutput::tripwire("bad output")
            } else {
                GuardrailOutput::pass()
            })
        }
    }

    fn input(name: &str, trip: bool, calls: &Arc<AtomicUsize>) -> InputGuardrail {
        InputGuardrail::new(
            name,
            Counted {
                trip,
                calls: Arc::clone(calls),
            },
        )
    }

    mod input_chain {
        use super::*;

        #[tokio::test]
        async fn blocking_stops_at_first_tripwire() {
            let first = Arc::new(AtomicUsize::new(0));
            let second = Arc::new(AtomicUsize::new(0));
            let a = input("first", true, &first).run_in_parallel(false);
            let b = input("second", false, &second).run_in_parallel(false);

            let err = run_blocking_input(&[&a, &b], &RunContext::new(), "agent", &[])
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InputGuardrailTriggered { ref guardrail, .. } if guardrail == "first"));
            assert_eq!(first.load(Ordering::SeqCst), 1);
            assert_eq!(second.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn parallel_runs_all_and_reports_first_in_order() {
            let calls = Arc::new(AtomicUsize::new(0));
            let a = input("a", false, &calls);
            let b = input("b", true, &calls);
            let c = input("c", true, &calls);

            let err = run_parallel_input(&[&a, &b, &c], &RunContext::new(), "agent", &[])
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InputGuardrailTriggered { ref guardrail, .. } if guardrail == "b"));
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn passing_results_are_collected() {
            let calls = Arc::new(AtomicUsize::new(0));
            let a = input("a", false, &calls);
            let results = run_parallel_input(&[&a], &RunContext::new(), "agent", &[])
                .await
                .unwrap();
            assert_eq!(results.len(), 1);
            assert!(!results[0].is_triggered());
            assert!(run_parallel_input(&[], &RunContext::new(), "agent", &[])
                .await
                .unwrap()
                .is_empty());
        }
    }

    mod output_chain {
        use super::*;

        #[tokio::test]
        async fn any_tripwire_fails() {
            let calls = Arc::new(AtomicUsize::new(0));
            let ok = OutputGuardrail::new(
                "ok",
                Counted {
                    trip: false,
                    calls: Arc::clone(&calls),
                },
            );
            let bad = OutputGuardrail::new(
                "bad",
                Counted {
                    trip: true,
                    calls: Arc::clone(&calls),
                },
            );
            let err = run_output(&[&ok, &bad], &RunContext::new(), "agent", &json!("x"))
                .await
                .unwrap_err();
            match err {
                Error::OutputGuardrailTriggered { guardrail, info } => {
                    assert_eq!(guardrail, "bad");
                    assert_eq!(info, json!("bad output"));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    mod tool_chain {
        use super::*;

        struct Fixed(ToolGuardrailOutput, Arc<AtomicUsize>);

        #[async_trait]
        impl ToolInputGuardrailCheck for Fixed {
            async fn check(&self, _: &RunContext, _: &str, _: &ToolCallItem) -> Result<ToolGuardrailOutput> {
                self.1.fetch_add(1, Ordering::SeqCst);
                Ok(self.0.clone())
            }
        }

        #[async_trait]
        impl ToolOutputGuardrailCheck for Fixed {
            async fn check(
                &self,
                _: &RunContext,
                _: &str,
                _: &ToolCallItem,
                _: &str,
            ) -> Result<ToolGuardrailOutput> {
                self.1.fetch_add(1, Ordering::SeqCst);
                Ok(self.0.clone())
            }
        }

        fn call() -> ToolCallItem {
            ToolCallItem::new("c1", "shell", r#"{"cmd": "ls"}"#)
        }

        #[tokio::test]
        async fn reject_stops_the_chain() {
            let calls = Arc::new(AtomicUsize::new(0));
            let chain = [
                ToolInputGuardrail::new("allow", Fixed(ToolGuardrailOutput::allow(), Arc::clone(&calls))),
                ToolInputGuardrail::new(
                    "deny",
                    Fixed(ToolGuardrailOutput::reject("not allowed"), Arc::clone(&calls)),
                ),
                ToolInputGuardrail::new("never", Fixed(ToolGuardrailOutput::allow(), Arc::clone(&calls))),
            ];
            let verdict = run_tool_input(&chain, &RunContext::new(), "a", &call())
                .await
                .unwrap();
            assert_eq!(
                verdict,
                ToolVerdict::Replace {
                    guardrail: "deny".into(),
                    message: "not allowed".into()
                }
            );
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn raise_carries_metadata() {
            let calls = Arc::new(AtomicUsize::new(0));
            let chain = [ToolOutputGuardrail::new(
                "leak",
                Fixed(ToolGuardrailOutput::raise(json!({"secret": true})), calls),
            )];
            let verdict = run_tool_output(&chain, &RunContext::new(), "a", &call(), "password=1")
                .await
                .unwrap();
            assert_eq!(
                verdict,
                ToolVerdict::Raise {
                    guardrail: "leak".into(),
                    info: json!({"secret": true})
                }
            );
        }

        #[tokio::test]
        async fn empty_chain_allows() {
            let verdict = run_tool_input(&[], &RunContext::new(), "a", &call())
                .await
                .unwrap();
            assert_eq!(verdict, ToolVerdict::Allow);
        }
    }
}
