//! Guardrail module: pluggable safety checks around a run.
//!
//! - **[`InputGuardrail`]** validates the run input on the first turn.
//! - **[`OutputGuardrail`]** validates the final output before it is returned.
//! - **[`ToolInputGuardrail`]** / **[`ToolOutputGuardrail`]** wrap a single
//!   tool call, before and after it runs.
//!
//! # Outcomes
//!
//! Input and output guardrails return a [`GuardrailOutput`]: pass, or a
//! triggered tripwire with metadata. A tripwire halts the run with
//! [`Error::InputGuardrailTriggered`](crate::Error::InputGuardrailTriggered)
//! or [`Error::OutputGuardrailTriggered`](crate::Error::OutputGuardrailTriggered).
//!
//! Tool guardrails return a [`ToolGuardrailOutput`] whose
//! [`ToolGuardrailBehavior`] is one of:
//!
//! - `Allow`: continue with the next guardrail in the chain,
//! - `RejectContent`: stop the chain and use the message as the tool result,
//! - `Raise`: stop the chain and report a tripwire for this call.
//!
//! Outcomes are plain values. Only the runner decides whether a raise ends
//! the run.
//!
//! # Execution modes
//!
//! Input guardrails are either **blocking** (`run_in_parallel(false)`), run
//! one at a time before the first model call, or **parallel** (the default),
//! run concurrently with the first model call. Output guardrails always run
//! concurrently with each other. Tool guardrails run one at a time.
//!
//! ```rust,ignore
//! struct NoSecrets;
//!
//! #[async_trait::async_trait]
//! impl InputGuardrailCheck for NoSecrets {
//!     async fn check(&self, _ctx: &RunContext, _agent: &str, input: &[RunItem]) -> Result<GuardrailOutput> {
//!         let leaked = input.iter().filter_map(RunItem::text).any(|t| t.contains("password"));
//!         Ok(if leaked { GuardrailOutput::tripwire("secret in input") } else { GuardrailOutput::pass() })
//!     }
//! }
//!
//! let agent = Agent::new("safe").input_guardrail(InputGuardrail::new("no-secrets", NoSecrets).run_in_parallel(false));
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RunContext;
use crate::error::Result;
use crate::items::{RunItem, ToolCallItem};

/// The output of an input or output guardrail check.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailOutput {
    /// Whether the tripwire was triggered.
    pub tripwire_triggered: bool,

    /// Structured information about the check, included in the error when
    /// the tripwire fires.
    pub output_info: Value,
}

impl GuardrailOutput {
    /// A passing output.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            tripwire_triggered: false,
            output_info: Value::Null,
        }
    }

    /// A triggered tripwire with the given metadata.
    #[must_use]
    pub fn tripwire(info: impl Into<Value>) -> Self {
        Self {
            tripwire_triggered: true,
            output_info: info.into(),
        }
    }

    /// A passing output carrying diagnostic metadata.
    #[must_use]
    pub fn pass_with_info(info: impl Into<Value>) -> Self {
        Self {
            tripwire_triggered: false,
            output_info: info.into(),
        }
    }

    /// Returns `true` if the tripwire was triggered.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.tripwire_triggered
    }
}

/// Check logic of an [`InputGuardrail`].
#[async_trait]
pub trait InputGuardrailCheck: Send + Sync {
    /// Inspect the run input.
    ///
    /// `input` is the item list the first model request is built from
    /// (session history plus the caller's input).
    async fn check(
        &self,
        context: &RunContext,
        agent_name: &str,
        input: &[RunItem],
    ) -> Result<GuardrailOutput>;
}

/// A guardrail on the run input, evaluated on the first turn only.
#[derive(Clone)]
pub struct InputGuardrail {
    name: String,
    run_in_parallel: bool,
    check: Arc<dyn InputGuardrailCheck>,
}

impl InputGuardrail {
    /// Create a new input guardrail. Runs in parallel mode by default.
    #[must_use]
    pub fn new(name: impl Into<String>, check: impl InputGuardrailCheck + 'static) -> Self {
        Self {
            name: name.into(),
            run_in_parallel: true,
            check: Arc::new(check),
        }
    }

    /// Choose parallel (`true`) or blocking (`false`) mode.
    #[must_use]
    pub const fn run_in_parallel(mut self, parallel: bool) -> Self {
        self.run_in_parallel = parallel;
        self
    }

    /// Returns the name of this guardrail.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether this guardrail runs in parallel mode.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.run_in_parallel
    }

    /// Execute the check.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by the check itself.
    pub async fn run(
        &self,
        context: &RunContext,
        agent_name: &str,
        input: &[RunItem],
    ) -> Result<InputGuardrailResult> {
        let output = self.check.check(context, agent_name, input).await?;
        Ok(InputGuardrailResult {
            guardrail_name: self.name.clone(),
            output,
        })
    }
}

impl fmt::Debug for InputGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputGuardrail")
            .field("name", &self.name)
            .field("run_in_parallel", &self.run_in_parallel)
            .finish_non_exhaustive()
    }
}

/// The result of running an input guardrail.
#[derive(Debug, Clone, PartialEq)]
pub struct InputGuardrailResult {
    /// Name of the guardrail.
    pub guardrail_name: String,
    /// The check output.
    pub output: GuardrailOutput,
}

impl InputGuardrailResult {
    /// Returns `true` if the tripwire was triggered.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.output.tripwire_triggered
    }
}

/// Check logic of an [`OutputGuardrail`].
#[async_trait]
pub trait OutputGuardrailCheck: Send + Sync {
    /// Inspect the final output of `agent_name`.
    async fn check(
        &self,
        context: &RunContext,
        agent_name: &str,
        output: &Value,
    ) -> Result<GuardrailOutput>;
}

/// A guardrail on the final output.
#[derive(Clone)]
pub struct OutputGuardrail {
    name: String,
    check: Arc<dyn OutputGuardrailCheck>,
}

impl OutputGuardrail {
    /// Create a new output guardrail.
    #[must_use]
    pub fn new(name: impl Into<String>, check: impl OutputGuardrailCheck + 'static) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Returns the name of this guardrail.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the check.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by the check itself.
    pub async fn run(
        &self,
        context: &RunContext,
        agent_name: &str,
        output: &Value,
    ) -> Result<OutputGuardrailResult> {
        let guardrail_output = self.check.check(context, agent_name, output).await?;
        Ok(OutputGuardrailResult {
            guardrail_name: self.name.clone(),
            output: guardrail_output,
        })
    }
}

impl fmt::Debug for OutputGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputGuardrail")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The result of running an output guardrail.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGuardrailResult {
    /// Name of the guardrail.
    pub guardrail_name: String,
    /// The check output.
    pub output: GuardrailOutput,
}

impl OutputGuardrailResult {
    /// Returns `true` if the tripwire was triggered.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        self.output.tripwire_triggered
    }
}

/// What a tool guardrail decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolGuardrailBehavior {
    /// Continue with the next guardrail (or the tool call).
    Allow,
    /// Skip the rest of the chain and use `message` as the tool result.
    RejectContent {
        /// Replacement content shown to the model.
        message: String,
    },
    /// Skip the rest of the chain and report a tripwire.
    Raise,
}

/// The output of a tool guardrail check.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolGuardrailOutput {
    /// The decision.
    pub behavior: ToolGuardrailBehavior,
    /// Structured information about the check.
    pub output_info: Value,
}

impl ToolGuardrailOutput {
    /// Let the call continue.
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            behavior: ToolGuardrailBehavior::Allow,
            output_info: Value::Null,
        }
    }

    /// Let the call continue, recording metadata.
    #[must_use]
    pub fn allow_with_info(info: impl Into<Value>) -> Self {
        Self {
            behavior: ToolGuardrailBehavior::Allow,
            output_info: info.into(),
        }
    }

    /// Replace the tool result with `message`.
    #[must_use]
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            behavior: ToolGuardrailBehavior::RejectContent {
                message: message.into(),
            },
            output_info: Value::Null,
        }
    }

    /// Report a tripwire with the given metadata.
    #[must_use]
    pub fn raise(info: impl Into<Value>) -> Self {
        Self {
            behavior: ToolGuardrailBehavior::Raise,
            output_info: info.into(),
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_info(mut self, info: impl Into<Value>) -> Self {
        self.output_info = info.into();
        self
    }

    /// Returns `true` for [`ToolGuardrailBehavior::Allow`].
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self.behavior, ToolGuardrailBehavior::Allow)
    }
}

/// Check logic of a [`ToolInputGuardrail`].
#[async_trait]
pub trait ToolInputGuardrailCheck: Send + Sync {
    /// Inspect a tool call before it runs.
    async fn check(
        &self,
        context: &RunContext,
        agent_name: &str,
        call: &ToolCallItem,
    ) -> Result<ToolGuardrailOutput>;
}

/// Check logic of a [`ToolOutputGuardrail`].
#[async_trait]
pub trait ToolOutputGuardrailCheck: Send + Sync {
    /// Inspect a tool call and the text it produced.
    async fn check(
        &self,
        context: &RunContext,
        agent_name: &str,
        call: &ToolCallItem,
        output: &str,
    ) -> Result<ToolGuardrailOutput>;
}

/// A guardrail evaluated before a tool call.
#[derive(Clone)]
pub struct ToolInputGuardrail {
    name: String,
    check: Arc<dyn ToolInputGuardrailCheck>,
}

impl ToolInputGuardrail {
    /// Create a new tool input guardrail.
    #[must_use]
    pub fn new(name: impl Into<String>, check: impl ToolInputGuardrailCheck + 'static) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Returns the name of this guardrail.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the check.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by the check itself.
    pub async fn run(
        &self,
        context: &RunContext,
        agent_name: &str,
        call: &ToolCallItem,
    ) -> Result<ToolGuardrailResult> {
        let output = self.check.check(context, agent_name, call).await?;
        Ok(ToolGuardrailResult {
            guardrail_name: self.name.clone(),
            output,
        })
    }
}

impl fmt::Debug for ToolInputGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolInputGuardrail")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A guardrail evaluated after a tool call.
#[derive(Clone)]
pub struct ToolOutputGuardrail {
    name: String,
    check: Arc<dyn ToolOutputGuardrailCheck>,
}

impl ToolOutputGuardrail {
    /// Create a new tool output guardrail.
    #[must_use]
    pub fn new(name: impl Into<String>, check: impl ToolOutputGuardrailCheck + 'static) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Returns the name of this guardrail.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the check.
    ///
    /// # Errors
    ///
    /// Propagates errors returned by the check itself.
    pub async fn run(
        &self,
        context: &RunContext,
        agent_name: &str,
        call: &ToolCallItem,
        output: &str,
    ) -> Result<ToolGuardrailResult> {
        let guardrail_output = self.check.check(context, agent_name, call, output).await?;
        Ok(ToolGuardrailResult {
            guardrail_name: self.name.clone(),
            output: guardrail_output,
        })
    }
}

impl fmt::Debug for ToolOutputGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolOutputGuardrail")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The result of running a tool guardrail.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolGuardrailResult {
    /// Name of the guardrail.
    pub guardrail_name: String,
    /// The check output.
    pub output: ToolGuardrailOutput,
}
