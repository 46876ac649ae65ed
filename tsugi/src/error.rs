//! Unified error types for the tsugi engine.
//!
//! Two layers of failure exist during a run:
//!
//! - [`Error`]: **terminal** failures. A run that hits one of these unwinds
//!   and the caller receives exactly this error (turn budget exhausted,
//!   timeouts, guardrail tripwires, malformed model output, transport
//!   failures, cancellation).
//! - [`ToolError`]: **recoverable** tool failures. These never escape a run;
//!   they are formatted by the tool's error hook into a tool-call-result item
//!   so the model can see the failure and react.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::agent::RunSnapshot;

/// Result type alias for tsugi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which timeout scope elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutScope {
    /// A single model invocation exceeded the per-call timeout.
    ModelCall,
    /// The whole turn loop exceeded the overall run timeout.
    Run,
}

impl TimeoutScope {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ModelCall => "model call",
            Self::Run => "run",
        }
    }
}

impl fmt::Display for TimeoutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main (terminal) error type for a run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The turn budget was exhausted without a final output.
    #[error("Max turns ({max_turns}) exceeded after {turns} turns without a final output")]
    MaxTurnsExceeded {
        /// The configured maximum number of turns.
        max_turns: usize,
        /// The number of turns actually executed.
        turns: usize,
    },

    /// A per-call or overall timeout elapsed.
    #[error("Timed out: {scope} exceeded {duration:?}")]
    Timeout {
        /// Which timeout fired.
        scope: TimeoutScope,
        /// The configured duration of that timeout.
        duration: Duration,
        /// State of the run when the timeout fired. Filled in by the runner
        /// before the error reaches the caller.
        partial: Option<Box<RunSnapshot>>,
    },

    /// The model produced output that could not be interpreted.
    #[error("Model behavior error: {0}")]
    ModelBehavior(String),

    /// An input guardrail tripwire was triggered.
    #[error("Input guardrail '{guardrail}' triggered tripwire")]
    InputGuardrailTriggered {
        /// Name of the guardrail.
        guardrail: String,
        /// Metadata reported by the guardrail.
        info: Value,
    },

    /// An output guardrail tripwire was triggered.
    #[error("Output guardrail '{guardrail}' triggered tripwire")]
    OutputGuardrailTriggered {
        /// Name of the guardrail.
        guardrail: String,
        /// Metadata reported by the guardrail.
        info: Value,
    },

    /// A tool input guardrail raised.
    #[error("Tool input guardrail '{guardrail}' raised for tool '{tool}'")]
    ToolInputGuardrailTriggered {
        /// Name of the guardrail.
        guardrail: String,
        /// Name of the guarded tool.
        tool: String,
        /// Metadata reported by the guardrail.
        info: Value,
    },

    /// A tool output guardrail raised.
    #[error("Tool output guardrail '{guardrail}' raised for tool '{tool}'")]
    ToolOutputGuardrailTriggered {
        /// Name of the guardrail.
        guardrail: String,
        /// Name of the guarded tool.
        tool: String,
        /// Metadata reported by the guardrail.
        info: Value,
    },

    /// Unexpected transport or internal failure.
    #[error("System error: {0}")]
    System(String),

    /// The run was cancelled through its cancellation token.
    #[error("Run was cancelled")]
    Cancelled,

    /// The run was misconfigured (no model provider, unknown model, ...).
    #[error("User error: {0}")]
    UserError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a max turns error.
    #[must_use]
    pub const fn max_turns(max_turns: usize, turns: usize) -> Self {
        Self::MaxTurnsExceeded { max_turns, turns }
    }

    /// Create a timeout error.
    #[must_use]
    pub const fn timeout(scope: TimeoutScope, duration: Duration) -> Self {
        Self::Timeout {
            scope,
            duration,
            partial: None,
        }
    }

    /// Attach the run's partial state to errors that carry one.
    #[must_use]
    pub fn with_partial(self, snapshot: RunSnapshot) -> Self {
        match self {
            Self::Timeout {
                scope, duration, ..
            } => Self::Timeout {
                scope,
                duration,
                partial: Some(Box::new(snapshot)),
            },
            other => other,
        }
    }

    /// The partial run state carried by this error, if any.
    #[must_use]
    pub fn partial(&self) -> Option<&RunSnapshot> {
        match self {
            Self::Timeout { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }

    /// Create a model behavior error.
    #[must_use]
    pub fn model_behavior(msg: impl Into<String>) -> Self {
        Self::ModelBehavior(msg.into())
    }

    /// Create a system error.
    #[must_use]
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// Create a user (configuration) error.
    #[must_use]
    pub fn user(msg: impl Into<String>) -> Self {
        Self::UserError(msg.into())
    }

    /// Create an input guardrail tripwire error.
    #[must_use]
    pub fn input_guardrail(guardrail: impl Into<String>, info: Value) -> Self {
        Self::InputGuardrailTriggered {
            guardrail: guardrail.into(),
            info,
        }
    }

    /// Create an output guardrail tripwire error.
    #[must_use]
    pub fn output_guardrail(guardrail: impl Into<String>, info: Value) -> Self {
        Self::OutputGuardrailTriggered {
            guardrail: guardrail.into(),
            info,
        }
    }

    /// Returns `true` for any of the four guardrail tripwire variants.
    #[must_use]
    pub const fn is_guardrail_tripwire(&self) -> bool {
        matches!(
            self,
            Self::InputGuardrailTriggered { .. }
                | Self::OutputGuardrailTriggered { .. }
                | Self::ToolInputGuardrailTriggered { .. }
                | Self::ToolOutputGuardrailTriggered { .. }
        )
    }

    /// Returns `true` if this is a timeout of either scope.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Error type for recoverable tool failures.
///
/// A `ToolError` is converted into a model-visible string by the tool's
/// [`format_error`](crate::tool::DynTool::format_error) hook and attached to
/// the tool-call-result item. It never terminates a run.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// Error during tool execution.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The model supplied arguments that do not fit the tool's input shape.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool not found on the active agent.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Generic error.
    #[error("Tool error: {0}")]
    Other(String),
}

impl ToolError {
    /// Create an execution error.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create an invalid arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for ToolError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_owned())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(err.to_string())
    }
}
