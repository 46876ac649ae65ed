//! Run result types.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::guardrail::{InputGuardrailResult, OutputGuardrailResult};
use crate::items::RunItem;
use crate::model::ModelResponse;
use crate::usage::Usage;

/// The outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The final output: the last message text, or the parsed JSON value
    /// when the last agent declares an output schema.
    pub final_output: Value,
    /// The caller's input items (without session history).
    pub input: Vec<RunItem>,
    /// Every item generated during the run, in log order.
    pub new_items: Vec<RunItem>,
    /// Every raw model response, one per turn.
    pub raw_responses: Vec<ModelResponse>,
    /// Usage accumulated over all model calls.
    pub usage: Usage,
    /// Name of the agent that produced the final output.
    pub last_agent: String,
    /// Number of turns executed.
    pub turns: usize,
    /// Results of the input guardrails that ran.
    pub input_guardrail_results: Vec<InputGuardrailResult>,
    /// Results of the output guardrails that ran.
    pub output_guardrail_results: Vec<OutputGuardrailResult>,
}

impl RunResult {
    /// The final output as text, if it is a string.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.final_output.as_str()
    }

    /// Deserialize the final output into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the output does not
    /// fit `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.final_output.clone())?)
    }

    /// The caller's input followed by every new item; the input of a
    /// follow-up run.
    #[must_use]
    pub fn to_input_list(&self) -> Vec<RunItem> {
        self.input.iter().chain(&self.new_items).cloned().collect()
    }

    /// Identifier of the last model response.
    #[must_use]
    pub fn last_response_id(&self) -> Option<&str> {
        self.raw_responses.last()?.response_id.as_deref()
    }
}

/// Partial state of a failed run, handed to
/// [`RunHooks::on_error`](crate::callback::RunHooks::on_error).
#[derive(Debug, Clone, Default)]
pub struct RunSnapshot {
    /// Agent active when the run failed.
    pub agent: String,
    /// The caller's input items.
    pub input: Vec<RunItem>,
    /// Items generated before the failure.
    pub new_items: Vec<RunItem>,
    /// Model responses received before the failure.
    pub raw_responses: Vec<ModelResponse>,
    /// Usage accumulated before the failure.
    pub usage: Usage,
    /// Turns started before the failure.
    pub turns: usize,
}
