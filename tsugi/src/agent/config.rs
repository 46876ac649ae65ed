//! Agent configuration types.
//!
//! An [`Agent`] is an immutable description of one persona: instructions,
//! model, tools, hand-off targets and guardrails. It holds no execution
//! logic; the [`Runner`](super::Runner) drives it.
//!
//! Hand-off targets are shared as `Arc<Agent>`, so an agent graph is built
//! bottom-up and can be reused across runs without cloning.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tsugi::prelude::*;
//!
//! let support = Arc::new(
//!     Agent::new("Technical Support")
//!         .instructions("You solve technical problems.")
//!         .model("gpt-4o"),
//! );
//!
//! let triage = Agent::new("Triage")
//!     .instructions("Route the user to the right specialist.")
//!     .model("gpt-4o")
//!     .handoff(support);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::callback::SharedAgentHooks;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::guardrail::{InputGuardrail, OutputGuardrail, ToolInputGuardrail, ToolOutputGuardrail};
use crate::model::ModelSettings;
use crate::tool::{SharedTool, ToolDefinition};

/// Prefix of every synthesized hand-off tool name.
pub const HANDOFF_TOOL_PREFIX: &str = "transfer_to_";

/// JSON schema describing structured agent output.
///
/// When set on an [`Agent`], the schema is passed to the model with every
/// request and the final text is parsed as JSON before it becomes the run's
/// final output. Unparseable output fails the run with
/// [`Error::ModelBehavior`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    name: String,
    schema: Value,
    strict: bool,
}

impl OutputSchema {
    /// Creates a new output schema with strict mode enabled.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }

    /// Creates a new output schema with strict mode explicitly set.
    #[must_use]
    pub fn with_strict(name: impl Into<String>, schema: Value, strict: bool) -> Self {
        Self {
            name: name.into(),
            schema,
            strict,
        }
    }

    /// Returns the schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the JSON Schema definition.
    #[must_use]
    pub const fn schema(&self) -> &Value {
        &self.schema
    }

    /// Returns whether strict mode is enabled.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Parse `text` as output of this schema.
    ///
    /// The text must be valid JSON. For object schemas every key listed in
    /// `required` must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelBehavior`] if the text is not valid JSON or a
    /// required key is missing.
    pub fn parse(&self, text: &str) -> Result<Value> {
        let value: Value = serde_json::from_str(text.trim()).map_err(|e| {
            Error::model_behavior(format!(
                "Output for schema '{}' is not valid JSON: {e}",
                self.name
            ))
        })?;

        if let Some(required) = self.schema.get("required").and_then(Value::as_array) {
            let Some(object) = value.as_object() else {
                return Err(Error::model_behavior(format!(
                    "Output for schema '{}' must be a JSON object",
                    self.name
                )));
            };
            if let Some(missing) = required
                .iter()
                .filter_map(Value::as_str)
                .find(|key| !object.contains_key(*key))
            {
                return Err(Error::model_behavior(format!(
                    "Output for schema '{}' is missing required field '{missing}'",
                    self.name
                )));
            }
        }

        Ok(value)
    }

    /// Creates an output schema from a Rust type deriving
    /// [`schemars::JsonSchema`]. The schema name is the type name.
    #[cfg(feature = "schema")]
    #[must_use]
    pub fn from_type<T: schemars::JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let mut schema = serde_json::to_value(&root).unwrap_or_default();
        if let Value::Object(ref mut map) = schema {
            map.remove("$schema");
        }
        Self {
            name: <T as schemars::JsonSchema>::schema_name().into_owned(),
            schema,
            strict: true,
        }
    }
}

/// A pure configuration struct defining an agent.
///
/// - **`name`**: unique within a hand-off graph; used for hand-off routing
///   and in every log line
/// - **`instructions`**: static system prompt
/// - **`model`** / **`model_settings`**: what to call and how
/// - **`tools`**: capabilities the model may call
/// - **`handoffs`**: agents control may be transferred to
/// - guardrails on the run input, the final output, and around each tool call
/// - **`hooks`**: optional per-agent lifecycle listener
#[derive(Clone)]
pub struct Agent {
    pub(crate) name: String,
    pub(crate) instructions: Option<String>,
    pub(crate) handoff_description: Option<String>,
    pub(crate) model: String,
    pub(crate) model_settings: ModelSettings,
    pub(crate) output_schema: Option<OutputSchema>,
    pub(crate) tools: Vec<SharedTool>,
    pub(crate) handoffs: Vec<Arc<Self>>,
    pub(crate) input_guardrails: Vec<InputGuardrail>,
    pub(crate) output_guardrails: Vec<OutputGuardrail>,
    pub(crate) tool_input_guardrails: Vec<ToolInputGuardrail>,
    pub(crate) tool_output_guardrails: Vec<ToolOutputGuardrail>,
    pub(crate) hooks: Option<SharedAgentHooks>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("model_settings", &self.model_settings)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field(
                "handoffs",
                &self.handoffs.iter().map(|a| &a.name).collect::<Vec<_>>(),
            )
            .field(
                "output_schema",
                &self.output_schema.as_ref().map(OutputSchema::name),
            )
            .field("input_guardrails", &self.input_guardrails)
            .field("output_guardrails", &self.output_guardrails)
            .field("tool_input_guardrails", &self.tool_input_guardrails)
            .field("tool_output_guardrails", &self.tool_output_guardrails)
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create a new agent with the given name and empty configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            handoff_description: None,
            model: String::new(),
            model_settings: ModelSettings::default(),
            output_schema: None,
            tools: Vec::new(),
            handoffs: Vec::new(),
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            tool_input_guardrails: Vec::new(),
            tool_output_guardrails: Vec::new(),
            hooks: None,
        }
    }

    /// Set the system instructions.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Description used for the hand-off tool other agents see for this one.
    #[must_use]
    pub fn handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the model settings.
    #[must_use]
    pub fn model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Set the output schema for structured JSON output.
    #[must_use]
    pub fn output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Set structured output by inferring the JSON Schema from a Rust type.
    #[cfg(feature = "schema")]
    #[must_use]
    pub fn output_type<T: schemars::JsonSchema>(self) -> Self {
        self.output_schema(OutputSchema::from_type::<T>())
    }

    /// Add a tool.
    #[must_use]
    pub fn tool(mut self, tool: SharedTool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Set all tools.
    #[must_use]
    pub fn tools(mut self, tools: Vec<SharedTool>) -> Self {
        self.tools = tools;
        self
    }

    /// Add a hand-off target.
    #[must_use]
    pub fn handoff(mut self, target: impl Into<Arc<Self>>) -> Self {
        self.handoffs.push(target.into());
        self
    }

    /// Add an input guardrail.
    #[must_use]
    pub fn input_guardrail(mut self, guardrail: InputGuardrail) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    /// Add an output guardrail.
    #[must_use]
    pub fn output_guardrail(mut self, guardrail: OutputGuardrail) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    /// Add a guardrail evaluated before each tool call of this agent.
    #[must_use]
    pub fn tool_input_guardrail(mut self, guardrail: ToolInputGuardrail) -> Self {
        self.tool_input_guardrails.push(guardrail);
        self
    }

    /// Add a guardrail evaluated after each tool call of this agent.
    #[must_use]
    pub fn tool_output_guardrail(mut self, guardrail: ToolOutputGuardrail) -> Self {
        self.tool_output_guardrails.push(guardrail);
        self
    }

    /// Set per-agent lifecycle hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: SharedAgentHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Returns the agent's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the system instructions, if any.
    #[must_use]
    pub fn get_instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Returns the model name.
    #[must_use]
    pub fn get_model(&self) -> &str {
        &self.model
    }

    /// Returns the model settings.
    #[must_use]
    pub const fn get_model_settings(&self) -> &ModelSettings {
        &self.model_settings
    }

    /// Returns the output schema, if any.
    #[must_use]
    pub const fn get_output_schema(&self) -> Option<&OutputSchema> {
        self.output_schema.as_ref()
    }

    /// Returns the hand-off targets.
    #[must_use]
    pub fn handoffs(&self) -> &[Arc<Self>] {
        &self.handoffs
    }

    /// Returns the number of tools registered on this agent.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Name of the synthesized tool that hands off to `agent_name`.
    ///
    /// Spaces become underscores; case is kept.
    #[must_use]
    pub fn handoff_tool_name(agent_name: &str) -> String {
        format!("{HANDOFF_TOOL_PREFIX}{}", agent_name.replace(' ', "_"))
    }

    /// Definition of the hand-off tool for this agent as a target.
    ///
    /// Every hand-off tool takes the same input: an optional free-text
    /// `reason`.
    #[must_use]
    pub fn handoff_tool_definition(&self) -> ToolDefinition {
        let description = self.handoff_description.clone().unwrap_or_else(|| {
            format!(
                "Handoff to the {} agent to handle the request.",
                self.name
            )
        });
        ToolDefinition::new(
            Self::handoff_tool_name(&self.name),
            description,
            json!({
                "type": "object",
                "properties": {
                    "reason": {
                        "type": "string",
                        "description": "Why the conversation is transferred."
                    }
                },
                "additionalProperties": false
            }),
        )
    }

    /// Look up a hand-off target by the name carried in a hand-off tool.
    ///
    /// Three strategies are tried in order across all targets: exact name,
    /// target name with spaces replaced by underscores, and target name with
    /// underscores replaced by spaces.
    #[must_use]
    pub fn find_handoff(&self, requested: &str) -> Option<&Arc<Self>> {
        let strategies: [fn(&str) -> String; 3] = [
            str::to_owned,
            |name| name.replace(' ', "_"),
            |name| name.replace('_', " "),
        ];
        strategies.iter().find_map(|normalize| {
            self.handoffs
                .iter()
                .find(|target| normalize(&target.name) == requested)
        })
    }

    /// Returns `true` if a call named `tool_name` is a hand-off request.
    ///
    /// A name is a hand-off when it carries the hand-off prefix and no
    /// ordinary tool of this agent has that exact name.
    #[must_use]
    pub fn is_handoff_call(&self, tool_name: &str) -> bool {
        tool_name.starts_with(HANDOFF_TOOL_PREFIX) && !self.tools.iter().any(|t| t.name() == tool_name)
    }

    /// Resolve an enabled tool by name.
    #[must_use]
    pub fn find_tool(&self, ctx: &RunContext, name: &str) -> Option<&SharedTool> {
        self.tools
            .iter()
            .find(|t| t.name() == name && t.is_enabled(ctx))
    }

    /// Everything offered to the model in one request: enabled tools plus one
    /// hand-off tool per target.
    #[must_use]
    pub fn tool_definitions(&self, ctx: &RunContext) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|t| t.is_enabled(ctx))
            .map(|t| t.definition())
            .chain(self.handoffs.iter().map(|a| a.handoff_tool_definition()))
            .collect()
    }
}
