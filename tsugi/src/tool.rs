//! Tool trait and utilities for defining agent tools.
//!
//! A tool is a capability the model can call by name. Implement the typed
//! [`Tool`] trait for your own structs, or wrap a closure in a
//! [`FunctionTool`]. The engine only sees the object-safe [`DynTool`]
//! view, which every `Tool` gets through a blanket impl.
//!
//! Besides the call itself a tool can hook into the run:
//!
//! - [`Tool::needs_approval`] marks calls that must pass the approval
//!   ledger before they run.
//! - [`Tool::is_enabled`] hides the tool from the model and from resolution.
//! - [`Tool::format_error`] turns a failure into the model-visible text of
//!   the tool-call-result item. Tool failures never abort a run.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RunContext;
use crate::error::ToolError;

/// A type alias for `Result<T, ToolError>`.
pub type ToolResult<T> = Result<T, ToolError>;

/// Default model-visible text for a failed tool call.
#[must_use]
pub fn default_format_error(error: &ToolError) -> String {
    format!("An error occurred while running the tool. Please try again. Error: {error}")
}

/// Render a tool's JSON output as the text of its result item.
///
/// Strings are passed through unquoted; everything else is serialized.
#[must_use]
pub fn render_output(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Definition of a tool as offered to the model.
///
/// Serializes to the common function-calling format:
///
/// ```json
/// { "type": "function", "function": { "name": "...", "description": "...", "parameters": {...} } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[non_exhaustive]
pub struct ToolDefinition {
    /// Name of the tool (e.g., "get_weather").
    pub name: String,

    /// Description of what the tool does.
    pub description: String,

    /// JSON schema for the tool's parameters.
    pub parameters: Value,

    /// Whether to use strict schema validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl ToolDefinition {
    /// Create a new tool definition.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            strict: None,
        }
    }

    /// Enable strict schema validation.
    ///
    /// Adds `"additionalProperties": false` to the top-level schema when
    /// it is missing.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        if strict
            && let Some(obj) = self.parameters.as_object_mut()
            && !obj.contains_key("additionalProperties")
        {
            obj.insert("additionalProperties".to_owned(), Value::Bool(false));
        }
        self
    }

    /// Check if strict mode is enabled.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        matches!(self.strict, Some(true))
    }

    /// Returns the tool name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Serialize for ToolDefinition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut function = serde_json::Map::new();
        function.insert("name".to_owned(), Value::String(self.name.clone()));
        function.insert(
            "description".to_owned(),
            Value::String(self.description.clone()),
        );
        function.insert("parameters".to_owned(), self.parameters.clone());
        if let Some(strict) = self.strict {
            function.insert("strict".to_owned(), Value::Bool(strict));
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry("function", &function)?;
        map.end()
    }
}

/// The core trait for typed tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Static name of the tool.
    const NAME: &'static str;

    /// Arguments type for the tool.
    type Args: DeserializeOwned + Send + Sync;

    /// Output type of the tool.
    type Output: Serialize + Send;

    /// Error type for tool execution.
    type Error: Into<ToolError> + Send;

    /// Get the name of the tool.
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Get the description of the tool.
    fn description(&self) -> String;

    /// Get the JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool.
    async fn call(&self, ctx: &RunContext, args: Self::Args) -> Result<Self::Output, Self::Error>;

    /// Whether this particular call must be approved before it runs.
    async fn needs_approval(&self, _ctx: &RunContext, _args: &Self::Args) -> bool {
        false
    }

    /// Whether the tool is offered in this run.
    fn is_enabled(&self, _ctx: &RunContext) -> bool {
        true
    }

    /// Model-visible text for a failed call.
    fn format_error(&self, _ctx: &RunContext, error: &ToolError) -> String {
        default_format_error(error)
    }

    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters_schema())
    }
}

fn parse_args<A: DeserializeOwned>(args: Value) -> ToolResult<A> {
    match args {
        Value::String(s) => serde_json::from_str(&s).map_err(ToolError::from),
        other => serde_json::from_value(other).map_err(ToolError::from),
    }
}

/// A shared, thread-safe [`DynTool`] trait object.
pub type SharedTool = Arc<dyn DynTool>;

/// Object-safe version of the [`Tool`] trait used by the engine.
#[async_trait]
pub trait DynTool: Send + Sync {
    /// Get the name of the tool.
    fn name(&self) -> &str;

    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Whether the tool is offered in this run.
    fn is_enabled(&self, ctx: &RunContext) -> bool;

    /// Whether the call with these arguments needs approval.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if `args` does not fit the
    /// tool's input shape.
    async fn needs_approval(&self, ctx: &RunContext, args: &Value) -> ToolResult<bool>;

    /// Call the tool with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] on invalid arguments or failed execution.
    async fn call_json(&self, ctx: &RunContext, args: Value) -> ToolResult<Value>;

    /// Model-visible text for a failed call.
    fn format_error(&self, ctx: &RunContext, error: &ToolError) -> String;
}

#[async_trait]
impl<T: Tool + 'static> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    fn is_enabled(&self, ctx: &RunContext) -> bool {
        Tool::is_enabled(self, ctx)
    }

    async fn needs_approval(&self, ctx: &RunContext, args: &Value) -> ToolResult<bool> {
        let typed: T::Args = parse_args(args.clone())?;
        Ok(Tool::needs_approval(self, ctx, &typed).await)
    }

    async fn call_json(&self, ctx: &RunContext, args: Value) -> ToolResult<Value> {
        let typed: T::Args = parse_args(args)?;
        let output = Tool::call(self, ctx, typed).await.map_err(Into::into)?;
        serde_json::to_value(output).map_err(|e| ToolError::Execution(e.to_string()))
    }

    fn format_error(&self, ctx: &RunContext, error: &ToolError) -> String {
        Tool::format_error(self, ctx, error)
    }
}

/// Boxed future returned by [`FunctionTool`] handlers.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult<Value>> + Send + 'static>>;

type Handler = Arc<dyn Fn(RunContext, Value) -> ToolFuture + Send + Sync>;
type ErrorFormatter = Arc<dyn Fn(&RunContext, &ToolError) -> String + Send + Sync>;

/// A tool backed by an async closure over JSON arguments.
///
/// # Example
///
/// ```rust,ignore
/// let echo = FunctionTool::new("echo", "Echo the input", json!({"type": "object"}), |_ctx, args| async move {
///     Ok(args)
/// });
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    definition: ToolDefinition,
    handler: Handler,
    needs_approval: bool,
    enabled: bool,
    format_error: Option<ErrorFormatter>,
}

impl FunctionTool {
    /// Create a tool from a name, description, parameter schema and handler.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(RunContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<Value>> + Send + 'static,
    {
        Self {
            definition: ToolDefinition::new(name, description, parameters),
            handler: Arc::new(move |ctx, args| -> ToolFuture { Box::pin(handler(ctx, args)) }),
            needs_approval: false,
            enabled: true,
            format_error: None,
        }
    }

    /// Require approval for every call.
    #[must_use]
    pub const fn needs_approval(mut self, needs_approval: bool) -> Self {
        self.needs_approval = needs_approval;
        self
    }

    /// Enable or disable the tool.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the error formatter.
    #[must_use]
    pub fn format_error_with(
        mut self,
        f: impl Fn(&RunContext, &ToolError) -> String + Send + Sync + 'static,
    ) -> Self {
        self.format_error = Some(Arc::new(f));
        self
    }

    /// Wrap into a [`SharedTool`].
    #[must_use]
    pub fn shared(self) -> SharedTool {
        Arc::new(self)
    }
}

#[async_trait]
impl DynTool for FunctionTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn is_enabled(&self, _ctx: &RunContext) -> bool {
        self.enabled
    }

    async fn needs_approval(&self, _ctx: &RunContext, _args: &Value) -> ToolResult<bool> {
        Ok(self.needs_approval)
    }

    async fn call_json(&self, ctx: &RunContext, args: Value) -> ToolResult<Value> {
        (self.handler)(ctx.clone(), args).await
    }

    fn format_error(&self, ctx: &RunContext, error: &ToolError) -> String {
        self.format_error
            .as_ref()
            .map_or_else(|| default_format_error(error), |f| f(ctx, error))
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.definition.name)
            .field("needs_approval", &self.needs_approval)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    struct Adder;

    #[async_trait]
    impl Tool for Adder {
        const NAME: &'static str = "add";
        type Args = AddArgs;
        type Output = i64;
        type Error = ToolError;

        fn description(&self) -> String {
            "Add two numbers".into()
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            })
        }

        async fn call(&self, _ctx: &RunContext, args: AddArgs) -> Result<i64, ToolError> {
            args.a
                .checked_add(args.b)
                .ok_or_else(|| ToolError::execution("overflow"))
        }

        async fn needs_approval(&self, _ctx: &RunContext, args: &AddArgs) -> bool {
            args.a > 1000
        }
    }

    mod definition {
        use super::*;

        #[test]
        fn serializes_to_function_format() {
            let def = ToolDefinition::new("get_weather", "Weather", json!({"type": "object"}));
            let json = serde_json::to_value(&def).unwrap();
            assert_eq!(json["type"], "function");
            assert_eq!(json["function"]["name"], "get_weather");
            assert!(json["function"].get("strict").is_none());
        }

        #[test]
        fn strict_adds_additional_properties() {
            let def = ToolDefinition::new("t", "d", json!({"type": "object"})).with_strict(true);
            assert!(def.is_strict());
            assert_eq!(def.parameters["additionalProperties"], false);
        }
    }

    mod typed_tool {
        use super::*;

        #[tokio::test]
        async fn call_json_accepts_objects_and_strings() {
            let ctx = RunContext::new();
            let tool: SharedTool = Arc::new(Adder);
            assert_eq!(tool.call_json(&ctx, json!({"a": 1, "b": 2})).await.unwrap(), 3);
            assert_eq!(
                tool.call_json(&ctx, json!(r#"{"a": 2, "b": 2}"#)).await.unwrap(),
                4
            );
        }

        #[tokio::test]
        async fn bad_arguments_are_invalid_arguments() {
            let ctx = RunContext::new();
            let err = Adder.call_json(&ctx, json!({"a": "x"})).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
            let empty = json!({});
            let err = DynTool::needs_approval(&Adder, &ctx, &empty).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }

        #[tokio::test]
        async fn approval_depends_on_arguments() {
            let ctx = RunContext::new();
            let small = json!({"a": 1, "b": 1});
            let big = json!({"a": 5000, "b": 1});
            assert!(!DynTool::needs_approval(&Adder, &ctx, &small).await.unwrap());
            assert!(DynTool::needs_approval(&Adder, &ctx, &big).await.unwrap());
        }

        #[test]
        fn default_error_format() {
            let ctx = RunContext::new();
            let text = DynTool::format_error(&Adder, &ctx, &ToolError::execution("overflow"));
            assert!(text.starts_with("An error occurred while running the tool"));
            assert!(text.contains("overflow"));
        }
    }

    mod function_tool {
        use super::*;

        fn echo() -> FunctionTool {
            FunctionTool::new("echo", "Echo", json!({"type": "object"}), |_ctx, args| async move {
                Ok(args)
            })
        }

        #[tokio::test]
        async fn calls_closure() {
            let ctx = RunContext::new();
            let out = echo().call_json(&ctx, json!({"x": 1})).await.unwrap();
            assert_eq!(out, json!({"x": 1}));
        }

        #[tokio::test]
        async fn flags_and_formatter() {
            let ctx = RunContext::new();
            let tool = echo()
                .needs_approval(true)
                .enabled(false)
                .format_error_with(|_, e| format!("custom: {e}"));
            assert!(DynTool::needs_approval(&tool, &ctx, &Value::Null).await.unwrap());
            assert!(!tool.is_enabled(&ctx));
            assert_eq!(
                tool.format_error(&ctx, &ToolError::from("x")),
                "custom: Tool error: x"
            );
            assert!(format!("{tool:?}").contains("echo"));
        }
    }

    #[test]
    fn render_output_unquotes_strings() {
        assert_eq!(render_output(&json!("plain")), "plain");
        assert_eq!(render_output(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
