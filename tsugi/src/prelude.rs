//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tsugi::prelude::*;
//! ```

pub use crate::agent::{
    Agent, HANDOFF_TOOL_PREFIX, OutputSchema, RunConfig, RunResult, RunSnapshot, Runner,
    ToolResultOrder,
};
pub use crate::approval::{
    AlwaysRejectHandler, ApprovalDecision, ApprovalHandler, ApprovalLedger, ApprovalStatus,
    AutoApproveHandler, SharedApprovalHandler,
};
pub use crate::callback::{
    AgentHooks, ChannelRunHooks, LogLevel, LoggingAgentHooks, LoggingRunHooks, NoopAgentHooks,
    NoopRunHooks, RunEvent, RunHooks, SharedAgentHooks, SharedRunHooks,
};
pub use crate::context::{ContextPayload, RunContext};
pub use crate::error::{Error, Result, TimeoutScope, ToolError};
pub use crate::guardrail::{
    GuardrailOutput, InputGuardrail, InputGuardrailCheck, InputGuardrailResult, OutputGuardrail,
    OutputGuardrailCheck, OutputGuardrailResult, ToolGuardrailBehavior, ToolGuardrailOutput,
    ToolGuardrailResult, ToolInputGuardrail, ToolInputGuardrailCheck, ToolOutputGuardrail,
    ToolOutputGuardrailCheck,
};
pub use crate::items::{
    HandoffOutputItem, RunInput, RunItem, ToolCallItem, ToolCallOutputItem, has_final_output,
};
pub use crate::model::{
    Model, ModelProvider, ModelRequest, ModelResponse, ModelSettings, OutputItem, SharedModel,
    SharedModelProvider, ToolChoice,
};
pub use crate::session::{InMemorySession, Session, SharedSession};
pub use crate::tool::{DynTool, FunctionTool, SharedTool, Tool, ToolDefinition, ToolResult};
pub use crate::usage::{InputTokensDetails, OutputTokensDetails, RequestUsage, Usage};
