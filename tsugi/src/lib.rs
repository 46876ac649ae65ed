//! Tsugi - an execution engine for multi-agent LLM workflows
//!
//! Given a declarative [`Agent`](agent::Agent) (instructions, tools, hand-off
//! targets, guardrails) and a user input, the [`Runner`](agent::Runner)
//! drives a bounded multi-turn conversation with a language model until a
//! final answer is produced, the turn budget runs out, or a guardrail halts
//! the run.
//!
//! The language model, the conversation store and the tools are external
//! collaborators reached through the [`Model`](model::Model),
//! [`Session`](session::Session) and [`DynTool`](tool::DynTool) traits.

pub mod agent;
pub mod approval;
pub mod callback;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod items;
pub mod model;
pub mod prelude;
pub mod session;
pub mod tool;
pub mod usage;

pub use error::{Error, Result, TimeoutScope, ToolError};
