//! Agent module, the execution engine.
//!
//! - **[`Agent`]** is immutable configuration: instructions, model, tools,
//!   hand-off targets and guardrails.
//! - **[`RunConfig`]** carries per-run parameters: turn budget, timeouts,
//!   model provider, session, listeners and approval handler.
//! - **[`Runner`]** is a stateless engine that drives the active agent
//!   through a bounded turn loop until the log ends in a final answer.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tsugi::prelude::*;
//!
//! let support = Agent::new("Technical Support")
//!     .instructions("Resolve technical issues.")
//!     .model("gpt-4o");
//!
//! let triage = Agent::new("Triage")
//!     .instructions("Route the user to the right team.")
//!     .model("gpt-4o-mini")
//!     .handoff(support);
//!
//! let config = RunConfig::new().provider(provider).max_turns(5);
//! let result = triage.run("My router keeps rebooting", config).await?;
//! println!("{} answered: {}", result.last_agent, result.text().unwrap_or_default());
//! ```
//!
//! # Hand-offs
//!
//! Every hand-off target becomes a tool named `transfer_to_<name>` (spaces
//! replaced by underscores). At most one hand-off runs per turn; further
//! hand-off calls and ordinary calls of that turn are answered with a
//! "skipped" result so every call stays paired.

mod config;
mod guardrails;
mod handoff;
mod hook;
mod invoker;
mod options;
mod result;
mod runner;

pub use config::{Agent, HANDOFF_TOOL_PREFIX, OutputSchema};
pub use options::{RunConfig, ToolResultOrder};
pub use result::{RunResult, RunSnapshot};
pub use runner::Runner;
