//! Lifecycle listeners for runs.
//!
//! Instead of subclassing a hooks base class, callers register listeners:
//!
//! - [`RunHooks`] on [`RunConfig`](crate::agent::RunConfig) observe every
//!   agent of a run.
//! - [`AgentHooks`] on an [`Agent`](crate::agent::Agent) observe only that
//!   agent.
//!
//! Ready-made listeners: [`NoopRunHooks`] / [`NoopAgentHooks`] (the
//! defaults), [`LoggingRunHooks`] / [`LoggingAgentHooks`] (structured
//! `tracing` logs) and [`ChannelRunHooks`] (forwards every event into a
//! `tokio` channel as a [`RunEvent`]).

mod channel;
mod hooks;
mod logging;
mod noop;

pub use channel::{ChannelRunHooks, RunEvent};
pub use hooks::{AgentHooks, RunHooks, SharedAgentHooks, SharedRunHooks};
pub use logging::{LogLevel, LoggingAgentHooks, LoggingRunHooks};
pub use noop::{NoopAgentHooks, NoopRunHooks};
