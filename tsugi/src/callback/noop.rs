//! No-op implementations of the listener traits.
//!
//! Used as the defaults when no listeners are configured.

use async_trait::async_trait;

use super::hooks::{AgentHooks, RunHooks};

/// A [`RunHooks`] that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRunHooks;

#[async_trait]
impl RunHooks for NoopRunHooks {}

/// An [`AgentHooks`] that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAgentHooks;

#[async_trait]
impl AgentHooks for NoopAgentHooks {}
