//! Per-run execution context.
//!
//! [`RunContext`] carries everything that is shared by reference with hooks,
//! guardrails and every tool invocation of a run:
//!
//! - the caller-supplied opaque payload,
//! - the usage accumulator (starts at [`Usage::zero`] and only grows),
//! - the [`ApprovalLedger`](crate::approval::ApprovalLedger),
//! - the current turn number and active agent name.
//!
//! Cloning a `RunContext` is cheap: all clones observe the same state, so
//! concurrent tool calls of one turn can read the ledger and append usage.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use uuid::Uuid;

use crate::approval::ApprovalLedger;
use crate::usage::Usage;

/// Opaque caller data attached to a run.
pub type ContextPayload = Arc<dyn Any + Send + Sync>;

struct Inner {
    run_id: Uuid,
    payload: Option<ContextPayload>,
    usage: Mutex<Usage>,
    approvals: ApprovalLedger,
    turn: AtomicUsize,
    agent_name: RwLock<String>,
}

/// Context shared by every participant of one run.
#[derive(Clone)]
pub struct RunContext {
    inner: Arc<Inner>,
}

impl RunContext {
    /// Create a context without caller payload.
    #[must_use]
    pub fn new() -> Self {
        Self::with_payload(None)
    }

    /// Create a context carrying `payload`.
    #[must_use]
    pub fn with_payload(payload: Option<ContextPayload>) -> Self {
        Self {
            inner: Arc::new(Inner {
                run_id: Uuid::new_v4(),
                payload,
                usage: Mutex::new(Usage::zero()),
                approvals: ApprovalLedger::new(),
                turn: AtomicUsize::new(0),
                agent_name: RwLock::new(String::new()),
            }),
        }
    }

    /// Set the active agent name.
    #[must_use]
    pub fn with_agent_name(self, name: impl Into<String>) -> Self {
        self.set_agent_name(name);
        self
    }

    /// Unique identifier of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    /// Downcast the caller payload to `T`.
    ///
    /// Returns `None` when no payload was supplied or it has another type.
    #[must_use]
    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.payload.as_deref()?.downcast_ref::<T>()
    }

    /// Returns `true` if a caller payload is attached.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.inner.payload.is_some()
    }

    /// Snapshot of the usage accumulated so far.
    #[must_use]
    pub fn usage(&self) -> Usage {
        self.inner
            .usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Add a usage delta to the accumulator.
    pub fn add_usage(&self, delta: &Usage) {
        let mut usage = self.inner.usage.lock().unwrap_or_else(PoisonError::into_inner);
        *usage += delta;
    }

    /// The approval ledger of this run.
    #[must_use]
    pub fn approvals(&self) -> &ApprovalLedger {
        &self.inner.approvals
    }

    /// Current turn number (1-indexed during execution, 0 before start).
    #[must_use]
    pub fn turn(&self) -> usize {
        self.inner.turn.load(Ordering::Acquire)
    }

    /// Advance to the next turn and return its number.
    pub fn advance_turn(&self) -> usize {
        self.inner.turn.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Name of the currently active agent.
    #[must_use]
    pub fn agent_name(&self) -> String {
        self.inner
            .agent_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a switch of the active agent.
    pub fn set_agent_name(&self, name: impl Into<String>) {
        *self
            .inner
            .agent_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = name.into();
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.inner.run_id)
            .field("agent_name", &self.agent_name())
            .field("turn", &self.turn())
            .field("usage", &self.usage())
            .field("has_payload", &self.has_payload())
            .finish_non_exhaustive()
    }
}
