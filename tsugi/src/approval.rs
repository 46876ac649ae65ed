//! Tool approval ledger and the human-in-the-loop approval seam.
//!
//! The [`ApprovalLedger`] records, per tool name, which calls have been
//! approved or rejected. A decision either covers **all** calls of the tool
//! (permanent) or a set of specific call identifiers. Lookups are
//! three-valued: [`ApprovalStatus::Approved`], [`ApprovalStatus::Rejected`],
//! or [`ApprovalStatus::Undecided`].
//!
//! The ledger lives in the run's [`RunContext`](crate::context::RunContext)
//! and is shared by every concurrent tool invocation of the run, so all
//! methods take `&self` and synchronize internally.
//!
//! When a tool that needs approval is called and the ledger is undecided,
//! the runner consults the configured [`ApprovalHandler`]. Its answer is
//! written back into the ledger so later calls reuse it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::context::RunContext;
use crate::items::ToolCallItem;

/// Result of an approval lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalStatus {
    /// The call may run.
    Approved,
    /// The call must not run.
    Rejected,
    /// No decision recorded for this call.
    Undecided,
}

impl ApprovalStatus {
    /// Returns `true` if the call was approved.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Returns `true` if no decision exists.
    #[must_use]
    pub const fn is_undecided(&self) -> bool {
        matches!(self, Self::Undecided)
    }
}

/// The set of calls a decision applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Scope {
    #[default]
    Nothing,
    Calls(HashSet<String>),
    All,
}

impl Scope {
    fn covers(&self, call_id: &str) -> bool {
        match self {
            Self::Nothing => false,
            Self::Calls(ids) => ids.contains(call_id),
            Self::All => true,
        }
    }

    fn insert(&mut self, call_id: &str) {
        match self {
            Self::All => {}
            Self::Calls(ids) => {
                ids.insert(call_id.to_owned());
            }
            Self::Nothing => *self = Self::Calls(HashSet::from([call_id.to_owned()])),
        }
    }

    fn remove(&mut self, call_id: &str) {
        if let Self::Calls(ids) = self {
            ids.remove(call_id);
            if ids.is_empty() {
                *self = Self::Nothing;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ToolRecord {
    approved: Scope,
    rejected: Scope,
}

/// Per-tool record of approval and rejection decisions.
#[derive(Debug, Default)]
pub struct ApprovalLedger {
    records: RwLock<HashMap<String, ToolRecord>>,
}

impl ApprovalLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve a call of `tool`.
    ///
    /// With `always = true` every past and future call of the tool is
    /// approved and any rejection for the tool is cleared. Otherwise only
    /// `call_id` is approved (and removed from the per-call rejections).
    pub fn approve(&self, tool: &str, call_id: &str, always: bool) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(tool.to_owned()).or_default();
        if always {
            record.approved = Scope::All;
            record.rejected = Scope::Nothing;
        } else {
            record.approved.insert(call_id);
            record.rejected.remove(call_id);
        }
    }

    /// Reject a call of `tool`. Symmetric to [`approve`](Self::approve).
    pub fn reject(&self, tool: &str, call_id: &str, always: bool) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(tool.to_owned()).or_default();
        if always {
            record.rejected = Scope::All;
            record.approved = Scope::Nothing;
        } else {
            record.rejected.insert(call_id);
            record.approved.remove(call_id);
        }
    }

    /// Look up the decision for one call.
    ///
    /// A specific per-call decision wins over a permanent one for the
    /// opposite outcome, so a single call can be carved out of an
    /// "all calls" decision.
    #[must_use]
    pub fn status(&self, tool: &str, call_id: &str) -> ApprovalStatus {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = records.get(tool) else {
            return ApprovalStatus::Undecided;
        };

        match (&record.approved, &record.rejected) {
            (Scope::Calls(ids), _) if ids.contains(call_id) => ApprovalStatus::Approved,
            (_, Scope::Calls(ids)) if ids.contains(call_id) => ApprovalStatus::Rejected,
            (approved, _) if approved.covers(call_id) => ApprovalStatus::Approved,
            (_, rejected) if rejected.covers(call_id) => ApprovalStatus::Rejected,
            _ => ApprovalStatus::Undecided,
        }
    }

    /// Forget every decision for `tool`.
    pub fn clear(&self, tool: &str) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tool);
    }

    /// Returns `true` if no decision has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Answer of an [`ApprovalHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalDecision {
    /// Approve this call only.
    Approve,
    /// Approve this and all future calls of the tool.
    ApproveAlways,
    /// Reject this call only.
    Reject,
    /// Reject this and all future calls of the tool.
    RejectAlways,
}

impl ApprovalDecision {
    /// Record this decision for `call` in `ledger`.
    pub fn record(self, ledger: &ApprovalLedger, call: &ToolCallItem) {
        match self {
            Self::Approve => ledger.approve(&call.name, &call.id, false),
            Self::ApproveAlways => ledger.approve(&call.name, &call.id, true),
            Self::Reject => ledger.reject(&call.name, &call.id, false),
            Self::RejectAlways => ledger.reject(&call.name, &call.id, true),
        }
    }

    /// Returns `true` if the decision lets the call run.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approve | Self::ApproveAlways)
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => f.write_str("approve"),
            Self::ApproveAlways => f.write_str("approve_always"),
            Self::Reject => f.write_str("reject"),
            Self::RejectAlways => f.write_str("reject_always"),
        }
    }
}

/// Decides undecided tool calls that need approval.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Decide whether `call`, issued by `agent_name`, may run.
    async fn decide(
        &self,
        context: &RunContext,
        agent_name: &str,
        call: &ToolCallItem,
    ) -> ApprovalDecision;
}

/// A shared, thread-safe [`ApprovalHandler`] trait object.
pub type SharedApprovalHandler = std::sync::Arc<dyn ApprovalHandler>;

/// Handler that approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApproveHandler;

#[async_trait]
impl ApprovalHandler for AutoApproveHandler {
    async fn decide(&self, _: &RunContext, _: &str, _: &ToolCallItem) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}

/// Handler that rejects every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRejectHandler;

#[async_trait]
impl ApprovalHandler for AlwaysRejectHandler {
    async fn decide(&self, _: &RunContext, _: &str, _: &ToolCallItem) -> ApprovalDecision {
        ApprovalDecision::Reject
    }
}
