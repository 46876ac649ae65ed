//! Conversation persistence seam.
//!
//! A [`Session`] stores the item log across runs. When a session is set on
//! [`RunConfig`](crate::agent::RunConfig), the runner loads its history once
//! before the first turn (prepended to the caller's input) and, after a
//! successful run, appends exactly the caller's input plus the newly
//! generated items. Nothing already sourced from the session is written back.
//!
//! The engine does not retry session failures.

mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;

pub use in_memory::InMemorySession;

use crate::error::Result;
use crate::items::RunItem;

/// Persistent conversation storage.
#[async_trait]
pub trait Session: Send + Sync {
    /// Identifier of this session.
    fn id(&self) -> &str;

    /// The most recent `limit` items in log order, or all items for `None`.
    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<RunItem>>;

    /// Append items to the log.
    async fn add_items(&self, items: &[RunItem]) -> Result<()>;

    /// Remove and return the last item.
    async fn pop_item(&self) -> Result<Option<RunItem>>;

    /// Remove every item.
    async fn clear(&self) -> Result<()>;
}

/// A shared, thread-safe [`Session`] trait object.
pub type SharedSession = Arc<dyn Session>;
