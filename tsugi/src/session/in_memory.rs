//! In-memory session implementation.
//!
//! [`InMemorySession`] keeps the item log in a `Vec<RunItem>` behind a
//! `tokio::sync::RwLock`. Data is lost when the value is dropped.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Session;
use crate::error::Result;
use crate::items::RunItem;

/// In-memory session backed by `tokio::sync::RwLock<Vec<RunItem>>`.
#[derive(Debug)]
pub struct InMemorySession {
    id: String,
    items: RwLock<Vec<RunItem>>,
}

impl InMemorySession {
    /// Creates an empty session.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_items(id, Vec::new())
    }

    /// Creates a session pre-populated with `items`.
    #[must_use]
    pub fn with_items(id: impl Into<String>, items: Vec<RunItem>) -> Self {
        Self {
            id: id.into(),
            items: RwLock::new(items),
        }
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl Session for InMemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_items(&self, limit: Option<usize>) -> Result<Vec<RunItem>> {
        let guard = self.items.read().await;
        match limit {
            Some(n) if n < guard.len() => Ok(guard[guard.len() - n..].to_vec()),
            _ => Ok(guard.clone()),
        }
    }

    async fn add_items(&self, items: &[RunItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.items.write().await.extend_from_slice(items);
        Ok(())
    }

    async fn pop_item(&self) -> Result<Option<RunItem>> {
        Ok(self.items.write().await.pop())
    }

    async fn clear(&self) -> Result<()> {
        self.items.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn sample_items(n: usize) -> Vec<RunItem> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    RunItem::user(format!("user-{i}"))
                } else {
                    RunItem::assistant(format!("assistant-{i}"))
                }
            })
            .collect()
    }

    mod get_items {
        use super::*;

        #[tokio::test]
        async fn returns_everything_without_limit() {
            let session = InMemorySession::with_items("s", sample_items(4));
            assert_eq!(session.get_items(None).await.unwrap(), sample_items(4));
        }

        #[tokio::test]
        async fn limit_keeps_the_most_recent() {
            let session = InMemorySession::with_items("s", sample_items(5));
            let items = session.get_items(Some(2)).await.unwrap();
            assert_eq!(items, sample_items(5)[3..].to_vec());
        }

        #[tokio::test]
        async fn limit_larger_than_log() {
            let session = InMemorySession::with_items("s", sample_items(2));
            assert_eq!(session.get_items(Some(10)).await.unwrap().len(), 2);
            assert!(session.get_items(Some(0)).await.unwrap().is_empty());
        }
    }

    mod mutation {
        use super::*;

        #[tokio::test]
        async fn add_pop_clear() {
            let session = InMemorySession::new("s");
            assert_eq!(session.id(), "s");
            assert!(session.is_empty().await);

            session.add_items(&sample_items(3)).await.unwrap();
            session.add_items(&[]).await.unwrap();
            assert_eq!(session.len().await, 3);

            let last = session.pop_item().await.unwrap();
            assert_eq!(last, Some(RunItem::user("user-2")));
            session.clear().await.unwrap();
            assert!(session.pop_item().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn concurrent_appends_are_all_kept() {
            let session = Arc::new(InMemorySession::new("s"));
            let tasks: Vec<_> = (0..10)
                .map(|i| {
                    let s = Arc::clone(&session);
                    tokio::spawn(async move {
                        s.add_items(&[RunItem::user(format!("m{i}"))]).await.unwrap();
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }
            assert_eq!(session.len().await, 10);
        }
    }
}
