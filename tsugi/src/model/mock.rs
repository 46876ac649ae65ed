//! Scripted model and provider for tests.
//!
//! [`MockModel`] replays a queue of canned replies, one per call. When the
//! queue is exhausted it keeps repeating the last reply it served, which
//! makes "model that never stops calling tools" scenarios easy to express.
//! Every request is recorded for later inspection.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{Model, ModelProvider, ModelRequest, ModelResponse, SharedModel};
use crate::error::{Error, Result};

/// A canned reply.
#[derive(Debug, Clone)]
enum Reply {
    Response(ModelResponse),
    Failure(String),
}

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Reply>,
    last: Option<Reply>,
}

/// A model that replays scripted responses.
#[derive(Debug, Default)]
pub struct MockModel {
    script: Mutex<Script>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockModel {
    /// An empty script. Calls fail until a reply is queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A script serving `responses` in order.
    #[must_use]
    pub fn with_responses(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        let model = Self::new();
        for response in responses {
            model.push(response);
        }
        model
    }

    /// Sleep for `delay` before answering each call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response.
    pub fn push(&self, response: ModelResponse) {
        self.lock_script().queue.push_back(Reply::Response(response));
    }

    /// Queue a transport failure, reported as [`Error::System`].
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock_script().queue.push_back(Reply::Failure(message.into()));
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_reply(&self) -> Option<Reply> {
        let mut script = self.lock_script();
        match script.queue.pop_front() {
            Some(reply) => {
                script.last = Some(reply.clone());
                Some(reply)
            }
            None => script.last.clone(),
        }
    }
}

#[async_trait]
impl Model for MockModel {
    async fn get_response(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_reply() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(message)) => Err(Error::system(message)),
            None => Err(Error::system("mock model has no scripted responses")),
        }
    }
}

/// A provider serving [`MockModel`]s.
///
/// Names registered with [`with_model`](Self::with_model) resolve to their
/// model; every other name resolves to the default model if one is set.
#[derive(Debug, Default)]
pub struct MockProvider {
    default: Option<Arc<MockModel>>,
    models: HashMap<String, Arc<MockModel>>,
}

impl MockProvider {
    /// A provider answering every name with `model`.
    #[must_use]
    pub fn new(model: Arc<MockModel>) -> Self {
        Self {
            default: Some(model),
            models: HashMap::new(),
        }
    }

    /// A provider that only knows explicitly registered names.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register `model` under `name`.
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>, model: Arc<MockModel>) -> Self {
        self.models.insert(name.into(), model);
        self
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn get_model(&self, name: &str) -> Result<SharedModel> {
        let model = self
            .models
            .get(name)
            .or(self.default.as_ref())
            .ok_or_else(|| Error::user(format!("Unknown model: {name}")))?;
        Ok(Arc::clone(model) as SharedModel)
    }
}
