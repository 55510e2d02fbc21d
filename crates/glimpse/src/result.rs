//! Deferred, single-materialization handles to a model's output.
//!
//! A platform hands back a [`DeferredResult`] before any content exists. Materializing it
//! drives the underlying source (a request future or a token stream) exactly once. The
//! owner consumes the handle with [`DeferredResult::resolve`]; once it has done so the
//! content is gone from the shared slot, and a non-owning [`ResultProbe`] can only report
//! [`PlatformError::AlreadyConsumed`]. Observers therefore read through the identity-keyed
//! cache in [`crate::profiler::ResultCache`] and fall back to a probe only on a miss.
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::{PlatformError, PlatformResult};
use crate::models::tool::ToolCall;

/// Identity of a single result. Two results with equal content never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(Uuid);

impl ResultId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The materialized output of a model invocation. Exactly one variant is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    /// Non-empty, in the order the model requested them
    ToolCalls(Vec<ToolCall>),
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::ToolCalls(_) => None,
        }
    }

    pub fn as_tool_calls(&self) -> Option<&[ToolCall]> {
        match self {
            Content::ToolCalls(calls) => Some(calls),
            Content::Text(_) => None,
        }
    }

    pub fn is_tool_calls(&self) -> bool {
        matches!(self, Content::ToolCalls(_))
    }
}

pub type ContentSource = BoxFuture<'static, PlatformResult<Content>>;

/// Lifecycle of the shared slot behind a result
pub enum ResultState {
    Unresolved(ContentSource),
    /// The source is being driven. Only observable afterwards if that work was abandoned.
    Resolving,
    /// Materialized by an observer; the owner has not taken it yet
    Resolved(Content),
    Failed(PlatformError),
    /// Handed to the owner
    Consumed,
}

impl fmt::Debug for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultState::Unresolved(_) => f.write_str("Unresolved"),
            ResultState::Resolving => f.write_str("Resolving"),
            ResultState::Resolved(content) => f.debug_tuple("Resolved").field(content).finish(),
            ResultState::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            ResultState::Consumed => f.write_str("Consumed"),
        }
    }
}

type Slot = Arc<Mutex<ResultState>>;

/// Drive the source if nothing has yet. The guard is held across the await so concurrent
/// readers queue up behind the first materialization instead of starting another.
async fn drive(id: ResultId, state: &mut ResultState) -> PlatformResult<Content> {
    match std::mem::replace(state, ResultState::Resolving) {
        ResultState::Unresolved(source) => {
            let outcome = source.await;
            *state = match &outcome {
                Ok(content) => ResultState::Resolved(content.clone()),
                Err(err) => ResultState::Failed(err.clone()),
            };
            outcome
        }
        ResultState::Resolving => Err(PlatformError::Interrupted(id)),
        ResultState::Resolved(content) => {
            *state = ResultState::Resolved(content.clone());
            Ok(content)
        }
        ResultState::Failed(err) => {
            *state = ResultState::Failed(err.clone());
            Err(err)
        }
        ResultState::Consumed => {
            *state = ResultState::Consumed;
            Err(PlatformError::AlreadyConsumed(id))
        }
    }
}

/// Owner handle to a model invocation's outcome
#[derive(Debug)]
pub struct DeferredResult {
    id: ResultId,
    slot: Slot,
}

impl DeferredResult {
    fn with_state(id: ResultId, state: ResultState) -> Self {
        Self {
            id,
            slot: Arc::new(Mutex::new(state)),
        }
    }

    /// A result materialized by awaiting `source`. Nothing runs until someone resolves it.
    pub fn new<F>(source: F) -> Self
    where
        F: Future<Output = PlatformResult<Content>> + Send + 'static,
    {
        Self::with_state(ResultId::new(), ResultState::Unresolved(source.boxed()))
    }

    /// A text result assembled from streamed chunks. The stream can only be consumed once.
    pub fn from_text_stream<S>(chunks: S) -> Self
    where
        S: Stream<Item = PlatformResult<String>> + Send + 'static,
    {
        Self::new(async move {
            let mut chunks = Box::pin(chunks);
            let mut text = String::new();
            while let Some(chunk) = chunks.next().await {
                text.push_str(&chunk?);
            }
            Ok(Content::Text(text))
        })
    }

    /// An already materialized result that keeps the identity `id`
    pub fn ready(id: ResultId, content: Content) -> Self {
        Self::with_state(id, ResultState::Resolved(content))
    }

    /// An already failed result that keeps the identity `id`
    pub fn failed(id: ResultId, error: PlatformError) -> Self {
        Self::with_state(id, ResultState::Failed(error))
    }

    pub fn id(&self) -> ResultId {
        self.id
    }

    /// A non-owning handle onto the same slot
    pub fn probe(&self) -> ResultProbe {
        ResultProbe {
            id: self.id,
            slot: self.slot.clone(),
        }
    }

    /// Run `observer` on the content the first time it is materialized, whoever does it.
    /// The identity of the result is unchanged.
    pub fn inspect<F>(self, observer: F) -> Self
    where
        F: FnOnce(&Content) + Send + 'static,
    {
        let Ok(mut state) = self.slot.try_lock() else {
            tracing::debug!(result = %self.id, "result is being materialized, observer skipped");
            return self;
        };
        match std::mem::replace(&mut *state, ResultState::Resolving) {
            ResultState::Unresolved(source) => {
                *state = ResultState::Unresolved(
                    source
                        .map(move |outcome| {
                            if let Ok(content) = &outcome {
                                observer(content);
                            }
                            outcome
                        })
                        .boxed(),
                );
            }
            ResultState::Resolved(content) => {
                observer(&content);
                *state = ResultState::Resolved(content);
            }
            other => *state = other,
        }
        drop(state);
        self
    }

    /// Materialize and take the content. Consuming `self` makes this the single owner read.
    pub async fn resolve(self) -> PlatformResult<Content> {
        let mut state = self.slot.lock().await;
        let outcome = drive(self.id, &mut state).await;
        if outcome.is_ok() {
            *state = ResultState::Consumed;
        }
        outcome
    }
}

/// Non-owning view of a result, used by observers after a cache miss
#[derive(Debug, Clone)]
pub struct ResultProbe {
    id: ResultId,
    slot: Slot,
}

impl ResultProbe {
    pub fn id(&self) -> ResultId {
        self.id
    }

    /// Materialize on behalf of an observer. The content stays in the slot so the owner can
    /// still take it; if the owner already did, this fails with `AlreadyConsumed`.
    pub async fn materialize(&self) -> PlatformResult<Content> {
        let mut state = self.slot.lock().await;
        drive(self.id, &mut state).await
    }
}
