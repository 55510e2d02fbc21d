use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::errors::PlatformResult;
use crate::models::tool::ToolMetadata;
use crate::result::{Content, DeferredResult, ResultId, ResultProbe};
use crate::toolbox::Toolbox;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a recorded call ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    Returned(Value),
    Failed(String),
    /// A deferred result nobody has materialized yet
    Pending,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// One traced call. Snapshots are deep copies taken when the call happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    pub method: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub input: Value,
    pub outcome: Outcome,
}

impl RecordedCall {
    pub fn new<M: Into<String>>(
        method: M,
        started_at: DateTime<Utc>,
        duration: Duration,
        input: Value,
        outcome: Outcome,
    ) -> Self {
        Self {
            method: method.into(),
            started_at,
            duration,
            input,
            outcome,
        }
    }
}

/// Materialized content keyed by result identity. Results with equal content but different
/// identities get separate entries.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<Entries>,
}

/// Cached content plus the number of times the cache was cleared
#[derive(Debug, Default)]
struct Entries {
    epoch: u64,
    content: HashMap<ResultId, Content>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ResultId) -> Option<Content> {
        lock(&self.entries).content.get(&id).cloned()
    }

    pub fn insert(&self, id: ResultId, content: Content) {
        lock(&self.entries).content.insert(id, content);
    }

    /// Current epoch; every `clear` starts a new one
    pub fn epoch(&self) -> u64 {
        lock(&self.entries).epoch
    }

    /// Insert only if the cache has not been cleared since `epoch`
    pub fn insert_in_epoch(&self, epoch: u64, id: ResultId, content: Content) -> bool {
        let mut entries = lock(&self.entries);
        if entries.epoch != epoch {
            return false;
        }
        entries.content.insert(id, content);
        true
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).content.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).content.is_empty()
    }

    pub fn clear(&self) {
        let mut entries = lock(&self.entries);
        entries.content.clear();
        entries.epoch += 1;
    }

    /// Content of the result behind `probe`: from the cache when present, otherwise
    /// materialized once through the probe and remembered.
    pub async fn read(&self, probe: &ResultProbe) -> PlatformResult<Content> {
        if let Some(content) = self.get(probe.id()) {
            return Ok(content);
        }
        let content = probe.materialize().await?;
        self.insert(probe.id(), content.clone());
        Ok(content)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    call: RecordedCall,
    result: Option<ResultProbe>,
}

/// Accumulates traced calls for one session. Share it between decorators with an `Arc`.
#[derive(Default)]
pub struct CallCollector {
    toolbox: Option<Arc<dyn Toolbox>>,
    cache: Arc<ResultCache>,
    platform_calls: Mutex<Vec<Entry>>,
    tool_calls: Mutex<Vec<RecordedCall>>,
    agent_calls: Mutex<Vec<Entry>>,
}

impl CallCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector that also reports the tools of `toolbox`
    pub fn with_toolbox(toolbox: Arc<dyn Toolbox>) -> Self {
        Self {
            toolbox: Some(toolbox),
            ..Self::default()
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Metadata of the default toolbox, if one was given
    pub fn tools(&self) -> Vec<ToolMetadata> {
        self.toolbox
            .as_ref()
            .map(|toolbox| toolbox.tools())
            .unwrap_or_default()
    }

    pub async fn platform_calls(&self) -> Vec<RecordedCall> {
        let entries = lock(&self.platform_calls).clone();
        self.settle(entries).await
    }

    pub fn tool_calls(&self) -> Vec<RecordedCall> {
        lock(&self.tool_calls).clone()
    }

    pub async fn agent_calls(&self) -> Vec<RecordedCall> {
        let entries = lock(&self.agent_calls).clone();
        self.settle(entries).await
    }

    /// Forget every recorded call and cached content
    pub fn reset(&self) {
        lock(&self.platform_calls).clear();
        lock(&self.tool_calls).clear();
        lock(&self.agent_calls).clear();
        self.cache.clear();
        tracing::debug!("call collector reset");
    }

    /// Tee the content of `result` into the cache whenever it gets materialized
    pub(crate) fn observe(&self, result: DeferredResult) -> DeferredResult {
        let cache = self.cache.clone();
        let epoch = cache.epoch();
        let id = result.id();
        result.inspect(move |content| {
            if !cache.insert_in_epoch(epoch, id, content.clone()) {
                tracing::debug!(result = %id, "result recorded before reset, not cached");
            }
        })
    }

    pub(crate) fn record_platform_call(&self, call: RecordedCall, result: Option<ResultProbe>) {
        emit(&call);
        lock(&self.platform_calls).push(Entry { call, result });
    }

    pub(crate) fn record_tool_call(&self, call: RecordedCall) {
        emit(&call);
        lock(&self.tool_calls).push(call);
    }

    pub(crate) fn record_agent_call(&self, call: RecordedCall, result: Option<ResultProbe>) {
        emit(&call);
        lock(&self.agent_calls).push(Entry { call, result });
    }

    /// Fill in the outcome of calls that returned a deferred result. Locks are released
    /// before any materialization.
    async fn settle(&self, entries: Vec<Entry>) -> Vec<RecordedCall> {
        let mut calls = Vec::with_capacity(entries.len());
        for Entry { mut call, result } in entries {
            if let Some(probe) = result.filter(|_| call.outcome == Outcome::Pending) {
                call.outcome = match self.cache.read(&probe).await {
                    Ok(content) => Outcome::Returned(snapshot(&content)),
                    Err(err) => Outcome::Failed(err.to_string()),
                };
            }
            calls.push(call);
        }
        calls
    }
}

impl std::fmt::Debug for CallCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCollector")
            .field("platform_calls", &lock(&self.platform_calls).len())
            .field("tool_calls", &lock(&self.tool_calls).len())
            .field("agent_calls", &lock(&self.agent_calls).len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

fn emit(call: &RecordedCall) {
    tracing::debug!(
        method = %call.method,
        duration_ms = call.duration.as_millis() as u64,
        failed = call.outcome.is_failure(),
        "recorded call"
    );
}

pub(crate) fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
