use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use super::tool::Tool;
use crate::models::tool::ToolMetadata;

type TimeSource = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Tells the model the current date and time
#[derive(Clone)]
pub struct ClockTool {
    metadata: ToolMetadata,
    now: TimeSource,
}

impl Default for ClockTool {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockTool {
    pub fn new() -> Self {
        Self::with_source(Arc::new(Utc::now))
    }

    /// A clock frozen at `instant`
    pub fn fixed(instant: DateTime<Utc>) -> Self {
        Self::with_source(Arc::new(move || instant))
    }

    fn with_source(now: TimeSource) -> Self {
        Self {
            metadata: ToolMetadata::new(
                "clock",
                "Get the current date and time",
                json!({
                    "type": "object",
                    "properties": {},
                    "additionalProperties": false
                }),
            ),
            now,
        }
    }
}

#[async_trait]
impl Tool for ClockTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, _arguments: Value) -> AnyhowResult<Value> {
        let now = (self.now)();
        Ok(json!(now.format("%Y-%m-%d %H:%M:%S UTC").to_string()))
    }
}
