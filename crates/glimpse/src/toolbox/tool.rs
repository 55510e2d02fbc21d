use anyhow::Result as AnyhowResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::models::tool::ToolMetadata;

/// A capability that can be registered into a toolbox
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema presented to the model
    fn metadata(&self) -> &ToolMetadata;

    /// Run the capability with already validated arguments. The returned value becomes the
    /// tool's answer in the conversation.
    async fn call(&self, arguments: Value) -> AnyhowResult<Value>;
}

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, AnyhowResult<Value>> + Send + Sync>;

/// A tool backed by a closure
#[derive(Clone)]
pub struct FunctionTool {
    metadata: ToolMetadata,
    handler: Handler,
}

impl FunctionTool {
    pub fn new<F, Fut>(metadata: ToolMetadata, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AnyhowResult<Value>> + Send + 'static,
    {
        Self {
            metadata,
            handler: Arc::new(move |arguments| handler(arguments).boxed()),
        }
    }

    /// A tool whose handler does not need to await anything
    pub fn sync<F>(metadata: ToolMetadata, handler: F) -> Self
    where
        F: Fn(Value) -> AnyhowResult<Value> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(metadata, move |arguments| {
            let handler = handler.clone();
            async move { handler(arguments) }
        })
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn call(&self, arguments: Value) -> AnyhowResult<Value> {
        (self.handler)(arguments).await
    }
}
