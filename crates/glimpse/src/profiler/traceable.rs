use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use super::collector::{snapshot, CallCollector, Outcome, RecordedCall};
use crate::agent::Agent;
use crate::errors::{AgentResult, PlatformResult, ToolOutcome};
use crate::models::message::MessageBag;
use crate::models::options::Options;
use crate::models::tool::{ToolCall, ToolMetadata, ToolResult};
use crate::platform::Platform;
use crate::result::DeferredResult;
use crate::toolbox::Toolbox;

/// Records every `invoke` of the wrapped platform
pub struct TraceablePlatform<P> {
    inner: P,
    collector: Arc<CallCollector>,
}

impl<P: Platform> TraceablePlatform<P> {
    pub fn new(inner: P, collector: Arc<CallCollector>) -> Self {
        Self { inner, collector }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Platform> Platform for TraceablePlatform<P> {
    fn invoke(
        &self,
        model: &str,
        messages: &MessageBag,
        options: &Options,
    ) -> PlatformResult<DeferredResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let input = json!({
            "model": model,
            "messages": snapshot(messages),
            "options": snapshot(options),
        });

        match self.inner.invoke(model, messages, options) {
            Ok(result) => {
                let result = self.collector.observe(result);
                self.collector.record_platform_call(
                    RecordedCall::new("invoke", started_at, start.elapsed(), input, Outcome::Pending),
                    Some(result.probe()),
                );
                Ok(result)
            }
            Err(err) => {
                self.collector.record_platform_call(
                    RecordedCall::new(
                        "invoke",
                        started_at,
                        start.elapsed(),
                        input,
                        Outcome::Failed(err.to_string()),
                    ),
                    None,
                );
                Err(err)
            }
        }
    }
}

/// Records every `execute` of the wrapped toolbox
pub struct TraceableToolbox<T> {
    inner: T,
    collector: Arc<CallCollector>,
}

impl<T: Toolbox> TraceableToolbox<T> {
    pub fn new(inner: T, collector: Arc<CallCollector>) -> Self {
        Self { inner, collector }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Toolbox> Toolbox for TraceableToolbox<T> {
    fn tools(&self) -> Vec<ToolMetadata> {
        self.inner.tools()
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome<ToolResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let input = json!({ "call": snapshot(call) });

        let outcome = self.inner.execute(call).await;
        let recorded = match &outcome {
            Ok(result) => Outcome::Returned(snapshot(result)),
            Err(err) => Outcome::Failed(err.to_string()),
        };
        self.collector.record_tool_call(RecordedCall::new(
            "execute",
            started_at,
            start.elapsed(),
            input,
            recorded,
        ));
        outcome
    }
}

/// Records every `call` of the wrapped agent
pub struct TraceableAgent<A> {
    inner: A,
    collector: Arc<CallCollector>,
}

impl<A: Agent> TraceableAgent<A> {
    pub fn new(inner: A, collector: Arc<CallCollector>) -> Self {
        Self { inner, collector }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn collector(&self) -> &Arc<CallCollector> {
        &self.collector
    }
}

#[async_trait]
impl<A: Agent> Agent for TraceableAgent<A> {
    async fn call(&self, messages: MessageBag, options: Options) -> AgentResult<DeferredResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let input = json!({
            "messages": snapshot(&messages),
            "options": snapshot(&options),
        });

        match self.inner.call(messages, options).await {
            Ok(result) => {
                let result = self.collector.observe(result);
                self.collector.record_agent_call(
                    RecordedCall::new("call", started_at, start.elapsed(), input, Outcome::Pending),
                    Some(result.probe()),
                );
                Ok(result)
            }
            Err(err) => {
                self.collector.record_agent_call(
                    RecordedCall::new(
                        "call",
                        started_at,
                        start.elapsed(),
                        input,
                        Outcome::Failed(err.to_string()),
                    ),
                    None,
                );
                Err(err)
            }
        }
    }

    fn reset(&self) {
        self.collector.reset();
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{PlatformError, ToolError};
    use crate::models::message::Message;
    use crate::agent::ChatAgent;
    use crate::platform::mock::{ScriptedPlatform, SCRIPTED_MODEL};
    use crate::processor::LoggingProcessor;
    use crate::result::Content;
    use crate::toolbox::{ClockTool, Tool, ToolRegistry};

    fn user(text: &str) -> MessageBag {
        MessageBag::new(vec![Message::user().with_text(text)])
    }

    #[tokio::test]
    async fn test_platform_records_input_and_content() {
        let collector = Arc::new(CallCollector::new());
        let platform = TraceablePlatform::new(
            ScriptedPlatform::with_contents([Content::text("Tokyo")]),
            collector.clone(),
        );

        let result = platform
            .invoke(SCRIPTED_MODEL, &user("Capital of Japan?"), &Options::new().with("temperature", 0.5))
            .unwrap();
        let id = result.id();
        assert_eq!(result.resolve().await.unwrap(), Content::text("Tokyo"));

        let calls = collector.platform_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "invoke");
        assert_eq!(calls[0].input["model"], SCRIPTED_MODEL);
        assert_eq!(calls[0].input["options"]["temperature"], 0.5);
        assert_eq!(calls[0].outcome, Outcome::Returned(snapshot(&Content::text("Tokyo"))));
        assert_eq!(collector.cache().get(id), Some(Content::text("Tokyo")));
        assert_eq!(platform.inner().materializations(), 1);
    }

    #[tokio::test]
    async fn test_platform_failure_is_recorded_and_returned() {
        let collector = Arc::new(CallCollector::new());
        let platform =
            TraceablePlatform::new(ScriptedPlatform::with_contents([]), collector.clone());

        let err = platform
            .invoke("gpt-4o", &user("Hi"), &Options::new())
            .unwrap_err();
        assert_eq!(err, PlatformError::UnsupportedModel("gpt-4o".into()));

        let calls = collector.platform_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].outcome, Outcome::Failed(err.to_string()));
    }

    #[tokio::test]
    async fn test_toolbox_records_results_and_errors() {
        let collector = Arc::new(CallCollector::new());
        let clock: Arc<dyn Tool> = Arc::new(ClockTool::new());
        let toolbox = TraceableToolbox::new(ToolRegistry::new(vec![clock]).unwrap(), collector.clone());
        assert_eq!(toolbox.tools()[0].name, "clock");

        let ok = toolbox
            .execute(&ToolCall::new("1", "clock", json!({})))
            .await
            .unwrap();
        let err = toolbox
            .execute(&ToolCall::new("2", "weather", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("weather".into()));

        let calls = collector.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].input["call"]["name"], "clock");
        assert_eq!(calls[0].outcome, Outcome::Returned(snapshot(&ok)));
        assert_eq!(calls[1].outcome, Outcome::Failed(err.to_string()));
    }

    #[tokio::test]
    async fn test_agent_reset_clears_records_and_inner_state() {
        let collector = Arc::new(CallCollector::new());
        let logging = Arc::new(LoggingProcessor::new());
        let platform = Arc::new(ScriptedPlatform::with_contents([Content::text("Hello!")]));
        let agent = TraceableAgent::new(
            ChatAgent::new(platform, SCRIPTED_MODEL).with_processor(logging.clone()),
            collector.clone(),
        );

        agent.call(user("Hi"), Options::new()).await.unwrap().resolve().await.unwrap();
        assert_eq!(collector.agent_calls().await.len(), 1);
        assert_eq!(logging.dispatches(), 1);

        agent.reset();
        assert!(collector.agent_calls().await.is_empty());
        assert_eq!(logging.dispatches(), 0);
    }
}
