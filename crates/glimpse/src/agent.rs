use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::MessageBag;
use crate::models::options::Options;
use crate::platform::Platform;
use crate::processor::{Input, InputProcessor, Output, OutputProcessor};
use crate::result::DeferredResult;

/// Rounds of tool calls a [`ChatAgent`] executes before giving up
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Core trait of an agent: take a conversation and return the final model result
#[async_trait]
pub trait Agent: Send + Sync {
    async fn call(&self, messages: MessageBag, options: Options) -> AgentResult<DeferredResult>;

    /// Clear any state accumulated across calls
    fn reset(&self) {}
}

#[async_trait]
impl<A: Agent + ?Sized> Agent for Arc<A> {
    async fn call(&self, messages: MessageBag, options: Options) -> AgentResult<DeferredResult> {
        (**self).call(messages, options).await
    }

    fn reset(&self) {
        (**self).reset()
    }
}

/// Agent integrates a model on a platform with the processors that shape each dispatch
pub struct ChatAgent {
    platform: Arc<dyn Platform>,
    model: String,
    input_processors: Vec<Arc<dyn InputProcessor>>,
    output_processors: Vec<Arc<dyn OutputProcessor>>,
    max_tool_rounds: usize,
}

impl ChatAgent {
    pub fn new<M: Into<String>>(platform: Arc<dyn Platform>, model: M) -> Self {
        Self {
            platform,
            model: model.into(),
            input_processors: Vec::new(),
            output_processors: Vec::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_input_processor(mut self, processor: Arc<dyn InputProcessor>) -> Self {
        self.input_processors.push(processor);
        self
    }

    pub fn with_output_processor(mut self, processor: Arc<dyn OutputProcessor>) -> Self {
        self.output_processors.push(processor);
        self
    }

    /// Register a processor on both sides of the dispatch
    pub fn with_processor<P>(self, processor: Arc<P>) -> Self
    where
        P: InputProcessor + OutputProcessor + 'static,
    {
        self.with_input_processor(processor.clone())
            .with_output_processor(processor)
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }
}

#[async_trait]
impl Agent for ChatAgent {
    async fn call(&self, messages: MessageBag, options: Options) -> AgentResult<DeferredResult> {
        let mut messages = messages;
        let mut round = 0;

        loop {
            let mut input = Input {
                model: self.model.clone(),
                messages,
                options: options.clone(),
            };
            for processor in &self.input_processors {
                processor.process_input(&mut input).await?;
            }

            let result = self
                .platform
                .invoke(&input.model, &input.messages, &input.options)?;
            tracing::debug!(model = %input.model, result = %result.id(), round, "platform invoked");

            let mut output = Output::new(input, options.clone(), result, round, self.max_tool_rounds);
            for processor in &self.output_processors {
                processor.process_output(&mut output).await?;
            }

            let (result, next) = output.into_parts();
            let Some(next) = next else {
                return Ok(result);
            };

            round += 1;
            if round > self.max_tool_rounds {
                return Err(AgentError::ToolCallLimitExceeded {
                    limit: self.max_tool_rounds,
                });
            }
            messages = next;
        }
    }

    fn reset(&self) {
        for processor in &self.input_processors {
            processor.reset();
        }
        for processor in &self.output_processors {
            processor.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PlatformError;
    use crate::models::message::Message;
    use crate::models::role::Role;
    use crate::models::tool::{ToolCall, ToolMetadata};
    use crate::platform::mock::{Reply, ScriptedPlatform, SCRIPTED_MODEL};
    use crate::processor::{LoggingProcessor, SystemPromptProcessor, ToolCallProcessor};
    use crate::result::Content;
    use crate::toolbox::{FunctionTool, Tool, ToolRegistry};
    use anyhow::Result;
    use serde_json::json;

    fn echo_toolbox() -> Arc<ToolRegistry> {
        let echo: Arc<dyn Tool> = Arc::new(FunctionTool::sync(
            ToolMetadata::new(
                "echo",
                "Echoes back the input",
                json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]}),
            ),
            |args| Ok(args["message"].clone()),
        ));
        Arc::new(ToolRegistry::new(vec![echo]).unwrap())
    }

    fn tool_agent(platform: Arc<ScriptedPlatform>) -> ChatAgent {
        ChatAgent::new(platform, SCRIPTED_MODEL)
            .with_processor(Arc::new(ToolCallProcessor::new(echo_toolbox())))
    }

    fn user(text: &str) -> MessageBag {
        MessageBag::new(vec![Message::user().with_text(text)])
    }

    fn echo_call(id: &str, message: &str) -> ToolCall {
        ToolCall::new(id, "echo", json!({ "message": message }))
    }

    #[tokio::test]
    async fn test_simple_response() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([Content::text("Hello!")]));
        let agent = ChatAgent::new(platform.clone(), SCRIPTED_MODEL);

        let result = agent.call(user("Hi"), Options::new()).await?;
        assert_eq!(result.resolve().await?, Content::text("Hello!"));
        assert_eq!(platform.invocations(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([
            Content::ToolCalls(vec![echo_call("1", "test")]),
            Content::text("Done!"),
        ]));
        let agent = tool_agent(platform.clone());

        let result = agent.call(user("Echo test"), Options::new()).await?;
        assert_eq!(result.resolve().await?, Content::text("Done!"));

        let requests = platform.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].options.tools().unwrap()[0].name, "echo");

        // Second dispatch carries the tool request and its answer
        let second = requests[1].messages.messages();
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role(), Role::Assistant);
        assert_eq!(second[2].role(), Role::Tool);
        assert_eq!(second[2].tool_responses().next().unwrap().as_text(), "test");
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_tool() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([
            Content::ToolCalls(vec![ToolCall::new("1", "invalid_tool", json!({}))]),
            Content::text("Error occurred"),
        ]));
        let agent = tool_agent(platform.clone());

        let result = agent.call(user("Invalid tool"), Options::new()).await?;
        assert_eq!(result.resolve().await?, Content::text("Error occurred"));

        let second = platform.requests()[1].messages.clone();
        let answer = second.last().unwrap().tool_responses().next().unwrap().clone();
        assert!(answer.is_error);
        assert_eq!(answer.as_text(), "Tool \"invalid_tool\" does not exist.");
        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_tool_calls() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([
            Content::ToolCalls(vec![echo_call("1", "first"), echo_call("2", "second")]),
            Content::text("All done!"),
        ]));
        let agent = tool_agent(platform.clone());

        let result = agent.call(user("Multiple calls"), Options::new()).await?;
        assert_eq!(result.resolve().await?, Content::text("All done!"));

        let second = platform.requests()[1].messages.clone();
        let answers: Vec<String> = second.messages()[2..]
            .iter()
            .flat_map(|m| m.tool_responses().map(|r| r.as_text()))
            .collect();
        assert_eq!(answers, vec!["first", "second"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_call_limit() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([
            Content::ToolCalls(vec![echo_call("1", "a")]),
            Content::ToolCalls(vec![echo_call("2", "b")]),
            Content::ToolCalls(vec![echo_call("3", "c")]),
            Content::text("never reached"),
        ]));
        let agent = tool_agent(platform.clone()).with_max_tool_rounds(2);

        let err = agent.call(user("Loop"), Options::new()).await.unwrap_err();
        assert_eq!(err, AgentError::ToolCallLimitExceeded { limit: 2 });
        assert_eq!(platform.invocations(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_rounds_rejects_first_tool_call() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([Content::ToolCalls(vec![
            echo_call("1", "a"),
        ])]));
        let agent = tool_agent(platform.clone()).with_max_tool_rounds(0);

        let err = agent.call(user("Hi"), Options::new()).await.unwrap_err();
        assert_eq!(err, AgentError::ToolCallLimitExceeded { limit: 0 });
        assert_eq!(platform.invocations(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_model() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([Content::text("Hi")]));
        let agent = ChatAgent::new(platform.clone(), "gpt-4o");

        let err = agent.call(user("Hi"), Options::new()).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::Platform(PlatformError::UnsupportedModel("gpt-4o".into()))
        );
        assert_eq!(platform.invocations(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_error_aborts_tool_round() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::new([Reply::Error(PlatformError::provider(
            "overloaded",
        ))]));
        let agent = tool_agent(platform);

        let err = agent.call(user("Hi"), Options::new()).await.unwrap_err();
        assert_eq!(err, AgentError::Platform(PlatformError::provider("overloaded")));
        Ok(())
    }

    #[tokio::test]
    async fn test_caller_options_reach_every_dispatch() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([
            Content::ToolCalls(vec![echo_call("1", "a")]),
            Content::text("ok"),
        ]));
        let agent = tool_agent(platform.clone());

        agent
            .call(user("Hi"), Options::new().with("temperature", 0.2))
            .await?
            .resolve()
            .await?;
        for request in platform.requests() {
            assert_eq!(request.options.get_f64("temperature"), Some(0.2));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_reaches_processors() -> Result<()> {
        let platform = Arc::new(ScriptedPlatform::with_contents([Content::text("Hi")]));
        let logging = Arc::new(LoggingProcessor::new());
        let agent = ChatAgent::new(platform, SCRIPTED_MODEL)
            .with_input_processor(Arc::new(SystemPromptProcessor::new("Be brief.")))
            .with_processor(logging.clone());

        agent.call(user("Hi"), Options::new()).await?;
        assert_eq!(logging.dispatches(), 1);

        agent.reset();
        assert_eq!(logging.dispatches(), 0);
        Ok(())
    }
}
