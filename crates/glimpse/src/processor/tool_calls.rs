use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

use super::{Input, InputProcessor, Output, OutputProcessor};
use crate::errors::{AgentError, AgentResult, PlatformError};
use crate::models::message::Message;
use crate::models::options::TOOLS;
use crate::models::tool::{ToolCall, ToolResult};
use crate::result::Content;
use crate::toolbox::Toolbox;

/// Lets the model call tools.
///
/// On input it advertises the toolbox's tools (or the subset named by the caller under
/// `tools`). On output, when the model asks for tool calls, it runs them all concurrently,
/// appends the request and the answers in request order, and asks the agent to dispatch
/// again.
pub struct ToolCallProcessor {
    toolbox: Arc<dyn Toolbox>,
}

impl ToolCallProcessor {
    pub fn new(toolbox: Arc<dyn Toolbox>) -> Self {
        Self { toolbox }
    }

    /// Run one call; failures the model can recover from become its answer
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.toolbox.execute(call).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %err, "tool call failed");
                ToolResult::from_error(call, &err)
            }
        }
    }
}

#[async_trait]
impl InputProcessor for ToolCallProcessor {
    async fn process_input(&self, input: &mut Input) -> AgentResult<()> {
        let available = self.toolbox.tools();
        let tools: Vec<_> = match input.options.tool_names() {
            Some(names) => available
                .into_iter()
                .filter(|tool| names.contains(&tool.name))
                .collect(),
            None => available,
        };

        if tools.is_empty() {
            input.options.remove(TOOLS);
        } else {
            input.options.set_tools(&tools);
        }
        Ok(())
    }
}

#[async_trait]
impl OutputProcessor for ToolCallProcessor {
    async fn process_output(&self, output: &mut Output) -> AgentResult<()> {
        let calls = match output.content().await? {
            Content::ToolCalls(calls) if calls.is_empty() => {
                let err = PlatformError::provider("Model requested an empty set of tool calls");
                return Err(err.into());
            }
            Content::ToolCalls(calls) => calls,
            Content::Text(_) => return Ok(()),
        };

        if !output.can_continue() {
            return Err(AgentError::ToolCallLimitExceeded {
                limit: output.max_rounds(),
            });
        }

        tracing::info!(
            round = output.round() + 1,
            calls = calls.len(),
            "executing requested tool calls"
        );
        let results = join_all(calls.iter().map(|call| self.execute(call))).await;

        let messages = output
            .messages()
            .with(Message::assistant().with_tool_requests(calls))
            .extended(results.into_iter().map(Message::tool));
        output.continue_with(messages);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageBag;
    use crate::models::options::Options;
    use crate::models::role::Role;
    use crate::models::tool::ToolMetadata;
    use crate::result::{DeferredResult, ResultId};
    use crate::toolbox::{ClockTool, FunctionTool, Tool, ToolRegistry};
    use serde_json::json;

    fn toolbox() -> Arc<dyn Toolbox> {
        let echo: Arc<dyn Tool> = Arc::new(FunctionTool::sync(
            ToolMetadata::new("echo", "Echoes back the input", json!({"type": "object"})),
            |args| Ok(args),
        ));
        let clock: Arc<dyn Tool> = Arc::new(ClockTool::new());
        Arc::new(ToolRegistry::new(vec![echo, clock]).unwrap())
    }

    fn input(options: Options) -> Input {
        Input {
            model: "scripted".into(),
            messages: MessageBag::new(vec![Message::user().with_text("Hi")]),
            options,
        }
    }

    fn output(content: Content, round: usize, max_rounds: usize) -> Output {
        Output::new(
            input(Options::new()),
            Options::new(),
            DeferredResult::ready(ResultId::new(), content),
            round,
            max_rounds,
        )
    }

    #[tokio::test]
    async fn test_input_advertises_all_tools() {
        let processor = ToolCallProcessor::new(toolbox());
        let mut input = input(Options::new());
        processor.process_input(&mut input).await.unwrap();

        let names: Vec<_> = input.options.tools().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo", "clock"]);
    }

    #[tokio::test]
    async fn test_input_restricts_to_requested_names() {
        let processor = ToolCallProcessor::new(toolbox());
        let mut input = input(Options::new().with(TOOLS, json!(["clock"])));
        processor.process_input(&mut input).await.unwrap();

        let names: Vec<_> = input.options.tools().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["clock"]);
    }

    #[tokio::test]
    async fn test_text_output_is_left_alone() {
        let processor = ToolCallProcessor::new(toolbox());
        let mut output = output(Content::text("Hello!"), 0, 3);
        processor.process_output(&mut output).await.unwrap();
        assert!(output.continuation().is_none());
    }

    #[tokio::test]
    async fn test_tool_calls_extend_conversation_in_request_order() {
        let processor = ToolCallProcessor::new(toolbox());
        let calls = vec![
            ToolCall::new("a", "echo", json!({"n": 1})),
            ToolCall::new("b", "missing", json!({})),
            ToolCall::new("c", "echo", json!({"n": 3})),
        ];
        let mut output = output(Content::ToolCalls(calls), 0, 3);
        processor.process_output(&mut output).await.unwrap();

        let next = output.continuation().unwrap();
        assert_eq!(next.len(), 5);
        assert_eq!(next.messages()[1].role(), Role::Assistant);
        assert_eq!(next.messages()[1].tool_requests().count(), 3);

        let answers: Vec<_> = next.messages()[2..]
            .iter()
            .map(|m| m.tool_responses().next().unwrap().clone())
            .collect();
        assert_eq!(
            answers.iter().map(|r| r.call_id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(answers[0].output, json!({"n": 1}));
        assert!(answers[1].is_error);
        assert_eq!(answers[1].as_text(), "Tool \"missing\" does not exist.");
    }

    #[tokio::test]
    async fn test_empty_tool_calls_are_rejected() {
        let processor = ToolCallProcessor::new(toolbox());
        let mut output = output(Content::ToolCalls(Vec::new()), 0, 3);
        let err = processor.process_output(&mut output).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::Platform(PlatformError::provider(
                "Model requested an empty set of tool calls"
            ))
        );
        assert!(output.continuation().is_none());
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let processor = ToolCallProcessor::new(toolbox());
        let call = ToolCall::new("a", "clock", json!({}));
        let mut output = output(Content::ToolCalls(vec![call]), 2, 2);
        let err = processor.process_output(&mut output).await.unwrap_err();
        assert_eq!(err, AgentError::ToolCallLimitExceeded { limit: 2 });
        assert!(output.continuation().is_none());
    }
}
