//! Pluggable hooks around a model invocation.
//!
//! Input processors may rewrite the model, conversation and options before the platform is
//! invoked. Output processors inspect the result afterwards and may ask the agent to
//! dispatch again with an extended conversation. Both run in registration order.
mod logging;
mod system_prompt;
mod tool_calls;

pub use logging::LoggingProcessor;
pub use system_prompt::SystemPromptProcessor;
pub use tool_calls::ToolCallProcessor;

use async_trait::async_trait;

use crate::errors::{AgentResult, PlatformError, PlatformResult};
use crate::models::message::MessageBag;
use crate::models::options::Options;
use crate::result::{Content, DeferredResult};

/// What is about to be sent to the platform
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub model: String,
    pub messages: MessageBag,
    pub options: Options,
}

/// What came back from the platform, plus the agent's round budget
#[derive(Debug)]
pub struct Output {
    model: String,
    messages: MessageBag,
    options: Options,
    result: DeferredResult,
    round: usize,
    max_rounds: usize,
    next: Option<MessageBag>,
}

impl Output {
    pub(crate) fn new(
        input: Input,
        options: Options,
        result: DeferredResult,
        round: usize,
        max_rounds: usize,
    ) -> Self {
        Self {
            model: input.model,
            messages: input.messages,
            options,
            result,
            round,
            max_rounds,
            next: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The conversation that was sent
    pub fn messages(&self) -> &MessageBag {
        &self.messages
    }

    /// The options the agent was originally called with
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn result(&self) -> &DeferredResult {
        &self.result
    }

    /// Replace the result handed back to the caller
    pub fn set_result(&mut self, result: DeferredResult) {
        self.result = result;
    }

    /// Materialize the result. The output owns the handle, so the content is produced once
    /// and a ready handle with the same identity is put back for later processors and the
    /// caller.
    pub async fn content(&mut self) -> PlatformResult<Content> {
        let id = self.result.id();
        let pending = std::mem::replace(
            &mut self.result,
            DeferredResult::failed(id, PlatformError::AlreadyConsumed(id)),
        );
        match pending.resolve().await {
            Ok(content) => {
                self.result = DeferredResult::ready(id, content.clone());
                Ok(content)
            }
            Err(err) => {
                self.result = DeferredResult::failed(id, err.clone());
                Err(err)
            }
        }
    }

    /// Number of follow-up dispatches already made in this call
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Whether another dispatch fits in the round budget
    pub fn can_continue(&self) -> bool {
        self.round < self.max_rounds
    }

    /// Ask the agent to dispatch again with `messages` and the original options
    pub fn continue_with(&mut self, messages: MessageBag) {
        self.next = Some(messages);
    }

    pub fn continuation(&self) -> Option<&MessageBag> {
        self.next.as_ref()
    }

    pub(crate) fn into_parts(self) -> (DeferredResult, Option<MessageBag>) {
        (self.result, self.next)
    }
}

#[async_trait]
pub trait InputProcessor: Send + Sync {
    async fn process_input(&self, input: &mut Input) -> AgentResult<()>;

    /// Clear any state accumulated across calls
    fn reset(&self) {}
}

#[async_trait]
pub trait OutputProcessor: Send + Sync {
    async fn process_output(&self, output: &mut Output) -> AgentResult<()>;

    /// Clear any state accumulated across calls
    fn reset(&self) {}
}
