use async_trait::async_trait;
use std::sync::Arc;

use super::{Input, InputProcessor};
use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::toolbox::Toolbox;

/// Prepends a system message unless the conversation already starts with one
pub struct SystemPromptProcessor {
    prompt: String,
    toolbox: Option<Arc<dyn Toolbox>>,
}

impl SystemPromptProcessor {
    pub fn new<S: Into<String>>(prompt: S) -> Self {
        Self {
            prompt: prompt.into(),
            toolbox: None,
        }
    }

    /// Also describe the toolbox's tools in the prompt
    pub fn with_toolbox(mut self, toolbox: Arc<dyn Toolbox>) -> Self {
        self.toolbox = Some(toolbox);
        self
    }

    fn render(&self) -> String {
        let Some(toolbox) = &self.toolbox else {
            return self.prompt.clone();
        };
        let tools = toolbox.tools();
        if tools.is_empty() {
            return self.prompt.clone();
        }

        let mut prompt = format!("{}\n\n# Available tools\n", self.prompt);
        for tool in tools {
            prompt.push_str(&format!("\n## {}\n{}\n", tool.name, tool.description));
        }
        prompt
    }
}

#[async_trait]
impl InputProcessor for SystemPromptProcessor {
    async fn process_input(&self, input: &mut Input) -> AgentResult<()> {
        if input.messages.system_message().is_some() {
            tracing::debug!("conversation already has a system message");
            return Ok(());
        }
        input.messages = input
            .messages
            .prepended(Message::system().with_text(self.render()));
        Ok(())
    }
}
