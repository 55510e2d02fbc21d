use anyhow::{Context, Result};
use std::sync::Arc;

use glimpse::agent::{Agent, ChatAgent};
use glimpse::models::message::{Message, MessageBag};
use glimpse::models::options::Options;
use glimpse::platform::Platform;
use glimpse::processor::{LoggingProcessor, SystemPromptProcessor, ToolCallProcessor};
use glimpse::profiler::{CallCollector, TraceableAgent, TraceablePlatform, TraceableToolbox};
use glimpse::result::Content;
use glimpse::toolbox::{Tool, ToolRegistry, Toolbox};

use crate::configuration::AgentSettings;

/// A traced agent plus the collector its decorators report to
pub struct Session {
    agent: TraceableAgent<ChatAgent>,
    collector: Arc<CallCollector>,
}

impl Session {
    pub fn new(
        platform: Arc<dyn Platform>,
        settings: &AgentSettings,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<Self> {
        let registry: Arc<dyn Toolbox> =
            Arc::new(ToolRegistry::new(tools).context("Failed to build toolbox")?);
        let collector = Arc::new(CallCollector::with_toolbox(registry.clone()));
        let toolbox = Arc::new(TraceableToolbox::new(registry, collector.clone()));

        let agent = ChatAgent::new(
            Arc::new(TraceablePlatform::new(platform, collector.clone())),
            settings.model.clone(),
        )
        .with_input_processor(Arc::new(SystemPromptProcessor::new(
            settings.system_prompt.clone(),
        )))
        .with_processor(Arc::new(ToolCallProcessor::new(toolbox)))
        .with_processor(Arc::new(LoggingProcessor::new()))
        .with_max_tool_rounds(settings.max_tool_rounds);

        Ok(Self {
            agent: TraceableAgent::new(agent, collector.clone()),
            collector,
        })
    }

    pub fn collector(&self) -> &CallCollector {
        &self.collector
    }

    /// Send `prompt` and wait for the final answer
    pub async fn ask(&self, prompt: &str, options: Options) -> Result<String> {
        let messages = MessageBag::new(vec![Message::user().with_text(prompt)]);
        let result = self.agent.call(messages, options).await?;
        match result.resolve().await? {
            Content::Text(text) => Ok(text),
            Content::ToolCalls(calls) => Ok(serde_json::to_string_pretty(&calls)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glimpse::models::tool::ToolCall;
    use glimpse::platform::mock::{ScriptedPlatform, SCRIPTED_MODEL};
    use glimpse::toolbox::ClockTool;
    use serde_json::json;

    #[tokio::test]
    async fn test_session_traces_every_layer() {
        let platform = Arc::new(ScriptedPlatform::with_contents([
            Content::ToolCalls(vec![ToolCall::new("1", "clock", json!({}))]),
            Content::text("It is late."),
        ]));
        let settings = AgentSettings {
            model: SCRIPTED_MODEL.to_string(),
            ..AgentSettings::default()
        };
        let clock: Arc<dyn Tool> = Arc::new(ClockTool::new());
        let session = Session::new(platform, &settings, vec![clock]).unwrap();

        let answer = session.ask("What time is it?", Options::new()).await.unwrap();
        assert_eq!(answer, "It is late.");
        assert_eq!(session.collector().platform_calls().await.len(), 2);
        assert_eq!(session.collector().tool_calls().len(), 1);
        assert_eq!(session.collector().agent_calls().await.len(), 1);
    }
}
