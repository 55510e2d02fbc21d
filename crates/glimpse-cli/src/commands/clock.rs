use anyhow::Result;
use console::style;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use glimpse::models::options::Options;
use glimpse::models::tool::ToolCall;
use glimpse::platform::mock::{ScriptedPlatform, SCRIPTED_MODEL};
use glimpse::platform::Platform;
use glimpse::profiler::Outcome;
use glimpse::result::Content;
use glimpse::toolbox::{ClockTool, Tool};

use crate::configuration::{AgentSettings, Settings};
use crate::report;
use crate::session::Session;

const PROMPT: &str = "What date and time is it?";

/// Let the model answer the time with the clock tool. Offline, a scripted platform plays
/// the model's part.
pub async fn execute(config: Option<&Path>, offline: bool, trace: bool) -> Result<()> {
    let (platform, settings): (Arc<dyn Platform>, AgentSettings) = if offline {
        let platform: Arc<dyn Platform> = Arc::new(ScriptedPlatform::with_contents([
            Content::ToolCalls(vec![ToolCall::new("call_clock", "clock", json!({}))]),
            Content::text("The clock tool reported the current time."),
        ]));
        let settings = AgentSettings {
            model: SCRIPTED_MODEL.to_string(),
            ..AgentSettings::default()
        };
        (platform, settings)
    } else {
        let settings = Settings::new(config)?;
        let platform: Arc<dyn Platform> = Arc::new(settings.provider.into_platform()?);
        (platform, settings.agent)
    };

    let clock: Arc<dyn Tool> = Arc::new(ClockTool::new());
    let session = Session::new(platform, &settings, vec![clock])?;
    let answer = session.ask(PROMPT, Options::new()).await?;
    println!("{}", style(answer).bold());

    if offline {
        for call in session.collector().tool_calls() {
            if let Outcome::Returned(result) = call.outcome {
                println!(
                    "{} {}",
                    style("clock:").dim(),
                    result["output"].as_str().unwrap_or_default()
                );
            }
        }
    }

    if trace {
        report::render(session.collector()).await;
    }
    Ok(())
}
