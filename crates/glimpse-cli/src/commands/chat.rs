use anyhow::Result;
use console::style;
use std::path::Path;
use std::sync::Arc;

use glimpse::models::options::{Options, MAX_TOKENS, TEMPERATURE};

use crate::configuration::Settings;
use crate::report;
use crate::session::Session;

/// Plain chat: one prompt, no tools offered to the model
pub async fn execute(
    config: Option<&Path>,
    prompt: &str,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    trace: bool,
) -> Result<()> {
    let settings = Settings::new(config)?;
    let platform = Arc::new(settings.provider.into_platform()?);
    let session = Session::new(platform, &settings.agent, Vec::new())?;

    let answer = session
        .ask(prompt, chat_options(temperature, max_tokens))
        .await?;
    println!("{}", style(answer).bold());

    if trace {
        report::render(session.collector()).await;
    }
    Ok(())
}

fn chat_options(temperature: Option<f64>, max_tokens: Option<u64>) -> Options {
    let mut options = Options::new();
    if let Some(temperature) = temperature {
        options.insert(TEMPERATURE, temperature);
    }
    if let Some(max_tokens) = max_tokens {
        options.insert(MAX_TOKENS, max_tokens);
    }
    options
}
