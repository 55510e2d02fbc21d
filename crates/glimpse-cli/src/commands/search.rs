use anyhow::Result;
use console::style;
use std::path::Path;
use std::sync::Arc;

use glimpse::models::options::{Options, DISABLE_SEARCH};

use crate::configuration::Settings;
use crate::report;
use crate::session::Session;

/// Ask a retrieval-augmented model, optionally telling the provider not to search
pub async fn execute(
    config: Option<&Path>,
    prompt: &str,
    model: Option<String>,
    disable_search: bool,
    trace: bool,
) -> Result<()> {
    let mut settings = Settings::new(config)?;
    if let Some(model) = model {
        settings.agent.model = model;
    }
    let platform = Arc::new(settings.provider.into_platform()?);
    let session = Session::new(platform, &settings.agent, Vec::new())?;

    let answer = session.ask(prompt, search_options(disable_search)).await?;
    println!("{}", style(answer).bold());

    if trace {
        report::render(session.collector()).await;
    }
    Ok(())
}

/// Providers search by default, so the flag is only sent when search is turned off
fn search_options(disable_search: bool) -> Options {
    let mut options = Options::new();
    if disable_search {
        options.insert(DISABLE_SEARCH, true);
    }
    options
}
