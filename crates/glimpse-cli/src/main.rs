use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands {
    pub mod chat;
    pub mod clock;
    pub mod search;
    pub mod version;
}
mod configuration;
mod error;
mod report;
mod session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file, overridden by GLIMPSE_* environment variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the recorded platform, tool and agent calls after the answer
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask the configured model a question
    Chat {
        prompt: String,

        /// Sampling temperature passed to the provider
        #[arg(long)]
        temperature: Option<f64>,

        /// Upper bound on tokens in the reply
        #[arg(long)]
        max_tokens: Option<u64>,
    },

    /// Ask the model for the current date and time through the clock tool
    Clock {
        /// Use a scripted model instead of the configured provider
        #[arg(long)]
        offline: bool,
    },

    /// Ask a search-augmented model such as Perplexity's sonar
    Search {
        prompt: String,

        /// Model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,

        /// Tell the provider not to run a web search
        #[arg(long)]
        disable_search: bool,
    },

    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("glimpse=info,glimpse_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Chat {
            prompt,
            temperature,
            max_tokens,
        } => commands::chat::execute(config, &prompt, temperature, max_tokens, cli.trace).await,
        Command::Clock { offline } => commands::clock::execute(config, offline, cli.trace).await,
        Command::Search {
            prompt,
            model,
            disable_search,
        } => commands::search::execute(config, &prompt, model, disable_search, cli.trace).await,
        Command::Version => commands::version::execute().await,
    }
}
