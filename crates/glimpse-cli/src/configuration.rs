use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File, FileFormat};
use glimpse::agent::DEFAULT_MAX_TOOL_ROUNDS;
use glimpse::platform::openai::{OpenAiPlatform, OpenAiPlatformConfig, OPENAI_HOST};
use glimpse::platform::ModelCatalog;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

impl ProviderSettings {
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            })
    }

    /// Build the chat-completions platform these settings describe
    pub fn into_platform(self) -> anyhow::Result<OpenAiPlatform> {
        let api_key = self.api_key()?.to_string();
        let config = OpenAiPlatformConfig::new(self.host, api_key, ModelCatalog::new(self.models));
        Ok(OpenAiPlatform::new(config)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tool_rounds: default_max_tool_rounds(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    /// Defaults, then the TOML file at `path` if given, then `GLIMPSE_*` variables
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("provider.host", default_host())?
            .set_default("agent.model", default_model())?
            .set_default("agent.max_tool_rounds", default_max_tool_rounds() as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("GLIMPSE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("provider.models")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);
                if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_models() -> Vec<String> {
    vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()]
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tool_rounds() -> usize {
    DEFAULT_MAX_TOOL_ROUNDS
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}
