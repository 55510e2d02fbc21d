use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: set {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Environment variable overriding the settings key `field`, e.g. `provider.api_key`
pub fn to_env_var(field: &str) -> String {
    format!("GLIMPSE_{}", field.replace('.', "__").to_uppercase())
}
