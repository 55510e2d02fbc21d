use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{PlatformError, PlatformResult};
use crate::models::message::MessageBag;
use crate::models::options::Options;
use crate::result::DeferredResult;

/// Stateless gateway to a model provider (OpenAI, Cerebras, Perplexity, etc)
pub trait Platform: Send + Sync {
    /// Start an invocation of `model` with the conversation so far.
    ///
    /// Returns immediately with an unresolved [`DeferredResult`]; provider and network
    /// failures surface only when that result is materialized. An unknown or disabled model
    /// fails here, before any result exists.
    fn invoke(
        &self,
        model: &str,
        messages: &MessageBag,
        options: &Options,
    ) -> PlatformResult<DeferredResult>;
}

impl<P: Platform + ?Sized> Platform for Arc<P> {
    fn invoke(
        &self,
        model: &str,
        messages: &MessageBag,
        options: &Options,
    ) -> PlatformResult<DeferredResult> {
        (**self).invoke(model, messages, options)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// The model identifiers a platform accepts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    models: Vec<ModelEntry>,
}

impl ModelCatalog {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models
                .into_iter()
                .map(|name| ModelEntry {
                    name: name.into(),
                    enabled: true,
                })
                .collect(),
        }
    }

    /// Keep `model` known but refuse invocations of it
    pub fn with_disabled<S: Into<String>>(mut self, model: S) -> Self {
        let model = model.into();
        match self.models.iter_mut().find(|entry| entry.name == model) {
            Some(entry) => entry.enabled = false,
            None => self.models.push(ModelEntry {
                name: model,
                enabled: false,
            }),
        }
        self
    }

    pub fn supports(&self, model: &str) -> bool {
        self.models
            .iter()
            .any(|entry| entry.enabled && entry.name == model)
    }

    pub fn ensure_supported(&self, model: &str) -> PlatformResult<()> {
        if self.supports(model) {
            Ok(())
        } else {
            Err(PlatformError::UnsupportedModel(model.to_string()))
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = ModelCatalog::new(["gpt-4o-mini", "llama3.1-8b"]);
        assert!(catalog.supports("llama3.1-8b"));
        assert!(!catalog.supports("sonar"));
        assert_eq!(
            catalog.ensure_supported("sonar"),
            Err(PlatformError::UnsupportedModel("sonar".into()))
        );
    }

    #[test]
    fn test_disabled_model_is_rejected() {
        let catalog = ModelCatalog::new(["gpt-4o-mini", "gpt-4o"]).with_disabled("gpt-4o");
        assert!(!catalog.supports("gpt-4o"));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["gpt-4o-mini"]);
    }
}
