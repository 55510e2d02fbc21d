use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{ModelCatalog, Platform};
use super::utils::{
    check_openai_context_length_error, messages_to_openai_spec, openai_response_to_content,
    tools_to_openai_spec,
};
use crate::errors::{PlatformError, PlatformResult};
use crate::models::message::MessageBag;
use crate::models::options::{Options, TOOLS};
use crate::result::{DeferredResult, ResultId};

pub const OPENAI_HOST: &str = "https://api.openai.com";

/// Connection settings for any endpoint speaking the OpenAI chat-completions protocol
#[derive(Debug, Clone)]
pub struct OpenAiPlatformConfig {
    pub host: String,
    pub api_key: String,
    pub catalog: ModelCatalog,
    pub timeout: Duration,
}

impl OpenAiPlatformConfig {
    pub fn new<H: Into<String>, K: Into<String>>(host: H, api_key: K, catalog: ModelCatalog) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            catalog,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Platform for OpenAI and the providers that mirror its API (Cerebras, Perplexity, ...)
pub struct OpenAiPlatform {
    client: Client,
    config: OpenAiPlatformConfig,
}

impl OpenAiPlatform {
    pub fn new(config: OpenAiPlatformConfig) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlatformError::provider(format!("Could not build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.config.catalog
    }

    /// Request body for one invocation. Options other than `tools` are copied verbatim so
    /// provider extensions such as `disable_search` reach the provider untouched.
    fn payload(model: &str, messages: &MessageBag, options: &Options) -> PlatformResult<Value> {
        let mut payload = json!({
            "model": model,
            "messages": messages_to_openai_spec(messages),
        });
        let body = payload
            .as_object_mut()
            .ok_or_else(|| PlatformError::provider("Payload is not an object"))?;

        for (key, value) in options.iter() {
            if key == TOOLS || key == "model" || key == "messages" {
                continue;
            }
            body.insert(key.clone(), value.clone());
        }

        if let Some(tools) = options.tools() {
            let tools_spec = tools_to_openai_spec(&tools)?;
            if !tools_spec.is_empty() {
                body.insert("tools".to_string(), json!(tools_spec));
            }
        }

        Ok(payload)
    }
}

async fn post(client: Client, url: String, api_key: String, payload: Value) -> PlatformResult<Value> {
    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&payload)
        .send()
        .await
        .map_err(|e| PlatformError::provider(format!("Request failed: {}", e)))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .unwrap_or_else(|e| json!({ "error": { "message": e.to_string() } }));

    match status {
        StatusCode::OK => Ok(body),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() => {
            Err(PlatformError::ProviderInvocation {
                message: format!("Server error: {}", status),
                status: Some(status.as_u16()),
                payload: Some(body),
            })
        }
        status => Err(PlatformError::ProviderInvocation {
            message: format!("Request failed: {}", status),
            status: Some(status.as_u16()),
            payload: Some(body),
        }),
    }
}

impl Platform for OpenAiPlatform {
    fn invoke(
        &self,
        model: &str,
        messages: &MessageBag,
        options: &Options,
    ) -> PlatformResult<DeferredResult> {
        self.config.catalog.ensure_supported(model)?;

        let payload = match Self::payload(model, messages, options) {
            Ok(payload) => payload,
            Err(err) => return Ok(DeferredResult::failed(ResultId::new(), err)),
        };
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );
        let client = self.client.clone();
        let api_key = self.config.api_key.clone();
        tracing::debug!(model, url = %url, "invoking chat completions");

        Ok(DeferredResult::new(async move {
            let response = post(client, url, api_key, payload).await?;

            if let Some(error) = response.get("error") {
                let message = check_openai_context_length_error(error)
                    .unwrap_or_else(|| format!("Provider error: {}", error));
                return Err(PlatformError::ProviderInvocation {
                    message,
                    status: None,
                    payload: Some(error.clone()),
                });
            }

            openai_response_to_content(&response)
        }))
    }
}
