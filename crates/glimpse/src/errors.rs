use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::result::ResultId;

/// Failures raised by a platform, either synchronously from `invoke` or
/// when a deferred result is materialized.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum PlatformError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Provider invocation failed: {message}")]
    ProviderInvocation {
        message: String,
        status: Option<u16>,
        payload: Option<Value>,
    },

    #[error("Result {0} was already consumed by its owner")]
    AlreadyConsumed(ResultId),

    #[error("Materialization of result {0} was interrupted")]
    Interrupted(ResultId),
}

impl PlatformError {
    pub fn provider<S: Into<String>>(message: S) -> Self {
        PlatformError::ProviderInvocation {
            message: message.into(),
            status: None,
            payload: None,
        }
    }
}

/// Failures of a single tool call. These are recoverable: the tool-calling
/// processor turns them into conversational content for the model.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool {tool} failed: {message}")]
    Execution { tool: String, message: String },
}

/// Failures that abort an agent call.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Tool call limit of {limit} rounds exceeded")]
    ToolCallLimitExceeded { limit: usize },

    #[error("Invalid toolbox: {0}")]
    InvalidToolbox(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;
pub type ToolOutcome<T> = Result<T, ToolError>;
pub type AgentResult<T> = Result<T, AgentError>;
