use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::errors::ToolError;

/// The description of a tool presented to a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolMetadata {
    /// The name of the tool, unique within a toolbox
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema of the arguments the tool accepts
    pub parameters: Value,
}

impl ToolMetadata {
    /// Create new tool metadata with the given name, description and parameter schema
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolMetadata {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A model-issued request to invoke a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Correlation id assigned by the model, echoed back in the matching [`ToolResult`]
    pub id: String,
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution
    pub arguments: Value,
}

impl ToolCall {
    pub fn new<I: Into<String>, S: Into<String>>(id: I, name: S, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The answer to a [`ToolCall`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub output: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCall, output: Value) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output,
            is_error: false,
        }
    }

    /// Describe a failed tool call so the model can read about it and correct itself
    pub fn from_error(call: &ToolCall, error: &ToolError) -> Self {
        let message = match error {
            ToolError::UnknownTool(name) => format!("Tool \"{}\" does not exist.", name),
            ToolError::InvalidArguments { tool, reason } => format!(
                "The arguments for tool \"{}\" were invalid: {}",
                tool, reason
            ),
            ToolError::Execution { tool, message } => format!(
                "An error occurred while executing tool \"{}\": {}",
                tool, message
            ),
        };
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: Value::String(message),
            is_error: true,
        }
    }

    /// Render the output as conversational text. Strings are used as-is, anything else is
    /// serialized to JSON.
    pub fn as_text(&self) -> String {
        match &self.output {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
