use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::errors::{PlatformError, PlatformResult};
use crate::models::message::{MessageBag, MessageContent};
use crate::models::tool::{ToolCall, ToolMetadata};
use crate::result::Content;

fn invalid_name_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("static regex"))
}

/// Convert a conversation to the OpenAI chat-completions message list
pub fn messages_to_openai_spec(messages: &MessageBag) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = Map::new();
        converted.insert("role".to_string(), json!(message.role()));

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        let mut output = Vec::new();

        for content in message.content() {
            match content {
                MessageContent::Text(text) => {
                    if !text.is_empty() {
                        texts.push(text.clone());
                    }
                }
                MessageContent::Structured(value) => texts.push(value.to_string()),
                MessageContent::ToolRequest(call) => tool_calls.push(json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": sanitize_function_name(&call.name),
                        "arguments": call.arguments.to_string(),
                    }
                })),
                MessageContent::ToolResponse(result) => output.push(json!({
                    "role": "tool",
                    "content": result.as_text(),
                    "tool_call_id": result.call_id,
                })),
            }
        }

        if !texts.is_empty() {
            converted.insert("content".to_string(), json!(texts.join("\n")));
        }
        if !tool_calls.is_empty() {
            converted.insert("tool_calls".to_string(), json!(tool_calls));
        }
        if converted.contains_key("content") || converted.contains_key("tool_calls") {
            output.insert(0, Value::Object(converted));
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert tool metadata to the OpenAI function tool specification
pub fn tools_to_openai_spec(tools: &[ToolMetadata]) -> PlatformResult<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(PlatformError::provider(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert an OpenAI chat-completions response body to result content.
///
/// Tool calls take precedence over text. Arguments that are not valid JSON are kept as the
/// raw string so the toolbox reports them back to the model as invalid arguments.
pub fn openai_response_to_content(response: &Value) -> PlatformResult<Content> {
    let message = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| PlatformError::ProviderInvocation {
            message: "Response contained no choices".to_string(),
            status: None,
            payload: Some(response.clone()),
        })?;

    let calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .map(|call| {
                    let id = call["id"].as_str().unwrap_or_default();
                    let name = call["function"]["name"].as_str().unwrap_or_default();
                    let raw = call["function"]["arguments"].as_str().unwrap_or("{}");
                    let arguments = serde_json::from_str::<Value>(raw)
                        .unwrap_or_else(|_| Value::String(raw.to_string()));
                    ToolCall::new(id, name, arguments)
                })
                .collect()
        })
        .unwrap_or_default();

    if !calls.is_empty() {
        return Ok(Content::ToolCalls(calls));
    }

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(Content::text(text))
}

pub fn sanitize_function_name(name: &str) -> String {
    invalid_name_chars().replace_all(name, "_").to_string()
}

pub fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty() && !invalid_name_chars().is_match(name)
}

/// Recognise the provider's context-length error and describe it
pub fn check_openai_context_length_error(error: &Value) -> Option<String> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        Some(format!("Context length exceeded. Message: {}", message))
    } else {
        None
    }
}
