use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::Role;
use super::tool::{ToolCall, ToolResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
/// Content passed inside a message, which can be both simple content and tool content
pub enum MessageContent {
    Text(String),
    Structured(Value),
    ToolRequest(ToolCall),
    ToolResponse(ToolResult),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_request(&self) -> Option<&ToolCall> {
        match self {
            MessageContent::ToolRequest(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResult> {
        match self {
            MessageContent::ToolResponse(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM. Built once through the `with_*` builders and never
/// mutated afterwards.
pub struct Message {
    role: Role,
    created: i64,
    content: Vec<MessageContent>,
}

impl Message {
    fn new(role: Role) -> Self {
        Message {
            role,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new system message with the current timestamp
    pub fn system() -> Self {
        Self::new(Role::System)
    }

    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Self::new(Role::User)
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Self::new(Role::Assistant)
    }

    /// Create a tool message answering a single tool call
    pub fn tool(result: ToolResult) -> Self {
        Self::new(Role::Tool).with_content(MessageContent::ToolResponse(result))
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add a structured payload to the message
    pub fn with_structured(self, value: Value) -> Self {
        self.with_content(MessageContent::Structured(value))
    }

    /// Add a tool request to the message
    pub fn with_tool_request(self, call: ToolCall) -> Self {
        self.with_content(MessageContent::ToolRequest(call))
    }

    /// Add every tool request in order
    pub fn with_tool_requests<I: IntoIterator<Item = ToolCall>>(self, calls: I) -> Self {
        calls.into_iter().fold(self, Message::with_tool_request)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn content(&self) -> &[MessageContent] {
        &self.content
    }

    /// All text content joined by newlines
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(MessageContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_requests(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(MessageContent::as_tool_request)
    }

    pub fn tool_responses(&self) -> impl Iterator<Item = &ToolResult> {
        self.content.iter().filter_map(MessageContent::as_tool_response)
    }
}

/// Ordered, immutable conversation history. Every transformation returns a new bag and
/// preserves the order of the messages it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBag {
    messages: Vec<Message>,
}

impl MessageBag {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// A new bag with `message` appended
    pub fn with(&self, message: Message) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        Self { messages }
    }

    /// A new bag with all of `messages` appended in iteration order
    pub fn extended<I: IntoIterator<Item = Message>>(&self, messages: I) -> Self {
        let mut all = self.messages.clone();
        all.extend(messages);
        Self { messages: all }
    }

    /// A new bag with `message` in front of the existing history
    pub fn prepended(&self, message: Message) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(message);
        messages.extend(self.messages.iter().cloned());
        Self { messages }
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role() == Role::System)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FromIterator<Message> for MessageBag {
    fn from_iter<T: IntoIterator<Item = Message>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MessageBag {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
