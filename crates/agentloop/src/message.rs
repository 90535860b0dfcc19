//! Conversation messages and model-issued tool calls.
//!
//! A conversation only ever stores `User`, `Assistant` and `ToolResult`; `System` exists so
//! the model client can prepend the agent's fixed instruction preamble to a request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation requested by the model inside an assistant message.
///
/// `arguments` holds the decoded JSON payload. When the model sends text that is not valid
/// JSON it is kept as `Value::String(raw)`, which fails schema validation downstream.
///
/// **Interaction**: produced by `LlmClient::invoke`, dispatched by `ToolRegistry::dispatch`,
/// answered by a `Message::ToolResult` carrying the same `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within its assistant message.
    pub id: String,
    /// Registry name of the requested tool.
    pub name: String,
    /// Decoded argument object.
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Decodes the raw argument string the way chat-completions endpoints deliver it.
    ///
    /// Blank input means "no arguments" and becomes `{}`.
    pub fn parse_arguments(raw: &str) -> Value {
        if raw.trim().is_empty() {
            return Value::Object(Default::default());
        }
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }

    /// Re-encodes arguments for the wire; undecodable payloads are sent back verbatim.
    pub fn arguments_string(&self) -> String {
        match &self.arguments {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// Instruction preamble; prepended per request, never stored.
    System { content: String },
    /// User input.
    User { content: String },
    /// Model reply: text, tool calls, or both.
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Outcome of one tool call, correlated by `tool_call_id`.
    ToolResult {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Plain assistant answer with no tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Role name as used on the wire by OpenAI-compatible endpoints.
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::ToolResult { .. } => "tool",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::ToolResult { content, .. } => content,
        }
    }

    /// Tool calls carried by an assistant message; empty for every other role.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::ToolResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_arguments_blank_is_empty_object() {
        assert_eq!(ToolCall::parse_arguments("  "), json!({}));
    }

    #[test]
    fn parse_arguments_keeps_invalid_json_as_string() {
        let v = ToolCall::parse_arguments("{city: Paris");
        assert_eq!(v, Value::String("{city: Paris".into()));
        let call = ToolCall::new("c1", "get_weather_for_location", v);
        assert_eq!(call.arguments_string(), "{city: Paris");
    }

    #[test]
    fn assistant_serializes_without_empty_tool_calls() {
        let v = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert_eq!(v, json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn tool_result_round_trips_through_json() {
        let m = Message::tool_result("call_0", "get_user_location", "Florida");
        let s = serde_json::to_string(&m).unwrap();
        assert!(s.contains("\"role\":\"tool_result\""));
        let back: Message = serde_json::from_str(&s).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.role(), "tool");
        assert_eq!(back.tool_call_id(), Some("call_0"));
    }
}
