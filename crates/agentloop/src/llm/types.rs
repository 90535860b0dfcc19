//! Model response and token usage.

use serde::{Deserialize, Serialize};

use crate::message::{Message, ToolCall};

/// Token usage reported by the endpoint (zero when not reported).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
    }
}

/// One model reply: either a final answer or a set of tool requests (optionally with text).
///
/// A reply with no tool calls is always final; there is no third shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    /// Assistant text; may be empty alongside tool calls.
    pub content: String,
    /// Requested tool invocations, in the order the model listed them.
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
}

impl LlmResponse {
    /// Final answer with no tool requests.
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            ..Default::default()
        }
    }

    /// Tool requests plus optional accompanying text.
    pub fn tool_requests(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: text.into(),
            tool_calls,
            usage: Usage::default(),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }

    /// The assistant message this reply becomes in the conversation.
    pub fn to_message(&self) -> Message {
        Message::assistant_with_tools(self.content.clone(), self.tool_calls.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_requests_are_final() {
        assert!(LlmResponse::tool_requests("thinking", vec![]).is_final());
        let r = LlmResponse::tool_requests(
            "",
            vec![ToolCall::new("c1", "get_user_location", json!({}))],
        );
        assert!(!r.is_final());
        assert_eq!(r.to_message().tool_calls().len(), 1);
    }

    #[test]
    fn usage_accumulates() {
        let mut u = Usage::default();
        u += Usage { prompt_tokens: 10, completion_tokens: 3 };
        u += Usage { prompt_tokens: 5, completion_tokens: 2 };
        assert_eq!(u.total(), 20);
    }
}
