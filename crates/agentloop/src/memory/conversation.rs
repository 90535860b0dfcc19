//! One thread's message history.

use serde::{Deserialize, Serialize};

use crate::memory::StoreError;
use crate::message::Message;

/// Ordered message history of a thread.
///
/// Only grows by whole batches through `ConversationStore::append`, which runs
/// `check_append` first. Never truncated or rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub thread_id: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool-call ids emitted by assistant messages and not yet answered, oldest first.
    pub fn pending_tool_calls(&self) -> Vec<String> {
        let mut pending = Vec::new();
        for m in &self.messages {
            settle(&mut pending, m);
        }
        pending
    }

    /// Whether a turn can pick up from here without new user input: the history ends in a
    /// user message, or in tool results that answer every outstanding call.
    pub fn is_resumable(&self) -> bool {
        match self.messages.last() {
            Some(Message::User { .. }) => true,
            Some(Message::ToolResult { .. }) => self.pending_tool_calls().is_empty(),
            _ => false,
        }
    }

    /// Checks that appending `batch` keeps the history well formed.
    ///
    /// Rejects system messages and any tool result whose id does not match a pending call
    /// from an earlier assistant message (in the history or earlier in the batch).
    pub fn check_append(&self, batch: &[Message]) -> Result<(), StoreError> {
        let mut pending = self.pending_tool_calls();
        for m in batch {
            match m {
                Message::System { .. } => {
                    return Err(StoreError::Storage(
                        "system messages are not stored in a conversation".into(),
                    ))
                }
                Message::ToolResult { tool_call_id, .. } if !pending.contains(tool_call_id) => {
                    return Err(StoreError::OrphanToolResult {
                        thread_id: self.thread_id.clone(),
                        tool_call_id: tool_call_id.clone(),
                    })
                }
                _ => settle(&mut pending, m),
            }
        }
        Ok(())
    }

    /// `check_append`, then extend.
    pub fn append(&mut self, batch: Vec<Message>) -> Result<(), StoreError> {
        self.check_append(&batch)?;
        self.messages.extend(batch);
        Ok(())
    }
}

fn settle(pending: &mut Vec<String>, m: &Message) {
    match m {
        Message::Assistant { tool_calls, .. } => {
            pending.extend(tool_calls.iter().map(|c| c.id.clone()));
        }
        Message::ToolResult { tool_call_id, .. } => {
            if let Some(pos) = pending.iter().position(|id| id == tool_call_id) {
                pending.remove(pos);
            }
        }
        _ => {}
    }
}
