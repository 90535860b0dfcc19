//! Model client: the remote text-generation endpoint seen as one async call.
//!
//! - `LlmClient`: `invoke(history, system_prompt) -> LlmResponse`
//! - `ChatOpenAI`: OpenAI-compatible chat completions over reqwest
//! - `MockLlm`: scripted responses for tests and offline demos
//! - `RetryPolicy` / `invoke_with_retry`: per-attempt timeout plus exponential backoff
//! - `LlmError`: transport / upstream status / malformed payload

mod error;
mod mock;
mod openai;
mod retry;
mod types;

pub use error::LlmError;
pub use mock::MockLlm;
pub use openai::{ChatOpenAI, OpenAiConfig};
pub use retry::{invoke_with_retry, RetryPolicy};
pub use types::{LlmResponse, Usage};

use async_trait::async_trait;

use crate::message::Message;

/// Async chat interface used by the turn controller.
///
/// Implementations prepend `system_prompt` as a synthetic leading system message (when
/// non-empty) and must not modify `history`. Tool definitions are bound to the client
/// at construction (see `ChatOpenAI::with_tools`).
///
/// **Interaction**: called once per `AwaitingModel` step by `TurnController`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, history: &[Message], system_prompt: &str)
        -> Result<LlmResponse, LlmError>;
}

/// Builds the request list: `[System(system_prompt)?, ...history]`.
///
/// Fails with `LlmError::InvalidRequest` when the result would be empty, before any I/O.
pub fn request_messages(history: &[Message], system_prompt: &str) -> Result<Vec<Message>, LlmError> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.extend(history.iter().cloned());
    if messages.is_empty() {
        return Err(LlmError::InvalidRequest(
            "empty history and empty system prompt".into(),
        ));
    }
    Ok(messages)
}
