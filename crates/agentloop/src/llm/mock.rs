//! Mock LLM for tests and offline demos.
//!
//! Plays back a script of responses (or errors) in order, optionally sleeping before each
//! reply, and records every request it receives so tests can inspect what the model saw.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::LlmError;
use super::types::LlmResponse;
use super::{request_messages, LlmClient};
use crate::message::Message;

/// Scripted `LlmClient`.
///
/// Each `invoke` pops the next scripted reply. When the script is exhausted the `repeat`
/// reply (if set) is returned forever, otherwise the call fails with `MalformedResponse`.
///
/// **Interaction**: stands in for `ChatOpenAI` behind `Arc<dyn LlmClient>` in `TurnController`.
#[derive(Debug, Default)]
pub struct MockLlm {
    script: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    repeat: Option<LlmResponse>,
    delay: Option<Duration>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockLlm {
    /// Replies with each response in order.
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Replies with each entry in order; `Err` entries are returned as call failures.
    pub fn scripted(script: Vec<Result<LlmResponse, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    /// Always answers with the same final text.
    pub fn with_final_answer(text: impl Into<String>) -> Self {
        Self::default().repeating(LlmResponse::final_text(text))
    }

    /// Reply used once the script is exhausted.
    pub fn repeating(mut self, response: LlmResponse) -> Self {
        self.repeat = Some(response);
        self
    }

    /// Sleeps before every reply (for timeout and cancellation tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Full request lists (system prompt included) in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        history: &[Message],
        system_prompt: &str,
    ) -> Result<LlmResponse, LlmError> {
        let messages = request_messages(history, system_prompt)?;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(reply) => reply,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| LlmError::MalformedResponse("mock script exhausted".into())),
        }
    }
}
