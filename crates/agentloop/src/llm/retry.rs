//! Per-attempt timeout and exponential backoff around `LlmClient::invoke`.

use std::time::Duration;

use rand::Rng;

use super::error::LlmError;
use super::types::LlmResponse;
use super::LlmClient;
use crate::message::Message;

/// Retry schedule for retryable model errors (`LlmError::is_retryable`).
///
/// Delay before retry `n` (0-based) is `base_delay * 2^n`, capped at `max_delay`, plus a
/// random jitter of up to half `base_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff before retry `retry` (0 = first retry), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, retry: u32) -> Duration {
        let half_base = (self.base_delay.as_millis() / 2) as u64;
        let jitter = if half_base == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=half_base)
        };
        self.backoff(retry) + Duration::from_millis(jitter)
    }
}

/// Calls `client.invoke` with a timeout per attempt, retrying per `policy`.
///
/// A timed-out attempt is reported as `LlmError::Transport` and is retryable like any other
/// transport failure. Returns the last error once retries are exhausted.
pub async fn invoke_with_retry(
    client: &dyn LlmClient,
    history: &[Message],
    system_prompt: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<LlmResponse, LlmError> {
    let mut retry = 0;
    loop {
        let attempt = tokio::time::timeout(timeout, client.invoke(history, system_prompt)).await;
        let err = match attempt {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(e)) => e,
            Err(_) => LlmError::Transport(format!(
                "model call timed out after {}ms",
                timeout.as_millis()
            )),
        };
        if !err.is_retryable() || retry >= policy.max_retries {
            return Err(err);
        }
        let delay = policy.jittered(retry);
        tracing::warn!(
            retry = retry + 1,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying model call"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(p.backoff(0), Duration::from_millis(100));
        assert_eq!(p.backoff(1), Duration::from_millis(200));
        assert_eq!(p.backoff(2), Duration::from_millis(350));
        assert_eq!(p.backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn retries_transport_then_succeeds() {
        let llm = MockLlm::scripted(vec![
            Err(LlmError::Transport("reset".into())),
            Err(LlmError::Upstream { status: 503, body: "busy".into() }),
            Ok(LlmResponse::final_text("ok")),
        ]);
        let out = invoke_with_retry(&llm, &[Message::user("hi")], "", Duration::from_secs(1), &fast())
            .await
            .unwrap();
        assert_eq!(out.content, "ok");
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let llm = MockLlm::scripted(vec![
            Err(LlmError::Upstream { status: 401, body: "bad key".into() }),
            Ok(LlmResponse::final_text("never")),
        ]);
        let err = invoke_with_retry(&llm, &[Message::user("hi")], "", Duration::from_secs(1), &fast())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn timeout_becomes_transport_error() {
        let llm = MockLlm::with_final_answer("late").with_delay(Duration::from_millis(500));
        let err = invoke_with_retry(
            &llm,
            &[Message::user("hi")],
            "",
            Duration::from_millis(20),
            &RetryPolicy::none(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LlmError::Transport(m) if m.contains("timed out")));
    }
}
