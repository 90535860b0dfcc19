//! Model client errors.

use thiserror::Error;

/// Errors from one model call.
///
/// All variants abort the current turn. `Transport` and `Upstream` with 429/5xx are
/// retryable (see `RetryPolicy`); timeouts are reported as `Transport`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// Network or connection failure, or the call timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    /// The payload could not be parsed into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request could not be built (e.g. nothing to send).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Transport(_) => true,
            LlmError::Upstream { status, .. } => *status == 429 || *status >= 500,
            LlmError::MalformedResponse(_) | LlmError::InvalidRequest(_) => false,
        }
    }

    /// Upstream status code, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
