//! Turn and tool error types.
//!
//! - `AgentError`: why a turn did not reach `Done`; returned by `TurnController`
//! - `ToolError`: raised inside tools and the registry; never leaves a turn
//! - `ValidationError`: argument/schema mismatch produced by `validate_args`

use thiserror::Error;

use crate::llm::LlmError;
use crate::memory::StoreError;

/// Failure of a whole turn.
///
/// Tool failures are not represented here: they are folded into tool-result messages
/// and fed back to the model. Everything below aborts the turn and leaves the
/// conversation at its last committed batch.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model call failed (transport, upstream status, malformed payload).
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model kept requesting tools past the configured number of model calls.
    #[error("turn limit exceeded: model did not converge within {limit} calls")]
    TurnLimitExceeded { limit: usize },

    /// Another turn currently holds this thread.
    #[error("thread {0} already has a turn in progress")]
    ThreadBusy(String),

    /// The turn was cancelled between two suspension points.
    #[error("turn cancelled")]
    Cancelled,

    /// `resume_turn` on a thread whose last message is not a user message or tool result.
    #[error("nothing to resume on thread {0}")]
    NothingToResume(String),

    /// Conversation store rejected a read or append.
    #[error("store: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AgentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ThreadBusy(id) => AgentError::ThreadBusy(id),
            other => AgentError::Store(other),
        }
    }
}

/// Argument validation failure, produced by `validate_args(schema, args)`.
///
/// `ToolRegistry::invoke` reports it as `ToolFailureKind::InvalidArguments`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("validation failed: {0}")]
pub struct ValidationError(pub String);

/// Errors raised by tools.
///
/// Whatever the variant, an error returned from `Tool::execute` is reported to the model as
/// `ToolFailureKind::ExecutionError`: the tool already ran.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Arguments did not match the tool's input schema.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    /// The tool ran and failed (including timeouts).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<ValidationError> for ToolError {
    fn from(e: ValidationError) -> Self {
        ToolError::ValidationFailed(e.0)
    }
}
