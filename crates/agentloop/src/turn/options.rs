//! Turn options, phases and output.

use std::fmt;
use std::time::Duration;

use crate::llm::{RetryPolicy, Usage};

/// Default cap on model calls per turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Where a turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnPhase {
    /// Waiting on the model client.
    AwaitingModel,
    /// Running the tools named by the last model reply.
    ExecutingTools,
    /// Final answer committed; terminal.
    Done,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TurnPhase::AwaitingModel => "awaiting_model",
            TurnPhase::ExecutingTools => "executing_tools",
            TurnPhase::Done => "done",
        })
    }
}

/// Per-controller limits.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    /// Model calls allowed per turn before `TurnLimitExceeded`.
    pub max_iterations: usize,
    /// Bound on each model attempt; expiry is a transport error.
    pub model_timeout: Duration,
    /// Bound on each tool call; expiry is an `execution_error` outcome.
    pub tool_timeout: Option<Duration>,
    pub retry: RetryPolicy,
    /// Run the tools of one reply concurrently (results keep request order either way).
    pub parallel_tools: bool,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model_timeout: Duration::from_secs(60),
            tool_timeout: Some(Duration::from_secs(30)),
            retry: RetryPolicy::default(),
            parallel_tools: true,
        }
    }
}

impl TurnOptions {
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_parallel_tools(mut self, parallel: bool) -> Self {
        self.parallel_tools = parallel;
        self
    }
}

/// Result of a turn that reached `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutput {
    /// Final assistant text.
    pub answer: String,
    pub model_calls: usize,
    /// Tool requests dispatched, failures included.
    pub tool_calls: usize,
    pub usage: Usage,
}
