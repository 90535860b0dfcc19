//! Result of one tool dispatch, as the model will read it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;


/// Why a tool request produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailureKind {
    /// Arguments failed the tool's input schema; the tool was not run.
    InvalidArguments,
    /// No tool with the requested name.
    UnknownTool,
    /// The tool ran and failed, or timed out.
    ExecutionError,
}

impl ToolFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolFailureKind::InvalidArguments => "invalid_arguments",
            ToolFailureKind::UnknownTool => "unknown_tool",
            ToolFailureKind::ExecutionError => "execution_error",
        }
    }
}

impl fmt::Display for ToolFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success text or typed failure for a single tool request.
///
/// Never an error for the turn: `content()` is what goes into the tool-result message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Failure {
        kind: ToolFailureKind,
        message: String,
    },
}

impl ToolOutcome {
    pub fn failure(kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Renders a tool's return value: strings as-is, anything else as compact JSON.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Success(s),
            other => Self::Success(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    pub fn failure_kind(&self) -> Option<ToolFailureKind> {
        match self {
            ToolOutcome::Success(_) => None,
            ToolOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Tool-result message body: the success text, or `error[<kind>]: <message>`.
    pub fn content(&self) -> String {
        match self {
            ToolOutcome::Success(text) => text.clone(),
            ToolOutcome::Failure { kind, message } => format!("error[{kind}]: {message}"),
        }
    }
}
