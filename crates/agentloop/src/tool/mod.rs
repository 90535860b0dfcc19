//! Tools the model may ask the agent to run.
//!
//! - `Tool`: name, description, input schema, async `execute`
//! - `ToolRegistry`: name → tool; validates arguments before invoking
//! - `ToolOutcome`: success text or a typed failure, always fed back to the model
//! - `validate_args`: structural check of arguments against a JSON Schema subset
//! - `builtin`: the weather-forecaster demo tools

pub mod builtin;
mod outcome;
mod registry;
mod validation;

pub use outcome::{ToolFailureKind, ToolOutcome};
pub use registry::ToolRegistry;
pub use validation::validate_args;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// Tool definition as shown to the model (`tools[].function` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Natural-language description; read by the model only.
    pub description: String,
    /// JSON Schema object for the arguments.
    pub input_schema: Value,
}

/// A named capability with a declared input schema.
///
/// `execute` only ever receives arguments that passed `validate_args` against
/// `input_schema`; it may have side effects and may fail.
///
/// **Interaction**: registered in `ToolRegistry`; its `spec()` is bound to the model client.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key; must be unique within a registry.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the arguments (`type`, `properties`, `required`, `additionalProperties`).
    fn input_schema(&self) -> Value;

    /// Runs the tool. Strings are returned to the model verbatim, other values as JSON.
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
