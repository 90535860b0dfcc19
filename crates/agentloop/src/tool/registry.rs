//! Tool registry: register by name, resolve, validate and invoke.
//!
//! `dispatch(call)` is the single entry point used by a turn: resolve the name, check the
//! arguments against the tool's schema, run the tool under the optional timeout, and fold
//! every outcome (including panics) into a `ToolOutcome`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::message::ToolCall;
use crate::tool::validation::validate_args;
use crate::tool::{Tool, ToolFailureKind, ToolOutcome, ToolSpec};

/// Name → tool map, read-only once a turn starts.
///
/// **Interaction**: shared by `TurnController` behind an `Arc`; `specs()` is what the model
/// client advertises as `tools`.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds each tool execution; an expired call yields `ExecutionError`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder form of `register`.
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Registers a tool; a tool with the same name is replaced.
    pub fn register(&mut self, tool: impl Tool + 'static) -> &mut Self {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "tool re-registered; previous definition replaced");
        }
        self
    }

    /// Looks a tool up by name. Same name, same tool, for the registry's lifetime.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Specs of all tools, sorted by name so requests are deterministic.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validates `args` against the tool's schema, then runs it.
    ///
    /// Invalid arguments never reach `Tool::execute`; any error returned once `execute` has
    /// run is an `ExecutionError`, whatever its `ToolError` variant.
    pub async fn invoke(&self, tool: &dyn Tool, args: Value) -> ToolOutcome {
        if let Err(e) = validate_args(&tool.input_schema(), &args) {
            return ToolOutcome::failure(ToolFailureKind::InvalidArguments, e.0);
        }

        let run = AssertUnwindSafe(tool.execute(args)).catch_unwind();
        let finished = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(r) => r,
                Err(_) => {
                    return ToolOutcome::failure(
                        ToolFailureKind::ExecutionError,
                        format!("timed out after {}ms", limit.as_millis()),
                    )
                }
            },
            None => run.await,
        };

        match finished {
            Ok(Ok(value)) => ToolOutcome::from_value(value),
            Ok(Err(e)) => ToolOutcome::failure(ToolFailureKind::ExecutionError, e.to_string()),
            Err(_) => ToolOutcome::failure(ToolFailureKind::ExecutionError, "tool panicked"),
        }
    }

    /// Resolves and invokes one model tool call.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        let Some(tool) = self.resolve(&call.name) else {
            warn!(tool = %call.name, tool_call_id = %call.id, "unknown tool requested");
            return ToolOutcome::failure(
                ToolFailureKind::UnknownTool,
                format!("no tool named {}", call.name),
            );
        };

        let started = Instant::now();
        let outcome = self.invoke(tool.as_ref(), call.arguments.clone()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome.failure_kind() {
            None => debug!(tool = %call.name, tool_call_id = %call.id, elapsed_ms, "tool succeeded"),
            Some(kind) => warn!(
                tool = %call.name,
                tool_call_id = %call.id,
                elapsed_ms,
                %kind,
                "tool failed"
            ),
        }
        outcome
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes text."
        }
        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"],
                "additionalProperties": false
            })
        }
        async fn execute(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args["text"].clone())
        }
    }

    #[tokio::test]
    async fn dispatch_runs_registered_tool() {
        let reg = ToolRegistry::new().with_tool(Echo);
        let out = reg
            .dispatch(&ToolCall::new("c1", "echo", json!({"text": "hi"})))
            .await;
        assert_eq!(out, ToolOutcome::Success("hi".into()));
    }

    #[tokio::test]
    async fn dispatch_unknown_tool() {
        let reg = ToolRegistry::new();
        let out = reg.dispatch(&ToolCall::new("c1", "nope", json!({}))).await;
        assert_eq!(out.failure_kind(), Some(ToolFailureKind::UnknownTool));
    }

    #[test]
    fn specs_sorted_by_name() {
        let reg = ToolRegistry::new()
            .with_tool(Echo)
            .with_tool(crate::tool::builtin::UserLocationTool::default());
        let names: Vec<String> = reg.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["echo", "get_user_location"]);
    }
}
