//! `TurnController`: the turn state machine over an injected client, registry and store.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::llm::{invoke_with_retry, LlmClient, LlmResponse, Usage};
use crate::memory::{ConversationStore, ThreadLease};
use crate::message::{Message, ToolCall};
use crate::tool::{ToolFailureKind, ToolOutcome, ToolRegistry};
use crate::turn::{TurnOptions, TurnOutput, TurnPhase};

/// Runs turns against per-thread conversations.
///
/// One controller serves any number of threads; turns on distinct threads run independently,
/// a second turn on a busy thread fails fast with `AgentError::ThreadBusy`.
///
/// Commit points: the user message when the turn starts, then one batch
/// (assistant tool requests + all their results) per tool round, then the final answer.
/// A turn that fails or is cancelled leaves the thread at its last commit.
///
/// **Interaction**: holds `Arc<dyn LlmClient>`, `Arc<ToolRegistry>` and
/// `Arc<dyn ConversationStore>`; the CLI builds one per process.
pub struct TurnController {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn ConversationStore>,
    system_prompt: String,
    options: TurnOptions,
}

#[derive(Default)]
struct TurnStats {
    model_calls: usize,
    tool_calls: usize,
    usage: Usage,
}

impl TurnController {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn ConversationStore>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            tools,
            store,
            system_prompt: system_prompt.into(),
            options: TurnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TurnOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Appends `user_text` to the thread and runs until the model answers.
    pub async fn run_turn(&self, thread_id: &str, user_text: &str) -> Result<TurnOutput, AgentError> {
        self.run_turn_with_cancel(thread_id, user_text, CancellationToken::new())
            .await
    }

    /// `run_turn` that stops with `AgentError::Cancelled` once `cancel` fires.
    pub async fn run_turn_with_cancel(
        &self,
        thread_id: &str,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<TurnOutput, AgentError> {
        let lease = self.store.lease(thread_id).await?;
        info!(thread_id, "turn started");
        self.store
            .append(&lease, vec![Message::user(user_text)])
            .await?;
        self.drive(&lease, &cancel).await
    }

    /// Picks up a thread whose last turn stopped after a commit (failure, cancellation or
    /// turn limit) without adding a new user message.
    pub async fn resume_turn(&self, thread_id: &str) -> Result<TurnOutput, AgentError> {
        self.resume_turn_with_cancel(thread_id, CancellationToken::new())
            .await
    }

    pub async fn resume_turn_with_cancel(
        &self,
        thread_id: &str,
        cancel: CancellationToken,
    ) -> Result<TurnOutput, AgentError> {
        let lease = self.store.lease(thread_id).await?;
        let conversation = self.store.load(thread_id).await?;
        if !conversation.is_resumable() {
            return Err(AgentError::NothingToResume(thread_id.to_string()));
        }
        info!(thread_id, messages = conversation.len(), "turn resumed");
        self.drive(&lease, &cancel).await
    }

    async fn drive(
        &self,
        lease: &ThreadLease,
        cancel: &CancellationToken,
    ) -> Result<TurnOutput, AgentError> {
        let thread_id = lease.thread_id();
        let started = Instant::now();
        let mut history = self.store.load(thread_id).await?.messages;
        let mut stats = TurnStats::default();
        let mut phase = TurnPhase::AwaitingModel;
        let mut pending: Option<LlmResponse> = None;
        let mut answer = String::new();

        let result = loop {
            debug!(thread_id, iteration = stats.model_calls, %phase, "turn step");
            match phase {
                TurnPhase::AwaitingModel => {
                    if stats.model_calls >= self.options.max_iterations {
                        break Err(AgentError::TurnLimitExceeded {
                            limit: self.options.max_iterations,
                        });
                    }
                    stats.model_calls += 1;
                    let response = match self.call_model(&history, cancel).await {
                        Ok(r) => r,
                        Err(e) => break Err(e),
                    };
                    stats.usage += response.usage;
                    if response.is_final() {
                        let message = response.to_message();
                        if let Err(e) = self.store.append(lease, vec![message]).await {
                            break Err(e.into());
                        }
                        answer = response.content;
                        phase = TurnPhase::Done;
                    } else {
                        pending = Some(response);
                        phase = TurnPhase::ExecutingTools;
                    }
                }
                TurnPhase::ExecutingTools => {
                    let Some(response) = pending.take() else {
                        phase = TurnPhase::AwaitingModel;
                        continue;
                    };
                    let outcomes = match self.run_tools(thread_id, &response.tool_calls, cancel).await {
                        Ok(o) => o,
                        Err(e) => break Err(e),
                    };
                    stats.tool_calls += outcomes.len();

                    let mut batch = Vec::with_capacity(outcomes.len() + 1);
                    batch.push(response.to_message());
                    for (call, outcome) in response.tool_calls.iter().zip(&outcomes) {
                        batch.push(Message::tool_result(&call.id, &call.name, outcome.content()));
                    }
                    if let Err(e) = self.store.append(lease, batch.clone()).await {
                        break Err(e.into());
                    }
                    history.extend(batch);
                    phase = TurnPhase::AwaitingModel;
                }
                TurnPhase::Done => break Ok(()),
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => {
                info!(
                    thread_id,
                    model_calls = stats.model_calls,
                    tool_calls = stats.tool_calls,
                    tokens = stats.usage.total(),
                    elapsed_ms,
                    "turn done"
                );
                Ok(TurnOutput {
                    answer,
                    model_calls: stats.model_calls,
                    tool_calls: stats.tool_calls,
                    usage: stats.usage,
                })
            }
            Err(e) => {
                warn!(
                    thread_id,
                    model_calls = stats.model_calls,
                    elapsed_ms,
                    error = %e,
                    "turn aborted"
                );
                Err(e)
            }
        }
    }

    async fn call_model(
        &self,
        history: &[Message],
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, AgentError> {
        let call = invoke_with_retry(
            self.llm.as_ref(),
            history,
            &self.system_prompt,
            self.options.model_timeout,
            &self.options.retry,
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            r = call => r.map_err(AgentError::from),
        }
    }

    /// Dispatches every call; outcomes come back in request order.
    async fn run_tools(
        &self,
        thread_id: &str,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolOutcome>, AgentError> {
        debug!(
            thread_id,
            count = calls.len(),
            parallel = self.options.parallel_tools,
            "executing tools"
        );
        let run = async {
            if self.options.parallel_tools {
                join_all(calls.iter().map(|c| self.run_tool(c))).await
            } else {
                let mut outcomes = Vec::with_capacity(calls.len());
                for c in calls {
                    outcomes.push(self.run_tool(c).await);
                }
                outcomes
            }
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            outcomes = run => Ok(outcomes),
        }
    }

    async fn run_tool(&self, call: &ToolCall) -> ToolOutcome {
        match self.options.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, self.tools.dispatch(call))
                .await
                .unwrap_or_else(|_| {
                    warn!(tool = %call.name, tool_call_id = %call.id, "tool timed out");
                    ToolOutcome::failure(
                        ToolFailureKind::ExecutionError,
                        format!("timed out after {}ms", limit.as_millis()),
                    )
                }),
            None => self.tools.dispatch(call).await,
        }
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("tools", &self.tools)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
