//! Agent turn-loop: ask the model, run the tools it asks for, ask again, until it answers.
//!
//! - `message`: `Message` / `ToolCall`, the unit appended to a conversation
//! - `llm`: `LlmClient` trait, `ChatOpenAI` (OpenAI-compatible chat completions), `MockLlm`
//! - `tool`: `Tool` trait, `ToolRegistry` (resolve / validate / invoke), built-in demo tools
//! - `memory`: `ConversationStore` keyed by thread id, `InMemoryStore`
//! - `turn`: `TurnController`, the `AwaitingModel ⇄ ExecutingTools → Done` state machine
//! - `config`: `AgentConfig` loaded from the environment
//!
//! A turn is driven by `TurnController::run_turn(thread_id, text)`; everything it needs
//! (client, registry, store) is injected at construction.

pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod message;
pub mod prompts;
pub mod tool;
pub mod turn;

pub use config::{AgentConfig, ConfigError};
pub use error::{AgentError, ToolError, ValidationError};
pub use llm::{
    ChatOpenAI, LlmClient, LlmError, LlmResponse, MockLlm, OpenAiConfig, RetryPolicy, Usage,
};
pub use memory::{Conversation, ConversationStore, InMemoryStore, StoreError, ThreadLease};
pub use message::{Message, ToolCall};
pub use tool::{validate_args, Tool, ToolFailureKind, ToolOutcome, ToolRegistry, ToolSpec};
pub use turn::{TurnController, TurnOptions, TurnOutput, TurnPhase};
