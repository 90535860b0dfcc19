//! Conversation store trait, its error type and the per-thread lease.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::memory::Conversation;
use crate::message::Message;

/// Store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A tool result that answers no pending tool call.
    #[error("thread {thread_id}: tool result {tool_call_id} answers no pending tool call")]
    OrphanToolResult {
        thread_id: String,
        tool_call_id: String,
    },
    /// The thread is leased by a turn in progress.
    #[error("thread {0} is busy")]
    ThreadBusy(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Exclusive write access to one thread, held for the duration of a turn.
///
/// Released on drop, including when the turn future is dropped mid-flight.
#[derive(Debug)]
pub struct ThreadLease {
    thread_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl ThreadLease {
    pub fn new(thread_id: impl Into<String>, guard: OwnedMutexGuard<()>) -> Self {
        Self {
            thread_id: thread_id.into(),
            _guard: guard,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

/// Per-thread conversation storage.
///
/// Writes require a `ThreadLease` for the same thread, so at most one turn appends to a
/// thread at a time. Reads never block on a lease.
///
/// **Interaction**: `TurnController` leases a thread, loads it, and appends one batch per
/// committed step.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Snapshot of the thread; an unknown thread loads as empty.
    async fn load(&self, thread_id: &str) -> Result<Conversation, StoreError>;

    /// Appends `batch` atomically: either every message lands or none does.
    async fn append(&self, lease: &ThreadLease, batch: Vec<Message>) -> Result<(), StoreError>;

    /// Takes the thread's lease without waiting; `ThreadBusy` when already held.
    async fn lease(&self, thread_id: &str) -> Result<ThreadLease, StoreError>;

    /// Ids of all known threads, sorted.
    async fn threads(&self) -> Result<Vec<String>, StoreError>;

    /// Drops a thread's history. `ThreadBusy` while a turn holds it.
    async fn evict(&self, thread_id: &str) -> Result<bool, StoreError>;
}
