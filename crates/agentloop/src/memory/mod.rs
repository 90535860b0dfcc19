//! Conversation state: per-thread message history and the single-writer lease.
//!
//! - `Conversation`: ordered, append-only messages of one thread; checks the tool-result invariant
//! - `ConversationStore`: load / append / lease / threads / evict, keyed by thread id
//! - `InMemoryStore`: process-local implementation; not persistent

mod conversation;
mod in_memory;
mod store;

pub use conversation::Conversation;
pub use in_memory::InMemoryStore;
pub use store::{ConversationStore, StoreError, ThreadLease};
