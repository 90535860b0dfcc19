//! In-memory conversation store. Not persistent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::memory::{Conversation, ConversationStore, StoreError, ThreadLease};
use crate::message::Message;

/// Process-local `ConversationStore`.
///
/// Histories live in a `RwLock`ed map; each thread has its own `Mutex<()>` whose owned guard
/// backs the `ThreadLease`.
///
/// **Interaction**: used as `Arc<dyn ConversationStore>` by `TurnController`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    leases: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load(&self, thread_id: &str) -> Result<Conversation, StoreError> {
        let guard = self.conversations.read().await;
        Ok(guard
            .get(thread_id)
            .cloned()
            .unwrap_or_else(|| Conversation::new(thread_id)))
    }

    async fn append(&self, lease: &ThreadLease, batch: Vec<Message>) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let thread_id = lease.thread_id();
        let mut guard = self.conversations.write().await;
        let conversation = guard
            .entry(thread_id.to_string())
            .or_insert_with(|| Conversation::new(thread_id));
        let added = batch.len();
        conversation.append(batch)?;
        debug!(thread_id, added, total = conversation.len(), "batch committed");
        Ok(())
    }

    async fn lease(&self, thread_id: &str) -> Result<ThreadLease, StoreError> {
        // Taken under the map lock so `evict` cannot swap the entry in between.
        let mut leases = self.leases.lock().await;
        let guard = leases
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
            .try_lock_owned()
            .map_err(|_| StoreError::ThreadBusy(thread_id.to_string()))?;
        Ok(ThreadLease::new(thread_id, guard))
    }

    async fn threads(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.conversations.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn evict(&self, thread_id: &str) -> Result<bool, StoreError> {
        let mut leases = self.leases.lock().await;
        if let Some(lock) = leases.get(thread_id) {
            if lock.try_lock().is_err() {
                return Err(StoreError::ThreadBusy(thread_id.to_string()));
            }
            leases.remove(thread_id);
        }
        Ok(self.conversations.write().await.remove(thread_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_thread_loads_empty() {
        let store = InMemoryStore::new();
        let c = store.load("nobody").await.unwrap();
        assert_eq!(c.thread_id, "nobody");
        assert!(c.is_empty());
        assert!(store.threads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_lease_is_busy_until_first_drops() {
        let store = InMemoryStore::new();
        let lease = store.lease("t1").await.unwrap();
        assert_eq!(
            store.lease("t1").await.unwrap_err(),
            StoreError::ThreadBusy("t1".into())
        );
        assert!(store.lease("t2").await.is_ok());
        drop(lease);
        assert!(store.lease("t1").await.is_ok());
    }

    #[tokio::test]
    async fn rejected_batch_leaves_history_untouched() {
        let store = InMemoryStore::new();
        let lease = store.lease("t1").await.unwrap();
        store
            .append(&lease, vec![Message::user("hi")])
            .await
            .unwrap();
        let err = store
            .append(
                &lease,
                vec![
                    Message::assistant("ok"),
                    Message::tool_result("call_9", "get_user_location", "Florida"),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OrphanToolResult { .. }));
        assert_eq!(store.load("t1").await.unwrap().messages, vec![Message::user("hi")]);
    }

    #[tokio::test]
    async fn evict_refuses_leased_thread() {
        let store = InMemoryStore::new();
        let lease = store.lease("t1").await.unwrap();
        store.append(&lease, vec![Message::user("hi")]).await.unwrap();
        assert!(matches!(store.evict("t1").await, Err(StoreError::ThreadBusy(_))));
        drop(lease);
        assert!(store.evict("t1").await.unwrap());
        assert!(!store.evict("t1").await.unwrap());
        assert!(store.load("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn evicted_thread_can_be_leased_once() {
        let store = InMemoryStore::new();
        drop(store.lease("t1").await.unwrap());
        assert!(!store.evict("t1").await.unwrap());
        let lease = store.lease("t1").await.unwrap();
        assert!(matches!(store.lease("t1").await, Err(StoreError::ThreadBusy(_))));
        assert!(matches!(store.evict("t1").await, Err(StoreError::ThreadBusy(_))));
        drop(lease);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn evict_racing_lease_never_yields_two_holders() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let store = Arc::new(InMemoryStore::new());
        let holders = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let holders = holders.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..500 {
                    let _ = store.evict("t").await;
                    if let Ok(lease) = store.lease("t").await {
                        assert_eq!(holders.fetch_add(1, Ordering::SeqCst), 0);
                        tokio::task::yield_now().await;
                        holders.fetch_sub(1, Ordering::SeqCst);
                        drop(lease);
                    }
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
    }
}
