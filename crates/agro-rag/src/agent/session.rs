//! In-memory chat sessions
//!
//! Each session id maps to its own history behind an async mutex. Holding
//! the guard for a whole turn serializes requests on the same session while
//! different sessions proceed independently.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::ChatTurn;

/// Session id used when the client does not send one
pub const DEFAULT_SESSION_ID: &str = "default";

/// History of one session
pub type SessionHistory = Arc<Mutex<Vec<ChatTurn>>>;

/// Exclusive access to one session's history for the length of a turn
pub type SessionGuard = OwnedMutexGuard<Vec<ChatTurn>>;

/// Process-wide session map. Nothing is persisted or evicted.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHistory>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the history for `session_id`, creating an empty one on first use
    pub fn get_or_create(&self, session_id: &str) -> SessionHistory {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Lock a session for a whole turn
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        self.get_or_create(session_id).lock_owned().await
    }

    /// Append turns to a session
    pub async fn append(&self, session_id: &str, turns: impl IntoIterator<Item = ChatTurn>) {
        self.lock(session_id).await.extend(turns);
    }

    /// Snapshot of a session's history; empty for unknown sessions
    pub async fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        let history = match self.sessions.get(session_id) {
            Some(entry) => entry.value().clone(),
            None => return Vec::new(),
        };
        let turns = history.lock().await;
        turns.clone()
    }

    /// Whether a session has been created
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatRole;
    use std::time::Duration;

    #[tokio::test]
    async fn test_created_lazily() {
        let store = SessionStore::new();
        assert!(store.history("farmer-1").await.is_empty());
        assert!(!store.contains("farmer-1"));

        store.get_or_create("farmer-1");
        assert!(store.contains("farmer-1"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_append_keeps_order() {
        let store = SessionStore::new();
        store
            .append("s", [ChatTurn::user("hi"), ChatTurn::assistant("hello")])
            .await;
        store.append("s", [ChatTurn::user("again")]).await;

        let history = store.history("s").await;
        let roles: Vec<ChatRole> = history.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant, ChatRole::User]);
        assert_eq!(history[2].content, "again");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.append("a", [ChatTurn::user("from a")]).await;
        store.append("b", [ChatTurn::user("from b")]).await;
        assert_eq!(store.history("a").await.len(), 1);
        assert_eq!(store.history("b").await[0].content, "from b");
    }

    #[tokio::test]
    async fn test_same_session_turns_are_serialized() {
        let store = Arc::new(SessionStore::new());

        let guard = store.lock("s").await;
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut turns = store.lock("s").await;
                turns.push(ChatTurn::user("second"));
            })
        };

        // The second turn cannot start while the first holds the session
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        // Other sessions are not blocked
        store.append("other", [ChatTurn::user("free")]).await;

        let mut turns = guard;
        turns.push(ChatTurn::user("first"));
        drop(turns);

        waiter.await.unwrap();
        let history = store.history("s").await;
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }
}
