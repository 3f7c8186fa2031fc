//! Conversational context kept between report requests of the same session.

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Maximum number of turns retained per session (five user/assistant pairs).
pub const MAX_TURNS_PER_SESSION: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role/content turn, in the shape chat-completion APIs expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Storage for per-session conversation history.
///
/// Unknown sessions read as empty; there is no explicit delete.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Current ordered turns for `session_id`, possibly empty.
    async fn get_context(&self, session_id: &str) -> Vec<ChatMessage>;

    /// Appends one user and one assistant turn, then trims to the last
    /// [`MAX_TURNS_PER_SESSION`] entries.
    async fn append(&self, session_id: &str, user: ChatMessage, assistant: ChatMessage);

    /// Number of sessions currently held.
    async fn session_count(&self) -> u64;
}

type SessionLog = Arc<Mutex<VecDeque<ChatMessage>>>;

/// Process-local context store.
///
/// Sessions are evicted least-recently-used once `max_sessions` is reached and,
/// when configured, after `idle_ttl` without access. Each session log sits
/// behind its own mutex so appends for one session never interleave while other
/// sessions proceed independently.
#[derive(Clone)]
pub struct InMemoryContextStore {
    sessions: Cache<String, SessionLog>,
}

impl InMemoryContextStore {
    pub fn new(max_sessions: u64, idle_ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(max_sessions)
            .eviction_policy(EvictionPolicy::lru());
        if let Some(ttl) = idle_ttl {
            builder = builder.time_to_idle(ttl);
        }

        Self {
            sessions: builder.build(),
        }
    }

    /// Flushes pending eviction work. Mostly useful to make counts exact in tests.
    pub async fn run_pending_tasks(&self) {
        self.sessions.run_pending_tasks().await;
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get_context(&self, session_id: &str) -> Vec<ChatMessage> {
        match self.sessions.get(session_id).await {
            Some(log) => log.lock().await.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    async fn append(&self, session_id: &str, user: ChatMessage, assistant: ChatMessage) {
        let log = self
            .sessions
            .get_with(session_id.to_string(), async {
                tracing::debug!("Creating conversation context for session {}", session_id);
                Arc::new(Mutex::new(VecDeque::with_capacity(MAX_TURNS_PER_SESSION + 2)))
            })
            .await;

        let mut turns = log.lock().await;
        turns.push_back(user);
        turns.push_back(assistant);
        while turns.len() > MAX_TURNS_PER_SESSION {
            turns.pop_front();
        }
        tracing::debug!(
            "Session {} now holds {} context turn(s)",
            session_id,
            turns.len()
        );
    }

    async fn session_count(&self) -> u64 {
        self.sessions.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = InMemoryContextStore::new(10, None);
        assert!(store.get_context("missing").await.is_empty());
    }

    #[tokio::test]
    async fn test_append_keeps_order() {
        let store = InMemoryContextStore::new(10, None);
        store
            .append("s1", ChatMessage::user("q1"), ChatMessage::assistant("a1"))
            .await;

        let turns = store.get_context("s1").await;
        assert_eq!(
            turns,
            vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")]
        );
    }

    #[tokio::test]
    async fn test_sliding_window_drops_oldest() {
        let store = InMemoryContextStore::new(10, None);
        for i in 0..7 {
            store
                .append(
                    "s1",
                    ChatMessage::user(format!("q{}", i)),
                    ChatMessage::assistant(format!("a{}", i)),
                )
                .await;
        }

        let turns = store.get_context("s1").await;
        assert_eq!(turns.len(), MAX_TURNS_PER_SESSION);
        assert_eq!(turns[0], ChatMessage::user("q2"));
        assert_eq!(turns[9], ChatMessage::assistant("a6"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemoryContextStore::new(10, None);
        store
            .append("a", ChatMessage::user("for a"), ChatMessage::assistant("ok a"))
            .await;
        store
            .append("b", ChatMessage::user("for b"), ChatMessage::assistant("ok b"))
            .await;

        assert_eq!(store.get_context("a").await[0].content, "for a");
        assert_eq!(store.get_context("b").await[0].content, "for b");
    }

    #[tokio::test]
    async fn test_session_count_is_bounded() {
        let store = InMemoryContextStore::new(3, None);
        for i in 0..20 {
            store
                .append(
                    &format!("session-{}", i),
                    ChatMessage::user("q"),
                    ChatMessage::assistant("a"),
                )
                .await;
        }
        store.run_pending_tasks().await;

        assert!(store.session_count().await <= 3);
    }

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "assistant", "content": "hi" }));
    }
}
