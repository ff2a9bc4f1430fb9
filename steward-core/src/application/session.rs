//! Conversation history storage.
//!
//! The agent reads history once at the start of a request and writes the
//! request's new messages back only after it succeeds.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::Message;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read history for session '{session_id}': {reason}")]
    Load { session_id: String, reason: String },
    #[error("failed to write history for session '{session_id}': {reason}")]
    Append { session_id: String, reason: String },
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The most recent `limit` messages of the session, oldest first.
    async fn load_history(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, SessionError>;

    async fn append_history(&self, session_id: &str, message: Message) -> Result<(), SessionError>;

    /// Appends a request's messages in order. Stores that can write them as
    /// one unit should override this.
    async fn append_batch(&self, session_id: &str, messages: Vec<Message>) -> Result<(), SessionError> {
        for message in messages {
            self.append_history(session_id, message).await?;
        }
        Ok(())
    }
}

/// Process-local store. History is lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full stored history of a session.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn clear(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_history(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, SessionError> {
        let sessions = self.sessions.read().await;
        let history = sessions.get(session_id).map(Vec::as_slice).unwrap_or_default();
        let start = history.len().saturating_sub(limit);
        Ok(history[start..].to_vec())
    }

    async fn append_history(&self, session_id: &str, message: Message) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn append_batch(&self, session_id: &str, messages: Vec<Message>) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .extend(messages);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_returns_most_recent_messages_in_order() {
        let store = InMemorySessionStore::new();
        store
            .append_batch(
                "s1",
                vec![Message::user("one"), Message::assistant("two"), Message::user("three")],
            )
            .await
            .expect("append");

        let recent = store.load_history("s1", 2).await.expect("load");
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);

        assert!(store.load_history("other", 10).await.expect("load").is_empty());
        assert_eq!(store.load_history("s1", 0).await.expect("load").len(), 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store.append_history("a", Message::user("for a")).await.expect("append");
        store.append_history("b", Message::user("for b")).await.expect("append");
        assert_eq!(store.history("a").await.len(), 1);
        store.clear("a").await;
        assert!(store.history("a").await.is_empty());
        assert_eq!(store.history("b").await[0].content, "for b");
    }
}
