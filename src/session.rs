//! Conversation session management.
//!
//! The [`SessionStore`] owns all conversation state: creation, bounded
//! history, reset, deletion, expiry sweeping and statistics. Callers only
//! ever receive clones or projections, never the live records.

use crate::error::ApiError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Minimum allowed history bound. Below this the trim would evict every
/// exchange and only the system message could survive.
const MIN_HISTORY: usize = 2;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversation message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A conversation session.
///
/// `messages[0]` is always the system message; it is set at creation and
/// only ever replaced wholesale by a reset.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Session {
    fn new(system_prompt: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            messages: vec![Message {
                role: Role::System,
                content: system_prompt.to_string(),
                timestamp: now,
            }],
            created_at: now,
            last_activity: now,
            metadata: HashMap::new(),
        }
    }

    /// Check if the session has been idle strictly longer than the threshold.
    pub fn is_expired(&self, threshold_minutes: i64) -> bool {
        Utc::now() - self.last_activity > Duration::minutes(threshold_minutes)
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Session statistics projection.
///
/// `total_messages` excludes the system message (it still counts toward
/// the history bound internally).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Lightweight per-session summary for the listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub total_messages: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// In-memory session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    max_history: usize,
    expiry_minutes: i64,
}

impl SessionStore {
    /// Create a new store. `max_history` is clamped to at least 2 so the
    /// system message is never the only survivor of a trim.
    pub fn new(max_history: usize, expiry_minutes: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_history: max_history.max(MIN_HISTORY),
            expiry_minutes,
        }
    }

    /// Create a session seeded with the given system prompt.
    pub async fn create(&self, system_prompt: &str) -> Session {
        let mut session = Session::new(system_prompt);
        let mut sessions = self.sessions.write().await;
        // UUID collision is negligible; regenerate rather than clobber.
        while sessions.contains_key(&session.id) {
            session.id = Uuid::new_v4().to_string();
        }
        sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a session by id. No side effects.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Append a message and enforce the history bound.
    ///
    /// When the bound is exceeded, the oldest non-system messages are
    /// dropped; the system message at index 0 is always retained. Append
    /// and trim happen under one write lock.
    pub async fn append(&self, id: &str, role: Role, content: &str) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))?;

        session.messages.push(Message::new(role, content));
        session.touch();

        if session.messages.len() > self.max_history {
            let excess = session.messages.len() - self.max_history;
            session.messages.drain(1..1 + excess);
        }

        Ok(())
    }

    /// Project the history as ordered (role, content) pairs for the
    /// completion boundary. Empty when the id is unknown.
    pub async fn history(&self, id: &str) -> Vec<(Role, String)> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| {
                s.messages
                    .iter()
                    .map(|m| (m.role, m.content.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shallow-merge `partial` into the session metadata. Incoming keys
    /// overwrite, untouched keys persist.
    pub async fn update_metadata(
        &self,
        id: &str,
        partial: HashMap<String, serde_json::Value>,
    ) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))?;
        session.metadata.extend(partial);
        Ok(())
    }

    /// Truncate the history back to the system message. Metadata and
    /// `created_at` are untouched.
    pub async fn reset(&self, id: &str) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))?;
        session.messages.truncate(1);
        session.touch();
        Ok(())
    }

    /// Remove a session. Returns true iff a session existed and was removed.
    pub async fn delete(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Statistics projection for one session.
    pub async fn stats(&self, id: &str) -> Option<SessionStats> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(id)?;

        let user_messages = session
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        let assistant_messages = session
            .messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();

        Some(SessionStats {
            total_messages: session.messages.len().saturating_sub(1),
            user_messages,
            assistant_messages,
            created_at: session.created_at,
            last_activity: session.last_activity,
            metadata: session.metadata.clone(),
        })
    }

    /// Summaries of all live sessions.
    pub async fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .await
            .values()
            .map(|s| SessionSummary {
                session_id: s.id.clone(),
                total_messages: s.messages.len().saturating_sub(1),
                created_at: s.created_at,
                last_activity: s.last_activity,
            })
            .collect()
    }

    /// Remove every session idle strictly longer than `threshold_minutes`.
    /// Returns the number of sessions removed.
    pub async fn sweep_expired(&self, threshold_minutes: i64) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(threshold_minutes));
        before - sessions.len()
    }

    /// Sweep with the store's configured expiry threshold.
    pub async fn sweep(&self) -> usize {
        self.sweep_expired(self.expiry_minutes).await
    }
}

/// Spawn the periodic expiry sweeper. The caller owns the handle and
/// aborts it on shutdown; environments without long-lived background
/// tasks can skip this and call [`SessionStore::sweep`] on demand.
pub fn spawn_sweeper(store: SessionStore, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let removed = store.sweep().await;
            if removed > 0 {
                tracing::info!(removed, "Expired sessions swept");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_session() {
        let store = SessionStore::new(20, 60);
        let session = store.create("Tu es un assistant.").await;

        assert!(!session.id.is_empty());
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::System);
        assert_eq!(session.created_at, session.last_activity);
        assert!(session.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_history_bound_holds() {
        let store = SessionStore::new(6, 60);
        let session = store.create("system").await;

        for i in 0..30 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append(&session.id, role, &format!("msg-{}", i))
                .await
                .unwrap();
        }

        let session = store.get(&session.id).await.unwrap();
        assert_eq!(session.messages.len(), 6);
        assert_eq!(session.messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn test_trim_keeps_most_recent_in_order() {
        let store = SessionStore::new(4, 60);
        let session = store.create("system").await;

        // Seven appends against a bound of four: system plus the last three.
        for i in 0..7 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append(&session.id, role, &format!("msg-{}", i))
                .await
                .unwrap();
        }

        let session = store.get(&session.id).await.unwrap();
        let contents: Vec<&str> = session
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["system", "msg-4", "msg-5", "msg-6"]);
    }

    #[tokio::test]
    async fn test_history_bound_clamped() {
        let store = SessionStore::new(1, 60);
        let session = store.create("system").await;

        store.append(&session.id, Role::User, "hello").await.unwrap();

        // A configured bound below 2 is clamped, so one exchange survives.
        let session = store.get(&session.id).await.unwrap();
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_idempotent() {
        let store = SessionStore::new(20, 60);
        let session = store.create("system").await;
        store.append(&session.id, Role::User, "hello").await.unwrap();
        store
            .append(&session.id, Role::Assistant, "hi")
            .await
            .unwrap();
        store
            .update_metadata(
                &session.id,
                HashMap::from([("mode".to_string(), serde_json::json!("TP_ASSISTANT"))]),
            )
            .await
            .unwrap();

        store.reset(&session.id).await.unwrap();
        let after_first = store.get(&session.id).await.unwrap();
        assert_eq!(after_first.messages.len(), 1);
        assert_eq!(after_first.messages[0].content, "system");

        store.reset(&session.id).await.unwrap();
        let after_second = store.get(&session.id).await.unwrap();
        assert_eq!(after_second.messages.len(), 1);
        assert_eq!(after_second.messages[0].content, "system");

        // Reset leaves metadata and created_at alone.
        assert_eq!(after_second.created_at, session.created_at);
        assert!(after_second.metadata.contains_key("mode"));
    }

    #[tokio::test]
    async fn test_stats_consistency() {
        let store = SessionStore::new(20, 60);
        let session = store.create("system").await;
        store.append(&session.id, Role::User, "q1").await.unwrap();
        store.append(&session.id, Role::Assistant, "a1").await.unwrap();
        store.append(&session.id, Role::User, "q2").await.unwrap();

        let stats = store.stats(&session.id).await.unwrap();
        let raw = store.get(&session.id).await.unwrap().messages.len();

        assert_eq!(stats.user_messages + stats.assistant_messages + 1, raw);
        assert_eq!(stats.total_messages, raw - 1);
        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.assistant_messages, 1);
    }

    #[tokio::test]
    async fn test_metadata_merge() {
        let store = SessionStore::new(20, 60);
        let session = store.create("system").await;

        store
            .update_metadata(
                &session.id,
                HashMap::from([("a".to_string(), serde_json::json!(1))]),
            )
            .await
            .unwrap();
        store
            .update_metadata(
                &session.id,
                HashMap::from([("b".to_string(), serde_json::json!(2))]),
            )
            .await
            .unwrap();

        let metadata = store.get(&session.id).await.unwrap().metadata;
        assert_eq!(metadata["a"], serde_json::json!(1));
        assert_eq!(metadata["b"], serde_json::json!(2));

        store
            .update_metadata(
                &session.id,
                HashMap::from([("a".to_string(), serde_json::json!(3))]),
            )
            .await
            .unwrap();

        let metadata = store.get(&session.id).await.unwrap().metadata;
        assert_eq!(metadata["a"], serde_json::json!(3));
        assert_eq!(metadata["b"], serde_json::json!(2));
    }

    #[tokio::test]
    async fn test_expiry_sweep() {
        let store = SessionStore::new(20, 60);
        let stale = store.create("system").await;
        let fresh = store.create("system").await;

        {
            let mut sessions = store.sessions.write().await;
            sessions.get_mut(&stale.id).unwrap().last_activity =
                Utc::now() - Duration::minutes(61);
            sessions.get_mut(&fresh.id).unwrap().last_activity =
                Utc::now() - Duration::minutes(59);
        }

        let removed = store.sweep_expired(60).await;
        assert_eq!(removed, 1);
        assert!(store.get(&stale.id).await.is_none());
        assert!(store.get(&fresh.id).await.is_some());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = SessionStore::new(20, 60);
        let session = store.create("system").await;

        assert!(store.delete(&session.id).await);
        assert!(!store.delete(&session.id).await);
        assert!(!store.delete("no-such-id").await);
    }

    #[tokio::test]
    async fn test_history_unknown_session_is_empty() {
        let store = SessionStore::new(20, 60);
        assert!(store.history("no-such-id").await.is_empty());
    }

    #[tokio::test]
    async fn test_append_unknown_session() {
        let store = SessionStore::new(20, 60);
        let result = store.append("no-such-id", Role::User, "hello").await;
        assert!(matches!(result, Err(ApiError::SessionNotFound(_))));
    }
}
