//! Session Management
//!
//! A session carries the conversation buffer the agent reasons over, so
//! follow-up questions see earlier answers. Sessions live in memory only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Role};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    pub conversation: Conversation,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            conversation: Conversation::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Title derived from the first user message
    pub fn title(&self) -> String {
        self.conversation
            .messages()
            .iter()
            .find(|m| m.role == Role::User)
            .map_or_else(
                || format!("Session {}", self.id.as_str().chars().take(8).collect::<String>()),
                |m| {
                    let preview: String = m.content.chars().take(50).collect();
                    if m.content.chars().count() > 50 {
                        format!("{preview}...")
                    } else {
                        preview
                    }
                },
            )
    }

    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session storage
pub trait SessionStore: Send + Sync {
    fn save(&self, session: &Session) -> Result<()>;

    fn load(&self, id: &SessionId) -> Result<Option<Session>>;

    fn contains(&self, id: &SessionId) -> Result<bool> {
        Ok(self.load(id)?.is_some())
    }

    fn delete(&self, id: &SessionId) -> Result<()>;

    /// Most recently updated sessions first
    fn list(&self, limit: usize) -> Result<Vec<Session>>;

    /// Load the session or start a fresh one under the same id
    fn load_or_create(&self, id: &SessionId) -> Result<Session> {
        Ok(self
            .load(id)?
            .unwrap_or_else(|| Session::with_id(id.clone())))
    }
}

/// Sessions kept by a store created with `MemorySessionStore::new`
pub const DEFAULT_SESSION_CAPACITY: usize = 256;

/// In-memory session store.
///
/// Holds at most `capacity` sessions; saving a new one when full drops the
/// least recently updated.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    capacity: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

fn poisoned<T>(_: T) -> AgentError {
    AgentError::Session("session store lock poisoned".into())
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;

        if !sessions.contains_key(&session.id) && sessions.len() >= self.capacity {
            let oldest = sessions
                .values()
                .min_by_key(|s| s.updated_at)
                .map(|s| s.id.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(session = %oldest, "Session store full, dropping oldest session");
                sessions.remove(&oldest);
            }
        }

        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(id).cloned())
    }

    fn contains(&self, id: &SessionId) -> Result<bool> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.contains_key(id))
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(id);
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        let mut result: Vec<_> = sessions.values().cloned().collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_session_title_from_first_user_message() {
        let mut session = Session::new();
        session.conversation.push(Message::system("sys"));
        session.conversation.push(Message::user("Recommend a dividend portfolio"));
        assert_eq!(session.title(), "Recommend a dividend portfolio");
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::new();
        let mut session = Session::new();
        session.conversation.push(Message::user("hello"));
        let id = session.id.clone();

        store.save(&session).unwrap();
        let loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded.message_count(), 1);

        store.delete(&id).unwrap();
        assert!(store.load(&id).unwrap().is_none());
    }

    #[test]
    fn test_full_store_drops_least_recently_updated() {
        let store = MemorySessionStore::with_capacity(2);
        let mut first = Session::with_id(SessionId::from_string("first"));
        let second = Session::with_id(SessionId::from_string("second"));
        store.save(&first).unwrap();
        store.save(&second).unwrap();

        // Touching "first" makes "second" the oldest
        first.updated_at = second.updated_at + chrono::Duration::seconds(1);
        store.save(&first).unwrap();
        store.save(&Session::with_id(SessionId::from_string("third"))).unwrap();

        assert!(store.contains(&SessionId::from_string("first")).unwrap());
        assert!(!store.contains(&SessionId::from_string("second")).unwrap());
        assert!(store.contains(&SessionId::from_string("third")).unwrap());
        assert_eq!(store.list(10).unwrap().len(), 2);
    }

    #[test]
    fn test_load_or_create_keeps_requested_id() {
        let store = MemorySessionStore::new();
        let id = SessionId::from_string("abc");
        let session = store.load_or_create(&id).unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.message_count(), 0);
    }
}
