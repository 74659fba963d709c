use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tutor_core::{HistoryEntry, Role};
use uuid::Uuid;

/// Fixed lifetime of a session, counted from creation
pub const SESSION_TTL_HOURS: i64 = 24;

/// Error type for session store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionStoreError {
    /// The backing store could not be reached or rejected the operation
    #[error("Session backend error: {0}")]
    Backend(String),
    /// A stored record could not be encoded or decoded
    #[error("Session serialization error: {0}")]
    Serialization(String),
}

/// Session data structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier, immutable after creation
    pub id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// `created_at` plus the session TTL; never refreshed on access
    pub expires_at: DateTime<Utc>,
    /// Conversation turns in insertion order
    pub conversation_history: Vec<HistoryEntry>,
    /// Free-form workflow state
    pub context: Map<String, Value>,
    pub active: bool,
}

impl Session {
    /// Create a new, empty session with the given ID
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
            conversation_history: Vec::new(),
            context: Map::new(),
            active: true,
        }
    }

    /// Generate a fresh session id: `session_<utc stamp>_<user or anonymous>_<uuid>`
    pub fn generate_id(user_id: Option<&str>) -> String {
        let user = user_id
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or("anonymous");
        format!(
            "session_{}_{}_{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            user,
            Uuid::new_v4().simple()
        )
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_ttl(&self) -> Option<std::time::Duration> {
        (self.expires_at - Utc::now())
            .to_std()
            .ok()
            .filter(|ttl| !ttl.is_zero())
    }

    /// Merge the fields named in `update`
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(history) = update.conversation_history {
            self.conversation_history = history;
        }
        if let Some(context) = update.context {
            self.context = context;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
    }

    /// Append one history entry stamped with the current time
    pub fn push_history(&mut self, role: Role, message: &str) {
        self.conversation_history
            .push(HistoryEntry::new(role, message));
    }

    /// Replace this session with a fresh record that keeps only the id
    pub fn reset(&mut self) {
        *self = Session::new(std::mem::take(&mut self.id));
    }
}

/// Partial update for `SessionStore::update_session`; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub conversation_history: Option<Vec<HistoryEntry>>,
    pub context: Option<Map<String, Value>>,
    pub active: Option<bool>,
}

impl SessionUpdate {
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.conversation_history = Some(history);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }
}

/// Trait defining the interface for session stores
///
/// Expired sessions are treated as absent by every operation, whether or not the
/// record still exists in the backing store.
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// Create a new session, optionally tagged with a user id
    async fn create_session(&self, user_id: Option<&str>) -> Result<Session, SessionStoreError>;

    /// Get a live session by ID
    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Merge `update` into a stored session; no-op if it does not exist
    async fn update_session(&self, id: &str, update: SessionUpdate)
        -> Result<(), SessionStoreError>;

    /// Append one history entry; no-op if the session does not exist
    async fn append_history(
        &self,
        id: &str,
        role: Role,
        message: &str,
    ) -> Result<(), SessionStoreError>;

    /// Reset history and context while keeping the id; returns whether the session existed
    async fn clear_session(&self, id: &str) -> Result<bool, SessionStoreError>;
}

/// Type alias for Arc-wrapped SessionStore trait objects
pub type SessionStoreRef = Arc<dyn SessionStore>;
