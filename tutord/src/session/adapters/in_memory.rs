use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;
use tutor_core::Role;

use crate::session::store::{Session, SessionStore, SessionStoreError, SessionUpdate};

/// In-memory implementation of SessionStore
///
/// Each operation runs under a single lock acquisition, so read-modify-write
/// updates on the same session never interleave. Expired records are evicted
/// when they are next touched.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    /// Thread-safe storage of sessions
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    /// Create a new InMemorySessionStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the live session `id`, if any, under the write lock
    fn with_live_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Result<Option<T>, SessionStoreError> {
        let mut sessions = self.sessions.write().map_err(|e| {
            SessionStoreError::Backend(format!("Failed to acquire write lock: {}", e))
        })?;

        let expired = match sessions.get(id) {
            Some(session) => session.is_expired(),
            None => return Ok(None),
        };
        if expired {
            sessions.remove(id);
            debug!("Evicted expired session: {}", id);
            return Ok(None);
        }

        Ok(sessions.get_mut(id).map(f))
    }

    #[cfg(test)]
    pub(crate) fn insert_raw(&self, session: Session) {
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, user_id: Option<&str>) -> Result<Session, SessionStoreError> {
        let session = Session::new(Session::generate_id(user_id));

        let mut sessions = self.sessions.write().map_err(|e| {
            SessionStoreError::Backend(format!("Failed to acquire write lock: {}", e))
        })?;

        sessions.insert(session.id.clone(), session.clone());
        debug!("Created session: {}", session.id);

        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        self.with_live_session(id, |session| session.clone())
    }

    async fn update_session(
        &self,
        id: &str,
        update: SessionUpdate,
    ) -> Result<(), SessionStoreError> {
        self.with_live_session(id, |session| session.apply(update))?;
        Ok(())
    }

    async fn append_history(
        &self,
        id: &str,
        role: Role,
        message: &str,
    ) -> Result<(), SessionStoreError> {
        self.with_live_session(id, |session| session.push_history(role, message))?;
        Ok(())
    }

    async fn clear_session(&self, id: &str) -> Result<bool, SessionStoreError> {
        let cleared = self.with_live_session(id, Session::reset)?.is_some();
        if cleared {
            debug!("Cleared session: {}", id);
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::{Map, Value};
    use tokio::test;

    #[test]
    async fn test_create_and_get_session() {
        let store = InMemorySessionStore::new();

        let created = store.create_session(Some("ada")).await.unwrap();
        assert!(created.id.contains("_ada_"));

        let retrieved = store.get_session(&created.id).await.unwrap().unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    async fn test_unknown_session_is_none() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get_session("non_existent").await.unwrap(), None);
    }

    #[test]
    async fn test_expired_session_is_absent() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new("expired".to_string());
        session.expires_at = Utc::now() - Duration::seconds(1);
        store.insert_raw(session);

        assert_eq!(store.get_session("expired").await.unwrap(), None);
        // Writes do not resurrect it
        store
            .append_history("expired", Role::User, "hello")
            .await
            .unwrap();
        assert_eq!(store.get_session("expired").await.unwrap(), None);
        assert!(!store.clear_session("expired").await.unwrap());
    }

    #[test]
    async fn test_append_history_preserves_order() {
        let store = InMemorySessionStore::new();
        let id = store.create_session(None).await.unwrap().id;

        store.append_history(&id, Role::User, "2+2").await.unwrap();
        store.append_history(&id, Role::Assistant, "4").await.unwrap();

        let session = store.get_session(&id).await.unwrap().unwrap();
        let turns: Vec<(Role, &str)> = session
            .conversation_history
            .iter()
            .map(|e| (e.role, e.message.as_str()))
            .collect();
        assert_eq!(turns, vec![(Role::User, "2+2"), (Role::Assistant, "4")]);
    }

    #[test]
    async fn test_update_merges_fields() {
        let store = InMemorySessionStore::new();
        let id = store.create_session(None).await.unwrap().id;
        store.append_history(&id, Role::User, "hi").await.unwrap();

        let mut context = Map::new();
        context.insert("subject".to_string(), Value::from("physics"));
        store
            .update_session(&id, SessionUpdate::default().with_context(context.clone()))
            .await
            .unwrap();

        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.context, context);
        assert_eq!(session.conversation_history.len(), 1);

        // Unknown ids are a no-op
        store
            .update_session("missing", SessionUpdate::default().with_active(false))
            .await
            .unwrap();
        assert_eq!(store.get_session("missing").await.unwrap(), None);
    }

    #[test]
    async fn test_clear_session_keeps_id() {
        let store = InMemorySessionStore::new();
        let id = store.create_session(None).await.unwrap().id;
        store.append_history(&id, Role::User, "hello").await.unwrap();

        assert!(store.clear_session(&id).await.unwrap());
        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.id, id);
        assert!(session.conversation_history.is_empty());

        assert!(!store.clear_session("missing").await.unwrap());
    }

    #[test]
    async fn test_concurrent_appends_are_not_lost() {
        let store = Arc::new(InMemorySessionStore::new());
        let id = store.create_session(None).await.unwrap().id;

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    store
                        .append_history(&id, Role::User, &format!("msg {}", i))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.conversation_history.len(), 20);
    }
}
