use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use tutor_core::Role;

use crate::session::locks::SessionLocks;
use crate::session::store::{Session, SessionStore, SessionStoreError, SessionUpdate};

/// Minimal key/value surface a durable session backend has to offer
#[async_trait]
pub trait KeyValueBackend: Send + Sync + Debug {
    /// Cheap liveness check
    async fn ping(&self) -> Result<(), SessionStoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStoreError>;

    /// Store `value` so that the backend drops it after `ttl`
    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;
}

/// Session store that keeps each session as a JSON document under `session:<id>`.
///
/// The backend TTL mirrors the time left until `expires_at`, so records disappear
/// on their own; reads still check expiry in case the backend lags.
#[derive(Debug)]
pub struct DurableSessionStore {
    backend: Arc<dyn KeyValueBackend>,
    locks: SessionLocks,
}

impl DurableSessionStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend,
            locks: SessionLocks::new(),
        }
    }

    pub fn key(id: &str) -> String {
        format!("session:{}", id)
    }

    pub async fn ping(&self) -> Result<(), SessionStoreError> {
        self.backend.ping().await
    }

    async fn load(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        let Some(bytes) = self.backend.get(&Self::key(id)).await? else {
            return Ok(None);
        };
        let session: Session = serde_json::from_slice(&bytes)
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;

        if session.is_expired() {
            debug!("Ignoring expired session record: {}", id);
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn store(&self, session: &Session) -> Result<(), SessionStoreError> {
        // Nothing to keep once the deadline has passed
        let Some(ttl) = session.remaining_ttl() else {
            return Ok(());
        };
        let payload = serde_json::to_vec(session)
            .map_err(|e| SessionStoreError::Serialization(e.to_string()))?;
        self.backend
            .set_with_ttl(&Self::key(&session.id), payload, ttl)
            .await
    }

    async fn modify<F>(&self, id: &str, f: F) -> Result<bool, SessionStoreError>
    where
        F: FnOnce(&mut Session) + Send,
    {
        let _guard = self.locks.lock(id).await;
        match self.load(id).await? {
            Some(mut session) => {
                f(&mut session);
                self.store(&session).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SessionStore for DurableSessionStore {
    async fn create_session(&self, user_id: Option<&str>) -> Result<Session, SessionStoreError> {
        let session = Session::new(Session::generate_id(user_id));
        self.store(&session).await?;
        debug!("Created durable session: {}", session.id);
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        self.load(id).await
    }

    async fn update_session(
        &self,
        id: &str,
        update: SessionUpdate,
    ) -> Result<(), SessionStoreError> {
        self.modify(id, |session| session.apply(update)).await?;
        Ok(())
    }

    async fn append_history(
        &self,
        id: &str,
        role: Role,
        message: &str,
    ) -> Result<(), SessionStoreError> {
        self.modify(id, |session| session.push_history(role, message))
            .await?;
        Ok(())
    }

    async fn clear_session(&self, id: &str) -> Result<bool, SessionStoreError> {
        self.modify(id, Session::reset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;
    use chrono::{Duration as ChronoDuration, Utc};

    fn store_with_backend() -> (DurableSessionStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (DurableSessionStore::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_sessions_are_stored_under_prefixed_key_with_ttl() {
        let (store, backend) = store_with_backend();
        let session = store.create_session(None).await.unwrap();

        let (bytes, ttl) = backend
            .entry(&format!("session:{}", session.id))
            .expect("record written");
        let decoded: Session = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, session);
        assert!(ttl <= Duration::from_secs(24 * 3600));
        assert!(ttl > Duration::from_secs(23 * 3600));
    }

    #[tokio::test]
    async fn test_history_survives_round_trip() {
        let (store, _) = store_with_backend();
        let id = store.create_session(Some("ada")).await.unwrap().id;

        store.append_history(&id, Role::User, "2+2").await.unwrap();
        store.append_history(&id, Role::Assistant, "4").await.unwrap();

        let session = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(session.conversation_history.len(), 2);
        assert_eq!(session.conversation_history[1].message, "4");
    }

    #[tokio::test]
    async fn test_expired_record_reads_as_absent() {
        let (store, backend) = store_with_backend();
        let mut session = Session::new("old".to_string());
        session.expires_at = Utc::now() - ChronoDuration::seconds(5);
        backend.put_raw("session:old", serde_json::to_vec(&session).unwrap());

        assert_eq!(store.get_session("old").await.unwrap(), None);
        assert!(!store.clear_session("old").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_session_writes_are_noops() {
        let (store, backend) = store_with_backend();
        store
            .append_history("missing", Role::User, "hi")
            .await
            .unwrap();
        assert!(backend.entry("session:missing").is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_serialization_error() {
        let (store, backend) = store_with_backend();
        backend.put_raw("session:bad", b"not json".to_vec());
        let result = store.get_session("bad").await;
        assert!(matches!(result, Err(SessionStoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_serialized() {
        let (store, _) = store_with_backend();
        let store = Arc::new(store);
        let id = store.create_session(None).await.unwrap().id;

        let tasks: Vec<_> = (0..10)
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
        assert_eq!(session.conversation_history.len(), 10);
    }
}
