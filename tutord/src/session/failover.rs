use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};
use tutor_core::Role;

use crate::session::adapters::{DurableSessionStore, InMemorySessionStore, KeyValueBackend};
use crate::session::store::{Session, SessionStore, SessionStoreError, SessionUpdate};

/// Session store that prefers a durable backend and falls back to process memory.
///
/// The switch happens at most once: either at start-up when the probe fails, or the
/// first time a durable operation errors. Sessions already written to the durable
/// backend are not copied across, so they are unreachable after the switch.
#[derive(Debug)]
pub struct FailoverSessionStore {
    durable: Option<DurableSessionStore>,
    using_durable: AtomicBool,
    fallback: OnceLock<InMemorySessionStore>,
}

impl FailoverSessionStore {
    /// Probe `backend` within `probe_timeout` and start in durable mode if it answers.
    pub async fn connect(backend: Arc<dyn KeyValueBackend>, probe_timeout: Duration) -> Self {
        let durable = DurableSessionStore::new(backend);
        let reachable = match tokio::time::timeout(probe_timeout, durable.ping()).await {
            Ok(Ok(())) => {
                info!("Connected to durable session backend");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Durable session backend unavailable");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = probe_timeout.as_millis() as u64,
                    "Durable session backend probe timed out"
                );
                false
            }
        };

        let store = Self {
            durable: Some(durable),
            using_durable: AtomicBool::new(reachable),
            fallback: OnceLock::new(),
        };
        if !reachable {
            store.fallback();
        }
        store
    }

    /// A store that never had a durable backend
    pub fn in_memory() -> Self {
        let store = Self {
            durable: None,
            using_durable: AtomicBool::new(false),
            fallback: OnceLock::new(),
        };
        store.fallback();
        store
    }

    pub fn is_using_durable(&self) -> bool {
        self.durable.is_some() && self.using_durable.load(Ordering::SeqCst)
    }

    fn durable(&self) -> Option<&DurableSessionStore> {
        if self.using_durable.load(Ordering::SeqCst) {
            self.durable.as_ref()
        } else {
            None
        }
    }

    fn fallback(&self) -> &InMemorySessionStore {
        self.fallback.get_or_init(|| {
            info!("Using in-memory session storage");
            InMemorySessionStore::new()
        })
    }

    fn fail_over(&self, operation: &str, e: &SessionStoreError) {
        if self.using_durable.swap(false, Ordering::SeqCst) {
            error!(
                operation,
                error = %e,
                "Durable session backend failed; using in-memory storage from now on"
            );
        }
    }
}

#[async_trait]
impl SessionStore for FailoverSessionStore {
    async fn create_session(&self, user_id: Option<&str>) -> Result<Session, SessionStoreError> {
        if let Some(durable) = self.durable() {
            match durable.create_session(user_id).await {
                Ok(session) => return Ok(session),
                Err(e) => self.fail_over("create_session", &e),
            }
        }
        self.fallback().create_session(user_id).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        if let Some(durable) = self.durable() {
            match durable.get_session(id).await {
                Ok(session) => return Ok(session),
                Err(e) => self.fail_over("get_session", &e),
            }
        }
        self.fallback().get_session(id).await
    }

    async fn update_session(
        &self,
        id: &str,
        update: SessionUpdate,
    ) -> Result<(), SessionStoreError> {
        if let Some(durable) = self.durable() {
            match durable.update_session(id, update.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => self.fail_over("update_session", &e),
            }
        }
        self.fallback().update_session(id, update).await
    }

    async fn append_history(
        &self,
        id: &str,
        role: Role,
        message: &str,
    ) -> Result<(), SessionStoreError> {
        if let Some(durable) = self.durable() {
            match durable.append_history(id, role, message).await {
                Ok(()) => return Ok(()),
                Err(e) => self.fail_over("append_history", &e),
            }
        }
        self.fallback().append_history(id, role, message).await
    }

    async fn clear_session(&self, id: &str) -> Result<bool, SessionStoreError> {
        if let Some(durable) = self.durable() {
            match durable.clear_session(id).await {
                Ok(cleared) => return Ok(cleared),
                Err(e) => self.fail_over("clear_session", &e),
            }
        }
        self.fallback().clear_session(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBackend;

    const PROBE: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_healthy_backend_stays_durable() {
        let backend = Arc::new(MemoryBackend::new());
        let store = FailoverSessionStore::connect(backend.clone(), PROBE).await;
        assert!(store.is_using_durable());

        let session = store.create_session(None).await.unwrap();
        assert!(backend.entry(&format!("session:{}", session.id)).is_some());
        assert!(store.get_session(&session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_probe_starts_in_memory() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_failing(true);
        let store = FailoverSessionStore::connect(backend.clone(), PROBE).await;
        assert!(!store.is_using_durable());

        let calls_after_probe = backend.calls();
        let session = store.create_session(None).await.unwrap();
        assert!(store.get_session(&session.id).await.unwrap().is_some());
        assert_eq!(backend.calls(), calls_after_probe);
    }

    #[tokio::test]
    async fn test_slow_probe_times_out_to_memory() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_delay(Duration::from_millis(500));
        let store = FailoverSessionStore::connect(backend, Duration::from_millis(20)).await;
        assert!(!store.is_using_durable());
    }

    #[tokio::test]
    async fn test_mid_life_failure_switches_permanently() {
        let backend = Arc::new(MemoryBackend::new());
        let store = FailoverSessionStore::connect(backend.clone(), PROBE).await;
        let durable_session = store.create_session(None).await.unwrap();

        backend.set_failing(true);

        // The failing operation is retried against memory and still succeeds
        let fresh = store.create_session(Some("ada")).await.unwrap();
        assert!(!store.is_using_durable());
        assert!(store.get_session(&fresh.id).await.unwrap().is_some());

        // Durable data is not migrated
        assert_eq!(store.get_session(&durable_session.id).await.unwrap(), None);

        // Recovery does not switch back
        backend.set_failing(false);
        let calls = backend.calls();
        store
            .append_history(&fresh.id, Role::User, "still here")
            .await
            .unwrap();
        assert!(!store.is_using_durable());
        assert_eq!(backend.calls(), calls);

        let session = store.get_session(&fresh.id).await.unwrap().unwrap();
        assert_eq!(session.conversation_history.len(), 1);
    }

    #[tokio::test]
    async fn test_read_failure_falls_back() {
        let backend = Arc::new(MemoryBackend::new());
        let store = FailoverSessionStore::connect(backend.clone(), PROBE).await;
        backend.set_failing(true);

        assert_eq!(store.get_session("anything").await.unwrap(), None);
        assert!(!store.is_using_durable());
    }

    #[tokio::test]
    async fn test_in_memory_only() {
        let store = FailoverSessionStore::in_memory();
        assert!(!store.is_using_durable());
        let id = store.create_session(None).await.unwrap().id;
        assert!(store.clear_session(&id).await.unwrap());
    }
}
