use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::{Mutex, MutexGuard};

const LOCK_STRIPES: usize = 64;

/// Fixed set of async mutexes keyed by session id hash.
///
/// Held across a load/modify/store cycle so two writers on the same session
/// cannot lose each other's changes. Distinct sessions may share a stripe.
#[derive(Debug)]
pub(crate) struct SessionLocks {
    stripes: Vec<Mutex<()>>,
}

impl SessionLocks {
    pub(crate) fn new() -> Self {
        Self {
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub(crate) async fn lock(&self, session_id: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        let index = (hasher.finish() % self.stripes.len() as u64) as usize;
        self.stripes[index].lock().await
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}
