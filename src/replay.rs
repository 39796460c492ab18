//! Replay guard. At-most-once acceptance of `(scope, assertion id)`
//! within the assertion's validity window.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[async_trait]
pub trait ReplayCache: Send + Sync {
    /// Returns `true` if `(scope, id)` has never been accepted before, and
    /// records it as used. Returns `false` on a repeat.
    async fn check(&self, scope: &str, id: &str, expires_at: DateTime<Utc>) -> bool;
}

/// In-memory, thread-safe default implementation. Entries past their
/// `expires_at` are lazily swept on each call so the map does not grow
/// without bound across a long-running process — the same
/// `Arc<RwLock<HashMap<...>>>` idiom used for cached IdP metadata elsewhere
/// in this codebase's lineage.
#[derive(Clone, Default)]
pub struct InMemoryReplayCache {
    seen: Arc<RwLock<HashMap<(String, String), DateTime<Utc>>>>,
}

impl InMemoryReplayCache {
    pub fn new() -> Self {
        InMemoryReplayCache { seen: Arc::new(RwLock::new(HashMap::new())) }
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) {
        let mut map = self.seen.write().await;
        map.retain(|_, expires_at| *expires_at > now);
    }
}

#[async_trait]
impl ReplayCache for InMemoryReplayCache {
    async fn check(&self, scope: &str, id: &str, expires_at: DateTime<Utc>) -> bool {
        self.sweep_expired(Utc::now()).await;
        let key = (scope.to_string(), id.to_string());
        let mut map = self.seen.write().await;
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, expires_at);
        true
    }
}
