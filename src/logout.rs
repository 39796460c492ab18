//! Single Logout session bookkeeping hook. Processing of incoming
//! `LogoutRequest`s is out of scope here; this crate only exposes the
//! record-only hook the assertion validator calls after deriving a
//! credential, so a later logout can find the session again.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Key used to correlate a later Single Logout request back to the session
/// established by this authentication: `(sessionIndex, nameId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogoutTrackingKey {
    pub session_index: String,
    pub name_id: String,
}

#[async_trait]
pub trait LogoutHandler: Send + Sync {
    /// Best-effort, fire-and-forget: a failure to record a session must
    /// never fail the authentication it is attached to.
    async fn record_session(&self, key: LogoutTrackingKey);
}

/// Used when no session index is available — recording only makes sense
/// when the tracking key is non-null.
pub struct NoopLogoutHandler;

#[async_trait]
impl LogoutHandler for NoopLogoutHandler {
    async fn record_session(&self, key: LogoutTrackingKey) {
        debug!(name_id = %key.name_id, "no logout handler configured, discarding session record");
    }
}

/// In-memory default recording `(sessionIndex, nameId) -> ()`, useful for
/// embedding into a process that also implements its own logout endpoint
/// against the same map.
#[derive(Clone, Default)]
pub struct InMemoryLogoutHandler {
    sessions: Arc<RwLock<HashMap<LogoutTrackingKey, ()>>>,
}

impl InMemoryLogoutHandler {
    pub fn new() -> Self {
        InMemoryLogoutHandler { sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn is_tracked(&self, key: &LogoutTrackingKey) -> bool {
        self.sessions.read().await.contains_key(key)
    }
}

#[async_trait]
impl LogoutHandler for InMemoryLogoutHandler {
    async fn record_session(&self, key: LogoutTrackingKey) {
        self.sessions.write().await.insert(key, ());
    }
}
