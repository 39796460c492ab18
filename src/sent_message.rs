//! Sent-message store: correlates an `InResponseTo` id back to the
//! `AuthnRequest` (or `LogoutRequest`) the SP originally sent.
//!
//! An entry of the wrong kind — e.g. the id belongs to a `LogoutRequest`
//! but a response claims it answers an `AuthnRequest` — is itself a
//! rejection, not merely a missing entry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::{SentAuthnRequest, SentMessageKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    AuthnRequest(SentAuthnRequest),
    LogoutRequest { id: String },
}

impl SentMessage {
    pub fn kind(&self) -> SentMessageKind {
        match self {
            SentMessage::AuthnRequest(_) => SentMessageKind::AuthnRequest,
            SentMessage::LogoutRequest { .. } => SentMessageKind::LogoutRequest,
        }
    }
}

#[async_trait]
pub trait SentMessageStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<SentMessage>;
    async fn put(&self, message: SentMessage, expires_at: DateTime<Utc>);
}

/// In-memory default, mirroring the single-use correlation-row pattern of a
/// durable store without requiring one.
#[derive(Clone, Default)]
pub struct InMemorySentMessageStore {
    entries: Arc<RwLock<HashMap<String, (SentMessage, DateTime<Utc>)>>>,
}

impl InMemorySentMessageStore {
    pub fn new() -> Self {
        InMemorySentMessageStore { entries: Arc::new(RwLock::new(HashMap::new())) }
    }

    fn id_of(message: &SentMessage) -> String {
        match message {
            SentMessage::AuthnRequest(req) => req.id.clone(),
            SentMessage::LogoutRequest { id } => id.clone(),
        }
    }

    /// Drops any entries past their expiry. Called opportunistically so a
    /// long-running store does not retain correlation rows forever.
    pub async fn cleanup_expired(&self) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
    }
}

#[async_trait]
impl SentMessageStore for InMemorySentMessageStore {
    async fn get(&self, id: &str) -> Option<SentMessage> {
        self.cleanup_expired().await;
        self.entries.read().await.get(id).map(|(msg, _)| msg.clone())
    }

    async fn put(&self, message: SentMessage, expires_at: DateTime<Utc>) {
        let id = Self::id_of(&message);
        self.entries.write().await.insert(id, (message, expires_at));
    }
}
