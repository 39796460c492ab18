//! Durable [`SentMessageStore`] backed by the SP's own sqlite database,
//! generalizing the single-use request-correlation table pattern (store on
//! send, look up once on response, periodically sweep expired rows) to
//! also carry the original message's kind and ACS binding hints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::model::SentAuthnRequest;
use crate::sent_message::{SentMessage, SentMessageStore};

pub struct SqliteSentMessageStore {
    pool: SqlitePool,
}

impl SqliteSentMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSentMessageStore { pool }
    }

    /// Creates the correlation table if it does not already exist. Callers
    /// that run their own migrations can skip this.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS saml_sent_messages (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                acs_index INTEGER,
                acs_url TEXT,
                protocol_binding TEXT,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("DELETE FROM saml_sent_messages WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SentMessageStore for SqliteSentMessageStore {
    async fn get(&self, id: &str) -> Option<SentMessage> {
        let row = sqlx::query_as::<_, (String, String, Option<i64>, Option<String>, Option<String>)>(
            "SELECT id, kind, acs_index, acs_url, protocol_binding FROM saml_sent_messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .ok()
        .flatten()?;

        let (id, kind, acs_index, acs_url, protocol_binding) = row;
        match kind.as_str() {
            "logout_request" => Some(SentMessage::LogoutRequest { id }),
            _ => Some(SentMessage::AuthnRequest(SentAuthnRequest {
                id,
                assertion_consumer_service_index: acs_index.and_then(|i| u16::try_from(i).ok()),
                assertion_consumer_service_url: acs_url,
                protocol_binding,
            })),
        }
    }

    async fn put(&self, message: SentMessage, expires_at: DateTime<Utc>) {
        let expires_at = expires_at.to_rfc3339();
        let result = match &message {
            SentMessage::AuthnRequest(req) => {
                sqlx::query(
                    "INSERT OR REPLACE INTO saml_sent_messages
                        (id, kind, acs_index, acs_url, protocol_binding, expires_at)
                     VALUES (?, 'authn_request', ?, ?, ?, ?)",
                )
                .bind(&req.id)
                .bind(req.assertion_consumer_service_index.map(i64::from))
                .bind(&req.assertion_consumer_service_url)
                .bind(&req.protocol_binding)
                .bind(expires_at)
                .execute(&self.pool)
                .await
            }
            SentMessage::LogoutRequest { id } => {
                sqlx::query(
                    "INSERT OR REPLACE INTO saml_sent_messages
                        (id, kind, acs_index, acs_url, protocol_binding, expires_at)
                     VALUES (?, 'logout_request', NULL, NULL, NULL, ?)",
                )
                .bind(id)
                .bind(expires_at)
                .execute(&self.pool)
                .await
            }
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, "failed to persist sent message");
        }
    }
}
