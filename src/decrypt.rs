//! Decryption gateway. Turns encrypted assertions, encrypted ids, and
//! encrypted attributes into cleartext, tolerating per-item failure — a
//! single malformed item must not poison the whole response.

use async_trait::async_trait;
use tracing::warn;

use crate::model::{Assertion, AttributeStatement, AttributeValue, EncryptedAssertion, EncryptedId, NameId, Response};

#[async_trait]
pub trait Decrypter: Send + Sync {
    async fn decrypt_assertion(&self, encrypted: &EncryptedAssertion) -> anyhow::Result<Assertion>;
    async fn decrypt_id(&self, encrypted: &EncryptedId) -> anyhow::Result<NameId>;
    async fn decrypt_attribute(&self, ciphertext: &[u8]) -> anyhow::Result<String>;
}

/// Decrypts every encrypted assertion on the response and appends the
/// successes to `response.assertions`, in document order, after the
/// already-cleartext ones. Failures are logged and skipped.
pub async fn decrypt_assertions<D: Decrypter + ?Sized>(response: &mut Response, decrypter: &D) {
    let encrypted = std::mem::take(&mut response.encrypted_assertions);
    for enc in &encrypted {
        match decrypter.decrypt_assertion(enc).await {
            Ok(assertion) => response.assertions.push(assertion),
            Err(err) => warn!(error = %err, "failed to decrypt assertion, skipping"),
        }
    }
}

/// Returns `None` when the field was absent, or when decryption of an
/// encrypted field fails — neither case is fatal.
pub async fn decrypt_id<D: Decrypter + ?Sized>(
    field: &crate::model::IdField,
    decrypter: Option<&D>,
) -> Option<NameId> {
    match field {
        crate::model::IdField::Plain(id) => Some(id.clone()),
        crate::model::IdField::Absent => None,
        crate::model::IdField::Encrypted(enc) => match decrypter {
            None => {
                warn!("encrypted id present but no decrypter configured, skipping");
                None
            }
            Some(d) => match d.decrypt_id(enc).await {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(error = %err, "failed to decrypt subject id, skipping");
                    None
                }
            },
        },
    }
}

/// Decrypts encrypted attribute values in place, dropping any that fail.
pub async fn decrypt_attributes<D: Decrypter + ?Sized>(statement: &mut AttributeStatement, decrypter: Option<&D>) {
    for attr in &mut statement.attributes {
        let mut resolved = Vec::with_capacity(attr.values.len());
        for value in std::mem::take(&mut attr.values) {
            match value {
                AttributeValue::Plain(v) => resolved.push(v),
                AttributeValue::Encrypted(ciphertext) => match decrypter {
                    None => warn!(attribute = %attr.name, "encrypted attribute value but no decrypter configured, skipping"),
                    Some(d) => match d.decrypt_attribute(&ciphertext).await {
                        Ok(v) => resolved.push(v),
                        Err(err) => warn!(attribute = %attr.name, error = %err, "failed to decrypt attribute value, skipping"),
                    },
                },
            }
        }
        attr.values = resolved.into_iter().map(AttributeValue::Plain).collect();
    }
}
