//! Signature verification against a peer's trust material.
//!
//! Key provisioning and the actual cryptographic primitives are out of
//! scope for this crate — `SignatureTrustEngine` is an injected
//! collaborator implemented by whatever XML/crypto layer embeds this
//! validator.

use async_trait::async_trait;

use crate::error::ValidationError;
use crate::model::Signature;

/// Verifies a single signed payload against the trust material configured
/// for a named peer entity.
#[async_trait]
pub trait SignatureTrustEngine: Send + Sync {
    async fn verify(&self, signature: &Signature, expected_entity_id: &str) -> Result<(), ValidationError>;
}

/// Builds a (possibly request-scoped) [`SignatureTrustEngine`]. Engines are
/// expected to be reusable and thread-safe across calls.
pub trait SignatureTrustEngineProvider: Send + Sync {
    type Engine: SignatureTrustEngine;

    fn build(&self) -> Self::Engine;
}

/// A no-op guard: verification only runs when a signature is actually
/// present. Callers (the protocol and assertion validators) are
/// responsible for deciding whether an *absent* signature is itself fatal.
pub async fn verify_if_present<E: SignatureTrustEngine + ?Sized>(
    engine: &E,
    signature: Option<&Signature>,
    expected_entity_id: &str,
) -> Result<(), ValidationError> {
    match signature {
        Some(sig) => engine.verify(sig, expected_entity_id).await,
        None => Ok(()),
    }
}
