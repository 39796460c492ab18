//! Fatal error classification for the validator's public surface.

use thiserror::Error;

/// Every way a SAML response or one of its assertions can be rejected.
///
/// Construction of any variant is the validator's only output besides a
/// [`crate::model::Credential`] — there is no partial success.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("not a valid SAML 2.0 message: {0}")]
    InvalidMessage(String),

    #[error("response status was not success: {0}")]
    StatusFailure(String),

    #[error("a required signature was missing")]
    SignatureRequired,

    #[error("signature validation failed: {0}")]
    SignatureValidation(String),

    #[error("issuer did not match expected peer entity: {0}")]
    IssuerMismatch(String),

    #[error("issue instant outside the accepted lifetime window")]
    IssueInstant,

    #[error("InResponseTo did not correlate to a known request: {0}")]
    InResponseToMismatch(String),

    #[error("destination did not match any acceptable endpoint: {0}")]
    EndpointMismatch(String),

    #[error("no authn-bearing assertion with a valid subject was found")]
    NoSubjectAssertion,

    #[error("no subject confirmation was accepted")]
    SubjectConfirmation,

    #[error("assertion condition violated: {0}")]
    AssertionCondition(String),

    #[error("audience restriction missing or did not contain the service provider")]
    AudienceRestriction,

    #[error("authn instant outside the accepted lifetime window")]
    AuthnInstant,

    #[error("authn session already expired")]
    AuthnSessionCriteria,

    #[error("required authn context class refs were not satisfied")]
    AuthnContextClassRef,

    #[error("assertion id was replayed: {0}")]
    Replay(String),
}

impl ValidationError {
    /// Logs this rejection at `debug` and returns it unchanged, for use at
    /// `return Err(...)` sites. A rejected SSO attempt is routine traffic
    /// rather than an operational incident, so this stays below `warn!`;
    /// the binding layer decides whether a given rejection warrants more.
    pub(crate) fn log(self) -> Self {
        tracing::debug!(error = %self, "rejecting SAML response");
        self
    }
}
