//! Request context: a read-only configuration view plus the per-request
//! working set the validator fills in as it runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::{NameId, SubjectConfirmation};

/// The SP's assertion-consumer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub location: String,
    pub response_location: Option<String>,
    pub index: Option<u16>,
    pub binding: String,

    /// `WantAssertionsSigned` as declared on the SP's own `SPSSODescriptor`
    /// in metadata, when one was resolved for this endpoint. Takes
    /// precedence over [`ValidatorConfig::wants_assertions_signed`] when
    /// present.
    pub sp_descriptor_wants_assertions_signed: Option<bool>,
}

/// Expected IdP identity for this exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntity {
    pub entity_id: String,
    pub authenticated: bool,
}

/// The SP's own identity, used as the expected audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfEntity {
    pub entity_id: String,
}

/// Configuration snapshot. Immutable for the lifetime of a validation
/// call; shared (e.g. behind an `Arc`) across concurrent requests by the
/// caller.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub wants_responses_signed: bool,
    pub wants_assertions_signed: bool,
    pub all_signature_validation_disabled: bool,

    /// Seconds; `<= 0` disables the window.
    pub maximum_authentication_lifetime: i64,

    #[validate(range(min = 0, max = 86_400, message = "clock skew must be a sane, bounded number of seconds"))]
    pub accepted_clock_skew_seconds: i64,

    pub response_destination_mandatory: bool,

    pub required_authn_context_class_refs: HashSet<String>,

    pub name_id_attribute: Option<String>,

    /// Identity for replay-cache scoping; distinct validator instances
    /// (e.g. different SPs in one process) must not share a scope.
    pub replay_cache_scope: String,
}

impl ValidatorConfig {
    /// A conservative default matching a typical single-SP deployment:
    /// both envelope and assertion signatures required, 3 minute skew, 1
    /// hour authentication lifetime.
    pub fn new(replay_cache_scope: impl Into<String>) -> Self {
        ValidatorConfig {
            wants_responses_signed: true,
            wants_assertions_signed: true,
            all_signature_validation_disabled: false,
            maximum_authentication_lifetime: 3600,
            accepted_clock_skew_seconds: 180,
            response_destination_mandatory: true,
            required_authn_context_class_refs: HashSet::new(),
            name_id_attribute: None,
            replay_cache_scope: replay_cache_scope.into(),
        }
    }
}

/// Per-request working set: inputs known before validation starts plus the
/// outputs the validator accumulates as it runs.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub config: ValidatorConfig,
    pub endpoint: Endpoint,
    pub peer: PeerEntity,
    pub this_sp: SelfEntity,

    pub now: chrono::DateTime<chrono::Utc>,

    pub selected_subject_name_id: Option<NameId>,
    pub accepted_confirmations: Vec<SubjectConfirmation>,
}

impl ValidationContext {
    pub fn new(
        config: ValidatorConfig,
        endpoint: Endpoint,
        peer: PeerEntity,
        this_sp: SelfEntity,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        ValidationContext {
            config,
            endpoint,
            peer,
            this_sp,
            now,
            selected_subject_name_id: None,
            accepted_confirmations: Vec::new(),
        }
    }

    pub fn requires_assertion_signature(&self) -> bool {
        if self.config.all_signature_validation_disabled {
            return false;
        }
        let wants_assertions_signed = self
            .endpoint
            .sp_descriptor_wants_assertions_signed
            .unwrap_or(self.config.wants_assertions_signed);
        wants_assertions_signed || !self.peer.authenticated
    }
}
