//! The crate's own domain model for the slice of SAML 2.0 it validates.
//!
//! These types are deliberately independent of whatever XML library parsed
//! the wire message — the validator core never touches XML itself. A
//! binding layer (or the optional `samael-adapter` feature) is responsible
//! for populating a [`Response`] from a parsed document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SAML20_VERSION: &str = "2.0";
pub const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
pub const SUBJECT_CONFIRMATION_METHOD_BEARER: &str =
    "urn:oasis:names:tc:SAML:2.0:cm:bearer";

/// Opaque handle to a signed payload. The validator core never inspects the
/// bytes itself; it only ever hands this to a [`crate::signature::SignatureTrustEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    pub value: String,
    pub format: Option<String>,
    pub name_qualifier: Option<String>,
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    pub fn new(value: impl Into<String>) -> Self {
        NameId {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }
}

/// An identifier field that has not yet been decrypted, if it was encrypted
/// on the wire. The decryption gateway resolves this to a plain [`NameId`]
/// before the rest of the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdField {
    Plain(NameId),
    Encrypted(EncryptedId),
    Absent,
}

impl Default for IdField {
    fn default() -> Self {
        IdField::Absent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedId {
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub recipient: Option<String>,
    pub in_response_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    pub method: String,
    pub data: Option<SubjectConfirmationData>,
    pub name_id: IdField,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    pub name_id: IdField,
    pub confirmations: Vec<SubjectConfirmation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRestriction {
    pub audiences: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conditions {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub audience_restrictions: Vec<AudienceRestriction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    pub authn_instant: DateTime<Utc>,
    pub session_not_on_or_after: Option<DateTime<Utc>>,
    pub session_index: Option<String>,
    pub authn_context_class_ref: Option<String>,
    pub authenticating_authorities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<AttributeValue>,
}

/// Raw attribute values as they appeared on the wire; some may still be
/// encrypted. The assertion validator decrypts these individually with a
/// skip-on-failure policy before handing them to the converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    Plain(String),
    Encrypted(Vec<u8>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeStatement {
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone)]
pub struct Assertion {
    pub version: String,
    pub id: String,
    pub issue_instant: DateTime<Utc>,
    pub issuer: String,
    pub subject: Option<Subject>,
    pub conditions: Option<Conditions>,
    pub authn_statements: Vec<AuthnStatement>,
    pub attribute_statements: Vec<AttributeStatement>,
    pub signature: Option<Signature>,
}

/// An assertion whose contents are still opaque ciphertext. The decryption
/// gateway turns these into plain [`Assertion`]s, appending them to the
/// response's assertion list; a failure here is logged and skipped, never
/// fatal.
#[derive(Debug, Clone)]
pub struct EncryptedAssertion {
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StatusCode {
    pub value: String,
    pub sub_codes: Vec<String>,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        self.value == STATUS_SUCCESS
    }

    pub fn chain_description(&self) -> String {
        if self.sub_codes.is_empty() {
            self.value.clone()
        } else {
            format!("{} -> {}", self.value, self.sub_codes.join(" -> "))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub version: String,
    pub status: StatusCode,
    pub issue_instant: DateTime<Utc>,
    pub issuer: Option<String>,
    pub destination: Option<String>,
    pub in_response_to: Option<String>,
    pub signature: Option<Signature>,
    pub assertions: Vec<Assertion>,
    pub encrypted_assertions: Vec<EncryptedAssertion>,
}

/// The final, normalized authenticated principal produced by a successful
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub name_id: NameId,
    pub issuer_entity_id: String,
    pub attributes: HashMap<String, Vec<String>>,
    pub conditions: Option<ConditionsSnapshot>,
    pub session_index: Option<String>,
    pub authn_context_class_refs: Vec<String>,
    pub authenticating_authorities: Vec<String>,
    pub in_response_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionsSnapshot {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub audiences: Vec<String>,
}

impl From<&Conditions> for ConditionsSnapshot {
    fn from(c: &Conditions) -> Self {
        ConditionsSnapshot {
            not_before: c.not_before,
            not_on_or_after: c.not_on_or_after,
            audiences: c
                .audience_restrictions
                .iter()
                .flat_map(|r| r.audiences.iter().cloned())
                .collect(),
        }
    }
}

/// The kind of a previously sent protocol message, used by the
/// [`crate::sent_message::SentMessageStore`] to classify an `InResponseTo`
/// correlation id — an entry of the wrong kind is itself a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentMessageKind {
    AuthnRequest,
    LogoutRequest,
}

/// The subset of an originally sent `AuthnRequest` that later cross-checks
/// need: its correlation id and the ACS binding hints it asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentAuthnRequest {
    pub id: String,
    pub assertion_consumer_service_index: Option<u16>,
    pub assertion_consumer_service_url: Option<String>,
    pub protocol_binding: Option<String>,
}
