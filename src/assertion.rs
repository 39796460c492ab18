//! Assertion validation, subject confirmation, and principal building —
//! the largest single component of the validator.

use std::collections::HashMap;

use crate::attributes::{convert_attributes, AttributeConverter};
use crate::context::ValidationContext;
use crate::decrypt::{decrypt_attributes, decrypt_id, Decrypter};
use crate::error::ValidationError;
use crate::logout::{LogoutHandler, LogoutTrackingKey};
use crate::model::{
    Assertion, AttributeStatement, Conditions, ConditionsSnapshot, Credential, NameId, Response,
    SubjectConfirmation, SAML20_VERSION, SUBJECT_CONFIRMATION_METHOD_BEARER,
};
use crate::replay::ReplayCache;
use crate::signature::{verify_if_present, SignatureTrustEngine};
use crate::time::{in_the_future, is_within, not_before_ok, not_on_or_after_ok};
use crate::uri::UriComparator;

/// Outcome of validating one candidate assertion's subject: the resolved
/// principal identifier (if any was found) and the confirmations accepted
/// along the way. Kept separate from [`ValidationContext`] so a failed
/// candidate never leaves partial state behind — context mutation is
/// confined to the assertion that is ultimately selected.
#[derive(Debug, Default)]
struct SubjectOutcome {
    name_id: Option<NameId>,
    accepted_confirmations: Vec<SubjectConfirmation>,
}

/// Selects the first assertion with at least one authn statement that
/// passes full validation. Remembers the first error encountered among
/// rejected candidates and surfaces it only if no candidate ultimately
/// succeeds.
pub async fn select_and_validate<'a, E, R, D, U>(
    response: &'a mut Response,
    ctx: &mut ValidationContext,
    trust_engine: &E,
    replay_cache: Option<&R>,
    decrypter: Option<&D>,
    uri_comparator: &U,
) -> Result<&'a Assertion, ValidationError>
where
    E: SignatureTrustEngine + ?Sized,
    R: ReplayCache + ?Sized,
    D: Decrypter + ?Sized,
    U: UriComparator + ?Sized,
{
    if let Some(d) = decrypter {
        crate::decrypt::decrypt_assertions(response, d).await;
    }

    let mut first_error = None;
    let mut selected_index = None;
    let mut selected_outcome = None;

    for (index, assertion) in response.assertions.iter().enumerate() {
        if assertion.authn_statements.is_empty() {
            continue;
        }
        match validate_assertion(assertion, ctx, trust_engine, replay_cache, decrypter, uri_comparator).await {
            Ok(outcome) => {
                selected_index = Some(index);
                selected_outcome = Some(outcome);
                break;
            }
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match (selected_index, selected_outcome) {
        (Some(index), Some(outcome)) => {
            ctx.selected_subject_name_id = outcome.name_id;
            ctx.accepted_confirmations = outcome.accepted_confirmations;
            Ok(&response.assertions[index])
        }
        _ => Err(first_error.unwrap_or_else(|| ValidationError::NoSubjectAssertion.log())),
    }
}

async fn validate_assertion<E, R, D, U>(
    assertion: &Assertion,
    ctx: &ValidationContext,
    trust_engine: &E,
    replay_cache: Option<&R>,
    decrypter: Option<&D>,
    uri_comparator: &U,
) -> Result<SubjectOutcome, ValidationError>
where
    E: SignatureTrustEngine + ?Sized,
    R: ReplayCache + ?Sized,
    D: Decrypter + ?Sized,
    U: UriComparator + ?Sized,
{
    // 1. Version.
    if assertion.version != SAML20_VERSION {
        return Err(ValidationError::InvalidMessage(format!(
            "assertion {} has unsupported version {}",
            assertion.id, assertion.version
        ))
        .log());
    }

    // 2. Issue instant.
    if !is_within(assertion.issue_instant, ctx.now, ctx.config.maximum_authentication_lifetime) {
        return Err(ValidationError::IssueInstant.log());
    }

    // 3. Issuer.
    if assertion.issuer != ctx.peer.entity_id {
        return Err(ValidationError::IssuerMismatch(assertion.issuer.clone()).log());
    }

    // 4. Subject.
    let subject = assertion.subject.as_ref().ok_or_else(|| ValidationError::NoSubjectAssertion.log())?;
    let outcome = validate_subject(subject, assertion, ctx, replay_cache, decrypter, uri_comparator).await?;

    // 5. Conditions.
    if let Some(conditions) = &assertion.conditions {
        validate_conditions(conditions, ctx)?;
    }

    // 6. Authn statements.
    validate_authn_statements(assertion, ctx)?;

    // 7. Assertion signature.
    if assertion.signature.is_some() {
        verify_if_present(trust_engine, assertion.signature.as_ref(), &ctx.peer.entity_id).await?;
    } else if ctx.requires_assertion_signature() {
        return Err(ValidationError::SignatureRequired.log());
    }

    Ok(outcome)
}

fn validate_conditions(conditions: &Conditions, ctx: &ValidationContext) -> Result<(), ValidationError> {
    let skew = ctx.config.accepted_clock_skew_seconds;
    if let Some(nb) = conditions.not_before {
        if !not_before_ok(nb, ctx.now, skew) {
            return Err(ValidationError::AssertionCondition("notBefore in the future".into()).log());
        }
    }
    if let Some(noa) = conditions.not_on_or_after {
        if !not_on_or_after_ok(noa, ctx.now, skew) {
            return Err(ValidationError::AssertionCondition("notOnOrAfter expired".into()).log());
        }
    }
    let contains_sp = conditions
        .audience_restrictions
        .iter()
        .any(|r| r.audiences.iter().any(|a| a == &ctx.this_sp.entity_id));
    if conditions.audience_restrictions.is_empty() || !contains_sp {
        return Err(ValidationError::AudienceRestriction.log());
    }
    Ok(())
}

fn validate_authn_statements(assertion: &Assertion, ctx: &ValidationContext) -> Result<(), ValidationError> {
    for statement in &assertion.authn_statements {
        if !is_within(statement.authn_instant, ctx.now, ctx.config.maximum_authentication_lifetime) {
            return Err(ValidationError::AuthnInstant.log());
        }
        if let Some(session_expiry) = statement.session_not_on_or_after {
            if !in_the_future(session_expiry, ctx.now) {
                return Err(ValidationError::AuthnSessionCriteria.log());
            }
        }
    }

    if !ctx.config.required_authn_context_class_refs.is_empty() {
        let provided: std::collections::HashSet<&str> = assertion
            .authn_statements
            .iter()
            .filter_map(|s| s.authn_context_class_ref.as_deref())
            .collect();
        let satisfied = ctx
            .config
            .required_authn_context_class_refs
            .iter()
            .all(|required| provided.contains(required.as_str()));
        if !satisfied {
            return Err(ValidationError::AuthnContextClassRef.log());
        }
    }
    Ok(())
}

async fn validate_subject<R, D, U>(
    subject: &crate::model::Subject,
    assertion: &Assertion,
    ctx: &ValidationContext,
    replay_cache: Option<&R>,
    decrypter: Option<&D>,
    uri_comparator: &U,
) -> Result<SubjectOutcome, ValidationError>
where
    R: ReplayCache + ?Sized,
    D: Decrypter + ?Sized,
    U: UriComparator + ?Sized,
{
    let mut outcome = SubjectOutcome::default();
    outcome.name_id = decrypt_id(&subject.name_id, decrypter).await;

    let skew = ctx.config.accepted_clock_skew_seconds;

    for confirmation in &subject.confirmations {
        if confirmation.method != SUBJECT_CONFIRMATION_METHOD_BEARER {
            continue;
        }
        let data = match &confirmation.data {
            Some(d) => d,
            None => continue,
        };
        if data.not_before.is_some() {
            continue;
        }
        let not_on_or_after = match data.not_on_or_after {
            Some(t) => t,
            None => continue,
        };
        if !not_on_or_after_ok(not_on_or_after, ctx.now, skew) {
            continue;
        }
        let recipient = match &data.recipient {
            Some(r) => r,
            None => continue,
        };
        if !uri_comparator.equal(recipient, &ctx.endpoint.location) {
            continue;
        }

        if let Some(cache) = replay_cache {
            let expires_at = not_on_or_after + chrono::Duration::seconds(skew);
            if assertion.id.is_empty() {
                return Err(ValidationError::Replay("assertion has no id but a replay cache is configured".into()).log());
            }
            if !cache.check(&ctx.config.replay_cache_scope, &assertion.id, expires_at).await {
                return Err(ValidationError::Replay(assertion.id.clone()).log());
            }
        }

        if outcome.name_id.is_none() {
            outcome.name_id = decrypt_id(&confirmation.name_id, decrypter).await;
        }
        outcome.accepted_confirmations.push(confirmation.clone());
        return Ok(outcome);
    }

    Err(ValidationError::SubjectConfirmation.log())
}

/// Builds the final credential from the selected assertion. Takes `&mut`
/// attribute statements so per-value decryption can run first.
pub async fn build_credential<D, C, L>(
    assertion: &Assertion,
    ctx: &ValidationContext,
    decrypter: Option<&D>,
    attribute_converter: &C,
    logout_handler: &L,
) -> Result<Credential, ValidationError>
where
    D: Decrypter + ?Sized,
    C: AttributeConverter + ?Sized,
    L: LogoutHandler + ?Sized,
{
    let mut statements: Vec<AttributeStatement> = assertion.attribute_statements.clone();
    for statement in &mut statements {
        decrypt_attributes(statement, decrypter).await;
    }
    let all_attributes: Vec<_> = statements.into_iter().flat_map(|s| s.attributes).collect();
    let attributes: HashMap<String, Vec<String>> = convert_attributes(&all_attributes, attribute_converter);

    let name_id = if let Some(attr_name) = &ctx.config.name_id_attribute {
        match attributes.get(attr_name).and_then(|values| values.first()) {
            Some(value) => NameId::new(value.clone()),
            None => ctx
                .selected_subject_name_id
                .clone()
                .ok_or_else(|| ValidationError::NoSubjectAssertion.log())?,
        }
    } else {
        ctx.selected_subject_name_id
            .clone()
            .ok_or_else(|| ValidationError::NoSubjectAssertion.log())?
    };

    let session_index = assertion.authn_statements.first().and_then(|s| s.session_index.clone());

    if let Some(session_index) = &session_index {
        logout_handler
            .record_session(LogoutTrackingKey {
                session_index: session_index.clone(),
                name_id: name_id.value.clone(),
            })
            .await;
    }

    let authn_context_class_refs = assertion
        .authn_statements
        .iter()
        .filter_map(|s| s.authn_context_class_ref.clone())
        .collect();
    let authenticating_authorities = assertion
        .authn_statements
        .iter()
        .flat_map(|s| s.authenticating_authorities.iter().cloned())
        .collect();

    Ok(Credential {
        name_id,
        issuer_entity_id: assertion.issuer.clone(),
        attributes,
        conditions: assertion.conditions.as_ref().map(ConditionsSnapshot::from),
        session_index,
        authn_context_class_refs,
        authenticating_authorities,
        in_response_to: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Endpoint, PeerEntity, SelfEntity, ValidatorConfig};
    use crate::decrypt::test_support::IdentityDecrypter;
    use crate::logout::NoopLogoutHandler;
    use crate::model::{
        AudienceRestriction, AuthnStatement, IdField, Subject, SubjectConfirmation, SubjectConfirmationData,
    };
    use crate::replay::InMemoryReplayCache;
    use crate::signature::test_support::AlwaysValid;
    use crate::uri::PortNormalizingUriComparator;
    use crate::attributes::IdentityAttributeConverter;

    fn ctx() -> ValidationContext {
        ValidationContext::new(
            ValidatorConfig::new("sp-default"),
            Endpoint {
                location: "https://sp.example/acs".into(),
                response_location: None,
                index: None,
                binding: "HTTP-POST".into(),
                sp_descriptor_wants_assertions_signed: None,
            },
            PeerEntity { entity_id: "https://idp.example".into(), authenticated: true },
            SelfEntity { entity_id: "https://sp.example".into() },
            chrono::Utc::now(),
        )
    }

    fn bearer_confirmation(recipient: &str, not_on_or_after_offset_secs: i64) -> SubjectConfirmation {
        SubjectConfirmation {
            method: SUBJECT_CONFIRMATION_METHOD_BEARER.to_string(),
            data: Some(SubjectConfirmationData {
                not_before: None,
                not_on_or_after: Some(chrono::Utc::now() + chrono::Duration::seconds(not_on_or_after_offset_secs)),
                recipient: Some(recipient.to_string()),
                in_response_to: None,
            }),
            name_id: IdField::Absent,
        }
    }

    fn happy_path_assertion() -> Assertion {
        Assertion {
            version: SAML20_VERSION.to_string(),
            id: "assertion-1".to_string(),
            issue_instant: chrono::Utc::now(),
            issuer: "https://idp.example".to_string(),
            subject: Some(Subject {
                name_id: IdField::Plain(NameId::new("alice")),
                confirmations: vec![bearer_confirmation("https://sp.example/acs", 300)],
            }),
            conditions: Some(Conditions {
                not_before: None,
                not_on_or_after: Some(chrono::Utc::now() + chrono::Duration::seconds(300)),
                audience_restrictions: vec![AudienceRestriction { audiences: vec!["https://sp.example".into()] }],
            }),
            authn_statements: vec![AuthnStatement {
                authn_instant: chrono::Utc::now(),
                session_not_on_or_after: None,
                session_index: Some("s1".into()),
                authn_context_class_ref: Some("urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport".into()),
                authenticating_authorities: vec![],
            }],
            attribute_statements: vec![],
            signature: Some(crate::model::Signature { raw: vec![1] }),
        }
    }

    #[tokio::test]
    async fn happy_path_selects_and_builds_credential() {
        let mut response = Response {
            version: SAML20_VERSION.to_string(),
            status: crate::model::StatusCode { value: crate::model::STATUS_SUCCESS.into(), sub_codes: vec![] },
            issue_instant: chrono::Utc::now(),
            issuer: Some("https://idp.example".into()),
            destination: Some("https://sp.example/acs".into()),
            in_response_to: None,
            signature: Some(crate::model::Signature { raw: vec![1] }),
            assertions: vec![happy_path_assertion()],
            encrypted_assertions: vec![],
        };
        let mut context = ctx();
        let replay_cache = InMemoryReplayCache::new();

        let assertion = select_and_validate(
            &mut response,
            &mut context,
            &AlwaysValid,
            Some(&replay_cache),
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await
        .expect("should select the assertion")
        .clone();

        let credential = build_credential(
            &assertion,
            &context,
            None::<&IdentityDecrypter>,
            &IdentityAttributeConverter,
            &NoopLogoutHandler,
        )
        .await
        .expect("should build a credential");

        assert_eq!(credential.name_id.value, "alice");
        assert_eq!(credential.session_index.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn assertion_without_authn_statements_is_not_selected() {
        let mut assertion = happy_path_assertion();
        assertion.authn_statements.clear();
        let mut response = Response {
            version: SAML20_VERSION.to_string(),
            status: crate::model::StatusCode { value: crate::model::STATUS_SUCCESS.into(), sub_codes: vec![] },
            issue_instant: chrono::Utc::now(),
            issuer: Some("https://idp.example".into()),
            destination: None,
            in_response_to: None,
            signature: None,
            assertions: vec![assertion],
            encrypted_assertions: vec![],
        };
        let mut context = ctx();
        let result = select_and_validate(
            &mut response,
            &mut context,
            &AlwaysValid,
            None::<&InMemoryReplayCache>,
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await;
        assert_eq!(result.unwrap_err(), ValidationError::NoSubjectAssertion);
    }

    #[tokio::test]
    async fn second_assertion_is_selected_when_first_has_no_authn_statements() {
        let mut first = happy_path_assertion();
        first.authn_statements.clear();
        first.id = "assertion-without-statements".into();
        let second = happy_path_assertion();
        let mut response = Response {
            version: SAML20_VERSION.to_string(),
            status: crate::model::StatusCode { value: crate::model::STATUS_SUCCESS.into(), sub_codes: vec![] },
            issue_instant: chrono::Utc::now(),
            issuer: Some("https://idp.example".into()),
            destination: None,
            in_response_to: None,
            signature: None,
            assertions: vec![first, second],
            encrypted_assertions: vec![],
        };
        let mut context = ctx();
        let selected = select_and_validate(
            &mut response,
            &mut context,
            &AlwaysValid,
            None::<&InMemoryReplayCache>,
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await
        .expect("second assertion should be selected");
        assert_eq!(selected.id, "assertion-1");
    }

    #[tokio::test]
    async fn audience_mismatch_is_rejected() {
        let mut assertion = happy_path_assertion();
        assertion.conditions.as_mut().unwrap().audience_restrictions =
            vec![AudienceRestriction { audiences: vec!["https://other.example".into()] }];
        let mut response = Response {
            version: SAML20_VERSION.to_string(),
            status: crate::model::StatusCode { value: crate::model::STATUS_SUCCESS.into(), sub_codes: vec![] },
            issue_instant: chrono::Utc::now(),
            issuer: Some("https://idp.example".into()),
            destination: None,
            in_response_to: None,
            signature: None,
            assertions: vec![assertion],
            encrypted_assertions: vec![],
        };
        let mut context = ctx();
        let result = select_and_validate(
            &mut response,
            &mut context,
            &AlwaysValid,
            None::<&InMemoryReplayCache>,
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await;
        assert_eq!(result.unwrap_err(), ValidationError::AudienceRestriction);
    }

    #[tokio::test]
    async fn replayed_assertion_id_is_rejected_on_second_use() {
        let mut response = Response {
            version: SAML20_VERSION.to_string(),
            status: crate::model::StatusCode { value: crate::model::STATUS_SUCCESS.into(), sub_codes: vec![] },
            issue_instant: chrono::Utc::now(),
            issuer: Some("https://idp.example".into()),
            destination: None,
            in_response_to: None,
            signature: None,
            assertions: vec![happy_path_assertion()],
            encrypted_assertions: vec![],
        };
        let replay_cache = InMemoryReplayCache::new();
        let mut context = ctx();
        select_and_validate(
            &mut response,
            &mut context,
            &AlwaysValid,
            Some(&replay_cache),
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await
        .expect("first use should succeed");

        let mut response2 = response.clone_for_test();
        let mut context2 = ctx();
        let result = select_and_validate(
            &mut response2,
            &mut context2,
            &AlwaysValid,
            Some(&replay_cache),
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await;
        assert!(matches!(result.unwrap_err(), ValidationError::Replay(_)));
    }

    #[tokio::test]
    async fn unsigned_assertion_rejected_when_signatures_required() {
        let mut assertion = happy_path_assertion();
        assertion.signature = None;
        let mut response = Response {
            version: SAML20_VERSION.to_string(),
            status: crate::model::StatusCode { value: crate::model::STATUS_SUCCESS.into(), sub_codes: vec![] },
            issue_instant: chrono::Utc::now(),
            issuer: Some("https://idp.example".into()),
            destination: None,
            in_response_to: None,
            signature: None,
            assertions: vec![assertion],
            encrypted_assertions: vec![],
        };
        let mut context = ctx();
        let result = select_and_validate(
            &mut response,
            &mut context,
            &AlwaysValid,
            None::<&InMemoryReplayCache>,
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await;
        assert_eq!(result.unwrap_err(), ValidationError::SignatureRequired);
    }

    #[tokio::test]
    async fn name_id_attribute_overrides_subject_when_configured() {
        let mut assertion = happy_path_assertion();
        assertion.attribute_statements = vec![AttributeStatement {
            attributes: vec![crate::model::Attribute {
                name: "upn".into(),
                values: vec![crate::model::AttributeValue::Plain("alice@example.com".into())],
            }],
        }];
        let mut response = Response {
            version: SAML20_VERSION.to_string(),
            status: crate::model::StatusCode { value: crate::model::STATUS_SUCCESS.into(), sub_codes: vec![] },
            issue_instant: chrono::Utc::now(),
            issuer: Some("https://idp.example".into()),
            destination: None,
            in_response_to: None,
            signature: None,
            assertions: vec![assertion],
            encrypted_assertions: vec![],
        };
        let mut context = ctx();
        context.config.name_id_attribute = Some("upn".into());
        let replay_cache = InMemoryReplayCache::new();

        let selected = select_and_validate(
            &mut response,
            &mut context,
            &AlwaysValid,
            Some(&replay_cache),
            None::<&IdentityDecrypter>,
            &PortNormalizingUriComparator,
        )
        .await
        .expect("should select")
        .clone();

        let credential = build_credential(
            &selected,
            &context,
            None::<&IdentityDecrypter>,
            &IdentityAttributeConverter,
            &NoopLogoutHandler,
        )
        .await
        .expect("should build credential");

        assert_eq!(credential.name_id.value, "alice@example.com");
    }

    impl Response {
        fn clone_for_test(&self) -> Response {
            Response {
                version: self.version.clone(),
                status: crate::model::StatusCode {
                    value: self.status.value.clone(),
                    sub_codes: self.status.sub_codes.clone(),
                },
                issue_instant: self.issue_instant,
                issuer: self.issuer.clone(),
                destination: self.destination.clone(),
                in_response_to: self.in_response_to.clone(),
                signature: self.signature.clone(),
                assertions: self.assertions.clone(),
                encrypted_assertions: vec![],
            }
        }
    }
}
