//! Protocol-level validation of the response envelope. Runs before any
//! assertion is looked at.

use tracing::warn;

use crate::context::ValidationContext;
use crate::error::ValidationError;
use crate::model::{Response, SentAuthnRequest, SAML20_VERSION};
use crate::sent_message::{SentMessage, SentMessageStore};
use crate::signature::{verify_if_present, SignatureTrustEngine};
use crate::time::is_within;
use crate::uri::UriComparator;

/// Runs the ordered envelope checks against the SAML response. Returns the
/// originally sent `AuthnRequest` when one was correlated via
/// `InResponseTo`, so the caller can run the non-fatal cross-checks
/// against it.
pub async fn validate_protocol<E, S, U>(
    response: &Response,
    ctx: &ValidationContext,
    trust_engine: &E,
    sent_message_store: Option<&S>,
    uri_comparator: &U,
) -> Result<Option<SentAuthnRequest>, ValidationError>
where
    E: SignatureTrustEngine + ?Sized,
    S: SentMessageStore + ?Sized,
    U: UriComparator + ?Sized,
{
    // 1. Status.
    if !response.status.is_success() {
        return Err(ValidationError::StatusFailure(response.status.chain_description()).log());
    }

    // 2. Version.
    if response.version != SAML20_VERSION {
        return Err(ValidationError::InvalidMessage(format!(
            "unsupported SAML version: {}",
            response.version
        ))
        .log());
    }

    // 3. Response signature presence + verification.
    if ctx.config.wants_responses_signed && response.signature.is_none() {
        return Err(ValidationError::SignatureRequired.log());
    }
    verify_if_present(trust_engine, response.signature.as_ref(), &ctx.peer.entity_id).await?;

    // 4. Issue instant.
    if !is_within(response.issue_instant, ctx.now, ctx.config.maximum_authentication_lifetime) {
        return Err(ValidationError::IssueInstant.log());
    }

    // 5. InResponseTo binding.
    let mut sent_request = None;
    if let Some(in_response_to) = &response.in_response_to {
        if let Some(store) = sent_message_store {
            match store.get(in_response_to).await {
                None => {
                    return Err(ValidationError::InResponseToMismatch(format!(
                        "no sent message found for id {in_response_to}"
                    ))
                    .log())
                }
                Some(SentMessage::AuthnRequest(req)) => sent_request = Some(req),
                Some(SentMessage::LogoutRequest { .. }) => {
                    return Err(ValidationError::InResponseToMismatch(format!(
                        "id {in_response_to} correlates to a LogoutRequest, not an AuthnRequest"
                    ))
                    .log())
                }
            }
        }
    }

    // 6. Destination.
    if let Some(destination) = &response.destination {
        let acceptable = std::iter::once(ctx.endpoint.location.as_str())
            .chain(ctx.endpoint.response_location.as_deref())
            .any(|candidate| uri_comparator.equal(destination, candidate));
        if !acceptable {
            return Err(ValidationError::EndpointMismatch(destination.clone()).log());
        }
    } else if ctx.config.response_destination_mandatory {
        return Err(ValidationError::EndpointMismatch("destination absent but mandatory".into()).log());
    }

    // 7. Request cross-checks (non-fatal diagnostics).
    if let Some(req) = &sent_request {
        if let Some(expected_index) = req.assertion_consumer_service_index {
            if ctx.endpoint.index != Some(expected_index) {
                warn!(
                    expected = expected_index,
                    actual = ?ctx.endpoint.index,
                    "resolved ACS index does not match the one requested"
                );
            }
        } else if let Some(expected_url) = &req.assertion_consumer_service_url {
            if !uri_comparator.equal(expected_url, &ctx.endpoint.location) {
                warn!(expected = %expected_url, actual = %ctx.endpoint.location, "resolved ACS URL does not match the one requested");
            }
        }
        if let Some(expected_binding) = &req.protocol_binding {
            if expected_binding != &ctx.endpoint.binding {
                warn!(expected = %expected_binding, actual = %ctx.endpoint.binding, "resolved protocol binding does not match the one requested");
            }
        }
    }

    // 8. Issuer.
    if let Some(issuer) = &response.issuer {
        if issuer != &ctx.peer.entity_id {
            return Err(ValidationError::IssuerMismatch(issuer.clone()).log());
        }
    }

    Ok(sent_request)
}
