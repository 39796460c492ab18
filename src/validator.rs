//! Top-level entry point: wires protocol validation, assertion selection,
//! and credential building together behind one `validate` call.

use crate::assertion::{build_credential, select_and_validate};
use crate::attributes::AttributeConverter;
use crate::context::ValidationContext;
use crate::decrypt::Decrypter;
use crate::error::ValidationError;
use crate::logout::LogoutHandler;
use crate::model::{Credential, Response};
use crate::protocol::validate_protocol;
use crate::replay::ReplayCache;
use crate::sent_message::SentMessageStore;
use crate::signature::SignatureTrustEngine;
use crate::uri::UriComparator;

/// Everything the validator needs injected for one call. Grouped into a
/// struct of borrows so `validate` itself stays a single, readable call
/// site; every field is optional except the trust engine and comparator,
/// matching which collaborators a caller may reasonably leave unwired.
pub struct Collaborators<'a, E, R, S, D, L, C, U>
where
    E: SignatureTrustEngine + ?Sized,
    R: ReplayCache + ?Sized,
    S: SentMessageStore + ?Sized,
    D: Decrypter + ?Sized,
    L: LogoutHandler + ?Sized,
    C: AttributeConverter + ?Sized,
    U: UriComparator + ?Sized,
{
    pub trust_engine: &'a E,
    pub replay_cache: Option<&'a R>,
    pub sent_message_store: Option<&'a S>,
    pub decrypter: Option<&'a D>,
    pub logout_handler: &'a L,
    pub attribute_converter: &'a C,
    pub uri_comparator: &'a U,
}

/// Validates a SAML 2.0 Web Browser SSO response against the supplied
/// context, consuming decrypted content into `response` along the way.
/// Returns a [`Credential`] on success or the first classified
/// [`ValidationError`] that caused rejection.
///
/// `response` is taken by value because encrypted assertions are merged
/// into its cleartext assertion list in place, giving the rest of the
/// pipeline a single combined in-memory view to validate against.
pub async fn validate<E, R, S, D, L, C, U>(
    mut response: Response,
    ctx: &mut ValidationContext,
    collaborators: &Collaborators<'_, E, R, S, D, L, C, U>,
) -> Result<Credential, ValidationError>
where
    E: SignatureTrustEngine + ?Sized,
    R: ReplayCache + ?Sized,
    S: SentMessageStore + ?Sized,
    D: Decrypter + ?Sized,
    L: LogoutHandler + ?Sized,
    C: AttributeConverter + ?Sized,
    U: UriComparator + ?Sized,
{
    let in_response_to = response.in_response_to.clone();

    validate_protocol(
        &response,
        ctx,
        collaborators.trust_engine,
        collaborators.sent_message_store,
        collaborators.uri_comparator,
    )
    .await?;

    let assertion = select_and_validate(
        &mut response,
        ctx,
        collaborators.trust_engine,
        collaborators.replay_cache,
        collaborators.decrypter,
        collaborators.uri_comparator,
    )
    .await?
    .clone();

    let mut credential = build_credential(
        &assertion,
        ctx,
        collaborators.decrypter,
        collaborators.attribute_converter,
        collaborators.logout_handler,
    )
    .await?;

    credential.in_response_to = in_response_to;
    Ok(credential)
}
