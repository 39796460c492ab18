//! Bridges a `samael`-parsed XML response into this crate's own domain
//! model: tagged variants over the SAML object union from the XML layer,
//! rather than depending on the XML library's types directly.
//!
//! `samael::schema::Response` exposes a single, optional `assertion` field
//! — this crate's model requires the full ordered list the SAML Web SSO
//! profile actually allows. A response with more than one cleartext
//! assertion, or any encrypted ones, cannot come through `samael`'s schema
//! today; this adapter is therefore a convenience for the common
//! single-assertion case, not a complete substitute for a binding layer
//! that parses the full `<samlp:Response>` itself.

use chrono::{DateTime, Utc};

use crate::model::{
    Assertion, AttributeStatement, AttributeValue, AudienceRestriction, AuthnStatement, Conditions, IdField,
    NameId, Response, StatusCode, Subject, SubjectConfirmation, SubjectConfirmationData,
    SUBJECT_CONFIRMATION_METHOD_BEARER,
};

fn parse_instant(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

pub fn response_from_samael(parsed: &samael::schema::Response) -> anyhow::Result<Response> {
    let status = parsed
        .status
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("response carried no status element"))?;
    let status_value = status
        .status_code
        .value
        .clone()
        .ok_or_else(|| anyhow::anyhow!("response carried no status code value"))?;

    let issue_instant = parse_instant(&parsed.issue_instant)?;

    let mut assertions = Vec::new();
    if let Some(assertion) = &parsed.assertion {
        assertions.push(assertion_from_samael(assertion)?);
    }

    Ok(Response {
        version: parsed.version.clone(),
        status: StatusCode { value: status_value, sub_codes: Vec::new() },
        issue_instant,
        issuer: parsed.issuer.as_ref().map(|i| i.value.clone()).flatten(),
        destination: parsed.destination.clone(),
        in_response_to: parsed.in_response_to.clone(),
        signature: parsed.signature.as_ref().map(|_| crate::model::Signature { raw: Vec::new() }),
        assertions,
        encrypted_assertions: Vec::new(),
    })
}

fn assertion_from_samael(assertion: &samael::schema::Assertion) -> anyhow::Result<Assertion> {
    let issue_instant = parse_instant(&assertion.issue_instant)?;
    let issuer = assertion
        .issuer
        .value
        .clone()
        .ok_or_else(|| anyhow::anyhow!("assertion carried no issuer value"))?;

    let subject = assertion
        .subject
        .as_ref()
        .map(subject_from_samael)
        .transpose()?;

    let conditions = assertion.conditions.as_ref().map(conditions_from_samael).transpose()?;

    let authn_statements = assertion
        .authn_statements
        .as_ref()
        .into_iter()
        .flatten()
        .map(authn_statement_from_samael)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let attribute_statements = assertion
        .attribute_statements
        .as_ref()
        .map(|statements| {
            statements
                .iter()
                .map(|s| AttributeStatement {
                    attributes: s
                        .attributes
                        .iter()
                        .map(|attr| crate::model::Attribute {
                            name: attr.name.clone().unwrap_or_default(),
                            values: attr
                                .values
                                .iter()
                                .map(|v| AttributeValue::Plain(v.value.clone().unwrap_or_default()))
                                .collect(),
                        })
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Assertion {
        version: assertion.version.clone(),
        id: assertion.id.clone(),
        issue_instant,
        issuer,
        subject,
        conditions,
        authn_statements,
        attribute_statements,
        signature: assertion.signature.as_ref().map(|_| crate::model::Signature { raw: Vec::new() }),
    })
}

fn subject_from_samael(subject: &samael::schema::Subject) -> anyhow::Result<Subject> {
    let name_id = match &subject.name_id {
        Some(id) => IdField::Plain(NameId {
            value: id.value.clone(),
            format: id.format.clone(),
            name_qualifier: id.name_qualifier.clone(),
            sp_name_qualifier: id.sp_name_qualifier.clone(),
        }),
        None => IdField::Absent,
    };

    let confirmations = subject
        .subject_confirmations
        .iter()
        .flatten()
        .map(|c| SubjectConfirmation {
            method: c.method.clone().unwrap_or_else(|| SUBJECT_CONFIRMATION_METHOD_BEARER.to_string()),
            data: c
                .subject_confirmation_data
                .as_ref()
                .map(|data| {
                    Ok::<_, anyhow::Error>(SubjectConfirmationData {
                        not_before: data.not_before.as_deref().map(parse_instant).transpose()?,
                        not_on_or_after: data.not_on_or_after.as_deref().map(parse_instant).transpose()?,
                        recipient: data.recipient.clone(),
                        in_response_to: data.in_response_to.clone(),
                    })
                })
                .transpose()?,
            name_id: IdField::Absent,
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Subject { name_id, confirmations })
}

fn conditions_from_samael(conditions: &samael::schema::Conditions) -> anyhow::Result<Conditions> {
    Ok(Conditions {
        not_before: conditions.not_before.as_deref().map(parse_instant).transpose()?,
        not_on_or_after: conditions.not_on_or_after.as_deref().map(parse_instant).transpose()?,
        audience_restrictions: conditions
            .audience_restrictions
            .iter()
            .flatten()
            .map(|r| AudienceRestriction {
                audiences: r.audience.iter().flatten().filter_map(|a| a.value.clone()).collect(),
            })
            .collect(),
    })
}

fn authn_statement_from_samael(statement: &samael::schema::AuthnStatement) -> anyhow::Result<AuthnStatement> {
    Ok(AuthnStatement {
        authn_instant: parse_instant(&statement.authn_instant)?,
        session_not_on_or_after: statement.session_not_on_or_after.as_deref().map(parse_instant).transpose()?,
        session_index: statement.session_index.clone(),
        authn_context_class_ref: statement
            .authn_context
            .as_ref()
            .and_then(|c| c.authn_context_class_ref.clone())
            .and_then(|r| r.value),
        authenticating_authorities: Vec::new(),
    })
}
