//! Attribute conversion: a pure, injected strategy turning raw attribute
//! name/value pairs into the caller's profile representation. Kept as a
//! first-class strategy injected into the validator rather than
//! process-wide state.

use std::collections::HashMap;

use crate::model::{Attribute, AttributeValue};

pub trait AttributeConverter: Send + Sync {
    fn convert(&self, name: &str, raw_values: &[String]) -> Vec<String>;
}

/// Passes every already-decrypted plain value through unchanged. Suitable
/// when the caller wants the raw wire values and does its own mapping
/// downstream.
pub struct IdentityAttributeConverter;

impl AttributeConverter for IdentityAttributeConverter {
    fn convert(&self, _name: &str, raw_values: &[String]) -> Vec<String> {
        raw_values.to_vec()
    }
}

/// Runs every attribute statement's attributes through the configured
/// converter and flattens them into a single name -> values map, as
/// consumed by [`crate::model::Credential::attributes`]. Attribute values
/// that are still [`AttributeValue::Encrypted`] at this point (i.e. were
/// not resolved by [`crate::decrypt::decrypt_attributes`]) are dropped.
pub fn convert_attributes<C: AttributeConverter + ?Sized>(
    attributes: &[Attribute],
    converter: &C,
) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for attr in attributes {
        let raw: Vec<String> = attr
            .values
            .iter()
            .filter_map(|v| match v {
                AttributeValue::Plain(s) => Some(s.clone()),
                AttributeValue::Encrypted(_) => None,
            })
            .collect();
        let converted = converter.convert(&attr.name, &raw);
        out.entry(attr.name.clone()).or_default().extend(converted);
    }
    out
}
