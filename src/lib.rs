//! SAML 2.0 Web Browser SSO response validator core.
//!
//! This crate validates an already-parsed SAML `Response` against a
//! Service Provider's configuration and injected collaborators (trust
//! engine, decrypter, replay cache, sent-message store, logout handler,
//! attribute converter, URI comparator), producing a normalized
//! [`model::Credential`] or a classified [`error::ValidationError`].
//!
//! It has no file format, wire protocol, or CLI of its own: HTTP binding
//! decode, XML parsing, metadata resolution, and key provisioning are the
//! responsibility of whatever embeds this crate.

pub mod assertion;
pub mod attributes;
pub mod context;
pub mod decrypt;
pub mod error;
pub mod logout;
pub mod model;
pub mod protocol;
pub mod replay;
pub mod sent_message;
pub mod signature;
pub mod time;
pub mod uri;
pub mod validator;

#[cfg(feature = "samael-adapter")]
pub mod samael_adapter;

#[cfg(feature = "sqlite-store")]
pub mod sqlite_store;

pub use context::{Endpoint, PeerEntity, SelfEntity, ValidationContext, ValidatorConfig};
pub use error::ValidationError;
pub use model::Credential;
pub use validator::{validate, Collaborators};
