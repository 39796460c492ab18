//! URI equality used for destination and bearer-recipient matching: a
//! recipient or destination URL must equal the SP endpoint location after
//! port normalization.

use url::Url;

pub trait UriComparator: Send + Sync {
    fn equal(&self, a: &str, b: &str) -> bool;
}

/// Compares scheme, host, default-normalized port, and path; ignores query
/// and fragment. `https://sp.example:443/acs` and `https://sp.example/acs`
/// compare equal because 443 is the default port for `https`.
pub struct PortNormalizingUriComparator;

impl UriComparator for PortNormalizingUriComparator {
    fn equal(&self, a: &str, b: &str) -> bool {
        let (a, b) = match (Url::parse(a), Url::parse(b)) {
            (Ok(a), Ok(b)) => (a, b),
            _ => return a == b,
        };
        a.scheme() == b.scheme()
            && a.host_str() == b.host_str()
            && a.port_or_known_default() == b.port_or_known_default()
            && a.path() == b.path()
    }
}
