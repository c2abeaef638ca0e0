//! Entity ID and endpoint comparison.

use url::Url;

/// Compares two URIs the way entity IDs and destinations are compared.
///
/// When both parse as URLs with a host, scheme and host compare
/// case-insensitively and path and query exactly; ports are not compared.
/// Anything else (URNs, relative references, garbage) must match
/// literally.
#[must_use]
pub fn uri_match(destination: &str, settings_url: &str) -> bool {
    match (Url::parse(destination), Url::parse(settings_url)) {
        (Ok(a), Ok(b)) => match (a.host_str(), b.host_str()) {
            (Some(host_a), Some(host_b)) => {
                a.scheme().eq_ignore_ascii_case(b.scheme())
                    && host_a.eq_ignore_ascii_case(host_b)
                    && a.path() == b.path()
                    && a.query() == b.query()
            }
            _ => destination == settings_url,
        },
        _ => destination == settings_url,
    }
}
