//! Helpers shared by the message builders and validators.

mod decrypt;
mod duration;
mod id;
mod query;
mod uri;

use chrono::{DateTime, Utc};

pub use decrypt::{decrypt_data, decrypt_multi};
pub use duration::parse_duration;
pub use id::{IdGenerator, UuidGenerator};
pub use query::{build_query, build_query_from_raw_parts, escape, unescape, verify_signature};
pub use uri::uri_match;

pub use samlkit_crypto::{
    build_cert_object, build_private_key_object, format_cert, format_private_key, is_cert_active,
    is_cert_expired,
};

/// Timestamp format of `IssueInstant` and friends.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Formats an instant as `YYYY-MM-DDTHH:MM:SSZ`.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(TIME_FORMAT).to_string()
}

/// Parses an `xs:dateTime` value into UTC.
///
/// Accepts RFC 3339 with an offset and the offset-less form, which is read
/// as UTC.
#[must_use]
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
