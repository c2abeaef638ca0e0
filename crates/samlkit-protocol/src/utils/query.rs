//! Query strings of the HTTP-Redirect binding.
//!
//! The redirect binding signs the exact bytes
//! `SAMLRequest=..&RelayState=..&SigAlg=..`, so the query must be rebuilt
//! with the same escaping the sender used.

use base64::Engine;
use samlkit_crypto::{signature, DigestAlgorithm, X509};

use crate::bindings::SamlMessageType;
use crate::error::SamlResult;

/// Escapes a value for a query string.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) stay as they are, space
/// becomes `+` and every other byte is percent-encoded with uppercase hex.
#[must_use]
pub fn escape(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Reverses [`escape`]: `+` becomes space and percent escapes are decoded.
///
/// Invalid escapes are kept literally; invalid UTF-8 is replaced.
#[must_use]
pub fn unescape(value: &str) -> String {
    let value = value.replace('+', " ");
    let bytes = urlencoding::decode_binary(value.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Builds the signed portion of a redirect query from decoded values.
#[must_use]
pub fn build_query(
    message_type: SamlMessageType,
    data: &str,
    relay_state: Option<&str>,
    sig_alg: &str,
) -> String {
    build_query_from_raw_parts(
        message_type,
        &escape(data),
        relay_state.map(escape).as_deref(),
        &escape(sig_alg),
    )
}

/// Builds the signed portion of a redirect query from values exactly as
/// they appeared on the wire.
#[must_use]
pub fn build_query_from_raw_parts(
    message_type: SamlMessageType,
    raw_data: &str,
    raw_relay_state: Option<&str>,
    raw_sig_alg: &str,
) -> String {
    let mut query = format!("{}={raw_data}", message_type.form_param());
    if let Some(relay_state) = raw_relay_state {
        query.push_str("&RelayState=");
        query.push_str(relay_state);
    }
    query.push_str("&SigAlg=");
    query.push_str(raw_sig_alg);
    query
}

/// Verifies a redirect binding signature.
///
/// The digest is derived from the `SigAlg` URI, defaulting to SHA-1 for an
/// unrecognised value. A signature that does not match yields `Ok(false)`.
///
/// # Errors
///
/// Returns an error if the certificate has no usable public key. A
/// signature that is not base64 does not verify.
pub fn verify_signature(
    cert: &X509,
    sig_alg: &str,
    signature_b64: &str,
    query: &str,
) -> SamlResult<bool> {
    let compact: String = signature_b64.chars().filter(|c| !c.is_whitespace()).collect();
    let Ok(signature) = base64::engine::general_purpose::STANDARD.decode(compact) else {
        tracing::debug!("redirect signature is not base64");
        return Ok(false);
    };
    let digest = DigestAlgorithm::from_identifier(sig_alg);
    Ok(signature::verify(cert, digest, &signature, query.as_bytes())?)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use samlkit_crypto::x509::generate_self_signed;

    use super::*;

    const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

    #[test]
    fn escape_matches_form_encoding() {
        assert_eq!(escape("a b+c/d=e"), "a+b%2Bc%2Fd%3De");
        assert_eq!(escape("-_.~"), "-_.~");
        assert_eq!(
            escape(RSA_SHA256),
            "http%3A%2F%2Fwww.w3.org%2F2001%2F04%2Fxmldsig-more%23rsa-sha256"
        );
    }

    #[test]
    fn unescape_reverses_escape() {
        for value in ["a b+c/d=e", "caf\u{e9}", RSA_SHA256, ""] {
            assert_eq!(unescape(&escape(value)), value);
        }
        assert_eq!(unescape("%zz"), "%zz");
    }

    #[test]
    fn query_layout() {
        assert_eq!(
            build_query(SamlMessageType::Request, "abc=", Some("a b"), "alg"),
            "SAMLRequest=abc%3D&RelayState=a+b&SigAlg=alg"
        );
        assert_eq!(
            build_query(SamlMessageType::Response, "abc", None, "alg"),
            "SAMLResponse=abc&SigAlg=alg"
        );
        assert_eq!(
            build_query_from_raw_parts(SamlMessageType::Request, "a%2b", Some(""), "x"),
            "SAMLRequest=a%2b&RelayState=&SigAlg=x"
        );
    }

    #[test]
    fn verifies_query_signature() {
        let now = Utc::now();
        let (key, cert) =
            generate_self_signed("idp", 1024, now - Duration::days(1), now + Duration::days(1))
                .unwrap();
        let query = build_query(SamlMessageType::Request, "PHNhbWw+", Some("r"), RSA_SHA256);
        let signed =
            samlkit_crypto::signature::sign(&key, DigestAlgorithm::Sha256, query.as_bytes())
                .unwrap();
        let signed = base64::engine::general_purpose::STANDARD.encode(signed);

        assert!(verify_signature(&cert, RSA_SHA256, &signed, &query).unwrap());
        assert!(!verify_signature(&cert, RSA_SHA256, &signed, &format!("{query}x")).unwrap());
        assert!(!verify_signature(&cert, RSA_SHA256, "not base64!", &query).unwrap());
        assert!(!verify_signature(&cert, RSA_SHA256, "!!!", &query).unwrap());
    }
}
