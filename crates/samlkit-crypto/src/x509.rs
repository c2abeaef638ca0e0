//! X.509 certificate handling.
//!
//! Certificates arrive from settings files and metadata documents in every
//! shape imaginable: bare base64, PEM with broken line lengths, several PEM
//! blocks glued together. [`format_cert`] normalises all of them.

use std::sync::LazyLock;

use base64::Engine;
use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509Ref, X509};
use regex::Regex;

use crate::algorithm::DigestAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::hash::{colon_hex, hash};

static CERT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)-{5}BEGIN CERTIFICATE-{5}[\n\r]?.*?-{5}END CERTIFICATE-{5}[\n\r]?")
        .expect("certificate block pattern is valid")
});

static CERT_ARMOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-{5}\s?(BEGIN|END) CERTIFICATE\s?-{5}").expect("certificate armor pattern is valid")
});

/// Line width of PEM bodies.
pub(crate) const PEM_LINE_WIDTH: usize = 64;

/// Normalises certificate text into PEM with 64 column lines.
///
/// Input containing several `BEGIN CERTIFICATE` blocks is split and each
/// block is formatted on its own; the results are joined with a newline.
/// Empty input and input with non-ASCII bytes (already binary) are
/// returned unchanged. The function is idempotent.
#[must_use]
pub fn format_cert(cert: &str) -> String {
    if cert.is_empty() || !cert.is_ascii() {
        return cert.to_string();
    }

    if cert.matches("BEGIN CERTIFICATE").count() > 1 {
        return CERT_BLOCK
            .find_iter(cert)
            .map(|block| format_cert(block.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let body = strip_whitespace(&CERT_ARMOR.replace_all(cert, ""));
    armor("CERTIFICATE", &body)
}

/// Removes every whitespace character.
pub(crate) fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Wraps a base64 body at 64 columns between PEM armor lines.
pub(crate) fn armor(label: &str, body: &str) -> String {
    let lines: Vec<&str> = body
        .as_bytes()
        .chunks(PEM_LINE_WIDTH)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect();
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----",
        lines.join("\n")
    )
}

/// Parses a certificate from PEM-ish text.
///
/// Returns `Ok(None)` for empty input; "no certificate configured" is not
/// an error.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidCertificate`] if the text is not a
/// certificate.
pub fn build_cert_object(cert: &str) -> CryptoResult<Option<X509>> {
    if cert.trim().is_empty() {
        return Ok(None);
    }
    X509::from_pem(format_cert(cert).as_bytes())
        .map(Some)
        .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))
}

/// Returns true if the certificate's `notAfter` lies before now.
///
/// # Errors
///
/// Returns an error if the current time cannot be represented as ASN.1.
pub fn is_cert_expired(cert: &X509Ref) -> CryptoResult<bool> {
    is_cert_expired_at(cert, Utc::now())
}

/// Returns true if the certificate's `notAfter` lies before `at`.
///
/// # Errors
///
/// Returns an error if `at` cannot be represented as ASN.1.
pub fn is_cert_expired_at(cert: &X509Ref, at: DateTime<Utc>) -> CryptoResult<bool> {
    let at = Asn1Time::from_unix(at.timestamp())?;
    Ok(cert.not_after() < at)
}

/// Returns true if `notBefore <= now <= notAfter`.
///
/// # Errors
///
/// Returns an error if the current time cannot be represented as ASN.1.
pub fn is_cert_active(cert: &X509Ref) -> CryptoResult<bool> {
    let now = Asn1Time::from_unix(Utc::now().timestamp())?;
    Ok(cert.not_before() <= now && cert.not_after() >= now)
}

/// Computes the certificate fingerprint as `AB:CD:...` over its DER form.
///
/// # Errors
///
/// Returns an error if the certificate cannot be DER encoded.
pub fn fingerprint(cert: &X509Ref, algorithm: DigestAlgorithm) -> CryptoResult<String> {
    let der = cert.to_der()?;
    Ok(colon_hex(&hash(algorithm, &der)?))
}

/// Returns the DER form as a single-line base64 string, the shape used in
/// `ds:X509Certificate` elements.
///
/// # Errors
///
/// Returns an error if the certificate cannot be DER encoded.
pub fn to_base64(cert: &X509Ref) -> CryptoResult<String> {
    Ok(base64::engine::general_purpose::STANDARD.encode(cert.to_der()?))
}

/// Generates an RSA key and a self-signed certificate valid between the
/// two instants.
///
/// # Errors
///
/// Returns an error if key generation or certificate signing fails.
pub fn generate_self_signed(
    common_name: &str,
    bits: u32,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> CryptoResult<(PKey<Private>, X509)> {
    let key = PKey::from_rsa(Rsa::generate(bits)?)?;

    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_text("CN", common_name)?;
    let name = name.build();

    let mut serial = BigNum::new()?;
    serial.rand(127, MsbOption::MAYBE_ZERO, false)?;
    let serial = Asn1Integer::from_bn(&serial)?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_not_before(Asn1Time::from_unix(not_before.timestamp())?.as_ref())?;
    builder.set_not_after(Asn1Time::from_unix(not_after.timestamp())?.as_ref())?;
    builder.set_pubkey(&key)?;
    builder.sign(&key, MessageDigest::sha256())?;

    Ok((key, builder.build()))
}
