//! Raw signatures.
//!
//! Signs and verifies byte strings: the canonical query string of the
//! HTTP-Redirect binding, or a canonicalised `SignedInfo` element. The
//! digest is chosen by the caller. Keys are RSA with PKCS#1 v1.5
//! padding, the OpenSSL default.

use openssl::pkey::{PKeyRef, Private};
use openssl::sign::{Signer, Verifier};
use openssl::x509::X509Ref;

use crate::algorithm::DigestAlgorithm;
use crate::error::{CryptoError, CryptoResult};

/// Signs data with a private key.
///
/// # Errors
///
/// Returns [`CryptoError::Signing`] if OpenSSL rejects the key or digest.
pub fn sign(
    key: &PKeyRef<Private>,
    digest: DigestAlgorithm,
    data: &[u8],
) -> CryptoResult<Vec<u8>> {
    let mut signer = Signer::new(digest.message_digest(), key)
        .map_err(|e| CryptoError::Signing(format!("signer creation failed: {e}")))?;
    signer
        .update(data)
        .map_err(|e| CryptoError::Signing(format!("signer update failed: {e}")))?;
    signer
        .sign_to_vec()
        .map_err(|e| CryptoError::Signing(e.to_string()))
}

/// Verifies a signature with the public key of a certificate.
///
/// A signature that does not match yields `Ok(false)`.
///
/// # Errors
///
/// Returns an error only for structural problems such as a certificate
/// whose public key cannot be extracted.
pub fn verify(
    cert: &X509Ref,
    digest: DigestAlgorithm,
    signature: &[u8],
    data: &[u8],
) -> CryptoResult<bool> {
    let public_key = cert
        .public_key()
        .map_err(|e| CryptoError::InvalidCertificate(format!("no public key: {e}")))?;
    let mut verifier = Verifier::new(digest.message_digest(), &public_key)?;
    verifier.update(data)?;
    Ok(verifier.verify(signature).unwrap_or(false))
}
