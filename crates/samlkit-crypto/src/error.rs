//! Error types for cryptographic operations.

use openssl::error::ErrorStack;
use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Cryptographic errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// Algorithm URI is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The private key could not unwrap the transported symmetric key.
    ///
    /// This is the error a caller holding several candidate keys expects
    /// when it tries the wrong one.
    #[error("key transport decryption failed: {0}")]
    KeyTransport(String),

    /// Block cipher failure (bad key length, truncated input, padding).
    #[error("cipher error: {0}")]
    Cipher(String),

    /// AES-GCM authentication tag did not verify.
    #[error("authentication tag mismatch")]
    AuthenticationTag,

    /// Signature creation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Unclassified OpenSSL failure.
    #[error("openssl error: {0}")]
    OpenSsl(#[from] ErrorStack),
}

impl CryptoError {
    /// Returns true if the error is tied to the private key that was used,
    /// so retrying with another key may succeed.
    #[must_use]
    pub const fn is_key_error(&self) -> bool {
        matches!(self, Self::KeyTransport(_) | Self::InvalidKey(_))
    }
}
