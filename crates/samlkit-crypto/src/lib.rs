//! # samlkit-crypto
//!
//! Cryptographic primitives for SAML 2.0 messages, built on OpenSSL.
//!
//! ## Contents
//!
//! - [`x509`]: PEM normalisation, certificate parsing, validity checks and
//!   fingerprints
//! - [`keys`]: private key normalisation and parsing
//! - [`signature`]: RSA signatures over raw bytes (redirect binding
//!   query strings, canonical `SignedInfo`)
//! - [`cipher`]: XML Encryption key transport (RSA-1.5, RSA-OAEP) and block
//!   ciphers (3DES-CBC, AES-CBC, AES-GCM)
//! - [`hash`]: message digests
//!
//! Algorithm identifiers are the W3C XML-DSig / XML-Enc URIs, see
//! [`algorithm`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod cipher;
pub mod error;
pub mod hash;
pub mod keys;
pub mod signature;
pub mod x509;

pub use algorithm::{BlockCipherAlgorithm, DigestAlgorithm, KeyTransportAlgorithm};
pub use error::{CryptoError, CryptoResult};
pub use keys::{build_private_key_object, format_private_key};
pub use x509::{build_cert_object, format_cert, is_cert_active, is_cert_expired};

/// Re-exported so downstream crates name key and certificate types without
/// depending on `openssl` directly.
pub use openssl::pkey::{PKey, Private, Public};
pub use openssl::x509::X509;
