//! Certificate and key material.
//!
//! Settings carry PEM text. The types here hold that text as configured and
//! the parsed pairs resolved from it.

use samlkit_crypto::{PKey, Private, X509};
use serde::{Deserialize, Serialize};

/// IdP certificates per usage, as PEM text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpCertMulti {
    /// Certificates that may sign IdP messages.
    pub signing: Vec<String>,
    /// Certificates the SP may encrypt to.
    pub encryption: Vec<String>,
}

impl IdpCertMulti {
    /// Returns true if neither usage lists a certificate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signing.is_empty() && self.encryption.is_empty()
    }
}

/// Parsed IdP certificates per usage.
#[derive(Debug, Clone, Default)]
pub struct IdpCerts {
    /// Signing certificates.
    pub signing: Vec<X509>,
    /// Encryption certificates.
    pub encryption: Vec<X509>,
}

/// One configured SP certificate with its private key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpCertEntry {
    /// Certificate PEM.
    #[serde(alias = "cert")]
    pub certificate: String,
    /// Private key PEM.
    #[serde(alias = "key")]
    pub private_key: String,
}

/// SP certificate and key pairs per usage, as PEM text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpCertMulti {
    /// Pairs used to sign outgoing messages. The first active one signs.
    pub signing: Vec<SpCertEntry>,
    /// Pairs used to decrypt incoming messages. Every key is tried.
    pub encryption: Vec<SpCertEntry>,
}

impl SpCertMulti {
    /// Returns true if neither usage lists a pair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signing.is_empty() && self.encryption.is_empty()
    }
}

/// A parsed SP certificate and private key.
///
/// Single-certificate configurations may leave either side unset.
#[derive(Debug, Clone)]
pub struct CertKeyPair {
    /// The certificate.
    pub cert: Option<X509>,
    /// The private key.
    pub key: Option<PKey<Private>>,
}

/// Parsed SP pairs per usage.
#[derive(Debug, Clone, Default)]
pub struct SpCerts {
    /// Signing pairs, in configuration order.
    pub signing: Vec<CertKeyPair>,
    /// Encryption pairs, in configuration order.
    pub encryption: Vec<CertKeyPair>,
}
