//! Signing, encryption and validation switches.

use samlkit_crypto::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use crate::types::signature_algorithms::RSA_SHA1;

/// Security section of the settings. Every switch is off by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Sign outgoing AuthnRequests.
    pub authn_requests_signed: bool,
    /// Sign outgoing LogoutRequests.
    pub logout_requests_signed: bool,
    /// Sign outgoing LogoutResponses.
    pub logout_responses_signed: bool,
    /// Require signed assertions (advertised in SP metadata).
    pub want_assertions_signed: bool,
    /// Require encrypted assertions (advertised in SP metadata).
    pub want_assertions_encrypted: bool,
    /// Require a NameID in responses.
    pub want_name_id: bool,
    /// Sign generated SP metadata.
    pub metadata_signed: bool,
    /// Sign messages inside the XML. Also makes HTTP-POST the default IdP
    /// binding.
    pub embed_sign: bool,
    /// Reject signatures made with an expired IdP certificate.
    pub check_idp_cert_expiration: bool,
    /// Drop expired SP certificates; fail when none is left.
    pub check_sp_cert_expiration: bool,
    /// Require the audience to be present and to match.
    pub strict_audience_validation: bool,
    /// Re-escape missing raw query values with lowercase percent escapes.
    pub lowercase_url_encoding: bool,
    /// Digest method URI for embedded signatures.
    pub digest_method: String,
    /// Signature method URI for embedded and query signatures.
    pub signature_method: String,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            authn_requests_signed: false,
            logout_requests_signed: false,
            logout_responses_signed: false,
            want_assertions_signed: false,
            want_assertions_encrypted: false,
            want_name_id: false,
            metadata_signed: false,
            embed_sign: false,
            check_idp_cert_expiration: false,
            check_sp_cert_expiration: false,
            strict_audience_validation: false,
            lowercase_url_encoding: false,
            digest_method: DigestAlgorithm::Sha1.uri().to_string(),
            signature_method: RSA_SHA1.to_string(),
        }
    }
}
