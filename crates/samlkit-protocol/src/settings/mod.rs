//! Toolkit settings.
//!
//! One [`Settings`] value describes a single SP/IdP pairing: endpoints,
//! trust material and security switches. It loads from TOML with every
//! field optional, and message builders and validators only read it.
//!
//! ```toml
//! idp_entity_id = "https://idp.example.com/metadata"
//! idp_sso_service_url = "https://idp.example.com/sso"
//! idp_slo_service_binding = "redirect"
//! sp_entity_id = "https://sp.example.com/metadata"
//!
//! [security]
//! authn_requests_signed = true
//! ```

mod certs;
mod security;

use std::path::Path;

use samlkit_crypto::{
    build_cert_object, build_private_key_object, is_cert_active, keys::private_key_pem,
    x509::fingerprint, DigestAlgorithm, PKey, Private, X509,
};
use serde::{Deserialize, Deserializer, Serialize};

pub use certs::{CertKeyPair, IdpCertMulti, IdpCerts, SpCertEntry, SpCertMulti, SpCerts};
pub use security::SecuritySettings;

use crate::error::{SamlError, SamlResult};
use crate::message::DEFAULT_MESSAGE_MAX_BYTESIZE;
use crate::types::{AuthnContextComparison, SamlBinding};
use crate::xml::Quote;

/// Settings for one SP/IdP pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // IdP
    /// IdP entity ID, compared with the `Issuer` of incoming messages.
    pub idp_entity_id: Option<String>,
    /// IdP single sign-on endpoint.
    pub idp_sso_service_url: Option<String>,
    /// Binding of the SSO endpoint. See [`Settings::idp_sso_service_binding`].
    #[serde(deserialize_with = "deserialize_optional_binding")]
    pub idp_sso_service_binding: Option<String>,
    /// IdP single logout endpoint.
    pub idp_slo_service_url: Option<String>,
    /// Binding of the SLO endpoint. See [`Settings::idp_slo_service_binding`].
    #[serde(deserialize_with = "deserialize_optional_binding")]
    pub idp_slo_service_binding: Option<String>,
    /// Where logout responses go when it differs from the SLO endpoint.
    pub idp_slo_response_service_url: Option<String>,
    /// IdP certificate PEM.
    pub idp_cert: Option<String>,
    /// IdP certificate fingerprint, `AB:CD:...`.
    pub idp_cert_fingerprint: Option<String>,
    /// Digest for [`Settings::get_fingerprint`].
    pub idp_cert_fingerprint_algorithm: String,
    /// IdP certificates per usage. When it lists signing certificates,
    /// `idp_cert` is not used for signature checks.
    pub idp_cert_multi: Option<IdpCertMulti>,
    /// Attribute names the IdP publishes.
    pub idp_attribute_names: Vec<String>,
    /// NameQualifier the IdP uses.
    pub idp_name_qualifier: Option<String>,
    /// Metadata `validUntil`.
    pub valid_until: Option<String>,
    /// Metadata `cacheDuration`.
    pub cache_duration: Option<String>,

    // SP
    /// SP entity ID, sent as `Issuer`.
    pub sp_entity_id: Option<String>,
    /// Where the IdP posts assertions.
    pub assertion_consumer_service_url: Option<String>,
    /// Binding of the ACS endpoint.
    #[serde(deserialize_with = "deserialize_binding")]
    pub assertion_consumer_service_binding: String,
    /// SP single logout endpoint.
    pub single_logout_service_url: Option<String>,
    /// Binding of the SP SLO endpoint.
    #[serde(deserialize_with = "deserialize_binding")]
    pub single_logout_service_binding: String,
    /// SPNameQualifier sent with the NameID.
    pub sp_name_qualifier: Option<String>,
    /// NameID format requested and sent.
    pub name_identifier_format: Option<String>,
    /// NameID sent in logout requests.
    pub name_identifier_value: Option<String>,
    /// NameID sent as `Subject` in authentication requests.
    pub name_identifier_value_requested: Option<String>,
    /// Session index sent in logout requests.
    pub sessionindex: Option<String>,

    // Messages
    /// Deflate requests sent over HTTP-Redirect.
    pub compress_request: bool,
    /// Deflate responses sent over HTTP-Redirect.
    pub compress_response: bool,
    /// Write attribute values in double quotes.
    pub double_quote_xml_attribute_values: bool,
    /// Largest accepted message, encoded or decoded.
    pub message_max_bytesize: usize,
    /// `IsPassive` of authentication requests.
    pub passive: Option<bool>,
    /// `ForceAuthn` of authentication requests.
    pub force_authn: Option<bool>,
    /// `ProtocolBinding` of authentication requests.
    pub protocol_binding: Option<String>,
    /// `AttributeConsumingServiceIndex` of authentication requests.
    pub attributes_index: Option<u16>,
    /// Requested `AuthnContextClassRef` values. A single string is accepted.
    #[serde(deserialize_with = "string_or_seq")]
    pub authn_context: Vec<String>,
    /// Comparison of the requested authentication context.
    pub authn_context_comparison: Option<AuthnContextComparison>,
    /// Requested `AuthnContextDeclRef` values. A single string is accepted.
    #[serde(deserialize_with = "string_or_seq")]
    pub authn_context_decl_ref: Vec<String>,

    // SP keys
    /// SP certificate PEM.
    pub certificate: Option<String>,
    /// Next SP certificate during a rollover; shares `private_key`.
    pub certificate_new: Option<String>,
    /// SP private key PEM.
    pub private_key: Option<String>,
    /// SP pairs per usage. Cannot be combined with the three fields above.
    pub sp_cert_multi: Option<SpCertMulti>,

    /// Security switches.
    pub security: SecuritySettings,
    /// Return `false` from validators instead of failing with an error.
    pub soft: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            idp_entity_id: None,
            idp_sso_service_url: None,
            idp_sso_service_binding: None,
            idp_slo_service_url: None,
            idp_slo_service_binding: None,
            idp_slo_response_service_url: None,
            idp_cert: None,
            idp_cert_fingerprint: None,
            idp_cert_fingerprint_algorithm: DigestAlgorithm::Sha1.uri().to_string(),
            idp_cert_multi: None,
            idp_attribute_names: Vec::new(),
            idp_name_qualifier: None,
            valid_until: None,
            cache_duration: None,
            sp_entity_id: None,
            assertion_consumer_service_url: None,
            assertion_consumer_service_binding: SamlBinding::HttpPost.uri().to_string(),
            single_logout_service_url: None,
            single_logout_service_binding: SamlBinding::HttpRedirect.uri().to_string(),
            sp_name_qualifier: None,
            name_identifier_format: None,
            name_identifier_value: None,
            name_identifier_value_requested: None,
            sessionindex: None,
            compress_request: true,
            compress_response: true,
            double_quote_xml_attribute_values: false,
            message_max_bytesize: DEFAULT_MESSAGE_MAX_BYTESIZE,
            passive: None,
            force_authn: None,
            protocol_binding: None,
            attributes_index: None,
            authn_context: Vec::new(),
            authn_context_comparison: None,
            authn_context_decl_ref: Vec::new(),
            certificate: None,
            certificate_new: None,
            private_key: None,
            sp_cert_multi: None,
            security: SecuritySettings::default(),
            soft: true,
        }
    }
}

impl Settings {
    /// Parses settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] for malformed TOML or values of the
    /// wrong shape.
    pub fn from_toml_str(toml: &str) -> SamlResult<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> SamlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SamlError::Setting(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Quote style for generated XML.
    #[must_use]
    pub const fn quote(&self) -> Quote {
        Quote::from_setting(self.double_quote_xml_attribute_values)
    }

    /// Binding of the IdP SSO endpoint: the configured one, else HTTP-POST
    /// with `embed_sign` and HTTP-Redirect without.
    #[must_use]
    pub fn idp_sso_service_binding(&self) -> &str {
        self.idp_sso_service_binding
            .as_deref()
            .unwrap_or_else(|| self.idp_binding_from_embed_sign())
    }

    /// Binding of the IdP SLO endpoint, defaulted like
    /// [`Settings::idp_sso_service_binding`].
    #[must_use]
    pub fn idp_slo_service_binding(&self) -> &str {
        self.idp_slo_service_binding
            .as_deref()
            .unwrap_or_else(|| self.idp_binding_from_embed_sign())
    }

    const fn idp_binding_from_embed_sign(&self) -> &'static str {
        if self.security.embed_sign {
            SamlBinding::HttpPost.uri()
        } else {
            SamlBinding::HttpRedirect.uri()
        }
    }

    /// Returns the configured IdP fingerprint, or computes one from
    /// `idp_cert` with `idp_cert_fingerprint_algorithm`.
    ///
    /// # Errors
    ///
    /// Returns an error if `idp_cert` does not parse.
    pub fn get_fingerprint(&self) -> SamlResult<Option<String>> {
        if let Some(fp) = &self.idp_cert_fingerprint {
            return Ok(Some(fp.clone()));
        }
        let Some(cert) = self.get_idp_cert()? else {
            return Ok(None);
        };
        let algorithm = DigestAlgorithm::from_identifier(&self.idp_cert_fingerprint_algorithm);
        Ok(Some(fingerprint(&cert, algorithm)?))
    }

    /// Parses `idp_cert`.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate does not parse.
    pub fn get_idp_cert(&self) -> SamlResult<Option<X509>> {
        Ok(build_cert(self.idp_cert.as_deref())?)
    }

    /// Parses `idp_cert_multi`. An absent or empty map yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if any certificate does not parse.
    pub fn get_idp_cert_multi(&self) -> SamlResult<Option<IdpCerts>> {
        let Some(multi) = self.idp_cert_multi.as_ref().filter(|m| !m.is_empty()) else {
            return Ok(None);
        };
        let parse_all = |pems: &[String]| -> SamlResult<Vec<X509>> {
            let mut certs = Vec::with_capacity(pems.len());
            for pem in pems {
                certs.extend(build_cert_object(pem)?);
            }
            Ok(certs)
        };
        Ok(Some(IdpCerts {
            signing: parse_all(&multi.signing)?,
            encryption: parse_all(&multi.encryption)?,
        }))
    }

    /// Certificates trusted to sign IdP messages: the signing list of
    /// `idp_cert_multi` when it has one, else `idp_cert`.
    ///
    /// # Errors
    ///
    /// Returns an error if a certificate does not parse.
    pub fn idp_signing_certs(&self) -> SamlResult<Vec<X509>> {
        if let Some(multi) = self.get_idp_cert_multi()? {
            if !multi.signing.is_empty() {
                return Ok(multi.signing);
            }
        }
        Ok(self.get_idp_cert()?.into_iter().collect())
    }

    /// Resolves the SP certificate and key pairs per usage.
    ///
    /// With `check_sp_cert_expiration`, pairs whose certificate is not
    /// currently valid are dropped; a usage that had pairs and loses all of
    /// them is a validation error.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] when both `sp_cert_multi` and the
    /// single certificate fields are set, a validation error when every
    /// certificate of a usage has expired, and a crypto error for PEM that
    /// does not parse.
    pub fn get_sp_certs(&self) -> SamlResult<SpCerts> {
        let certs = self.get_all_sp_certs()?;
        if !self.security.check_sp_cert_expiration {
            return Ok(certs);
        }
        Ok(SpCerts {
            signing: active_pairs(certs.signing)?,
            encryption: active_pairs(certs.encryption)?,
        })
    }

    fn get_all_sp_certs(&self) -> SamlResult<SpCerts> {
        self.validate_sp_certs_params()?;
        match self.sp_cert_multi.as_ref().filter(|m| !m.is_empty()) {
            Some(multi) => sp_certs_multi(multi),
            None => self.sp_certs_single(),
        }
    }

    fn validate_sp_certs_params(&self) -> SamlResult<()> {
        let set = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        let multi = self.sp_cert_multi.as_ref().is_some_and(|m| !m.is_empty());
        if multi && (set(&self.certificate) || set(&self.certificate_new) || set(&self.private_key))
        {
            return Err(SamlError::Setting(
                "Cannot specify both sp_cert_multi and certificate, certificate_new, private_key parameters"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn sp_certs_single(&self) -> SamlResult<SpCerts> {
        let mut certs = SpCerts::default();
        let key = build_key(self.private_key.as_deref())?;
        let cert = build_cert(self.certificate.as_deref())?;
        if cert.is_some() || key.is_some() {
            let pair = CertKeyPair { cert, key: key.clone() };
            certs.signing.push(pair.clone());
            certs.encryption.push(pair);
        }
        if let Some(cert_new) = build_cert(self.certificate_new.as_deref())? {
            let pair = CertKeyPair { cert: Some(cert_new), key };
            certs.signing.push(pair.clone());
            certs.encryption.push(pair);
        }
        Ok(certs)
    }

    /// The pair that signs outgoing messages.
    ///
    /// # Errors
    ///
    /// See [`Settings::get_sp_certs`].
    pub fn get_sp_signing_pair(&self) -> SamlResult<Option<CertKeyPair>> {
        Ok(self.get_sp_certs()?.signing.into_iter().next())
    }

    /// The certificate of the signing pair.
    ///
    /// # Errors
    ///
    /// See [`Settings::get_sp_certs`].
    pub fn get_sp_cert(&self) -> SamlResult<Option<X509>> {
        Ok(self.get_sp_signing_pair()?.and_then(|pair| pair.cert))
    }

    /// The private key of the signing pair.
    ///
    /// # Errors
    ///
    /// See [`Settings::get_sp_certs`].
    pub fn get_sp_signing_key(&self) -> SamlResult<Option<PKey<Private>>> {
        Ok(self.get_sp_signing_pair()?.and_then(|pair| pair.key))
    }

    /// Every distinct private key of the encryption pairs, in order.
    ///
    /// # Errors
    ///
    /// See [`Settings::get_sp_certs`].
    pub fn get_sp_decryption_keys(&self) -> SamlResult<Vec<PKey<Private>>> {
        let mut seen = Vec::new();
        let mut keys = Vec::new();
        for key in self.get_sp_certs()?.encryption.into_iter().filter_map(|p| p.key) {
            let pem = private_key_pem(&key)?;
            if !seen.contains(&pem) {
                seen.push(pem);
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

fn build_cert(pem: Option<&str>) -> SamlResult<Option<X509>> {
    Ok(pem.map(build_cert_object).transpose()?.flatten())
}

fn build_key(pem: Option<&str>) -> SamlResult<Option<PKey<Private>>> {
    Ok(pem.map(build_private_key_object).transpose()?.flatten())
}

fn sp_certs_multi(multi: &SpCertMulti) -> SamlResult<SpCerts> {
    let parse_all = |entries: &[SpCertEntry]| -> SamlResult<Vec<CertKeyPair>> {
        entries
            .iter()
            .map(|entry| -> SamlResult<CertKeyPair> {
                Ok(CertKeyPair {
                    cert: build_cert_object(&entry.certificate)?,
                    key: build_private_key_object(&entry.private_key)?,
                })
            })
            .collect()
    };
    Ok(SpCerts {
        signing: parse_all(&multi.signing)?,
        encryption: parse_all(&multi.encryption)?,
    })
}

fn active_pairs(pairs: Vec<CertKeyPair>) -> SamlResult<Vec<CertKeyPair>> {
    if pairs.is_empty() {
        return Ok(pairs);
    }
    let mut active = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let keep = match &pair.cert {
            Some(cert) => is_cert_active(cert)?,
            None => true,
        };
        if keep {
            active.push(pair);
        } else {
            tracing::warn!("dropping inactive SP certificate");
        }
    }
    if active.is_empty() {
        return Err(SamlError::validation("The SP certificate expired."));
    }
    Ok(active)
}

fn deserialize_binding<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|value| SamlBinding::normalize(&value))
}

fn deserialize_optional_binding<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer)
        .map(|value| value.map(|v| SamlBinding::normalize(&v)))
}

fn string_or_seq<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
