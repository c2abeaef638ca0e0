//! Common test utilities and fixtures.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use samlkit_crypto::keys::private_key_pem;
use samlkit_crypto::x509::{format_cert, generate_self_signed, to_base64};
use samlkit_crypto::{cipher, BlockCipherAlgorithm, KeyTransportAlgorithm, PKey, Private, X509};
use samlkit_protocol::types::{XMLDSIG_NS, XMLENC_NS};
use samlkit_protocol::{SecuritySettings, Settings};

pub const IDP_ENTITY_ID: &str = "https://idp.example.com/metadata";
pub const SP_ENTITY_ID: &str = "https://sp.example.com/metadata";
pub const SP_SLS_URL: &str = "https://sp.example.com/sls";
pub const IDP_SLO_URL: &str = "https://idp.example.com/slo";

/// A party's key and self-signed certificate.
pub struct Party {
    pub key: PKey<Private>,
    pub cert: X509,
    pub key_pem: String,
    pub cert_pem: String,
}

impl Party {
    /// Generates keys valid from yesterday for `days`.
    pub fn new(common_name: &str, days: i64) -> anyhow::Result<Self> {
        let now = Utc::now();
        let (key, cert) =
            generate_self_signed(common_name, 2048, now - Duration::days(1), now + Duration::days(days))?;
        let key_pem = String::from_utf8(private_key_pem(&key)?)?;
        let cert_pem = format_cert(&to_base64(&cert)?);
        Ok(Self {
            key,
            cert,
            key_pem,
            cert_pem,
        })
    }

    /// Base64 DER of the certificate, as metadata carries it.
    pub fn cert_base64(&self) -> anyhow::Result<String> {
        Ok(to_base64(&self.cert)?)
    }
}

/// Installs a test subscriber once; `RUST_LOG` controls the output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// SP settings trusting `idp` for signatures.
pub fn sp_settings(idp: Option<&Party>) -> Settings {
    Settings {
        idp_entity_id: Some(IDP_ENTITY_ID.to_string()),
        idp_sso_service_url: Some("https://idp.example.com/sso".to_string()),
        idp_slo_service_url: Some(IDP_SLO_URL.to_string()),
        idp_cert: idp.map(|p| p.cert_pem.clone()),
        sp_entity_id: Some(SP_ENTITY_ID.to_string()),
        assertion_consumer_service_url: Some("https://sp.example.com/acs".to_string()),
        single_logout_service_url: Some(SP_SLS_URL.to_string()),
        ..Settings::default()
    }
}

/// Settings for the IdP side: the builders sign with `idp` and address the
/// SP's logout endpoint.
pub fn idp_side_settings(idp: &Party, security: SecuritySettings) -> Settings {
    Settings {
        idp_slo_service_url: Some(SP_SLS_URL.to_string()),
        sp_entity_id: Some(IDP_ENTITY_ID.to_string()),
        certificate: Some(idp.cert_pem.clone()),
        private_key: Some(idp.key_pem.clone()),
        security,
        ..Settings::default()
    }
}

/// An `saml:EncryptedID` holding `name_id` for `recipient`, with an inline
/// RSA-OAEP transported key.
pub fn encrypted_id(
    recipient: &X509,
    name_id: &str,
    block: BlockCipherAlgorithm,
) -> anyhow::Result<String> {
    let transport = KeyTransportAlgorithm::RsaOaepMgf1p;
    let plaintext = format!(
        r#"<saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">{name_id}</saml:NameID>"#
    );
    let symmetric = cipher::generate_key(block)?;
    let payload = STANDARD.encode(cipher::encrypt(block, &symmetric, plaintext.as_bytes())?);
    let wrapped = STANDARD.encode(cipher::wrap_key(recipient, transport, &symmetric)?);
    Ok(format!(
        concat!(
            r#"<saml:EncryptedID><xenc:EncryptedData xmlns:xenc="{xenc}" Type="http://www.w3.org/2001/04/xmlenc#Element">"#,
            r#"<xenc:EncryptionMethod Algorithm="{block}"/>"#,
            r#"<ds:KeyInfo xmlns:ds="{ds}"><xenc:EncryptedKey><xenc:EncryptionMethod Algorithm="{transport}"/>"#,
            r#"<xenc:CipherData><xenc:CipherValue>{wrapped}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedKey></ds:KeyInfo>"#,
            r#"<xenc:CipherData><xenc:CipherValue>{payload}</xenc:CipherValue></xenc:CipherData>"#,
            r#"</xenc:EncryptedData></saml:EncryptedID>"#
        ),
        xenc = XMLENC_NS,
        ds = XMLDSIG_NS,
        block = block.uri(),
        transport = transport.uri(),
        wrapped = wrapped,
        payload = payload,
    ))
}

/// A `LogoutRequest` from the IdP with the given subject element.
pub fn logout_request_xml(subject: &str) -> String {
    format!(
        concat!(
            r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" "#,
            r#"ID="_idp_logout_1" Version="2.0" IssueInstant="2024-06-01T12:00:00Z" Destination="{sls}">"#,
            r#"<saml:Issuer>{issuer}</saml:Issuer>{subject}<samlp:SessionIndex>_session_1</samlp:SessionIndex>"#,
            r#"</samlp:LogoutRequest>"#
        ),
        sls = SP_SLS_URL,
        issuer = IDP_ENTITY_ID,
        subject = subject,
    )
}
