//! Key material for unit tests.

use chrono::{Duration, Utc};
use samlkit_crypto::x509::generate_self_signed;
use samlkit_crypto::{PKey, Private, X509};

/// A generated key with its self-signed certificate.
pub(crate) struct TestKeys {
    pub key: PKey<Private>,
    pub cert: X509,
    pub key_pem: String,
    pub cert_pem: String,
}

fn generate(common_name: &str, from: Duration, to: Duration) -> TestKeys {
    let now = Utc::now();
    let (key, cert) = generate_self_signed(common_name, 2048, now + from, now + to)
        .expect("test key generation");
    let key_pem = String::from_utf8(key.private_key_to_pem_pkcs8().expect("key pem"))
        .expect("pem is ascii");
    let cert_pem = String::from_utf8(cert.to_pem().expect("cert pem")).expect("pem is ascii");
    TestKeys {
        key,
        cert,
        key_pem,
        cert_pem,
    }
}

/// Keys whose certificate is valid today.
pub(crate) fn keys(common_name: &str) -> TestKeys {
    generate(common_name, Duration::days(-1), Duration::days(30))
}

/// Keys whose certificate expired yesterday.
pub(crate) fn expired_keys(common_name: &str) -> TestKeys {
    generate(common_name, Duration::days(-30), Duration::days(-1))
}

/// Encrypts `plaintext` for `cert` as an `saml:EncryptedID` with an inline
/// RSA-OAEP transported AES-128-CBC key. The `saml` prefix is left to the
/// enclosing document.
pub(crate) fn encrypted_id(cert: &X509, plaintext: &str) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use samlkit_crypto::{cipher, BlockCipherAlgorithm, KeyTransportAlgorithm};

    use crate::types::{XMLDSIG_NS, XMLENC_NS};

    let block = BlockCipherAlgorithm::Aes128Cbc;
    let transport = KeyTransportAlgorithm::RsaOaepMgf1p;
    let symmetric = cipher::generate_key(block).expect("symmetric key");
    let payload = STANDARD.encode(
        cipher::encrypt(block, &symmetric, plaintext.as_bytes()).expect("encryption"),
    );
    let wrapped = STANDARD.encode(cipher::wrap_key(cert, transport, &symmetric).expect("key wrap"));
    format!(
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
    )
}
