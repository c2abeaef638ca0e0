//! Decryption of `EncryptedID` / `EncryptedData` elements.

use base64::Engine;
use roxmltree::Node;
use samlkit_crypto::cipher;
use samlkit_crypto::{BlockCipherAlgorithm, CryptoError, KeyTransportAlgorithm, PKey, Private};

use crate::error::{SamlError, SamlResult};
use crate::types::constants::{XMLDSIG_NS, XMLENC_NS};
use crate::xml::{child, element_text, is_element};

/// Decrypts with each key in turn and returns the first plaintext.
///
/// A key-specific failure (see [`CryptoError::is_key_error`]) moves on to
/// the next key; once every key has failed the last such failure is
/// returned. Any other error ends the search.
///
/// # Errors
///
/// Returns [`SamlError::Setting`] for an empty key list, the last
/// key-specific [`SamlError::Crypto`] if no key fits, or the first other
/// error.
pub fn decrypt_multi(encrypted: Node<'_, '_>, keys: &[PKey<Private>]) -> SamlResult<String> {
    let mut last_error = None;
    for (index, key) in keys.iter().enumerate() {
        match decrypt_data(encrypted, key) {
            Ok(plaintext) => return Ok(plaintext),
            Err(SamlError::Crypto(err)) if err.is_key_error() => {
                tracing::debug!(key_index = index, error = %err, "decryption key did not fit");
                last_error = Some(SamlError::Crypto(err));
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        SamlError::Setting("no SP private key configured for decryption".to_string())
    }))
}

/// Decrypts an encrypted element with one key.
///
/// `encrypted` is either the `xenc:EncryptedData` element itself or a
/// wrapper such as `saml:EncryptedID` holding it.
///
/// # Errors
///
/// Returns [`SamlError::Crypto`] if the key does not unwrap the
/// transported key or the payload does not decrypt, and structural errors
/// for malformed input.
pub fn decrypt_data(encrypted: Node<'_, '_>, key: &PKey<Private>) -> SamlResult<String> {
    let encrypted_data = if is_element(encrypted, XMLENC_NS, "EncryptedData") {
        encrypted
    } else {
        child(encrypted, XMLENC_NS, "EncryptedData")
            .ok_or_else(|| SamlError::MissingElement("xenc:EncryptedData".to_string()))?
    };

    let symmetric_key = retrieve_symmetric_key(encrypted_data, key)?;
    let uri = encryption_method(encrypted_data)?;
    let algorithm = BlockCipherAlgorithm::from_uri(uri)
        .ok_or_else(|| SamlError::UnsupportedAlgorithm(uri.to_string()))?;
    let payload = cipher_value(encrypted_data)?;

    let plaintext = cipher::decrypt(algorithm, &symmetric_key, &payload)?;
    String::from_utf8(plaintext).map_err(|_| {
        SamlError::Crypto(CryptoError::Cipher(
            "decrypted payload is not UTF-8".to_string(),
        ))
    })
}

fn retrieve_symmetric_key(encrypted_data: Node<'_, '_>, key: &PKey<Private>) -> SamlResult<Vec<u8>> {
    let encrypted_key = find_encrypted_key(encrypted_data)
        .ok_or_else(|| SamlError::MissingElement("xenc:EncryptedKey".to_string()))?;
    let uri = encryption_method(encrypted_key)?;
    let algorithm = KeyTransportAlgorithm::from_uri(uri)
        .ok_or_else(|| SamlError::UnsupportedAlgorithm(uri.to_string()))?;
    let wrapped = cipher_value(encrypted_key)?;
    Ok(cipher::unwrap_key(key, algorithm, &wrapped)?)
}

/// Locates the `EncryptedKey` for an `EncryptedData` element.
///
/// Looked up inline under `KeyInfo` (with or without the dsig namespace),
/// then by the `Id` a `ds:RetrievalMethod` points at, then among the
/// siblings of the `EncryptedData`.
fn find_encrypted_key<'a, 'input>(encrypted_data: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    let key_info = encrypted_data.children().find(|c| {
        c.is_element()
            && c.tag_name().name() == "KeyInfo"
            && matches!(c.tag_name().namespace(), None | Some(XMLDSIG_NS))
    });

    if let Some(key_info) = key_info {
        if let Some(inline) = child(key_info, XMLENC_NS, "EncryptedKey") {
            return Some(inline);
        }
        let target = child(key_info, XMLDSIG_NS, "RetrievalMethod")
            .and_then(|method| method.attribute("URI"))
            .map(|uri| uri.trim_start_matches('#'));
        if let Some(target) = target {
            let referenced = encrypted_data.document().descendants().find(|n| {
                is_element(*n, XMLENC_NS, "EncryptedKey") && n.attribute("Id") == Some(target)
            });
            if referenced.is_some() {
                return referenced;
            }
        }
    }

    encrypted_data
        .parent_element()
        .and_then(|parent| child(parent, XMLENC_NS, "EncryptedKey"))
}

fn encryption_method<'a>(node: Node<'a, '_>) -> SamlResult<&'a str> {
    child(node, XMLENC_NS, "EncryptionMethod")
        .and_then(|method| method.attribute("Algorithm"))
        .ok_or_else(|| SamlError::MissingElement("xenc:EncryptionMethod/@Algorithm".to_string()))
}

fn cipher_value(node: Node<'_, '_>) -> SamlResult<Vec<u8>> {
    let text = child(node, XMLENC_NS, "CipherData")
        .and_then(|data| element_text(child(data, XMLENC_NS, "CipherValue")))
        .ok_or_else(|| SamlError::MissingElement("xenc:CipherValue".to_string()))?;
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}
