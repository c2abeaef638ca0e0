//! XML Encryption primitives.
//!
//! An `EncryptedData` element carries a payload encrypted with a random
//! symmetric key, and that key wrapped with the recipient's RSA public key.
//! [`unwrap_key`] recovers the symmetric key, [`decrypt`] the payload.
//!
//! Payload layout follows XML-Enc: `IV || ciphertext` for CBC modes and
//! `IV || ciphertext || tag` for GCM, where the tag is 16 bytes.

use openssl::pkey::{PKeyRef, Private};
use openssl::rand::rand_bytes;
use openssl::rsa::Padding;
use openssl::symm::{self, Crypter, Mode};
use openssl::x509::X509Ref;

use crate::algorithm::{BlockCipherAlgorithm, KeyTransportAlgorithm};
use crate::error::{CryptoError, CryptoResult};

const fn padding(algorithm: KeyTransportAlgorithm) -> Padding {
    match algorithm {
        KeyTransportAlgorithm::Rsa15 => Padding::PKCS1,
        KeyTransportAlgorithm::RsaOaepMgf1p | KeyTransportAlgorithm::RsaOaep => Padding::PKCS1_OAEP,
    }
}

/// Unwraps a transported symmetric key with an RSA private key.
///
/// # Errors
///
/// Returns [`CryptoError::KeyTransport`] when the key is not RSA or does
/// not match the wrapped key; callers holding several keys retry on it.
pub fn unwrap_key(
    key: &PKeyRef<Private>,
    algorithm: KeyTransportAlgorithm,
    wrapped: &[u8],
) -> CryptoResult<Vec<u8>> {
    let rsa = key
        .rsa()
        .map_err(|e| CryptoError::KeyTransport(format!("not an RSA key: {e}")))?;
    let mut decrypted = vec![0; rsa.size() as usize];
    let len = rsa
        .private_decrypt(wrapped, &mut decrypted, padding(algorithm))
        .map_err(|e| CryptoError::KeyTransport(e.to_string()))?;
    decrypted.truncate(len);
    Ok(decrypted)
}

/// Wraps a symmetric key for the holder of the certificate's private key.
///
/// # Errors
///
/// Returns an error if the certificate does not carry an RSA key.
pub fn wrap_key(
    cert: &X509Ref,
    algorithm: KeyTransportAlgorithm,
    symmetric_key: &[u8],
) -> CryptoResult<Vec<u8>> {
    let rsa = cert.public_key()?.rsa()?;
    let mut wrapped = vec![0; rsa.size() as usize];
    let len = rsa.public_encrypt(symmetric_key, &mut wrapped, padding(algorithm))?;
    wrapped.truncate(len);
    Ok(wrapped)
}

/// Decrypts an XML-Enc payload.
///
/// CBC modes take the IV from the first block and strip XML-Enc padding
/// (the last byte gives the pad length). GCM modes verify the trailing
/// authentication tag and fail with [`CryptoError::AuthenticationTag`]
/// when it does not match.
///
/// # Errors
///
/// Returns [`CryptoError::Cipher`] for a wrong key length or truncated
/// input.
pub fn decrypt(
    algorithm: BlockCipherAlgorithm,
    key: &[u8],
    payload: &[u8],
) -> CryptoResult<Vec<u8>> {
    if key.len() != algorithm.key_len() {
        return Err(CryptoError::Cipher(format!(
            "{} needs a {} byte key, got {}",
            algorithm.uri(),
            algorithm.key_len(),
            key.len()
        )));
    }

    let iv_len = algorithm.iv_len();
    let tag_len = if algorithm.is_gcm() {
        BlockCipherAlgorithm::GCM_TAG_LEN
    } else {
        0
    };
    if payload.len() < iv_len + tag_len {
        return Err(CryptoError::Cipher(format!(
            "payload of {} bytes is too short",
            payload.len()
        )));
    }

    let (iv, rest) = payload.split_at(iv_len);
    if algorithm.is_gcm() {
        let (data, tag) = rest.split_at(rest.len() - tag_len);
        return symm::decrypt_aead(algorithm.cipher(), key, Some(iv), &[], data, tag)
            .map_err(|_| CryptoError::AuthenticationTag);
    }

    let cipher = algorithm.cipher();
    let mut crypter = Crypter::new(cipher, Mode::Decrypt, key, Some(iv))
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    crypter.pad(false);
    let mut plaintext = vec![0; rest.len() + cipher.block_size()];
    let mut count = crypter
        .update(rest, &mut plaintext)
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    count += crypter
        .finalize(&mut plaintext[count..])
        .map_err(|e| CryptoError::Cipher(e.to_string()))?;
    plaintext.truncate(count);

    strip_padding(&mut plaintext, cipher.block_size());
    Ok(plaintext)
}

/// Removes XML-Enc block padding. Malformed padding is left in place.
fn strip_padding(plaintext: &mut Vec<u8>, block_size: usize) {
    if let Some(&last) = plaintext.last() {
        let pad = usize::from(last);
        if (1..=block_size).contains(&pad) && pad <= plaintext.len() {
            plaintext.truncate(plaintext.len() - pad);
        }
    }
}

/// Encrypts a payload in XML-Enc layout with a fresh random IV.
///
/// # Errors
///
/// Returns [`CryptoError::Cipher`] for a wrong key length.
pub fn encrypt(
    algorithm: BlockCipherAlgorithm,
    key: &[u8],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    if key.len() != algorithm.key_len() {
        return Err(CryptoError::Cipher(format!(
            "{} needs a {} byte key, got {}",
            algorithm.uri(),
            algorithm.key_len(),
            key.len()
        )));
    }

    let mut iv = vec![0; algorithm.iv_len()];
    rand_bytes(&mut iv)?;

    let mut payload = iv.clone();
    if algorithm.is_gcm() {
        let mut tag = vec![0; BlockCipherAlgorithm::GCM_TAG_LEN];
        let ciphertext =
            symm::encrypt_aead(algorithm.cipher(), key, Some(&iv), &[], plaintext, &mut tag)?;
        payload.extend_from_slice(&ciphertext);
        payload.extend_from_slice(&tag);
    } else {
        payload.extend_from_slice(&symm::encrypt(algorithm.cipher(), key, Some(&iv), plaintext)?);
    }
    Ok(payload)
}

/// Generates a random symmetric key of the right size for the algorithm.
///
/// # Errors
///
/// Returns an error if the random generator fails.
pub fn generate_key(algorithm: BlockCipherAlgorithm) -> CryptoResult<Vec<u8>> {
    let mut key = vec![0; algorithm.key_len()];
    rand_bytes(&mut key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::x509::generate_self_signed;

    const ALL_CIPHERS: [BlockCipherAlgorithm; 7] = [
        BlockCipherAlgorithm::TripleDesCbc,
        BlockCipherAlgorithm::Aes128Cbc,
        BlockCipherAlgorithm::Aes192Cbc,
        BlockCipherAlgorithm::Aes256Cbc,
        BlockCipherAlgorithm::Aes128Gcm,
        BlockCipherAlgorithm::Aes192Gcm,
        BlockCipherAlgorithm::Aes256Gcm,
    ];

    #[test]
    fn every_cipher_decrypts_its_own_output() {
        let plaintext = b"<saml:NameID>user@example.com</saml:NameID>";
        for algorithm in ALL_CIPHERS {
            let key = generate_key(algorithm).unwrap();
            let payload = encrypt(algorithm, &key, plaintext).unwrap();
            assert_eq!(decrypt(algorithm, &key, &payload).unwrap(), plaintext, "{algorithm:?}");
        }
    }

    #[test]
    fn gcm_rejects_tampered_tag() {
        let key = generate_key(BlockCipherAlgorithm::Aes128Gcm).unwrap();
        let mut payload = encrypt(BlockCipherAlgorithm::Aes128Gcm, &key, b"secret").unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0xff;

        let err = decrypt(BlockCipherAlgorithm::Aes128Gcm, &key, &payload).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationTag));
    }

    #[test]
    fn gcm_rejects_tampered_ciphertext() {
        let key = generate_key(BlockCipherAlgorithm::Aes256Gcm).unwrap();
        let mut payload = encrypt(BlockCipherAlgorithm::Aes256Gcm, &key, b"secret data").unwrap();
        payload[13] ^= 0x01;

        assert!(decrypt(BlockCipherAlgorithm::Aes256Gcm, &key, &payload).is_err());
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let err = decrypt(BlockCipherAlgorithm::Aes256Cbc, &[0; 16], &[0; 32]).unwrap_err();
        assert!(matches!(err, CryptoError::Cipher(_)));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let key = generate_key(BlockCipherAlgorithm::Aes128Gcm).unwrap();
        assert!(decrypt(BlockCipherAlgorithm::Aes128Gcm, &key, &[0; 20]).is_err());
    }

    #[test]
    fn key_transport_round_trip_and_wrong_key() {
        let now = Utc::now();
        let window = (now - Duration::days(1), now + Duration::days(1));
        let (key, cert) = generate_self_signed("recipient", 1024, window.0, window.1).unwrap();
        let (other_key, _) = generate_self_signed("other", 1024, window.0, window.1).unwrap();
        let symmetric = generate_key(BlockCipherAlgorithm::Aes128Cbc).unwrap();

        for algorithm in [
            KeyTransportAlgorithm::Rsa15,
            KeyTransportAlgorithm::RsaOaepMgf1p,
            KeyTransportAlgorithm::RsaOaep,
        ] {
            let wrapped = wrap_key(&cert, algorithm, &symmetric).unwrap();
            assert_eq!(unwrap_key(&key, algorithm, &wrapped).unwrap(), symmetric);
        }

        let wrapped = wrap_key(&cert, KeyTransportAlgorithm::RsaOaepMgf1p, &symmetric).unwrap();
        let err = unwrap_key(&other_key, KeyTransportAlgorithm::RsaOaepMgf1p, &wrapped).unwrap_err();
        assert!(err.is_key_error());
    }

    #[test]
    fn padding_is_stripped_only_when_well_formed() {
        let mut padded = b"abc\x03\x03\x03".to_vec();
        strip_padding(&mut padded, 16);
        assert_eq!(padded, b"abc");

        let mut odd = b"abc\x20".to_vec();
        strip_padding(&mut odd, 16);
        assert_eq!(odd, b"abc\x20");
    }
}
