//! Enveloped XML signatures.
//!
//! Messages sent over HTTP-POST carry their signature inside the document:
//! a `ds:Signature` child of the root element whose single reference
//! points at the root's `ID`. The reference is digested over the
//! exclusive canonical form of the root with the signature removed, and
//! `SignedInfo` is signed over its own exclusive canonical form.
//!
//! # Signing Algorithms
//!
//! - RSA-SHA1 (the settings default, kept for compatibility)
//! - RSA-SHA256, RSA-SHA384, RSA-SHA512
//!
//! HTTP-Redirect signatures cover the query string instead and live in
//! [`crate::utils::verify_signature`] and the binding encoder.

mod c14n;
mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use roxmltree::{Node, NodeId};
use samlkit_crypto::DigestAlgorithm;

use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::types::{canonicalization_algorithms, signature_algorithms, SamlBinding};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-1.
    #[default]
    RsaSha1,
    /// RSA with SHA-256.
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
        }
    }

    /// Returns the digest the signature is computed with.
    #[must_use]
    pub const fn digest(self) -> DigestAlgorithm {
        match self {
            Self::RsaSha1 => DigestAlgorithm::Sha1,
            Self::RsaSha256 => DigestAlgorithm::Sha256,
            Self::RsaSha384 => DigestAlgorithm::Sha384,
            Self::RsaSha512 => DigestAlgorithm::Sha512,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        [Self::RsaSha1, Self::RsaSha256, Self::RsaSha384, Self::RsaSha512]
            .into_iter()
            .find(|alg| alg.uri() == uri)
    }

    /// Parses a signature algorithm URI, failing for unknown ones.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnsupportedAlgorithm`].
    pub fn require(uri: &str) -> SamlResult<Self> {
        Self::from_uri(uri).ok_or_else(|| SamlError::UnsupportedAlgorithm(uri.to_string()))
    }
}

/// Canonicalization algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments.
    #[default]
    ExclusiveC14N,
    /// Exclusive C14N with comments.
    ExclusiveC14NWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
        }
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::ExclusiveC14N),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveC14NWithComments)
            }
            _ => None,
        }
    }

    /// Canonicalizes the root element of a document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML.
    pub fn canonicalize(self, xml: &str) -> SamlResult<String> {
        let doc = crate::xml::parse(xml)?;
        Ok(self.canonicalize_node(xml, doc.root_element(), None))
    }

    /// Canonicalizes an element of a document parsed from `source`,
    /// leaving out the `exclude` subtree.
    #[must_use]
    pub fn canonicalize_node(
        self,
        source: &str,
        node: Node<'_, '_>,
        exclude: Option<NodeId>,
    ) -> String {
        c14n::canonicalize(
            source,
            node,
            exclude,
            matches!(self, Self::ExclusiveC14NWithComments),
        )
    }
}

/// Settings for signature creation.
#[derive(Debug, Clone, Default)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// The reference digest.
    pub digest: DigestAlgorithm,
    /// The canonicalization algorithm to use.
    pub canonicalization: CanonicalizationAlgorithm,
}

impl SignatureConfig {
    /// Builds a configuration from the `signature_method` and
    /// `digest_method` URIs of the security settings.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnsupportedAlgorithm`] for an unknown
    /// signature method.
    pub fn from_uris(signature_method: &str, digest_method: &str) -> SamlResult<Self> {
        Ok(Self {
            algorithm: SignatureAlgorithm::require(signature_method)?,
            digest: DigestAlgorithm::from_identifier(digest_method),
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14N,
        })
    }
}

/// Embeds a signature in an outgoing message when it travels over
/// HTTP-POST, signing is enabled for its type and the SP has both a key
/// and a certificate. Other messages are returned unchanged.
///
/// # Errors
///
/// Returns setting or crypto errors from resolving the SP pair, and
/// [`SamlError::UnsupportedAlgorithm`] for an unknown signature method.
pub(crate) fn sign_document(
    settings: &Settings,
    xml: String,
    binding: &str,
    enabled: bool,
) -> SamlResult<String> {
    if !enabled || binding != SamlBinding::HttpPost.uri() {
        return Ok(xml);
    }
    let Some(pair) = settings.get_sp_signing_pair()? else {
        return Ok(xml);
    };
    let (Some(key), Some(cert)) = (pair.key, pair.cert) else {
        return Ok(xml);
    };
    let config = SignatureConfig::from_uris(
        &settings.security.signature_method,
        &settings.security.digest_method,
    )?;
    XmlSigner::new(key, Some(cert)).with_config(config).sign(&xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_algorithm_uri_roundtrip() {
        for alg in [
            SignatureAlgorithm::RsaSha1,
            SignatureAlgorithm::RsaSha256,
            SignatureAlgorithm::RsaSha384,
            SignatureAlgorithm::RsaSha512,
        ] {
            assert_eq!(SignatureAlgorithm::from_uri(alg.uri()), Some(alg));
        }
        assert!(SignatureAlgorithm::from_uri("urn:unknown").is_none());
        assert!(matches!(
            SignatureAlgorithm::require("urn:unknown"),
            Err(SamlError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            SignatureAlgorithm::require("http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256"),
            Err(SamlError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn signature_algorithm_digest() {
        assert_eq!(SignatureAlgorithm::RsaSha1.digest(), DigestAlgorithm::Sha1);
        assert_eq!(SignatureAlgorithm::RsaSha384.digest(), DigestAlgorithm::Sha384);
    }

    #[test]
    fn config_from_settings_uris() {
        let config = SignatureConfig::from_uris(
            signature_algorithms::RSA_SHA256,
            "http://www.w3.org/2001/04/xmlenc#sha256",
        )
        .unwrap();
        assert_eq!(config.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(config.digest, DigestAlgorithm::Sha256);
        assert_eq!(config.canonicalization, CanonicalizationAlgorithm::ExclusiveC14N);
    }

    #[test]
    fn canonicalization_drops_comments_and_expands_empty_elements() {
        let canonical = CanonicalizationAlgorithm::ExclusiveC14N
            .canonicalize(r#"<a xmlns="urn:x" b='1'><!-- note --><c/></a>"#)
            .unwrap();
        assert_eq!(canonical, r#"<a xmlns="urn:x" b="1"><c></c></a>"#);

        let with_comments = CanonicalizationAlgorithm::ExclusiveC14NWithComments
            .canonicalize(r#"<a><!-- note --></a>"#)
            .unwrap();
        assert_eq!(with_comments, "<a><!-- note --></a>");
    }

    #[test]
    fn signed_info_canonicalizes_alike_in_place_and_standalone() {
        let signed_info = concat!(
            r#"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">"#,
            r#"<ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>"#,
            r#"</ds:SignedInfo>"#
        );
        let embedded = format!(
            r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_1"><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">{}</ds:Signature></samlp:LogoutRequest>"#,
            signed_info.replace(r#" xmlns:ds="http://www.w3.org/2000/09/xmldsig#""#, "")
        );
        let doc = crate::xml::parse(&embedded).unwrap();
        let node = doc
            .descendants()
            .find(|n| n.tag_name().name() == "SignedInfo")
            .unwrap();

        let c14n = CanonicalizationAlgorithm::ExclusiveC14N;
        assert_eq!(
            c14n.canonicalize_node(&embedded, node, None),
            c14n.canonicalize(signed_info).unwrap()
        );
    }
}
