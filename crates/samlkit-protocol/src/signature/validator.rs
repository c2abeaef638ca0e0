//! XML Signature validation.

use base64::Engine;
use roxmltree::{Document, Node};
use samlkit_crypto::{hash::hash, signature::verify, DigestAlgorithm, X509};

use super::{CanonicalizationAlgorithm, SignatureAlgorithm};
use crate::error::{SamlError, SamlResult};
use crate::types::{ENVELOPED_SIGNATURE_TRANSFORM, XMLDSIG_NS};
use crate::xml;

/// Returns true if the root element carries an enveloped signature.
#[must_use]
pub fn has_signature(doc: &Document<'_>) -> bool {
    xml::child(doc.root_element(), XMLDSIG_NS, "Signature").is_some()
}

/// XML signature validator.
///
/// Validates the enveloped signature of a message root against a set of
/// trusted certificates.
pub struct XmlSignatureValidator {
    trusted_certificates: Vec<X509>,
}

impl XmlSignatureValidator {
    /// Creates a validator with the given trusted certificates.
    #[must_use]
    pub fn new(trusted_certificates: Vec<X509>) -> Self {
        Self {
            trusted_certificates,
        }
    }

    /// Validates the signature of the root element.
    ///
    /// Returns the trusted certificate the signature verified with. Any
    /// embedded `KeyInfo` certificate is ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the problem when the signature is
    /// missing, malformed, does not cover the root, has a wrong digest or
    /// verifies with none of the trusted certificates. Crypto errors for
    /// unusable certificates propagate.
    pub fn validate(&self, xml: &str) -> SamlResult<X509> {
        let doc = xml::parse(xml)?;
        let root = doc.root_element();
        let signature = xml::child(root, XMLDSIG_NS, "Signature")
            .ok_or_else(|| invalid("no Signature element in the root"))?;
        let signed_info = xml::child(signature, XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| invalid("no SignedInfo element"))?;

        let c14n = xml::child(signed_info, XMLDSIG_NS, "CanonicalizationMethod")
            .and_then(|n| n.attribute("Algorithm"))
            .ok_or_else(|| invalid("no CanonicalizationMethod"))?;
        let c14n = canonicalization(c14n)?;
        let signature_method = xml::child(signed_info, XMLDSIG_NS, "SignatureMethod")
            .and_then(|n| n.attribute("Algorithm"))
            .ok_or_else(|| invalid("no SignatureMethod"))?;

        let mut references = xml::children(signed_info, XMLDSIG_NS, "Reference");
        let reference = references.next().ok_or_else(|| invalid("no Reference"))?;
        if references.next().is_some() {
            return Err(invalid("more than one Reference"));
        }
        check_reference_uri(reference, root.attribute("ID"))?;

        let reference_c14n = reference_canonicalization(reference)?;
        let digest_method = xml::child(reference, XMLDSIG_NS, "DigestMethod")
            .and_then(|n| n.attribute("Algorithm"))
            .ok_or_else(|| invalid("no DigestMethod"))?;
        let expected_digest = strip_whitespace(
            &xml::element_text(xml::child(reference, XMLDSIG_NS, "DigestValue"))
                .ok_or_else(|| invalid("no DigestValue"))?,
        );

        let canonical = reference_c14n.canonicalize_node(xml, root, Some(signature.id()));
        let actual_digest = base64::engine::general_purpose::STANDARD.encode(hash(
            DigestAlgorithm::from_identifier(digest_method),
            canonical.as_bytes(),
        )?);
        if actual_digest != expected_digest {
            tracing::warn!("reference digest mismatch");
            return Err(invalid("digest mismatch"));
        }

        let signature_value = strip_whitespace(
            &xml::element_text(xml::child(signature, XMLDSIG_NS, "SignatureValue"))
                .ok_or_else(|| invalid("no SignatureValue"))?,
        );
        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(signature_value)
            .map_err(|e| invalid(&format!("SignatureValue is not base64: {e}")))?;
        let canonical_signed_info = c14n.canonicalize_node(xml, signed_info, None);
        let digest = SignatureAlgorithm::from_uri(signature_method)
            .map_or_else(|| DigestAlgorithm::from_identifier(signature_method), |alg| alg.digest());

        for cert in &self.trusted_certificates {
            if verify(cert, digest, &signature_bytes, canonical_signed_info.as_bytes())? {
                return Ok(cert.clone());
            }
        }
        tracing::warn!(
            candidates = self.trusted_certificates.len(),
            "embedded signature matches no trusted certificate"
        );
        Err(invalid("signature does not verify with any trusted certificate"))
    }
}

fn invalid(reason: &str) -> SamlError {
    SamlError::validation(format!("Invalid embedded signature: {reason}"))
}

fn canonicalization(uri: &str) -> SamlResult<CanonicalizationAlgorithm> {
    CanonicalizationAlgorithm::from_uri(uri)
        .ok_or_else(|| invalid(&format!("unsupported canonicalization {uri}")))
}

fn check_reference_uri(reference: Node<'_, '_>, root_id: Option<&str>) -> SamlResult<()> {
    let uri = reference.attribute("URI").unwrap_or_default();
    let covers_root = uri.is_empty()
        || uri
            .strip_prefix('#')
            .is_some_and(|id| Some(id) == root_id);
    if covers_root {
        Ok(())
    } else {
        Err(invalid("reference does not point at the root element"))
    }
}

fn reference_canonicalization(reference: Node<'_, '_>) -> SamlResult<CanonicalizationAlgorithm> {
    let mut c14n = CanonicalizationAlgorithm::ExclusiveC14N;
    let Some(transforms) = xml::child(reference, XMLDSIG_NS, "Transforms") else {
        return Ok(c14n);
    };
    for transform in xml::children(transforms, XMLDSIG_NS, "Transform") {
        let algorithm = transform.attribute("Algorithm").unwrap_or_default();
        if algorithm != ENVELOPED_SIGNATURE_TRANSFORM {
            c14n = canonicalization(algorithm)?;
        }
    }
    Ok(c14n)
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
