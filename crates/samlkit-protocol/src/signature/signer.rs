//! XML Signature creation.

use base64::Engine;
use roxmltree::Node;
use samlkit_crypto::{hash::hash, signature::sign, x509::to_base64, PKey, Private, X509};

use super::SignatureConfig;
use crate::error::{SamlError, SamlResult};
use crate::types::{ENVELOPED_SIGNATURE_TRANSFORM, SAML_NS, XMLDSIG_NS};
use crate::xml::{self, Quote, XmlWriter};

/// XML document signer.
///
/// Signs the root element of a SAML message with the configured private
/// key and places the certificate, when there is one, in `KeyInfo`.
pub struct XmlSigner {
    key: PKey<Private>,
    certificate: Option<X509>,
    config: SignatureConfig,
}

impl XmlSigner {
    /// Creates a signer with the default configuration (RSA-SHA1, SHA-1
    /// digest, exclusive C14N).
    #[must_use]
    pub fn new(key: PKey<Private>, certificate: Option<X509>) -> Self {
        Self {
            key,
            certificate,
            config: SignatureConfig::default(),
        }
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Signs the root element of an XML document.
    ///
    /// The root must carry an `ID`. The `ds:Signature` element is inserted
    /// right after the root's `Issuer`, or first when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingElement`] without a root `ID`,
    /// [`SamlError::SignatureCreation`] for a root without content, and
    /// crypto errors from the key.
    pub fn sign(&self, xml: &str) -> SamlResult<String> {
        let doc = xml::parse(xml)?;
        let root = doc.root_element();
        let id = root
            .attribute("ID")
            .ok_or_else(|| SamlError::MissingElement("ID attribute of the root element".to_string()))?;
        let insert_at = signature_position(root)?;

        let canonical = self.config.canonicalization.canonicalize(xml)?;
        let digest = base64::engine::general_purpose::STANDARD
            .encode(hash(self.config.digest, canonical.as_bytes())?);

        let canonical_signed_info = self
            .config
            .canonicalization
            .canonicalize(&self.signed_info(id, &digest, true))?;
        let signature_value = sign(
            &self.key,
            self.config.algorithm.digest(),
            canonical_signed_info.as_bytes(),
        )?;
        let signature = self.signature_element(
            &self.signed_info(id, &digest, false),
            &base64::engine::general_purpose::STANDARD.encode(signature_value),
        )?;

        tracing::debug!(reference = id, algorithm = self.config.algorithm.uri(), "signed message");
        Ok(format!("{}{}{}", &xml[..insert_at], signature, &xml[insert_at..]))
    }

    fn signed_info(&self, id: &str, digest: &str, declare_ns: bool) -> String {
        let canonicalization = self.config.canonicalization.uri();
        let reference = format!("#{id}");

        let mut w = XmlWriter::new(Quote::Double);
        w.open(
            "ds:SignedInfo",
            &[("xmlns:ds", declare_ns.then_some(XMLDSIG_NS))],
        );
        w.empty("ds:CanonicalizationMethod", &[("Algorithm", Some(canonicalization))]);
        w.empty(
            "ds:SignatureMethod",
            &[("Algorithm", Some(self.config.algorithm.uri()))],
        );
        w.open("ds:Reference", &[("URI", Some(reference.as_str()))]);
        w.open("ds:Transforms", &[]);
        w.empty("ds:Transform", &[("Algorithm", Some(ENVELOPED_SIGNATURE_TRANSFORM))]);
        w.empty("ds:Transform", &[("Algorithm", Some(canonicalization))]);
        w.close("ds:Transforms");
        w.empty("ds:DigestMethod", &[("Algorithm", Some(self.config.digest.uri()))]);
        w.text_element("ds:DigestValue", &[], digest);
        w.close("ds:Reference");
        w.close("ds:SignedInfo");
        w.finish()
    }

    fn signature_element(&self, signed_info: &str, signature_value: &str) -> SamlResult<String> {
        let mut w = XmlWriter::new(Quote::Double);
        w.open("ds:Signature", &[("xmlns:ds", Some(XMLDSIG_NS))]);
        w.raw(signed_info);
        w.text_element("ds:SignatureValue", &[], signature_value);
        if let Some(cert) = &self.certificate {
            w.open("ds:KeyInfo", &[]);
            w.open("ds:X509Data", &[]);
            w.text_element("ds:X509Certificate", &[], &to_base64(cert)?);
            w.close("ds:X509Data");
            w.close("ds:KeyInfo");
        }
        w.close("ds:Signature");
        Ok(w.finish())
    }
}

fn signature_position(root: Node<'_, '_>) -> SamlResult<usize> {
    if let Some(issuer) = root
        .children()
        .find(Node::is_element)
        .filter(|n| xml::is_element(*n, SAML_NS, "Issuer"))
    {
        return Ok(issuer.range().end);
    }
    root.first_child()
        .map(|child| child.range().start)
        .ok_or_else(|| SamlError::SignatureCreation("cannot sign an empty root element".to_string()))
}
