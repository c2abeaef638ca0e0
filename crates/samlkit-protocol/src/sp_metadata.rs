//! SP metadata: the `EntityDescriptor` an IdP imports to trust this SP.

use chrono::{DateTime, Utc};
use samlkit_crypto::x509::to_base64;
use samlkit_crypto::X509;

use crate::error::SamlResult;
use crate::settings::Settings;
use crate::signature::{SignatureConfig, XmlSigner};
use crate::types::{MD_NS, SAMLP_NS, XMLDSIG_NS};
use crate::utils::{format_instant, IdGenerator, UuidGenerator};
use crate::xml::XmlWriter;

/// SP metadata generator.
#[derive(Debug, Clone)]
pub struct SpMetadata {
    uuid: String,
    valid_until: Option<DateTime<Utc>>,
    cache_duration: Option<String>,
}

impl Default for SpMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl SpMetadata {
    /// Creates a generator with a `_`-prefixed UUID as the document ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(&UuidGenerator::default())
    }

    /// Creates a generator whose document ID comes from `generator`.
    #[must_use]
    pub fn with_id_generator(generator: &dyn IdGenerator) -> Self {
        Self {
            uuid: generator.generate(),
            valid_until: None,
            cache_duration: None,
        }
    }

    /// Sets `validUntil`.
    #[must_use]
    pub const fn valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    /// Sets `cacheDuration`, an xs:duration such as `PT1H`.
    #[must_use]
    pub fn cache_duration(mut self, duration: impl Into<String>) -> Self {
        self.cache_duration = Some(duration.into());
        self
    }

    /// The document ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.uuid
    }

    /// Generates the metadata document.
    ///
    /// Signing certificates are always published; encryption certificates
    /// only with `want_assertions_encrypted`. With `check_sp_cert_expiration`
    /// inactive certificates are left out. The document is signed when
    /// `metadata_signed` is set and the SP has a key and certificate.
    ///
    /// # Errors
    ///
    /// Returns setting or crypto errors from the SP certificates, and
    /// [`crate::SamlError::UnsupportedAlgorithm`] for an unknown signature
    /// method.
    pub fn generate(&self, settings: &Settings) -> SamlResult<String> {
        let certs = settings.get_sp_certs()?;
        let signing: Vec<&X509> = certs.signing.iter().filter_map(|p| p.cert.as_ref()).collect();
        let encryption: Vec<&X509> = if settings.security.want_assertions_encrypted {
            certs.encryption.iter().filter_map(|p| p.cert.as_ref()).collect()
        } else {
            Vec::new()
        };

        let valid_until = self.valid_until.map(format_instant);
        let authn_requests_signed = settings.security.authn_requests_signed.to_string();
        let want_assertions_signed = settings.security.want_assertions_signed.to_string();
        let slo_url = settings.single_logout_service_url.as_deref().filter(|u| !u.is_empty());
        let acs_url = settings
            .assertion_consumer_service_url
            .as_deref()
            .filter(|u| !u.is_empty());

        let mut w = XmlWriter::new(settings.quote());
        w.open(
            "md:EntityDescriptor",
            &[
                ("xmlns:md", Some(MD_NS)),
                ("ID", Some(self.uuid.as_str())),
                ("entityID", settings.sp_entity_id.as_deref()),
                ("validUntil", valid_until.as_deref()),
                ("cacheDuration", self.cache_duration.as_deref()),
            ],
        );
        w.open(
            "md:SPSSODescriptor",
            &[
                ("protocolSupportEnumeration", Some(SAMLP_NS)),
                ("AuthnRequestsSigned", Some(authn_requests_signed.as_str())),
                ("WantAssertionsSigned", Some(want_assertions_signed.as_str())),
            ],
        );
        for cert in &signing {
            key_descriptor(&mut w, "signing", cert)?;
        }
        for cert in &encryption {
            key_descriptor(&mut w, "encryption", cert)?;
        }
        if let Some(url) = slo_url {
            w.empty(
                "md:SingleLogoutService",
                &[
                    ("Binding", Some(settings.single_logout_service_binding.as_str())),
                    ("Location", Some(url)),
                    ("ResponseLocation", Some(url)),
                ],
            );
        }
        if let Some(format) = &settings.name_identifier_format {
            w.text_element("md:NameIDFormat", &[], format);
        }
        if let Some(url) = acs_url {
            w.empty(
                "md:AssertionConsumerService",
                &[
                    ("Binding", Some(settings.assertion_consumer_service_binding.as_str())),
                    ("Location", Some(url)),
                    ("isDefault", Some("true")),
                    ("index", Some("0")),
                ],
            );
        }
        w.close("md:SPSSODescriptor");
        w.close("md:EntityDescriptor");
        let mut xml = w.finish();

        if settings.security.metadata_signed {
            if let Some(pair) = settings.get_sp_signing_pair()? {
                if let (Some(key), Some(cert)) = (pair.key, pair.cert) {
                    let config = SignatureConfig::from_uris(
                        &settings.security.signature_method,
                        &settings.security.digest_method,
                    )?;
                    xml = XmlSigner::new(key, Some(cert)).with_config(config).sign(&xml)?;
                }
            }
        }

        tracing::debug!(
            id = %self.uuid,
            signing_certs = signing.len(),
            encryption_certs = encryption.len(),
            signed = settings.security.metadata_signed,
            "generated SP metadata"
        );

        let mut document = XmlWriter::new(settings.quote());
        document.declaration();
        document.raw(&xml);
        Ok(document.finish())
    }
}

fn key_descriptor(w: &mut XmlWriter, usage: &str, cert: &X509) -> SamlResult<()> {
    w.open("md:KeyDescriptor", &[("use", Some(usage))]);
    w.open("ds:KeyInfo", &[("xmlns:ds", Some(XMLDSIG_NS))]);
    w.open("ds:X509Data", &[]);
    w.text_element("ds:X509Certificate", &[], &to_base64(cert)?);
    w.close("ds:X509Data");
    w.close("ds:KeyInfo");
    w.close("md:KeyDescriptor");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::idp_metadata_parser::IdpMetadataParser;
    use crate::signature::XmlSignatureValidator;
    use crate::test_support::{expired_keys, keys};
    use crate::types::{NameIdFormat, SamlBinding};
    use crate::xml;

    fn settings() -> Settings {
        Settings {
            sp_entity_id: Some("https://sp.example/metadata".to_string()),
            assertion_consumer_service_url: Some("https://sp.example/acs".to_string()),
            single_logout_service_url: Some("https://sp.example/sls".to_string()),
            name_identifier_format: Some(NameIdFormat::Email.uri().to_string()),
            ..Settings::default()
        }
    }

    fn body(xml: &str) -> &str {
        &xml[xml.find("?>").unwrap() + 2..]
    }

    #[test]
    fn unsigned_metadata_structure() {
        let metadata = SpMetadata::new().generate(&settings()).unwrap();
        assert!(metadata.starts_with("<?xml version='1.0' encoding='UTF-8'?>"));

        let doc = xml::parse(body(&metadata)).unwrap();
        let root = doc.root_element();
        assert!(xml::is_element(root, MD_NS, "EntityDescriptor"));
        assert_eq!(root.attribute("entityID"), Some("https://sp.example/metadata"));
        assert!(root.attribute("validUntil").is_none());

        let sp = xml::child(root, MD_NS, "SPSSODescriptor").unwrap();
        assert_eq!(sp.attribute("AuthnRequestsSigned"), Some("false"));
        assert_eq!(sp.attribute("WantAssertionsSigned"), Some("false"));
        assert_eq!(sp.attribute("protocolSupportEnumeration"), Some(SAMLP_NS));
        assert!(xml::child(sp, MD_NS, "KeyDescriptor").is_none());

        let slo = xml::child(sp, MD_NS, "SingleLogoutService").unwrap();
        assert_eq!(slo.attribute("Binding"), Some(SamlBinding::HttpRedirect.uri()));
        assert_eq!(slo.attribute("ResponseLocation"), Some("https://sp.example/sls"));
        let acs = xml::child(sp, MD_NS, "AssertionConsumerService").unwrap();
        assert_eq!(acs.attribute("Binding"), Some(SamlBinding::HttpPost.uri()));
        assert_eq!(acs.attribute("index"), Some("0"));
        assert_eq!(
            xml::element_text(xml::child(sp, MD_NS, "NameIDFormat")).as_deref(),
            Some(NameIdFormat::Email.uri())
        );
    }

    #[test]
    fn validity_attributes() {
        let until = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let metadata = SpMetadata::new()
            .valid_until(until)
            .cache_duration("PT604800S")
            .generate(&settings())
            .unwrap();
        assert!(metadata.contains("validUntil='2030-01-02T03:04:05Z'"));
        assert!(metadata.contains("cacheDuration='PT604800S'"));
    }

    #[test]
    fn publishes_signing_and_requested_encryption_certificates() {
        let sp = keys("sp.example");
        let mut settings = settings();
        settings.certificate = Some(sp.cert_pem.clone());
        settings.private_key = Some(sp.key_pem.clone());

        let metadata = SpMetadata::new().generate(&settings).unwrap();
        assert!(metadata.contains("use='signing'"));
        assert!(!metadata.contains("use='encryption'"));

        settings.security.want_assertions_encrypted = true;
        settings.security.authn_requests_signed = true;
        let metadata = SpMetadata::new().generate(&settings).unwrap();
        let doc = xml::parse(body(&metadata)).unwrap();
        let sp_descriptor = xml::child(doc.root_element(), MD_NS, "SPSSODescriptor").unwrap();
        assert_eq!(sp_descriptor.attribute("AuthnRequestsSigned"), Some("true"));
        let uses: Vec<_> = xml::children(sp_descriptor, MD_NS, "KeyDescriptor")
            .filter_map(|k| k.attribute("use"))
            .collect();
        assert_eq!(uses, ["signing", "encryption"]);
        assert!(metadata.contains(&to_base64(&sp.cert).unwrap()));
    }

    #[test]
    fn expired_certificate_is_rejected_when_checked() {
        let expired = expired_keys("old.sp.example");
        let mut settings = settings();
        settings.certificate = Some(expired.cert_pem.clone());
        settings.private_key = Some(expired.key_pem.clone());

        assert!(SpMetadata::new().generate(&settings).unwrap().contains("KeyDescriptor"));
        settings.security.check_sp_cert_expiration = true;
        let err = SpMetadata::new().generate(&settings).unwrap_err();
        assert_eq!(err.to_string(), "The SP certificate expired.");
    }

    #[test]
    fn signed_metadata_validates() {
        let sp = keys("sp.example");
        let mut settings = settings();
        settings.certificate = Some(sp.cert_pem.clone());
        settings.private_key = Some(sp.key_pem.clone());
        settings.security.metadata_signed = true;
        settings.double_quote_xml_attribute_values = true;

        let metadata = SpMetadata::new().generate(&settings).unwrap();
        assert!(metadata.starts_with("<?xml version=\"1.0\""));
        let signed = body(&metadata);
        let doc = xml::parse(signed).unwrap();
        let first = doc.root_element().first_element_child().unwrap();
        assert!(xml::is_element(first, XMLDSIG_NS, "Signature"));
        assert!(XmlSignatureValidator::new(vec![sp.cert]).validate(signed).is_ok());
    }

    #[test]
    fn generated_metadata_is_not_idp_metadata() {
        let metadata = SpMetadata::new().generate(&settings()).unwrap();
        assert!(IdpMetadataParser::new()
            .parse_to_array(&metadata, &Default::default())
            .is_err());
    }
}
