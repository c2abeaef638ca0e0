//! IdP metadata: reading an `EntityDescriptor` into settings.
//!
//! Each `IDPSSODescriptor` becomes an [`IdpMetadata`] record. Where a
//! descriptor offers several bindings or name ID formats, the caller's
//! priority list decides; without one the first in document order wins.
//! A priority list that matches nothing yields no value.

use std::time::Duration;

use chrono::Utc;
use roxmltree::Node;
use samlkit_crypto::x509::fingerprint;
use samlkit_crypto::{build_cert_object, DigestAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};
use crate::settings::{IdpCertMulti, Settings};
use crate::types::{SamlBinding, MD_NS, SAML_NS, XMLDSIG_NS};
use crate::utils::{format_instant, parse_duration, parse_instant, unescape};
use crate::xml;

/// Selection options for parsing metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Only read the `EntityDescriptor` with this `entityID`.
    pub entity_id: Option<String>,
    /// Preferred SSO bindings, most preferred first.
    pub sso_binding: Vec<String>,
    /// Preferred SLO bindings, most preferred first.
    pub slo_binding: Vec<String>,
    /// Preferred name ID formats, most preferred first.
    pub name_id_format: Vec<String>,
}

impl ParseOptions {
    /// Restricts parsing to one entity.
    #[must_use]
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Sets the SSO binding priority. Short names (`post`, `redirect`) are
    /// accepted.
    #[must_use]
    pub fn sso_binding<I, S>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sso_binding = normalize_bindings(bindings);
        self
    }

    /// Sets the SLO binding priority.
    #[must_use]
    pub fn slo_binding<I, S>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.slo_binding = normalize_bindings(bindings);
        self
    }

    /// Sets the name ID format priority.
    #[must_use]
    pub fn name_id_format<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_id_format = formats.into_iter().map(Into::into).collect();
        self
    }
}

fn normalize_bindings<I, S>(bindings: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    bindings
        .into_iter()
        .map(|b| SamlBinding::normalize(b.as_ref()))
        .collect()
}

/// Settings values read from one `IDPSSODescriptor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpMetadata {
    /// `entityID` of the enclosing `EntityDescriptor`.
    pub idp_entity_id: Option<String>,
    /// Selected `NameIDFormat`.
    pub name_identifier_format: Option<String>,
    /// `Location` of the selected `SingleSignOnService`.
    pub idp_sso_service_url: Option<String>,
    /// Binding of the selected `SingleSignOnService`.
    pub idp_sso_service_binding: Option<String>,
    /// `Location` of the selected `SingleLogoutService`.
    pub idp_slo_service_url: Option<String>,
    /// Binding of the selected `SingleLogoutService`.
    pub idp_slo_service_binding: Option<String>,
    /// `ResponseLocation` of the selected `SingleLogoutService`.
    pub idp_slo_response_service_url: Option<String>,
    /// Names of the `saml:Attribute`s the IdP offers.
    pub idp_attribute_names: Vec<String>,
    /// The IdP certificate, when it uses one for everything.
    pub idp_cert: Option<String>,
    /// SHA-1 fingerprint of `idp_cert`.
    pub idp_cert_fingerprint: Option<String>,
    /// Every certificate by use.
    pub idp_cert_multi: Option<IdpCertMulti>,
    /// `validUntil` of the document.
    pub valid_until: Option<String>,
    /// `cacheDuration` of the document.
    pub cache_duration: Option<String>,
}

impl IdpMetadata {
    fn from_descriptor(descriptor: Node<'_, '_>, options: &ParseOptions) -> SamlResult<Self> {
        let top = descriptor.document().root_element();
        let sso = select_service(descriptor, "SingleSignOnService", &options.sso_binding);
        let slo = select_service(descriptor, "SingleLogoutService", &options.slo_binding);

        let mut metadata = Self {
            idp_entity_id: descriptor
                .parent_element()
                .and_then(|entity| entity.attribute("entityID"))
                .map(str::to_string),
            name_identifier_format: first_ranked(
                xml::children(descriptor, MD_NS, "NameIDFormat")
                    .filter_map(|node| xml::element_text(Some(node))),
                &options.name_id_format,
            ),
            idp_sso_service_url: sso.and_then(|s| s.location.map(str::to_string)),
            idp_sso_service_binding: sso.map(|s| s.binding.to_string()),
            idp_slo_service_url: slo.and_then(|s| s.location.map(str::to_string)),
            idp_slo_service_binding: slo.map(|s| s.binding.to_string()),
            idp_slo_response_service_url: slo
                .and_then(|s| s.response_location.map(str::to_string)),
            idp_attribute_names: xml::children(descriptor, SAML_NS, "Attribute")
                .filter_map(|node| node.attribute("Name").map(str::to_string))
                .collect(),
            valid_until: top.attribute("validUntil").map(str::to_string),
            cache_duration: top.attribute("cacheDuration").map(str::to_string),
            ..Self::default()
        };
        if let Some(certificates) = certificates(descriptor) {
            metadata.merge_certificates(certificates)?;
        }
        tracing::debug!(
            entity_id = ?metadata.idp_entity_id,
            sso_binding = ?metadata.idp_sso_service_binding,
            slo_binding = ?metadata.idp_slo_service_binding,
            "read IDPSSODescriptor"
        );
        Ok(metadata)
    }

    /// Sets `idp_cert_multi`, and `idp_cert` with its fingerprint when a
    /// single certificate serves every use.
    fn merge_certificates(&mut self, certificates: IdpCertMulti) -> SamlResult<()> {
        let single = match (&certificates.signing[..], &certificates.encryption[..]) {
            ([only], []) | ([], [only]) => Some(only),
            ([signing], [encryption]) if signing == encryption => Some(signing),
            _ => None,
        };
        if let Some(cert) = single {
            self.idp_cert_fingerprint = build_cert_object(cert)?
                .map(|parsed| fingerprint(&parsed, DigestAlgorithm::Sha1))
                .transpose()?;
            self.idp_cert = Some(cert.clone());
        }
        self.idp_cert_multi = Some(certificates);
        Ok(())
    }

    /// Folds `cacheDuration` into `valid_until`: when the cache expires
    /// before `validUntil` (or there is no `validUntil`) the cache expiry
    /// becomes `valid_until`. `cache_duration` is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidDuration`] for a malformed
    /// `cacheDuration`.
    pub fn resolve_valid_until(&mut self) -> SamlResult<()> {
        let Some(duration) = self.cache_duration.take() else {
            return Ok(());
        };
        let cache_expiry = parse_duration(&duration, Utc::now())?;
        let valid_until = self.valid_until.as_deref().and_then(parse_instant);
        if valid_until.map_or(true, |valid_until| cache_expiry < valid_until) {
            self.valid_until = Some(format_instant(cache_expiry));
        }
        Ok(())
    }

    /// Writes every field into `settings`, absent values included.
    pub fn merge_into(self, settings: &mut Settings) {
        settings.idp_entity_id = self.idp_entity_id;
        settings.name_identifier_format = self.name_identifier_format;
        settings.idp_sso_service_url = self.idp_sso_service_url;
        settings.idp_sso_service_binding = self.idp_sso_service_binding;
        settings.idp_slo_service_url = self.idp_slo_service_url;
        settings.idp_slo_service_binding = self.idp_slo_service_binding;
        settings.idp_slo_response_service_url = self.idp_slo_response_service_url;
        settings.idp_attribute_names = self.idp_attribute_names;
        settings.idp_cert = self.idp_cert;
        settings.idp_cert_fingerprint = self.idp_cert_fingerprint;
        settings.idp_cert_multi = self.idp_cert_multi;
        settings.valid_until = self.valid_until;
        settings.cache_duration = self.cache_duration;
    }
}

#[derive(Debug, Clone, Copy)]
struct Service<'a> {
    binding: &'a str,
    location: Option<&'a str>,
    response_location: Option<&'a str>,
}

/// Picks the service endpoint for the preferred binding, else the first
/// endpoint.
fn select_service<'a>(
    descriptor: Node<'a, '_>,
    element: &'static str,
    priority: &[String],
) -> Option<Service<'a>> {
    let services: Vec<Node<'a, '_>> = xml::children(descriptor, MD_NS, element).collect();
    let binding = first_ranked(
        services.iter().filter_map(|s| s.attribute("Binding")),
        priority,
    )?;
    let service = services
        .iter()
        .find(|s| s.attribute("Binding") == Some(binding.as_str()))?;
    Some(Service {
        binding: service.attribute("Binding")?,
        location: service.attribute("Location"),
        response_location: service.attribute("ResponseLocation"),
    })
}

/// The first candidate in `priority` that occurs among `values`, or the
/// first value when there is no priority.
fn first_ranked<I, S>(values: I, priority: &[String]) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let values: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
    if priority.is_empty() {
        return values.into_iter().next();
    }
    priority.iter().find(|candidate| values.contains(candidate)).cloned()
}

/// Certificates of the `KeyDescriptor`s by use. A descriptor without `use`
/// serves both.
fn certificates(descriptor: Node<'_, '_>) -> Option<IdpCertMulti> {
    let mut certs = IdpCertMulti::default();
    for key_descriptor in xml::children(descriptor, MD_NS, "KeyDescriptor") {
        let usage = key_descriptor.attribute("use").unwrap_or_default();
        let values: Vec<String> = xml::children(key_descriptor, XMLDSIG_NS, "KeyInfo")
            .flat_map(|info| xml::children(info, XMLDSIG_NS, "X509Data"))
            .flat_map(|data| xml::children(data, XMLDSIG_NS, "X509Certificate"))
            .filter_map(|cert| xml::element_text(Some(cert)))
            .map(|text| text.chars().filter(|c| !c.is_whitespace()).collect())
            .collect();
        if !usage.contains("encryption") {
            certs.signing.extend(values.iter().cloned());
        }
        if !usage.contains("signing") {
            certs.encryption.extend(values);
        }
    }
    (!certs.is_empty()).then_some(certs)
}

/// Parser for IdP metadata documents.
#[derive(Debug, Clone)]
pub struct IdpMetadataParser {
    timeout: Duration,
}

impl Default for IdpMetadataParser {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl IdpMetadataParser {
    /// Creates a parser with a 30 second fetch timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fetch timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads every `IDPSSODescriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed XML,
    /// [`SamlError::MissingElement`] when no descriptor matches, and
    /// certificate errors for unreadable certificates.
    pub fn parse_to_array(&self, metadata: &str, options: &ParseOptions) -> SamlResult<Vec<IdpMetadata>> {
        let doc = xml::parse(metadata)?;
        let descriptors: Vec<Node<'_, '_>> = doc
            .descendants()
            .filter(|node| xml::is_element(*node, MD_NS, "IDPSSODescriptor"))
            .filter(|node| {
                node.parent_element().is_some_and(|entity| {
                    xml::is_element(entity, MD_NS, "EntityDescriptor")
                        && options
                            .entity_id
                            .as_deref()
                            .map_or(true, |id| entity.attribute("entityID") == Some(id))
                })
            })
            .collect();
        if descriptors.is_empty() {
            return Err(SamlError::MissingElement(
                "idp_metadata must contain an IDPSSODescriptor element".to_string(),
            ));
        }
        descriptors
            .into_iter()
            .map(|descriptor| IdpMetadata::from_descriptor(descriptor, options))
            .collect()
    }

    /// Reads the first `IDPSSODescriptor`.
    ///
    /// # Errors
    ///
    /// See [`IdpMetadataParser::parse_to_array`].
    pub fn parse_to_hash(&self, metadata: &str, options: &ParseOptions) -> SamlResult<IdpMetadata> {
        self.parse_to_array(metadata, options)?
            .into_iter()
            .next()
            .ok_or_else(|| SamlError::MissingElement("IDPSSODescriptor".to_string()))
    }

    /// Builds settings from the first `IDPSSODescriptor`, with
    /// `cacheDuration` folded into `valid_until`.
    ///
    /// # Errors
    ///
    /// See [`IdpMetadataParser::parse_to_array`]; a malformed
    /// `cacheDuration` is an [`SamlError::InvalidDuration`].
    pub fn parse(&self, metadata: &str, options: &ParseOptions) -> SamlResult<Settings> {
        let mut settings = Settings::default();
        self.parse_into(metadata, options, &mut settings)?;
        Ok(settings)
    }

    /// Like [`IdpMetadataParser::parse`], overwriting the IdP fields of
    /// existing settings.
    ///
    /// # Errors
    ///
    /// See [`IdpMetadataParser::parse`].
    pub fn parse_into(
        &self,
        metadata: &str,
        options: &ParseOptions,
        settings: &mut Settings,
    ) -> SamlResult<()> {
        let mut parsed = self.parse_to_hash(metadata, options)?;
        parsed.resolve_valid_until()?;
        parsed.merge_into(settings);
        Ok(())
    }

    /// Fetches a metadata document.
    ///
    /// Credentials in the URL are sent as basic authentication. With
    /// `validate_cert` off, TLS certificates are not verified.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] for a URL that is not http(s),
    /// [`SamlError::Transport`] for connection failures and
    /// [`SamlError::Http`] for a non-success status.
    pub async fn fetch(&self, url: &str, validate_cert: bool) -> SamlResult<String> {
        let mut url = url::Url::parse(url)
            .map_err(|e| SamlError::Setting(format!("invalid metadata URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SamlError::Setting(
                "url must begin with http or https".to_string(),
            ));
        }
        let username = Some(unescape(url.username())).filter(|name| !name.is_empty());
        let password = url.password().map(unescape);
        // Credentials travel in the header only.
        let _ = url.set_username("");
        let _ = url.set_password(None);

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!validate_cert)
            .build()?;
        let mut request = client.get(url.clone());
        if let Some(username) = username {
            request = request.basic_auth(username, password);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "idp metadata fetch failed");
            return Err(SamlError::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let body = response.text().await?;
        tracing::info!(%url, bytes = body.len(), "fetched idp metadata");
        Ok(body)
    }

    /// Fetches and parses metadata into new settings.
    ///
    /// # Errors
    ///
    /// See [`IdpMetadataParser::fetch`] and [`IdpMetadataParser::parse`].
    pub async fn parse_remote(
        &self,
        url: &str,
        validate_cert: bool,
        options: &ParseOptions,
    ) -> SamlResult<Settings> {
        let metadata = self.fetch(url, validate_cert).await?;
        self.parse(&metadata, options)
    }

    /// Fetches metadata and reads the first `IDPSSODescriptor`.
    ///
    /// # Errors
    ///
    /// See [`IdpMetadataParser::fetch`] and
    /// [`IdpMetadataParser::parse_to_hash`].
    pub async fn parse_remote_to_hash(
        &self,
        url: &str,
        validate_cert: bool,
        options: &ParseOptions,
    ) -> SamlResult<IdpMetadata> {
        let metadata = self.fetch(url, validate_cert).await?;
        self.parse_to_hash(&metadata, options)
    }

    /// Fetches metadata and reads every `IDPSSODescriptor`.
    ///
    /// # Errors
    ///
    /// See [`IdpMetadataParser::fetch`] and
    /// [`IdpMetadataParser::parse_to_array`].
    pub async fn parse_remote_to_array(
        &self,
        url: &str,
        validate_cert: bool,
        options: &ParseOptions,
    ) -> SamlResult<Vec<IdpMetadata>> {
        let metadata = self.fetch(url, validate_cert).await?;
        self.parse_to_array(&metadata, options)
    }
}
