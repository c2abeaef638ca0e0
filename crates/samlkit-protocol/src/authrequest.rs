//! SP-initiated login: building the `AuthnRequest`.

use chrono::Utc;

use crate::bindings::{
    encode_params, EncodedParams, HttpRedirectBinding, Outgoing, RequestParams, SamlMessageType,
};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::signature::sign_document;
use crate::types::{AuthnRequest, NameId, NameIdPolicy, RequestedAuthnContext};
use crate::utils::{IdGenerator, UuidGenerator};

/// Builder for an authentication request.
///
/// Each instance has its own request ID; keep it to match the response's
/// `InResponseTo`.
#[derive(Debug, Clone)]
pub struct Authrequest {
    uuid: String,
}

impl Default for Authrequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Authrequest {
    /// Creates a request with a `_`-prefixed UUID as its ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(&UuidGenerator::default())
    }

    /// Creates a request whose ID comes from `generator`.
    #[must_use]
    pub fn with_id_generator(generator: &dyn IdGenerator) -> Self {
        Self {
            uuid: generator.generate(),
        }
    }

    /// The request ID.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.uuid
    }

    /// Builds the redirect URL to the IdP SSO endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] when `idp_sso_service_url` is unset,
    /// and errors from [`Authrequest::create_params`].
    pub fn create(&self, settings: &Settings, params: &RequestParams) -> SamlResult<String> {
        let url = settings
            .idp_sso_service_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SamlError::Setting("idp_sso_service_url is not set".to_string()))?;
        let params = self.create_params(settings, params)?;
        Ok(HttpRedirectBinding::url(url, &params))
    }

    /// Builds the binding parameters: `SAMLRequest`, the caller's
    /// `RelayState` and extra parameters, and for a signed redirect
    /// `SigAlg` and `Signature`.
    ///
    /// # Errors
    ///
    /// Returns setting, crypto or compression errors.
    pub fn create_params(
        &self,
        settings: &Settings,
        params: &RequestParams,
    ) -> SamlResult<EncodedParams> {
        let xml = self.create_authentication_xml_doc(settings)?;
        tracing::debug!(id = %self.uuid, "created AuthnRequest");
        encode_params(
            settings,
            Outgoing {
                message_type: SamlMessageType::Request,
                xml: &xml,
                binding: settings.idp_sso_service_binding(),
                compress: settings.compress_request,
                sign: settings.security.authn_requests_signed,
            },
            params,
        )
    }

    /// Serializes the request, signed when it goes over HTTP-POST with
    /// `authn_requests_signed`.
    ///
    /// # Errors
    ///
    /// Returns setting or crypto errors from signing.
    pub fn create_authentication_xml_doc(&self, settings: &Settings) -> SamlResult<String> {
        let xml = self.create_xml_document(settings).to_xml(settings.quote());
        sign_document(
            settings,
            xml,
            settings.idp_sso_service_binding(),
            settings.security.authn_requests_signed,
        )
    }

    /// Builds the unsigned request from the settings.
    #[must_use]
    pub fn create_xml_document(&self, settings: &Settings) -> AuthnRequest {
        let mut request = AuthnRequest::new(self.uuid.clone(), Utc::now());
        request.destination = settings.idp_sso_service_url.clone().filter(|url| !url.is_empty());
        request.is_passive = settings.passive;
        request.protocol_binding.clone_from(&settings.protocol_binding);
        request.attribute_consuming_service_index = settings.attributes_index;
        request.force_authn = settings.force_authn;
        request
            .assertion_consumer_service_url
            .clone_from(&settings.assertion_consumer_service_url);
        request.issuer.clone_from(&settings.sp_entity_id);

        if let Some(value) = &settings.name_identifier_value_requested {
            let mut name_id = NameId::new(value.clone());
            name_id.format.clone_from(&settings.name_identifier_format);
            request.subject = Some(name_id);
        }
        if let Some(format) = &settings.name_identifier_format {
            request.name_id_policy = Some(NameIdPolicy {
                format: Some(format.clone()),
                allow_create: true,
            });
        }
        if !settings.authn_context.is_empty() || !settings.authn_context_decl_ref.is_empty() {
            request.requested_authn_context = Some(RequestedAuthnContext {
                comparison: settings.authn_context_comparison.unwrap_or_default(),
                class_refs: settings.authn_context.clone(),
                decl_refs: settings.authn_context_decl_ref.clone(),
            });
        }
        request
    }
}
