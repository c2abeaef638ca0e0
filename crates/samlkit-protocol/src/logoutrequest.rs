//! SP-initiated logout: building the `LogoutRequest` sent to the IdP.

use chrono::Utc;

use crate::bindings::{
    encode_params, EncodedParams, HttpRedirectBinding, Outgoing, RequestParams, SamlMessageType,
};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::signature::sign_document;
use crate::types::{LogoutRequest, NameId};
use crate::utils::{IdGenerator, UuidGenerator};

/// Builder for a logout request.
#[derive(Debug, Clone)]
pub struct Logoutrequest {
    uuid: String,
    transient_name_id: String,
}

impl Default for Logoutrequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Logoutrequest {
    /// Creates a request with a `_`-prefixed UUID as its ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(&UuidGenerator::default())
    }

    /// Creates a request whose ID, and the transient name ID used when the
    /// settings carry none, come from `generator`.
    #[must_use]
    pub fn with_id_generator(generator: &dyn IdGenerator) -> Self {
        Self {
            uuid: generator.generate(),
            transient_name_id: generator.generate(),
        }
    }

    /// The request ID, to match against the response's `InResponseTo`.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.uuid
    }

    /// Builds the redirect URL to the IdP SLO endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] when `idp_slo_service_url` is unset,
    /// and errors from [`Logoutrequest::create_params`].
    pub fn create(&self, settings: &Settings, params: &RequestParams) -> SamlResult<String> {
        let url = slo_url(settings)?;
        let params = self.create_params(settings, params)?;
        Ok(HttpRedirectBinding::url(url, &params))
    }

    /// Builds the binding parameters of the request.
    ///
    /// # Errors
    ///
    /// Returns setting, crypto or compression errors.
    pub fn create_params(
        &self,
        settings: &Settings,
        params: &RequestParams,
    ) -> SamlResult<EncodedParams> {
        let xml = self.create_logout_request_xml_doc(settings)?;
        tracing::debug!(id = %self.uuid, "created LogoutRequest");
        encode_params(
            settings,
            Outgoing {
                message_type: SamlMessageType::Request,
                xml: &xml,
                binding: settings.idp_slo_service_binding(),
                compress: settings.compress_request,
                sign: settings.security.logout_requests_signed,
            },
            params,
        )
    }

    /// Serializes the request, signed when it goes over HTTP-POST with
    /// `logout_requests_signed`.
    ///
    /// # Errors
    ///
    /// Returns setting or crypto errors from signing.
    pub fn create_logout_request_xml_doc(&self, settings: &Settings) -> SamlResult<String> {
        let xml = self.create_xml_document(settings).to_xml(settings.quote());
        sign_document(
            settings,
            xml,
            settings.idp_slo_service_binding(),
            settings.security.logout_requests_signed,
        )
    }

    /// Builds the unsigned request. Without a configured
    /// `name_identifier_value` the subject is a generated transient ID.
    #[must_use]
    pub fn create_xml_document(&self, settings: &Settings) -> LogoutRequest {
        let name_id = match &settings.name_identifier_value {
            Some(value) => NameId {
                value: value.clone(),
                format: settings.name_identifier_format.clone(),
                name_qualifier: settings.idp_name_qualifier.clone(),
                sp_name_qualifier: settings.sp_name_qualifier.clone(),
            },
            None => NameId::transient(self.transient_name_id.clone()),
        };

        let mut request = LogoutRequest::new(self.uuid.clone(), Utc::now(), name_id);
        request.destination = settings.idp_slo_service_url.clone().filter(|url| !url.is_empty());
        request.issuer.clone_from(&settings.sp_entity_id);
        if let Some(index) = &settings.sessionindex {
            request.session_indexes.push(index.clone());
        }
        request
    }
}

fn slo_url(settings: &Settings) -> SamlResult<&str> {
    settings
        .idp_slo_service_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| SamlError::Setting("idp_slo_service_url is not set".to_string()))
}
