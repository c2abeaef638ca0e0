//! Answering an IdP-initiated logout: building the `LogoutResponse`.

use chrono::Utc;

use crate::bindings::{
    encode_params, EncodedParams, HttpRedirectBinding, Outgoing, RequestParams, SamlMessageType,
};
use crate::error::{SamlError, SamlResult};
use crate::settings::Settings;
use crate::signature::sign_document;
use crate::types::{LogoutResponse, Status, DEFAULT_LOGOUT_MESSAGE};
use crate::utils::{IdGenerator, UuidGenerator};

/// Builder for a logout response.
#[derive(Debug, Clone)]
pub struct SloLogoutresponse {
    uuid: String,
}

impl Default for SloLogoutresponse {
    fn default() -> Self {
        Self::new()
    }
}

impl SloLogoutresponse {
    /// Creates a response with a `_`-prefixed UUID as its ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(&UuidGenerator::default())
    }

    /// Creates a response whose ID comes from `generator`.
    #[must_use]
    pub fn with_id_generator(generator: &dyn IdGenerator) -> Self {
        Self {
            uuid: generator.generate(),
        }
    }

    /// The response ID.
    #[must_use]
    pub fn response_id(&self) -> &str {
        &self.uuid
    }

    /// Builds the redirect URL to the IdP endpoint that takes logout
    /// responses: `idp_slo_response_service_url`, else
    /// `idp_slo_service_url`.
    ///
    /// `status` defaults its message to "Successfully Signed Out" when it
    /// has none.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] when neither URL is set, and errors
    /// from [`SloLogoutresponse::create_params`].
    pub fn create(
        &self,
        settings: &Settings,
        in_response_to: Option<&str>,
        status: Status,
        params: &RequestParams,
    ) -> SamlResult<String> {
        let url = response_url(settings)
            .ok_or_else(|| SamlError::Setting("idp_slo_service_url is not set".to_string()))?;
        let params = self.create_params(settings, in_response_to, status, params)?;
        Ok(HttpRedirectBinding::url(url, &params))
    }

    /// Builds the binding parameters of the response.
    ///
    /// # Errors
    ///
    /// Returns setting, crypto or compression errors.
    pub fn create_params(
        &self,
        settings: &Settings,
        in_response_to: Option<&str>,
        status: Status,
        params: &RequestParams,
    ) -> SamlResult<EncodedParams> {
        let xml = self.create_logout_response_xml_doc(settings, in_response_to, status)?;
        tracing::debug!(id = %self.uuid, ?in_response_to, "created LogoutResponse");
        encode_params(
            settings,
            Outgoing {
                message_type: SamlMessageType::Response,
                xml: &xml,
                binding: settings.idp_slo_service_binding(),
                compress: settings.compress_response,
                sign: settings.security.logout_responses_signed,
            },
            params,
        )
    }

    /// Serializes the response, signed when it goes over HTTP-POST with
    /// `logout_responses_signed`.
    ///
    /// # Errors
    ///
    /// Returns setting or crypto errors from signing.
    pub fn create_logout_response_xml_doc(
        &self,
        settings: &Settings,
        in_response_to: Option<&str>,
        status: Status,
    ) -> SamlResult<String> {
        let xml = self
            .create_xml_document(settings, in_response_to, status)
            .to_xml(settings.quote());
        sign_document(
            settings,
            xml,
            settings.idp_slo_service_binding(),
            settings.security.logout_responses_signed,
        )
    }

    /// Builds the unsigned response.
    #[must_use]
    pub fn create_xml_document(
        &self,
        settings: &Settings,
        in_response_to: Option<&str>,
        mut status: Status,
    ) -> LogoutResponse {
        if status.status_message.is_none() {
            status.status_message = Some(DEFAULT_LOGOUT_MESSAGE.to_string());
        }
        let mut response = LogoutResponse::new(self.uuid.clone(), Utc::now(), status);
        response.in_response_to = in_response_to.map(str::to_string);
        response.destination = response_url(settings).map(str::to_string);
        response.issuer.clone_from(&settings.sp_entity_id);
        response
    }
}

fn response_url(settings: &Settings) -> Option<&str> {
    [&settings.idp_slo_response_service_url, &settings.idp_slo_service_url]
        .into_iter()
        .filter_map(|url| url.as_deref())
        .find(|url| !url.is_empty())
}
