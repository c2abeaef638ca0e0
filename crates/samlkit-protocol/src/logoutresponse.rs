//! SP-initiated logout: parsing and validating the IdP's
//! `LogoutResponse`.

use roxmltree::{Document, Node};

use crate::bindings::SamlMessageType;
use crate::error::{SamlError, SamlResult};
use crate::message::{self, valid_saml};
use crate::settings::Settings;
use crate::types::{Status, SAMLP_NS, SAML_NS};
use crate::utils::uri_match;
use crate::validation::{
    check_issuer, check_signature, run_checks, soft_or_strict, Check, ValidationOptions,
};
use crate::xml;

/// A logout response received from the IdP.
#[derive(Debug, Clone)]
pub struct Logoutresponse<'s> {
    document: String,
    settings: &'s Settings,
    options: ValidationOptions,
}

impl<'s> Logoutresponse<'s> {
    /// Decodes a received `SAMLResponse` value.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the message exceeds
    /// `message_max_bytesize`, and decoding errors for broken base64.
    pub fn new(
        response: &str,
        settings: &'s Settings,
        options: ValidationOptions,
    ) -> SamlResult<Self> {
        let document = message::decode_raw_saml(response, settings.message_max_bytesize)?;
        Ok(Self {
            document,
            settings,
            options,
        })
    }

    /// The decoded XML.
    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    fn parsed(&self) -> Option<Document<'_>> {
        let doc = xml::parse(&self.document).ok()?;
        let is_response = xml::is_element(doc.root_element(), SAMLP_NS, "LogoutResponse");
        is_response.then_some(doc)
    }

    fn read<R>(&self, read: impl FnOnce(Node<'_, '_>) -> Option<R>) -> Option<R> {
        self.parsed().and_then(|doc| read(doc.root_element()))
    }

    /// The `ID` of the response.
    #[must_use]
    pub fn response_id(&self) -> Option<String> {
        self.parsed().and_then(|doc| message::id(&doc))
    }

    /// The `InResponseTo` attribute.
    #[must_use]
    pub fn in_response_to(&self) -> Option<String> {
        self.read(|root| root.attribute("InResponseTo").map(str::to_string))
    }

    /// The `Destination` attribute.
    #[must_use]
    pub fn destination(&self) -> Option<String> {
        self.read(|root| root.attribute("Destination").map(str::to_string))
    }

    /// The `Issuer` text.
    #[must_use]
    pub fn issuer(&self) -> Option<String> {
        self.read(|root| xml::element_text(xml::child(root, SAML_NS, "Issuer")))
    }

    /// The `Status` block.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.read(|root| xml::child(root, SAMLP_NS, "Status").and_then(Status::from_node))
    }

    /// The top-level status code.
    #[must_use]
    pub fn status_code(&self) -> Option<String> {
        self.status().map(|status| status.status_code.value)
    }

    /// The status message.
    #[must_use]
    pub fn status_message(&self) -> Option<String> {
        self.status().and_then(|status| status.status_message)
    }

    /// Returns true if the top-level status code is Success.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status().is_some_and(|status| status.is_success())
    }

    /// Runs the validation pipeline.
    ///
    /// Steps run in order: message and settings present, Success status,
    /// structure, `InResponseTo`, destination, issuer, signature.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] listing the failures, and
    /// configuration or crypto errors as they occur.
    pub fn validate(&self, collect_errors: bool) -> SamlResult<()> {
        let checks: [(&str, Check<Self>); 7] = [
            ("state", Self::validate_state),
            ("success_status", Self::validate_success_status),
            ("structure", Self::validate_structure),
            ("in_response_to", Self::validate_in_response_to),
            ("destination", Self::validate_destination),
            ("issuer", Self::validate_issuer),
            ("signature", Self::validate_signature),
        ];
        run_checks(self, &checks, self.settings.soft, collect_errors)
    }

    /// Validates the response, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Strict settings return the validation error. Configuration and
    /// crypto errors are returned in both modes.
    pub fn is_valid(&self) -> SamlResult<bool> {
        soft_or_strict(self.validate(false), self.settings.soft)
    }

    fn validate_state(&self) -> SamlResult<()> {
        if self.document.trim().is_empty() {
            return Err(SamlError::validation("Blank logout response"));
        }
        if self.settings.idp_entity_id.is_none() {
            return Err(SamlError::validation(
                "No issuer in settings of the logout response",
            ));
        }
        if self.settings.sp_entity_id.is_none() {
            return Err(SamlError::validation(
                "No sp_entity_id in settings of the logout response",
            ));
        }
        Ok(())
    }

    fn validate_success_status(&self) -> SamlResult<()> {
        if self.success() {
            return Ok(());
        }
        Err(SamlError::validation(status_error_message(
            "The status code of the Logout Response was not Success",
            self.status_code().as_deref(),
            self.status_message().as_deref(),
        )))
    }

    fn validate_structure(&self) -> SamlResult<()> {
        if valid_saml(&self.document, self.settings.soft)? {
            Ok(())
        } else {
            Err(SamlError::validation(
                "Invalid SAML Logout Response. Not match the saml-schema-protocol-2.0.xsd",
            ))
        }
    }

    fn validate_in_response_to(&self) -> SamlResult<()> {
        let Some(expected) = self.options.matches_request_id.as_deref() else {
            return Ok(());
        };
        let in_response_to = self.in_response_to();
        if in_response_to.as_deref() == Some(expected) {
            return Ok(());
        }
        Err(SamlError::validation(format!(
            "The InResponseTo of the Logout Response: {}, does not match the ID of the Logout Request sent by the SP: {expected}",
            in_response_to.unwrap_or_default()
        )))
    }

    fn validate_destination(&self) -> SamlResult<()> {
        let Some(destination) = self.destination() else {
            return Ok(());
        };
        if destination.is_empty() {
            return Err(SamlError::validation(
                "The LogoutResponse has an empty Destination value",
            ));
        }
        let Some(expected) = self
            .settings
            .single_logout_service_url
            .as_deref()
            .filter(|url| !url.is_empty())
        else {
            return Ok(());
        };
        if uri_match(&destination, expected) {
            Ok(())
        } else {
            Err(SamlError::validation(format!(
                "The LogoutResponse was received at {destination} instead of {expected}"
            )))
        }
    }

    fn validate_issuer(&self) -> SamlResult<()> {
        check_issuer(self.settings, self.issuer().as_deref())
    }

    fn validate_signature(&self) -> SamlResult<()> {
        check_signature(
            self.settings,
            &self.options,
            SamlMessageType::Response,
            &self.document,
            "Invalid Signature on Logout Response",
        )
    }
}

/// Appends the short form of a status code (its last `:` segment) and the
/// status message to an error.
fn status_error_message(error: &str, status_code: Option<&str>, message: Option<&str>) -> String {
    let mut out = error.to_string();
    if let Some(code) = status_code {
        let printable = code
            .split(" | ")
            .map(|code| code.rsplit(':').next().unwrap_or(code))
            .collect::<Vec<_>>()
            .join(" => ");
        out.push_str(", was ");
        out.push_str(&printable);
    }
    if let Some(message) = message {
        out.push_str(" -> ");
        out.push_str(message);
    }
    out
}
