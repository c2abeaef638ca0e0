//! IdP-initiated logout: parsing and validating a received
//! `LogoutRequest`.

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};

use crate::bindings::SamlMessageType;
use crate::error::{SamlError, SamlResult};
use crate::message::{self, valid_saml};
use crate::settings::Settings;
use crate::types::{NameId, SAMLP_NS, SAML_NS, SAML_VERSION};
use crate::utils::{decrypt_multi, parse_instant};
use crate::validation::{
    check_issuer, check_signature, run_checks, soft_or_strict, Check, ValidationOptions,
};
use crate::xml;

/// A logout request received from the IdP.
#[derive(Debug, Clone)]
pub struct SloLogoutrequest<'s> {
    document: String,
    settings: &'s Settings,
    options: ValidationOptions,
}

impl<'s> SloLogoutrequest<'s> {
    /// Decodes a received `SAMLRequest` value (base64, optionally
    /// deflated, or plain XML).
    ///
    /// # Errors
    ///
    /// Returns a validation error when the message exceeds
    /// `message_max_bytesize`, and decoding errors for broken base64.
    pub fn new(
        request: &str,
        settings: &'s Settings,
        options: ValidationOptions,
    ) -> SamlResult<Self> {
        let document = message::decode_raw_saml(request, settings.message_max_bytesize)?;
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
        let is_request = xml::is_element(doc.root_element(), SAMLP_NS, "LogoutRequest");
        is_request.then_some(doc)
    }

    fn read<R>(&self, read: impl FnOnce(Node<'_, '_>) -> Option<R>) -> Option<R> {
        self.parsed().and_then(|doc| read(doc.root_element()))
    }

    /// The `ID` of the request.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.parsed().and_then(|doc| message::id(&doc))
    }

    /// Alias of [`SloLogoutrequest::id`], the value a logout response
    /// carries in `InResponseTo`.
    #[must_use]
    pub fn request_id(&self) -> Option<String> {
        self.id()
    }

    /// The `Version` of the request.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.parsed().and_then(|doc| message::version(&doc))
    }

    /// The `Issuer` text.
    #[must_use]
    pub fn issuer(&self) -> Option<String> {
        self.read(|root| xml::element_text(xml::child(root, SAML_NS, "Issuer")))
    }

    /// The `NotOnOrAfter` instant.
    #[must_use]
    pub fn not_on_or_after(&self) -> Option<DateTime<Utc>> {
        self.read(|root| root.attribute("NotOnOrAfter").and_then(parse_instant))
    }

    /// Every `SessionIndex`, in document order.
    #[must_use]
    pub fn session_indexes(&self) -> Vec<String> {
        self.read(|root| {
            Some(
                xml::children(root, SAMLP_NS, "SessionIndex")
                    .filter_map(|node| xml::element_text(Some(node)))
                    .collect(),
            )
        })
        .unwrap_or_default()
    }

    /// The subject, decrypting an `EncryptedID` with the SP decryption
    /// keys.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the subject is encrypted and no SP
    /// private key is configured, and decryption errors when no key fits.
    pub fn name_id_node(&self) -> SamlResult<Option<NameId>> {
        let Some(doc) = self.parsed() else {
            return Ok(None);
        };
        let root = doc.root_element();
        if let Some(name_id) = xml::child(root, SAML_NS, "NameID") {
            return Ok(Some(NameId::from_node(name_id)));
        }
        let Some(encrypted) = xml::child(root, SAML_NS, "EncryptedID") else {
            return Ok(None);
        };

        let keys = self.settings.get_sp_decryption_keys()?;
        if keys.is_empty() {
            return Err(SamlError::validation(
                "An EncryptedID found and no SP private key found on the settings to decrypt it",
            ));
        }
        let plaintext = decrypt_multi(encrypted, &keys)?;
        decrypted_name_id(&plaintext).map(Some)
    }

    /// The subject's `NameID` value.
    ///
    /// # Errors
    ///
    /// See [`SloLogoutrequest::name_id_node`].
    pub fn name_id(&self) -> SamlResult<Option<String>> {
        Ok(self.name_id_node()?.map(|name_id| name_id.value))
    }

    /// The subject's `NameID` format.
    ///
    /// # Errors
    ///
    /// See [`SloLogoutrequest::name_id_node`].
    pub fn name_id_format(&self) -> SamlResult<Option<String>> {
        Ok(self.name_id_node()?.and_then(|name_id| name_id.format))
    }

    /// Runs the validation pipeline.
    ///
    /// Steps run in order: non-empty message, `ID`, version, structure,
    /// `NotOnOrAfter`, issuer, signature. In soft mode with
    /// `collect_errors` every step runs and all messages are returned;
    /// otherwise the first failure ends the run.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] listing the failures, and
    /// configuration or crypto errors as they occur.
    pub fn validate(&self, collect_errors: bool) -> SamlResult<()> {
        let checks: [(&str, Check<Self>); 7] = [
            ("request_state", Self::validate_request_state),
            ("id", Self::validate_id),
            ("version", Self::validate_version),
            ("structure", Self::validate_structure),
            ("not_on_or_after", Self::validate_not_on_or_after),
            ("issuer", Self::validate_issuer),
            ("signature", Self::validate_signature),
        ];
        run_checks(self, &checks, self.settings.soft, collect_errors)
    }

    /// Validates the request, stopping at the first failure.
    ///
    /// Soft settings answer `Ok(false)` for an invalid request.
    ///
    /// # Errors
    ///
    /// Strict settings return the validation error. Configuration and
    /// crypto errors are returned in both modes.
    pub fn is_valid(&self) -> SamlResult<bool> {
        soft_or_strict(self.validate(false), self.settings.soft)
    }

    fn validate_request_state(&self) -> SamlResult<()> {
        if self.document.trim().is_empty() {
            return Err(SamlError::validation("Blank logout request"));
        }
        Ok(())
    }

    fn validate_id(&self) -> SamlResult<()> {
        match self.id() {
            Some(id) if !id.is_empty() => Ok(()),
            _ => Err(SamlError::validation("Missing ID attribute on Logout Request")),
        }
    }

    fn validate_version(&self) -> SamlResult<()> {
        if self.version().as_deref() == Some(SAML_VERSION) {
            Ok(())
        } else {
            Err(SamlError::validation("Unsupported SAML version"))
        }
    }

    fn validate_structure(&self) -> SamlResult<()> {
        if valid_saml(&self.document, self.settings.soft)? {
            Ok(())
        } else {
            Err(SamlError::validation(
                "Invalid SAML Logout Request. Not match the saml-schema-protocol-2.0.xsd",
            ))
        }
    }

    fn validate_not_on_or_after(&self) -> SamlResult<()> {
        let Some(not_on_or_after) = self.not_on_or_after() else {
            return Ok(());
        };
        let now = Utc::now();
        if seconds(now) < seconds(not_on_or_after) + self.options.effective_clock_drift() {
            return Ok(());
        }

        let drift = self.options.allowed_clock_drift.abs();
        let allowance = if drift > 0.0 {
            format!(" + {}s", drift.ceil())
        } else {
            String::new()
        };
        Err(SamlError::validation(format!(
            "Current time is on or after NotOnOrAfter ({} >= {}{allowance})",
            now.format(HUMAN_TIME),
            not_on_or_after.format(HUMAN_TIME),
        )))
    }

    fn validate_issuer(&self) -> SamlResult<()> {
        check_issuer(self.settings, self.issuer().as_deref())
    }

    fn validate_signature(&self) -> SamlResult<()> {
        check_signature(
            self.settings,
            &self.options,
            SamlMessageType::Request,
            &self.document,
            "Invalid Signature on Logout Request",
        )
    }
}

const HUMAN_TIME: &str = "%Y-%m-%d %H:%M:%S UTC";

#[allow(clippy::cast_precision_loss)]
fn seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / 1000.0
}

/// Reads the `NameID` out of a decrypted payload, which may rely on the
/// `saml` prefix being declared by the enclosing document.
fn decrypted_name_id(plaintext: &str) -> SamlResult<NameId> {
    let wrapped = format!("<wrapper xmlns:saml=\"{SAML_NS}\">{plaintext}</wrapper>");
    let doc = xml::parse(&wrapped)?;
    doc.root_element()
        .descendants()
        .find(|node| xml::is_element(*node, SAML_NS, "NameID"))
        .map(NameId::from_node)
        .ok_or_else(|| SamlError::MissingElement("saml:NameID in EncryptedID".to_string()))
}
