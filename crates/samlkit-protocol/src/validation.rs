//! Validation pipeline shared by the incoming message types.
//!
//! Each check returns `Ok(())` or a validation error carrying its message.
//! [`run_checks`] runs them in order and stops at the first failure, unless
//! the settings are soft and the caller asked to collect every error.
//! Errors that are not validation errors (configuration, crypto) always
//! stop the pipeline and propagate.

use samlkit_crypto::{is_cert_expired, X509};

use crate::bindings::{RedirectParams, SamlMessageType};
use crate::error::{SamlError, SamlResult, ValidationErrors};
use crate::settings::Settings;
use crate::signature::{has_signature, XmlSignatureValidator};
use crate::utils::{build_query_from_raw_parts, unescape, uri_match, verify_signature};
use crate::xml;

/// Options for validating an incoming message.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Parameters of the HTTP-Redirect request that carried the message.
    /// When they include a `Signature`, it is verified over the raw query.
    pub get_params: Option<RedirectParams>,
    /// Seconds of clock skew tolerated on time checks.
    pub allowed_clock_drift: f64,
    /// Accept signed messages when no IdP certificate is configured.
    pub relax_signature_validation: bool,
    /// ID of the request a response must answer.
    pub matches_request_id: Option<String>,
}

impl ValidationOptions {
    /// Sets the redirect parameters.
    #[must_use]
    pub fn with_get_params(mut self, params: RedirectParams) -> Self {
        self.get_params = Some(params);
        self
    }

    /// Sets the tolerated clock skew in seconds.
    #[must_use]
    pub const fn with_allowed_clock_drift(mut self, seconds: f64) -> Self {
        self.allowed_clock_drift = seconds;
        self
    }

    /// Accepts signatures that cannot be checked for lack of an IdP
    /// certificate.
    #[must_use]
    pub const fn relax_signature_validation(mut self) -> Self {
        self.relax_signature_validation = true;
        self
    }

    /// Requires `InResponseTo` to equal `id`.
    #[must_use]
    pub fn matches_request_id(mut self, id: impl Into<String>) -> Self {
        self.matches_request_id = Some(id.into());
        self
    }

    /// Clock drift as used in comparisons: the absolute drift plus
    /// `f64::EPSILON`. The epsilon only survives the addition for drifts
    /// below one; a larger drift rounds to itself.
    #[must_use]
    pub fn effective_clock_drift(&self) -> f64 {
        self.allowed_clock_drift.abs() + f64::EPSILON
    }
}

/// One step of a validation pipeline.
pub(crate) type Check<T> = fn(&T) -> SamlResult<()>;

/// Runs checks in order.
pub(crate) fn run_checks<T>(
    target: &T,
    checks: &[(&str, Check<T>)],
    soft: bool,
    collect_errors: bool,
) -> SamlResult<()> {
    let mut errors = ValidationErrors::new();
    for (name, check) in checks {
        match check(target) {
            Ok(()) => tracing::debug!(check = *name, "validation step passed"),
            Err(SamlError::Validation(failed)) => {
                tracing::debug!(check = *name, errors = %failed, "validation step failed");
                errors.extend(failed);
                if !(soft && collect_errors) {
                    break;
                }
            }
            Err(other) => return Err(other),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

/// Turns a pipeline result into the soft or strict `is_valid` answer.
pub(crate) fn soft_or_strict(result: SamlResult<()>, soft: bool) -> SamlResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(SamlError::Validation(errors)) if soft => {
            tracing::debug!(%errors, "message rejected");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Fails if a present issuer does not match the configured IdP entity ID.
pub(crate) fn check_issuer(settings: &Settings, issuer: Option<&str>) -> SamlResult<()> {
    let (Some(expected), Some(issuer)) = (settings.idp_entity_id.as_deref(), issuer) else {
        return Ok(());
    };
    if uri_match(issuer, expected) {
        Ok(())
    } else {
        Err(SamlError::validation(format!(
            "Doesn't match the issuer, expected: <{expected}>, but was: <{issuer}>"
        )))
    }
}

/// Verifies the signature of an incoming message.
///
/// A `Signature` among the redirect parameters is checked over the raw
/// query. Without one, an enveloped signature in the document is checked.
/// Unsigned messages pass.
pub(crate) fn check_signature(
    settings: &Settings,
    options: &ValidationOptions,
    message_type: SamlMessageType,
    message: &str,
    invalid_message: &str,
) -> SamlResult<()> {
    if let Some(params) = options.get_params.as_ref().filter(|p| p.signature.is_some()) {
        return check_redirect_signature(settings, options, params, message_type, invalid_message);
    }
    match xml::parse(message) {
        Ok(doc) if has_signature(&doc) => {
            check_embedded_signature(settings, options, message, invalid_message)
        }
        _ => Ok(()),
    }
}

fn check_redirect_signature(
    settings: &Settings,
    options: &ValidationOptions,
    params: &RedirectParams,
    message_type: SamlMessageType,
    invalid_message: &str,
) -> SamlResult<()> {
    let certs = settings.idp_signing_certs()?;
    if certs.is_empty() {
        return without_certificates(options);
    }

    let raw = params.prepare_raw_get_params(settings.security.lowercase_url_encoding);
    let sig_alg = params
        .sig_alg
        .clone()
        .or_else(|| raw.sig_alg.as_deref().map(unescape))
        .unwrap_or_default();
    let query = build_query_from_raw_parts(
        message_type,
        raw.message(message_type).unwrap_or_default(),
        raw.relay_state.as_deref(),
        raw.sig_alg.as_deref().unwrap_or_default(),
    );
    let signature = params.signature.as_deref().unwrap_or_default();

    let mut matched = None;
    for cert in &certs {
        if verify_signature(cert, &sig_alg, signature, &query)? {
            matched = Some(cert);
            break;
        }
    }
    accept_signer(settings, matched, invalid_message)
}

fn check_embedded_signature(
    settings: &Settings,
    options: &ValidationOptions,
    message: &str,
    invalid_message: &str,
) -> SamlResult<()> {
    let certs = settings.idp_signing_certs()?;
    if certs.is_empty() {
        return without_certificates(options);
    }
    match XmlSignatureValidator::new(certs).validate(message) {
        Ok(cert) => accept_signer(settings, Some(&cert), invalid_message),
        Err(SamlError::Validation(reason)) => {
            tracing::debug!(%reason, "embedded signature rejected");
            accept_signer(settings, None, invalid_message)
        }
        Err(err) => Err(err),
    }
}

fn without_certificates(options: &ValidationOptions) -> SamlResult<()> {
    if options.relax_signature_validation {
        tracing::debug!("no IdP certificate, signature accepted unchecked");
        Ok(())
    } else {
        Err(SamlError::validation(
            "No IdP certificate available to validate the signature",
        ))
    }
}

fn accept_signer(
    settings: &Settings,
    matched: Option<&X509>,
    invalid_message: &str,
) -> SamlResult<()> {
    let Some(cert) = matched else {
        tracing::warn!("signature rejected");
        return Err(SamlError::validation(invalid_message));
    };
    if settings.security.check_idp_cert_expiration && is_cert_expired(cert)? {
        tracing::warn!("signature made with an expired IdP certificate");
        return Err(SamlError::validation("IdP x509 certificate expired"));
    }
    Ok(())
}
