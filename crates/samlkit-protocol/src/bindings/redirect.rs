//! HTTP-Redirect binding.

use std::io::{Read, Write};
use std::sync::LazyLock;

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use regex::Regex;

use super::{EncodedParams, SamlMessageType};
use crate::error::{SamlError, SamlResult};
use crate::utils::{escape, unescape};

static PERCENT_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[A-Fa-f0-9]{2}").expect("percent escape pattern is valid"));

/// HTTP-Redirect binding helpers.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Builds the redirect URL for an encoded message.
    ///
    /// Parameters are appended in order with `?` or, when the destination
    /// already has a query, `&`.
    #[must_use]
    pub fn url(destination: &str, params: &EncodedParams) -> String {
        let mut url = destination.to_string();
        let mut separator = if destination.contains('?') { '&' } else { '?' };
        for (name, value) in params.iter() {
            url.push(separator);
            url.push_str(name);
            url.push('=');
            url.push_str(&escape(value));
            separator = '&';
        }
        url
    }

    /// Extracts the binding parameters from a full URL.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Setting`] for an unparsable URL.
    pub fn parse_url(url: &str) -> SamlResult<RedirectParams> {
        let parsed =
            url::Url::parse(url).map_err(|e| SamlError::Setting(format!("invalid URL: {e}")))?;
        Ok(RedirectParams::from_query(parsed.query().unwrap_or_default()))
    }
}

/// Values of the binding parameters as they arrived on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRedirectParams {
    /// `SAMLRequest`, still percent-encoded.
    pub saml_request: Option<String>,
    /// `SAMLResponse`, still percent-encoded.
    pub saml_response: Option<String>,
    /// `RelayState`, still percent-encoded.
    pub relay_state: Option<String>,
    /// `SigAlg`, still percent-encoded.
    pub sig_alg: Option<String>,
}

impl RawRedirectParams {
    /// Returns the raw message parameter of the given type.
    #[must_use]
    pub fn message(&self, message_type: SamlMessageType) -> Option<&str> {
        match message_type {
            SamlMessageType::Request => self.saml_request.as_deref(),
            SamlMessageType::Response => self.saml_response.as_deref(),
        }
    }
}

/// Received HTTP-Redirect parameters, decoded, with the raw forms kept for
/// signature verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectParams {
    /// Decoded `SAMLRequest`.
    pub saml_request: Option<String>,
    /// Decoded `SAMLResponse`.
    pub saml_response: Option<String>,
    /// Decoded `RelayState`.
    pub relay_state: Option<String>,
    /// Decoded `SigAlg`.
    pub sig_alg: Option<String>,
    /// Decoded `Signature`.
    pub signature: Option<String>,
    /// Raw forms, where known.
    pub raw: RawRedirectParams,
}

impl RedirectParams {
    /// Parses a query string, keeping the raw value of each parameter.
    ///
    /// The first occurrence of a repeated parameter wins.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let (decoded, raw_slot) = match name {
                "SAMLRequest" => (&mut params.saml_request, Some(&mut params.raw.saml_request)),
                "SAMLResponse" => (&mut params.saml_response, Some(&mut params.raw.saml_response)),
                "RelayState" => (&mut params.relay_state, Some(&mut params.raw.relay_state)),
                "SigAlg" => (&mut params.sig_alg, Some(&mut params.raw.sig_alg)),
                "Signature" => (&mut params.signature, None),
                _ => continue,
            };
            if decoded.is_some() {
                continue;
            }
            *decoded = Some(unescape(raw));
            if let Some(slot) = raw_slot {
                *slot = Some(raw.to_string());
            }
        }
        params
    }

    /// Returns the decoded message parameter of the given type.
    #[must_use]
    pub fn message(&self, message_type: SamlMessageType) -> Option<&str> {
        match message_type {
            SamlMessageType::Request => self.saml_request.as_deref(),
            SamlMessageType::Response => self.saml_response.as_deref(),
        }
    }

    /// Completes the raw parameters from the decoded ones.
    ///
    /// Raw values that were not captured are re-escaped from the decoded
    /// values; with `lowercase_url_encoding` the re-escaped percent escapes
    /// use lowercase hex, matching senders that encode that way. Captured
    /// raw values are never altered.
    #[must_use]
    pub fn prepare_raw_get_params(&self, lowercase_url_encoding: bool) -> RawRedirectParams {
        let fill = |raw: &Option<String>, decoded: &Option<String>| {
            raw.clone().or_else(|| {
                decoded
                    .as_deref()
                    .map(|value| escape_request_param(value, lowercase_url_encoding))
            })
        };
        RawRedirectParams {
            saml_request: fill(&self.raw.saml_request, &self.saml_request),
            saml_response: fill(&self.raw.saml_response, &self.saml_response),
            relay_state: fill(&self.raw.relay_state, &self.relay_state),
            sig_alg: fill(&self.raw.sig_alg, &self.sig_alg),
        }
    }
}

fn escape_request_param(value: &str, lowercase_url_encoding: bool) -> String {
    let escaped = escape(value);
    if lowercase_url_encoding {
        PERCENT_ESCAPE
            .replace_all(&escaped, |caps: &regex::Captures<'_>| caps[0].to_lowercase())
            .into_owned()
    } else {
        escaped
    }
}

/// Compresses data with raw DEFLATE at the best compression level.
///
/// # Errors
///
/// Returns [`SamlError::Deflate`] if compression fails.
pub fn deflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses raw DEFLATE data, reading at most `max_bytes` bytes.
///
/// # Errors
///
/// Returns a validation error if the output would exceed `max_bytes`, and
/// [`SamlError::Deflate`] for corrupt input.
pub fn inflate(data: &[u8], max_bytes: usize) -> SamlResult<Vec<u8>> {
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut decoder = DeflateDecoder::new(data).take(limit);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    if out.len() > max_bytes {
        return Err(SamlError::validation(format!(
            "SAML Message exceeds {max_bytes} bytes, so was rejected"
        )));
    }
    Ok(out)
}
