//! SAML bindings.
//!
//! - **HTTP-Redirect**: the message is deflated, base64-encoded and sent as
//!   a query parameter; a signature covers the query string
//! - **HTTP-POST**: the message is base64-encoded into an auto-submitting
//!   form; a signature is embedded in the XML
//!
//! Outgoing messages are turned into an ordered parameter list
//! ([`EncodedParams`]) that either binding can carry.

mod post;
mod redirect;

use base64::Engine;
use samlkit_crypto::{signature, DigestAlgorithm};
use serde::Serialize;

pub use post::*;
pub use redirect::*;

use crate::error::SamlResult;
use crate::settings::Settings;
use crate::types::SamlBinding;
use crate::utils::build_query;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// AuthnRequest or LogoutRequest.
    Request,
    /// Response or LogoutResponse.
    Response,
}

impl SamlMessageType {
    /// Returns the parameter name for this message type.
    #[must_use]
    pub const fn form_param(self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Caller supplied parameters of an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    /// Opaque state echoed back by the peer.
    pub relay_state: Option<String>,
    /// Further parameters appended after `RelayState`, in order.
    pub extra: Vec<(String, String)>,
}

impl RequestParams {
    /// Parameters carrying only a relay state.
    #[must_use]
    pub fn with_relay_state(relay_state: impl Into<String>) -> Self {
        Self {
            relay_state: Some(relay_state.into()),
            extra: Vec::new(),
        }
    }

    /// Appends an extra parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }
}

/// Ordered, unescaped parameters of an encoded message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncodedParams(Vec<(String, String)>);

impl EncodedParams {
    /// Appends a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over the parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An outgoing message ready to be encoded for a binding.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Outgoing<'a> {
    pub message_type: SamlMessageType,
    pub xml: &'a str,
    pub binding: &'a str,
    pub compress: bool,
    pub sign: bool,
}

/// Encodes a message into binding parameters.
///
/// The message is deflated only for the redirect binding with compression
/// enabled. For the redirect binding with signing enabled and an SP key
/// configured, `SigAlg` and `Signature` are appended; the signature covers
/// the query built from the base64 message, the relay state and the
/// configured signature method.
pub(crate) fn encode_params(
    settings: &Settings,
    message: Outgoing<'_>,
    params: &RequestParams,
) -> SamlResult<EncodedParams> {
    let redirect = message.binding == SamlBinding::HttpRedirect.uri();
    let data = if redirect && message.compress {
        deflate(message.xml.as_bytes())?
    } else {
        message.xml.as_bytes().to_vec()
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);

    let mut out = EncodedParams::default();
    out.push(message.message_type.form_param(), encoded.clone());
    if let Some(relay_state) = &params.relay_state {
        out.push("RelayState", relay_state.clone());
    }
    for (name, value) in &params.extra {
        out.push(name.clone(), value.clone());
    }

    if redirect && message.sign {
        if let Some(key) = settings.get_sp_signing_key()? {
            let sig_alg = settings.security.signature_method.as_str();
            let query = build_query(
                message.message_type,
                &encoded,
                params.relay_state.as_deref(),
                sig_alg,
            );
            let digest = DigestAlgorithm::from_identifier(sig_alg);
            let signed = signature::sign(&key, digest, query.as_bytes())?;
            out.push("SigAlg", sig_alg);
            out.push(
                "Signature",
                base64::engine::general_purpose::STANDARD.encode(signed),
            );
            tracing::debug!(sig_alg, "signed redirect binding query");
        }
    }

    Ok(out)
}
