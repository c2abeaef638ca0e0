//! SAML error types.
//!
//! Validation failures are collected in [`ValidationErrors`] and surface as
//! [`SamlError::Validation`]; configuration, cryptographic and transport
//! failures have their own variants and always propagate.

use std::fmt;

use samlkit_crypto::CryptoError;
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Settings are missing a required value or are contradictory.
    #[error("invalid settings: {0}")]
    Setting(String),

    /// A message failed one or more validation checks.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Key, certificate or cipher failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Remote metadata could not be fetched.
    #[error("failed to fetch idp metadata: {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Reason phrase or body excerpt.
        message: String,
    },

    /// Connection level failure of the HTTP client.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// XML could not be parsed.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// A required element or attribute is absent.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// String is not an ISO 8601 duration.
    #[error("invalid ISO 8601 duration: {0}")]
    InvalidDuration(String),

    /// Algorithm URI is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// XML signature could not be created.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),
}

impl SamlError {
    /// Creates a validation error with a single message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(message))
    }

    /// Returns the collected validation messages, if this is a validation
    /// error.
    #[must_use]
    pub const fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Returns the HTTP status a host application should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::XmlParse(_)
            | Self::MissingElement(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_) => 400,
            Self::Http { .. } | Self::Transport(_) => 502,
            _ => 500,
        }
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<roxmltree::Error> for SamlError {
    fn from(err: roxmltree::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}

impl From<toml::de::Error> for SamlError {
    fn from(err: toml::de::Error) -> Self {
        Self::Setting(err.to_string())
    }
}

/// Ordered list of human readable validation failures.
///
/// Messages are meant for logs. They can echo attacker controlled values
/// (issuers, destinations) and should not be shown to end users verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a list holding one message.
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    /// Appends a message.
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Appends every message of another list.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Returns true if no message was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the messages in the order they were recorded.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// Returns true if any message contains the given text.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.0.iter().any(|message| message.contains(text))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "validation failed"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => write!(f, "{first} (and {} more)", rest.len()),
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
