//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error from the SAML library.
    #[error(transparent)]
    Saml(#[from] samlkit_protocol::SamlError),

    /// Key or certificate generation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl From<samlkit_crypto::CryptoError> for CliError {
    fn from(err: samlkit_crypto::CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
