//! SAML 2.0 protocol messages for a Service Provider.
//!
//! This crate builds and checks the messages an SP exchanges with an
//! Identity Provider:
//!
//! - **AuthnRequest** - start a login ([`Authrequest`])
//! - **SP-initiated logout** - send a `LogoutRequest` ([`Logoutrequest`])
//!   and check the IdP's answer ([`Logoutresponse`])
//! - **IdP-initiated logout** - check an incoming `LogoutRequest`
//!   ([`SloLogoutrequest`]) and answer it ([`SloLogoutresponse`])
//! - **Metadata** - read IdP metadata into [`Settings`]
//!   ([`IdpMetadataParser`]) and publish SP metadata ([`SpMetadata`])
//!
//! # Architecture
//!
//! - [`settings`] - SP/IdP configuration and certificate resolution
//! - [`bindings`] - HTTP-Redirect and HTTP-POST encoding
//! - [`message`] - base64/deflate transport encoding and schema checks
//! - [`signature`] - embedded XML signatures
//! - [`types`] - protocol message structures and constants
//! - [`utils`] - query signing, decryption, durations and ID generation
//! - [`error`] - error types
//!
//! # Example
//!
//! ```rust,ignore
//! use samlkit_protocol::{Authrequest, RequestParams, Settings};
//!
//! let settings = Settings::from_file("sp.toml")?;
//! let url = Authrequest::new().create(&settings, &RequestParams::with_relay_state("/home"))?;
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Metadata](https://docs.oasis-open.org/security/saml/v2.0/saml-metadata-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authrequest;
pub mod bindings;
pub mod error;
pub mod idp_metadata_parser;
pub mod logoutrequest;
pub mod logoutresponse;
pub mod message;
pub mod schema;
pub mod settings;
pub mod signature;
pub mod slo_logoutrequest;
pub mod slo_logoutresponse;
pub mod sp_metadata;
pub mod types;
pub mod utils;
pub mod validation;
pub mod xml;

#[cfg(test)]
mod test_support;

pub use authrequest::Authrequest;
pub use bindings::{
    EncodedParams, HttpPostBinding, HttpRedirectBinding, RedirectParams, RequestParams,
    SamlMessageType,
};
pub use error::{SamlError, SamlResult, ValidationErrors};
pub use idp_metadata_parser::{IdpMetadata, IdpMetadataParser, ParseOptions};
pub use logoutrequest::Logoutrequest;
pub use logoutresponse::Logoutresponse;
pub use settings::{IdpCertMulti, SecuritySettings, Settings, SpCertEntry, SpCertMulti};
pub use slo_logoutrequest::SloLogoutrequest;
pub use slo_logoutresponse::SloLogoutresponse;
pub use sp_metadata::SpMetadata;
pub use utils::{IdGenerator, UuidGenerator};
pub use validation::ValidationOptions;
