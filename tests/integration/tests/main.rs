//! End-to-end SAML flows.
//!
//! These tests drive the public API the way an SP and its IdP use it: the
//! IdP side is played by the same builders configured with IdP keys.

mod authn_request;
mod common;
mod idp_logout;
mod metadata;
mod sp_logout;
