//! SAML 2.0 message types.
//!
//! Plain data structures for the protocol messages this crate writes,
//! together with their XML serialisation.

pub mod authn_request;
pub mod constants;
pub mod logout;
pub mod name_id;
pub mod status;

pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use name_id::*;
pub use status::*;
