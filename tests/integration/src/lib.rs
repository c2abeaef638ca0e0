//! End-to-end SAML flows across the samlkit crates.
//!
//! The scenarios live under `tests/`; this library target is empty.
