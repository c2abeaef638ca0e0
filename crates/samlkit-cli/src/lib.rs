//! # samlkit-cli
//!
//! Command line front end for `samlkit-protocol`.
//!
//! This crate provides command-line utilities for:
//! - Building AuthnRequest and LogoutRequest redirect URLs from a settings file
//! - Decoding captured SAMLRequest/SAMLResponse values
//! - Fetching IdP metadata and converting it into settings
//! - Emitting SP metadata and generating SP key pairs

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
