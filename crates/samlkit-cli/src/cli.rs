//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::OutputFormat;

/// samlkit - build and inspect SAML 2.0 messages for a Service Provider.
#[derive(Debug, Parser)]
#[command(name = "samlkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// SP settings file (TOML).
    #[arg(short, long, global = true, env = "SAMLKIT_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Output format for structured results.
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the AuthnRequest redirect URL.
    Login(LoginArgs),

    /// Print the LogoutRequest redirect URL.
    Logout(LogoutArgs),

    /// Decode a captured SAMLRequest or SAMLResponse.
    Decode(DecodeArgs),

    /// Parse IdP metadata from a URL or file.
    Metadata(MetadataArgs),

    /// Print SP metadata.
    SpMetadata(SpMetadataArgs),

    /// Generate an RSA key and self-signed certificate.
    Keygen(KeygenArgs),
}

/// Arguments of `login`.
#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// RelayState to send along.
    #[arg(long)]
    pub relay_state: Option<String>,
}

/// Arguments of `logout`.
#[derive(Debug, Clone, Args)]
pub struct LogoutArgs {
    /// NameID of the user to log out (overrides settings).
    #[arg(long)]
    pub name_id: Option<String>,

    /// SessionIndex to terminate (overrides settings).
    #[arg(long)]
    pub session_index: Option<String>,

    /// RelayState to send along.
    #[arg(long)]
    pub relay_state: Option<String>,
}

/// Arguments of `decode`.
#[derive(Debug, Clone, Args)]
pub struct DecodeArgs {
    /// A base64 message, or a full HTTP-Redirect URL carrying one.
    pub value: String,

    /// Largest accepted message, in bytes (defaults to the settings value).
    #[arg(long)]
    pub max_bytes: Option<usize>,
}

/// Arguments of `metadata`.
#[derive(Debug, Clone, Args)]
pub struct MetadataArgs {
    /// http(s) URL or path of the metadata document.
    pub source: String,

    /// Only read this entity.
    #[arg(long)]
    pub entity_id: Option<String>,

    /// Preferred SSO binding; repeat to rank several.
    #[arg(long = "sso-binding")]
    pub sso_binding: Vec<String>,

    /// Preferred SLO binding; repeat to rank several.
    #[arg(long = "slo-binding")]
    pub slo_binding: Vec<String>,

    /// Preferred NameID format; repeat to rank several.
    #[arg(long = "name-id-format")]
    pub name_id_format: Vec<String>,

    /// Print every IdP descriptor instead of the first.
    #[arg(long)]
    pub all: bool,

    /// Skip TLS certificate verification when fetching.
    #[arg(long)]
    pub no_validate_cert: bool,
}

/// Arguments of `sp-metadata`.
#[derive(Debug, Clone, Args)]
pub struct SpMetadataArgs {
    /// Days from now until the metadata expires (`validUntil`).
    #[arg(long)]
    pub valid_days: Option<i64>,

    /// `cacheDuration` to publish, e.g. `PT604800S`.
    #[arg(long)]
    pub cache_duration: Option<String>,
}

/// Arguments of `keygen`.
#[derive(Debug, Clone, Args)]
pub struct KeygenArgs {
    /// Certificate common name.
    #[arg(long, default_value = "samlkit")]
    pub cn: String,

    /// RSA key size.
    #[arg(long, default_value_t = 2048)]
    pub bits: u32,

    /// Certificate validity in days.
    #[arg(long, default_value_t = 365)]
    pub days: i64,

    /// Directory to write `sp.key` and `sp.crt` to; prints them when absent.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "samlkit",
            "logout",
            "--name-id",
            "user@example.com",
            "--settings",
            "sp.toml",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.settings, Some(PathBuf::from("sp.toml")));
        match cli.command {
            Command::Logout(args) => assert_eq!(args.name_id.as_deref(), Some("user@example.com")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn repeated_bindings_keep_their_order() {
        let cli = Cli::try_parse_from([
            "samlkit",
            "metadata",
            "idp.xml",
            "--sso-binding",
            "redirect",
            "--sso-binding",
            "post",
            "-o",
            "toml",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Toml));
        match cli.command {
            Command::Metadata(args) => assert_eq!(args.sso_binding, ["redirect", "post"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn keygen_defaults() {
        let cli = Cli::try_parse_from(["samlkit", "keygen"]).unwrap();
        match cli.command {
            Command::Keygen(args) => {
                assert_eq!(args.bits, 2048);
                assert_eq!(args.days, 365);
                assert!(args.out_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
