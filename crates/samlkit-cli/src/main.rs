//! # samlkit
//!
//! Command-line tools for SAML 2.0 Service Providers.

#![forbid(unsafe_code)]

use clap::Parser;
use samlkit_cli::{
    cli::{Cli, Command},
    commands::{run_decode, run_keygen, run_login, run_logout, run_metadata, run_sp_metadata},
    config::CliConfig,
    output::error,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CliConfig::new(cli.settings, cli.output);

    let result = match &cli.command {
        Command::Login(args) => run_login(args, &config),
        Command::Logout(args) => run_logout(args, &config),
        Command::Decode(args) => run_decode(args, &config),
        Command::Metadata(args) => run_metadata(args, &config).await,
        Command::SpMetadata(args) => run_sp_metadata(args, &config),
        Command::Keygen(args) => run_keygen(args),
    };

    if let Err(e) = result {
        error(&e.to_string());
        std::process::exit(1);
    }
}
