//! `login`: AuthnRequest redirect URL.

use samlkit_protocol::{Authrequest, RequestParams, Settings};

use crate::cli::LoginArgs;
use crate::output::info;
use crate::CliConfig;

/// Runs the login command.
pub fn run_login(args: &LoginArgs, config: &CliConfig) -> crate::CliResult<()> {
    let settings = config.settings()?;
    let request = Authrequest::new();
    let url = login_url(&request, &settings, args)?;
    info(&format!("AuthnRequest ID: {}", request.request_id()));
    println!("{url}");
    Ok(())
}

/// Builds the redirect URL for `request`.
pub fn login_url(
    request: &Authrequest,
    settings: &Settings,
    args: &LoginArgs,
) -> crate::CliResult<String> {
    let params = RequestParams {
        relay_state: args.relay_state.clone(),
        ..RequestParams::default()
    };
    Ok(request.create(settings, &params)?)
}
