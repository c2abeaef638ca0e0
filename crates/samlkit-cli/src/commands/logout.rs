//! `logout`: LogoutRequest redirect URL.

use samlkit_protocol::{Logoutrequest, RequestParams, Settings};

use crate::cli::LogoutArgs;
use crate::output::info;
use crate::CliConfig;

/// Runs the logout command.
pub fn run_logout(args: &LogoutArgs, config: &CliConfig) -> crate::CliResult<()> {
    let settings = config.settings()?;
    let request = Logoutrequest::new();
    let url = logout_url(&request, settings, args)?;
    info(&format!("LogoutRequest ID: {}", request.request_id()));
    println!("{url}");
    Ok(())
}

/// Builds the redirect URL for `request`, with the subject and session
/// from `args` taking precedence over the settings.
pub fn logout_url(
    request: &Logoutrequest,
    mut settings: Settings,
    args: &LogoutArgs,
) -> crate::CliResult<String> {
    if let Some(name_id) = &args.name_id {
        settings.name_identifier_value = Some(name_id.clone());
    }
    if let Some(index) = &args.session_index {
        settings.sessionindex = Some(index.clone());
    }
    let params = RequestParams {
        relay_state: args.relay_state.clone(),
        ..RequestParams::default()
    };
    Ok(request.create(&settings, &params)?)
}
