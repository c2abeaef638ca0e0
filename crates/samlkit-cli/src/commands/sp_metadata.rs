//! `sp-metadata`: print the SP metadata document.

use chrono::{Duration, Utc};
use samlkit_protocol::{Settings, SpMetadata};

use crate::cli::SpMetadataArgs;
use crate::CliConfig;

/// Runs the sp-metadata command.
pub fn run_sp_metadata(args: &SpMetadataArgs, config: &CliConfig) -> crate::CliResult<()> {
    let settings = config.settings()?;
    println!("{}", sp_metadata(&settings, args)?);
    Ok(())
}

/// Generates the metadata for `settings`.
pub fn sp_metadata(settings: &Settings, args: &SpMetadataArgs) -> crate::CliResult<String> {
    let mut metadata = SpMetadata::new();
    if let Some(days) = args.valid_days {
        if days <= 0 {
            return Err(crate::CliError::InvalidArgument(format!(
                "--valid-days must be positive, got {days}"
            )));
        }
        metadata = metadata.valid_until(Utc::now() + Duration::days(days));
    }
    if let Some(duration) = &args.cache_duration {
        metadata = metadata.cache_duration(duration.clone());
    }
    Ok(metadata.generate(settings)?)
}
