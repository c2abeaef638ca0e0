//! `metadata`: read IdP metadata from a URL or file.

use samlkit_protocol::{IdpMetadataParser, ParseOptions, Settings};

use crate::cli::MetadataArgs;
use crate::config::OutputFormat;
use crate::output::{output_single, success};
use crate::CliConfig;

/// Runs the metadata command.
///
/// JSON output prints the parsed records. TOML output prints settings,
/// merged into the `--settings` file when one is given, ready to be saved
/// as a new settings file.
pub async fn run_metadata(args: &MetadataArgs, config: &CliConfig) -> crate::CliResult<()> {
    let parser = IdpMetadataParser::new();
    let document = load(&parser, args).await?;
    let options = parse_options(args);

    match config.output {
        OutputFormat::Json if args.all => {
            let records = parser.parse_to_array(&document, &options)?;
            success(&format!("found {} IdP descriptor(s)", records.len()));
            output_single(&records, "idp", config.output)
        }
        OutputFormat::Json => {
            let record = parser.parse_to_hash(&document, &options)?;
            output_single(&record, "idp", config.output)
        }
        OutputFormat::Toml => {
            let settings = merged_settings(&parser, &document, &options, config.settings_or_default()?)?;
            output_single(&settings, "settings", config.output)
        }
    }
}

/// Reads the metadata document from an http(s) URL or a file.
pub async fn load(parser: &IdpMetadataParser, args: &MetadataArgs) -> crate::CliResult<String> {
    if args.source.starts_with("http://") || args.source.starts_with("https://") {
        Ok(parser.fetch(&args.source, !args.no_validate_cert).await?)
    } else {
        Ok(std::fs::read_to_string(&args.source)?)
    }
}

/// Selection options from the command line.
#[must_use]
pub fn parse_options(args: &MetadataArgs) -> ParseOptions {
    let options = ParseOptions::default()
        .sso_binding(&args.sso_binding)
        .slo_binding(&args.slo_binding)
        .name_id_format(args.name_id_format.iter().cloned());
    match &args.entity_id {
        Some(entity_id) => options.entity_id(entity_id.clone()),
        None => options,
    }
}

/// Merges the IdP values of `document` into `base`.
pub fn merged_settings(
    parser: &IdpMetadataParser,
    document: &str,
    options: &ParseOptions,
    mut base: Settings,
) -> crate::CliResult<Settings> {
    parser.parse_into(document, options, &mut base)?;
    Ok(base)
}
