//! CLI configuration.

use std::path::{Path, PathBuf};

use samlkit_protocol::Settings;
use serde::{Deserialize, Serialize};

use crate::{CliError, CliResult};

/// Resolved invocation context shared by the commands.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Settings file given on the command line or in `SAMLKIT_SETTINGS`.
    pub settings_path: Option<PathBuf>,
    /// Output format for structured results.
    pub output: OutputFormat,
}

impl CliConfig {
    /// Creates the context.
    #[must_use]
    pub const fn new(settings_path: Option<PathBuf>, output: OutputFormat) -> Self {
        Self {
            settings_path,
            output,
        }
    }

    /// Loads the SP settings, failing when no file was given.
    pub fn settings(&self) -> CliResult<Settings> {
        let path = self.settings_path.as_deref().ok_or_else(|| {
            CliError::Config("no settings file (use --settings or SAMLKIT_SETTINGS)".to_string())
        })?;
        load_settings(path)
    }

    /// Loads the SP settings when a file was given, else the defaults.
    pub fn settings_or_default(&self) -> CliResult<Settings> {
        match self.settings_path.as_deref() {
            Some(path) => load_settings(path),
            None => Ok(Settings::default()),
        }
    }
}

/// Reads a settings file.
pub fn load_settings(path: &Path) -> CliResult<Settings> {
    tracing::debug!(path = %path.display(), "loading settings");
    Ok(Settings::from_file(path)?)
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format.
    #[default]
    Json,
    /// TOML format, loadable as settings.
    Toml,
}
