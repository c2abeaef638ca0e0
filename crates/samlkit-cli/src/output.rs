//! Output formatting utilities.
//!
//! Results go to stdout; status messages go to stderr so results can be
//! piped.

use serde::Serialize;

use crate::config::OutputFormat;

/// Prints a success message.
pub fn success(message: &str) {
    eprintln!("ok: {message}");
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("error: {message}");
}

/// Prints an info message.
pub fn info(message: &str) {
    eprintln!("{message}");
}

/// Renders an item in the given format.
///
/// TOML has no null and no top-level arrays: absent values are dropped and
/// sequences are wrapped in a table under `key`.
pub fn render<T: Serialize>(item: &T, key: &str, format: OutputFormat) -> crate::CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(item)?),
        OutputFormat::Toml => {
            let mut value = serde_json::to_value(item)?;
            strip_nulls(&mut value);
            if value.is_array() {
                let mut table = serde_json::Map::new();
                table.insert(key.to_string(), value);
                value = serde_json::Value::Object(table);
            }
            Ok(toml::to_string_pretty(&value)?)
        }
    }
}

fn strip_nulls(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Prints an item in the given format.
pub fn output_single<T: Serialize>(item: &T, key: &str, format: OutputFormat) -> crate::CliResult<()> {
    println!("{}", render(item, key, format)?);
    Ok(())
}
