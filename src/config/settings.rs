//! Application settings loaded from `config.toml`.
//!
//! Every key is optional; a missing file yields the defaults so the bot can run
//! with nothing but a token and a database URL.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Ledger behaviour
    #[serde(default)]
    pub ledger: LedgerSettings,
}

/// The `[ledger]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Symbol printed before amounts in replies
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// How long an approved unlock lasts before the month relocks; 0 keeps it
    /// unlocked until someone locks it again
    #[serde(default = "default_unlock_window_hours")]
    pub unlock_window_hours: u32,
}

fn default_currency_symbol() -> String {
    "৳".to_string()
}

const fn default_unlock_window_hours() -> u32 {
    48
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            unlock_window_hours: default_unlock_window_hours(),
        }
    }
}

impl LedgerSettings {
    /// Relock window to apply when an unlock is granted, if any.
    #[must_use]
    pub fn unlock_window(&self) -> Option<chrono::Duration> {
        (self.unlock_window_hours > 0)
            .then(|| chrono::Duration::hours(i64::from(self.unlock_window_hours)))
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `CONFIG_PATH` (default `./config.toml`), falling back to
/// defaults when the file does not exist.
pub fn load_default_config() -> Result<Settings> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        warn!("{} not found, using default settings", path);
        return Ok(Settings::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [ledger]
            currency_symbol = "Tk"
            unlock_window_hours = 12
        "#;

        let settings = parse_config(toml_str).unwrap();
        assert_eq!(settings.ledger.currency_symbol, "Tk");
        assert_eq!(settings.ledger.unlock_window_hours, 12);
        assert_eq!(
            settings.ledger.unlock_window(),
            Some(chrono::Duration::hours(12))
        );
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let settings = parse_config("").unwrap();
        assert_eq!(settings.ledger.currency_symbol, "৳");
        assert_eq!(settings.ledger.unlock_window_hours, 48);

        let settings = parse_config("[ledger]\nunlock_window_hours = 0\n").unwrap();
        assert!(settings.ledger.unlock_window().is_none());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = parse_config("[ledger\ncurrency_symbol = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
