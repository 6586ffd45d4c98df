//! Application settings loaded from config.toml
//!
//! The file is optional. It can override the database location, choose how item
//! lists are ordered, and declare sheets that should exist on first run.

use crate::core::item::{ItemOrder, SortDirection, SortKey};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Overrides `DATABASE_URL` when present
    #[serde(default)]
    pub database_url: Option<String>,
    /// Display preferences
    #[serde(default)]
    pub display: DisplayConfig,
    /// Sheets to create when missing
    #[serde(default)]
    pub sheets: Vec<SheetSeed>,
}

/// How item lists are ordered
#[derive(Debug, Default, Deserialize, Clone, Copy)]
pub struct DisplayConfig {
    /// Field to sort items by
    #[serde(default)]
    pub sort_by: SortKey,
    /// Ascending or descending
    #[serde(default)]
    pub sort_order: SortDirection,
}

impl DisplayConfig {
    /// The item ordering described by this configuration.
    #[must_use]
    pub const fn item_order(&self) -> ItemOrder {
        ItemOrder {
            key: self.sort_by,
            direction: self.sort_order,
        }
    }
}

/// A sheet declared in config.toml
#[derive(Debug, Deserialize, Clone)]
pub struct SheetSeed {
    /// Sheet name; seeding is skipped when a sheet with this name exists
    pub name: String,
    /// Optional notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Contributor names
    #[serde(default)]
    pub contributors: Vec<String>,
}

/// Loads the configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads config.toml from the working directory, falling back to defaults when the
/// file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config(DEFAULT_CONFIG_PATH)
    } else {
        tracing::info!("No {DEFAULT_CONFIG_PATH} found, using default configuration");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            database_url = "sqlite::memory:"

            [display]
            sort_by = "amount"
            sort_order = "ascending"

            [[sheets]]
            name = "Ski trip"
            notes = "February"
            contributors = ["Alice", "Bob", "Carol"]

            [[sheets]]
            name = "Flat"
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.display.sort_by, SortKey::Amount);
        assert_eq!(config.display.sort_order, SortDirection::Ascending);
        assert_eq!(config.sheets.len(), 2);
        assert_eq!(config.sheets[0].contributors, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(config.sheets[0].notes.as_deref(), Some("February"));
        assert!(config.sheets[1].contributors.is_empty());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(config.database_url.is_none());
        assert!(config.sheets.is_empty());
        assert_eq!(config.display.item_order(), ItemOrder::default());
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let result = parse_config("[display]\nsort_by = \"colour\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
