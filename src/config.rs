//! `schema-upgrade.toml` configuration.
//!
//! ```toml
//! [database]
//! url = "postgresql://localhost:5432/app?schema=tenant"
//!
//! [output]
//! format = "json"
//! breaking = false
//! ```
//!
//! Command-line flags override every value read here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{UpgradeError, UpgradeResult};

/// Looked up in the working directory.
pub const FILE_NAME: &str = "schema-upgrade.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: DatabaseConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL, used to name the Postgres schema.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: Option<Format>,
    /// Include breaking operations in the report.
    pub breaking: Option<bool>,
}

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl Config {
    pub fn parse(content: &str) -> UpgradeResult<Self> {
        toml::from_str(content).map_err(|e| UpgradeError::Config(e.to_string()))
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> UpgradeResult<Self> {
        debug!(path = %path.display(), "loading config");
        let content = fs::read_to_string(path)
            .map_err(|e| UpgradeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Find and read the configuration for `dir`.
    ///
    /// Tries `dir/schema-upgrade.toml`, then the user config directory.
    /// Falls back to defaults when neither exists.
    pub fn discover(dir: &Path) -> UpgradeResult<Self> {
        match Self::candidates(dir).into_iter().find(|path| path.is_file()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn candidates(dir: &Path) -> Vec<PathBuf> {
        let mut paths = vec![dir.join(FILE_NAME)];
        if let Some(config) = dirs::config_dir() {
            paths.push(config.join("schema-upgrade").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            [database]
            url = "postgresql://localhost/app"

            [output]
            format = "json"
            breaking = false
            "#,
        )
        .unwrap();
        assert_eq!(config.database.url.as_deref(), Some("postgresql://localhost/app"));
        assert_eq!(config.output.format, Some(Format::Json));
        assert_eq!(config.output.breaking, Some(false));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = Config::parse("[output]\ncolour = true\n").unwrap_err();
        assert!(matches!(err, UpgradeError::Config(_)));
    }

    #[test]
    fn test_discover_in_directory() {
        let dir = std::env::temp_dir().join(format!("schema-upgrade-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(FILE_NAME), "[output]\nformat = \"text\"\n").unwrap();

        let config = Config::discover(&dir).unwrap();
        assert_eq!(config.output.format, Some(Format::Text));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/schema-upgrade.toml")).unwrap_err();
        assert!(matches!(err, UpgradeError::Config(_)));
    }
}
