//! Configuration file handling.
//!
//! Settings come from `catalog-dash.toml` (or `--config`); every key has a
//! default, so a missing file is equivalent to an empty one.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::FilterSpec;
use crate::data::loader::{ColumnMap, CountryMode, LoadOptions};
use crate::state::PanelSettings;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "catalog-dash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Source column names.
    #[serde(default)]
    pub columns: ColumnMap,

    /// Row parsing options.
    #[serde(default)]
    pub load: LoadConfig,

    /// Panel sizes and scope.
    #[serde(default)]
    pub panels: PanelSettings,

    /// Filter applied before any command-line constraint.
    #[serde(default)]
    pub filter: FilterSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default)]
    pub country_mode: CountryMode,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `path` when given, else the default file if present, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            log::debug!("using {}", default_path.display());
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            columns: self.columns.clone(),
            country_mode: self.load.country_mode,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).context("Failed to serialize default config")
    }
}
