pub mod config;

pub use config::{Filesystem, Server, Settings};

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// File name looked up in the project root when no settings path is given.
pub const SETTINGS_FILE_NAME: &str = "dizi.toml";

impl Settings {
    /// Load settings from a TOML file. A missing file yields the defaults so a
    /// bare project directory works without any configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {path:?}"))?;

        Self::from_toml(&contents).with_context(|| format!("Failed to parse settings in {path:?}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// JSON schema of the settings file, for editor integration.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Settings)
    }
}
