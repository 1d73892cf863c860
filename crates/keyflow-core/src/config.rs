// Keyflow Settings
// Optional TOML settings file; CLI flags take precedence over it

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Settings parser errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

/// Root settings table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Input device selection
    #[serde(default)]
    pub devices: DevicesConfig,

    /// Keymap file location
    #[serde(default)]
    pub keymap: KeymapConfig,
}

/// Device filtering configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Name or path fragments of the devices to capture
    #[serde(default)]
    pub filter: Vec<String>,
}

/// Keymap file configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeymapConfig {
    /// Path to the keymap rule file
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        toml::from_str(text).map_err(|e| SettingsError::TomlParse(e.to_string()))
    }

    /// Load settings from a TOML file
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
