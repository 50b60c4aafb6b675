//! Runtime settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// Settings shared by the tools that host a patcher.
///
/// Missing fields take their defaults.
///
/// # TOML Format
///
/// ```toml
/// log_filter = "patchwerk_core=debug,info"
/// sample_rate = 48000
/// block_size = 64
/// patch_dirs = ["/home/me/patches"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Sample rate handed to the signal engine.
    pub sample_rate: u32,

    /// Block size handed to the signal engine.
    pub block_size: usize,

    /// Directories searched for patches by name, before the user patches
    /// directory.
    pub patch_dirs: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            sample_rate: 48000,
            block_size: 64,
            patch_dirs: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load the user settings file, or the defaults when it does not exist.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = paths::settings_path();
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
