//! Host settings loaded from `plughost.toml`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plughost_core::PluginManagerConfig;
use serde::{Deserialize, Serialize};

/// Settings file as written by the user; every field is optional
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    plugin_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    recursive: Option<bool>,
    #[serde(default)]
    custom_markers: Vec<String>,
}

/// Effective host settings with defaults applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub plugin_dir: PathBuf,
    pub config_dir: PathBuf,
    pub recursive: bool,
    pub custom_markers: Vec<String>,
}

impl Settings {
    pub fn manager_config(&self) -> PluginManagerConfig {
        PluginManagerConfig {
            plugin_dir: self.plugin_dir.clone(),
            config_dir: self.config_dir.clone(),
            recursive: self.recursive,
        }
    }

    /// Apply command line overrides; `None` keeps the current value
    pub fn override_with(
        &mut self,
        plugin_dir: Option<PathBuf>,
        config_dir: Option<PathBuf>,
        recursive: bool,
    ) {
        if let Some(dir) = plugin_dir {
            self.plugin_dir = dir;
        }
        if let Some(dir) = config_dir {
            self.config_dir = dir;
        }
        self.recursive |= recursive;
    }
}

impl Default for Settings {
    fn default() -> Self {
        ConfigLoader::finalize(RawSettings::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from `path`, or from the default settings file if it exists.
    ///
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let raw = match path {
            Some(path) => Self::read(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::read(&default_path)?
                } else {
                    RawSettings::default()
                }
            }
        };

        Ok(Self::finalize(raw))
    }

    pub fn default_path() -> PathBuf {
        plughost_paths::settings_file()
    }

    fn read(path: &Path) -> Result<RawSettings> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let raw: RawSettings = toml::from_str(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(raw)
    }

    fn finalize(raw: RawSettings) -> Settings {
        let defaults = PluginManagerConfig::default();
        Settings {
            plugin_dir: raw.plugin_dir.unwrap_or(defaults.plugin_dir),
            config_dir: raw.config_dir.unwrap_or(defaults.config_dir),
            recursive: raw.recursive.unwrap_or(defaults.recursive),
            custom_markers: raw.custom_markers,
        }
    }
}
