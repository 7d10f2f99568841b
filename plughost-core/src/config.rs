//! Manager configuration and plugin configuration discovery

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use plughost_api::Configuration;
use serde::{Deserialize, Serialize};

use crate::error::{AggregateError, ManagerError};
use crate::plugins::discovery::discover_files;

/// Extension of plugin configuration files
pub const CONFIGURATION_EXTENSION: &str = "toml";

/// Where the manager looks for artifacts and plugin configurations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManagerConfig {
    /// Directory scanned for plugin artifacts
    pub plugin_dir: PathBuf,
    /// Directory scanned for plugin configuration files
    pub config_dir: PathBuf,
    /// Descend into subdirectories of both
    #[serde(default)]
    pub recursive: bool,
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            plugin_dir: plughost_paths::plugin_dir(),
            config_dir: plughost_paths::configuration_dir(),
            recursive: false,
        }
    }
}

/// Read every configuration file under `dir`, keyed by its `pluginid` field.
///
/// All files are attempted; unreadable files, invalid TOML, missing ids and
/// ids claimed by two files are collected before failing.
pub fn discover_configurations(
    dir: &Path,
    recursive: bool,
) -> Result<HashMap<String, Configuration>, AggregateError> {
    collect_configurations(dir, recursive, Vec::new())
}

/// Like [`discover_configurations`], then route each of `extra` by its own
/// `pluginid`.
///
/// An extra naming an id that a file (or an earlier extra) already
/// configures is an error, the same as two files claiming one id.
pub fn collect_configurations(
    dir: &Path,
    recursive: bool,
    extra: impl IntoIterator<Item = Configuration>,
) -> Result<HashMap<String, Configuration>, AggregateError> {
    let mut collected = Collected::default();

    match discover_files(dir, recursive, CONFIGURATION_EXTENSION) {
        Ok(files) => {
            for path in files {
                let origin = path.display().to_string();
                match read_configuration(&path) {
                    Ok(configuration) => collected.insert(origin, configuration),
                    Err(e) => collected.fail(origin, e),
                }
            }
        }
        Err(e) => collected.errors.push(e),
    }

    for (i, configuration) in extra.into_iter().enumerate() {
        collected.insert(format!("supplied configuration #{}", i + 1), configuration);
    }

    collected.errors.into_result()?;
    Ok(collected.configurations)
}

/// Configurations routed so far, with where each id came from
#[derive(Default)]
struct Collected {
    configurations: HashMap<String, Configuration>,
    origins: HashMap<String, String>,
    errors: AggregateError,
}

impl Collected {
    fn insert(&mut self, origin: String, configuration: Configuration) {
        let Some(plugin_id) = configuration.plugin_id().map(str::to_string) else {
            self.fail(
                origin,
                format!("missing string key '{}'", plughost_api::PLUGIN_ID_KEY),
            );
            return;
        };

        if let Some(first) = self.origins.get(&plugin_id) {
            let reason = format!("plugin id '{plugin_id}' is already configured by {first}");
            self.fail(origin, reason);
            return;
        }

        tracing::debug!(plugin = %plugin_id, origin = %origin, "Loaded configuration");
        self.origins.insert(plugin_id.clone(), origin);
        self.configurations.insert(plugin_id, configuration);
    }

    fn fail(&mut self, origin: String, reason: String) {
        tracing::warn!(origin = %origin, reason = %reason, "Failed to load configuration");
        self.errors.push(ManagerError::Configuration { origin, reason });
    }
}

fn read_configuration(path: &Path) -> Result<Configuration, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    content
        .parse()
        .map_err(|e: plughost_api::PluginError| e.to_string())
}
