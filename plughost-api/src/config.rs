//! Configuration - opaque plugin configuration values backed by TOML

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Key holding the id of the plugin a configuration belongs to
pub const PLUGIN_ID_KEY: &str = "pluginid";

/// A parsed plugin configuration.
///
/// The host only reads [`PLUGIN_ID_KEY`] to route the value; everything else
/// is left to the plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: toml::Table,
}

impl Configuration {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(values: toml::Table) -> Self {
        Self { values }
    }

    /// The plugin id this configuration is addressed to
    pub fn plugin_id(&self) -> Option<&str> {
        self.values.get(PLUGIN_ID_KEY).and_then(toml::Value::as_str)
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        let toml_value =
            toml::Value::try_from(value).map_err(|e| PluginError::Serialization(e.to_string()))?;
        self.values.insert(key.to_string(), toml_value);
        Ok(())
    }

    pub fn table(&self) -> &toml::Table {
        &self.values
    }
}

impl FromStr for Configuration {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: toml::Table = toml::from_str(s).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(Self { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plugin_id() {
        let config: Configuration = r#"
            pluginid = "chat"
            greeting = "hello"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.plugin_id(), Some("chat"));
        assert_eq!(config.get::<String>("greeting"), Some("hello".to_string()));
    }

    #[test]
    fn test_missing_plugin_id() {
        let config: Configuration = "threshold = 3".parse().unwrap();
        assert_eq!(config.plugin_id(), None);
        assert_eq!(config.get::<u32>("threshold"), Some(3));
    }

    #[test]
    fn test_non_string_plugin_id_is_ignored() {
        let config: Configuration = "pluginid = 7".parse().unwrap();
        assert_eq!(config.plugin_id(), None);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = "pluginid = ".parse::<Configuration>().unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }

    #[test]
    fn test_set_then_get() {
        let mut config = Configuration::new();
        config.set(PLUGIN_ID_KEY, "chat").unwrap();
        config.set("retries", 5).unwrap();

        assert_eq!(config.plugin_id(), Some("chat"));
        assert_eq!(config.get::<i64>("retries"), Some(5));
        assert_eq!(config.get::<String>("missing"), None);
    }
}
