//! XDG Base Directory paths for plughost.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths.

use std::path::PathBuf;

/// Get the plughost config directory.
///
/// Returns `$XDG_CONFIG_HOME/plughost` if set, otherwise `~/.config/plughost`.
///
/// # Examples
///
/// ```
/// use plughost_paths::config_dir;
///
/// let settings = config_dir().join("plughost.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("plughost")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/plughost")
    } else {
        PathBuf::from(".config/plughost")
    }
}

/// Default directory scanned for plugin artifacts
pub fn plugin_dir() -> PathBuf {
    config_dir().join("plugins")
}

/// Default directory scanned for plugin configuration files
pub fn configuration_dir() -> PathBuf {
    config_dir().join("config")
}

/// Default location of the host's own settings file
pub fn settings_file() -> PathBuf {
    config_dir().join("plughost.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_ends_with_plughost() {
        let path = config_dir();
        assert!(
            path.ends_with("plughost"),
            "config_dir should end with 'plughost'"
        );
    }

    #[test]
    #[serial]
    fn test_config_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
        }
        let path = config_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-config/plughost"));
        assert_eq!(
            plugin_dir(),
            PathBuf::from("/tmp/test-config/plughost/plugins")
        );
        assert_eq!(
            configuration_dir(),
            PathBuf::from("/tmp/test-config/plughost/config")
        );
        assert_eq!(
            settings_file(),
            PathBuf::from("/tmp/test-config/plughost/plughost.toml")
        );
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }
}
