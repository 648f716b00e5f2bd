use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::infrastructure::gateway::{DEFAULT_ETHERSCAN_URL, DEFAULT_OPENCHAIN_URL};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub api_url: String,
    pub chain_id: u64,
    pub api_key: Option<String>,
    pub keyed_interval_ms: u64,
    pub anonymous_interval_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_ETHERSCAN_URL.to_string(),
            chain_id: 1,
            api_key: None,
            keyed_interval_ms: 250,
            anonymous_interval_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub api_url: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_OPENCHAIN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timeout_secs: u64,
    pub rpc_url: Option<String>,
    pub registry: RegistryConfig,
    pub directory: DirectoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            rpc_url: None,
            registry: RegistryConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Registry API key, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.registry
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Minimum spacing between registry requests for the configured credential
    pub fn request_interval(&self) -> Duration {
        if self.api_key().is_some() {
            Duration::from_millis(self.registry.keyed_interval_ms)
        } else {
            Duration::from_millis(self.registry.anonymous_interval_ms)
        }
    }

    /// Apply `ETHERSCAN_API_KEY` if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = std::env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
        {
            self.registry.api_key = Some(key);
        }
        self
    }
}

/// Load the config file (defaults when absent or invalid) plus environment overrides
pub fn load() -> Config {
    let config = match config_path() {
        Some(path) if path.exists() => load_from(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %format!("{err:#}"), "Ignoring config file");
            Config::default()
        }),
        Some(path) => {
            debug!(path = %path.display(), "No config file, using defaults");
            Config::default()
        }
        None => Config::default(),
    };
    config.with_env_overrides()
}

pub fn load_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("UNRAVEL_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("unravel").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("unravel").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "unravel", "unravel")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.registry.chain_id, 1);
        assert_eq!(config.request_interval(), Duration::from_millis(5000));
        assert_eq!(config.directory.api_url, DEFAULT_OPENCHAIN_URL);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
timeout_secs = 3

[registry]
chain_id = 8453
api_key = "ABC123"
"#
        )
        .unwrap();

        let config = load_from(file.path()).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.registry.chain_id, 8453);
        assert_eq!(config.registry.api_url, DEFAULT_ETHERSCAN_URL);
        assert_eq!(config.api_key(), Some("ABC123"));
        assert_eq!(config.request_interval(), Duration::from_millis(250));
        assert_eq!(config.rpc_url, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = \"soon\"").unwrap();
        let err = load_from(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse"));

        assert!(load_from(Path::new("/nonexistent/unravel.toml")).is_err());
    }

    #[test]
    fn test_blank_key_is_anonymous() {
        let mut config = Config::default();
        config.registry.api_key = Some("   ".into());
        assert_eq!(config.api_key(), None);
        assert_eq!(config.request_interval(), Duration::from_millis(5000));
    }
}
