//! Configuration loading and types

use std::path::{Path, PathBuf};

use otagate_core::BackendsConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the otagate daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon server settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Director, registry and repository endpoints
    #[serde(default)]
    pub backends: BackendsConfig,
    /// API tokens and device quota
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Daemon server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address and port to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Who may call the API and how many devices they may own
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accepted `OTA-TOKEN` values; an empty list leaves the API open
    #[serde(default)]
    pub tokens: Vec<String>,
    /// Device quota reported in `X-MAX-DEVICES`, -1 for unlimited
    #[serde(default = "default_max_devices")]
    pub max_devices: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            max_devices: default_max_devices(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_devices() -> i64 {
    -1
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// First existing config file, if any
    ///
    /// `OTAGATE_CONFIG` wins when set, even if the file is missing.
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("OTAGATE_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let paths = [
            Some(PathBuf::from("otagate.toml")),
            Some(PathBuf::from("/etc/otagate/otagate.toml")),
            dirs::config_dir().map(|p| p.join("otagate/otagate.toml")),
        ];

        paths.into_iter().flatten().find(|path| path.exists())
    }

    /// Apply `DIRECTOR_URL`, `REGISTRY_URL` and `REPO_URL` from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let backends = &mut self.backends;
        for (key, slot) in [
            ("DIRECTOR_URL", &mut backends.director_url),
            ("REGISTRY_URL", &mut backends.registry_url),
            ("REPO_URL", &mut backends.repository_url),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.bind, "127.0.0.1:8080");
        assert_eq!(config.daemon.log_format, LogFormat::Pretty);
        assert_eq!(config.backends.namespace, "default");
        assert_eq!(config.backends.director_url, "http://director");
        assert!(config.auth.tokens.is_empty());
        assert_eq!(config.auth.max_devices, -1);
    }

    #[test]
    fn test_parse_full_file() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            bind = "0.0.0.0:9000"
            log_level = "debug"
            log_format = "json"

            [backends]
            namespace = "factory-a"
            director_url = "http://director.ota:9001"
            registry_url = "http://registry.ota:9001"
            repository_url = "http://reposerver.ota:9001"

            [backends.request]
            timeout_secs = 10
            max_retries = 4

            [auth]
            tokens = ["foo", "bar"]
            max_devices = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.daemon.bind, "0.0.0.0:9000");
        assert_eq!(config.daemon.log_format, LogFormat::Json);
        assert_eq!(config.backends.namespace, "factory-a");
        assert_eq!(config.backends.request.timeout_secs, 10);
        assert_eq!(config.backends.request.max_retries, 4);
        assert_eq!(config.backends.request.initial_backoff_ms, 200);
        assert_eq!(config.auth.tokens, ["foo", "bar"]);
        assert_eq!(config.auth.max_devices, 10);
    }

    #[test]
    fn test_env_overrides_endpoints() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "DIRECTOR_URL" => Some("http://localhost:9001".to_string()),
            "REPO_URL" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.backends.director_url, "http://localhost:9001");
        assert_eq!(config.backends.registry_url, "http://device-registry");
        assert_eq!(config.backends.repository_url, "http://tuf-reposerver");
    }
}
