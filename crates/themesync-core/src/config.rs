//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/themesync/config.toml)
//! 3. Environment variables (THEMESYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::DEFAULT_API_VERSION;
use crate::worker::{default_worker_count, RetryPolicy, MAX_WORKERS};

/// Environment variable prefix
const ENV_PREFIX: &str = "THEMESYNC";

/// Keys accepted by `config set`
pub const CONFIG_KEYS: &[&str] = &[
    "store",
    "access_token",
    "api_version",
    "workers",
    "max_attempts",
    "retry_base_ms",
    "retry_max_ms",
    "development_theme_id",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shop domain, e.g. `my-shop.myshopify.com`
    #[serde(default)]
    pub store: Option<String>,

    /// Admin API access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Admin API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Worker pool size (defaults to available parallelism)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Attempts per operation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Cap on any retry delay, in milliseconds
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Id of this machine's development theme
    #[serde(default)]
    pub development_theme_id: Option<u64>,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: None,
            access_token: None,
            api_version: default_api_version(),
            workers: None,
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
            development_theme_id: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (THEMESYNC_STORE, THEMESYNC_ACCESS_TOKEN, ...)
    /// 2. Config file (~/.config/themesync/config.toml or THEMESYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // THEMESYNC_STORE
        if let Some(val) = env_var("STORE") {
            self.store = non_empty(val);
        }

        // THEMESYNC_ACCESS_TOKEN
        if let Some(val) = env_var("ACCESS_TOKEN") {
            self.access_token = non_empty(val);
        }

        // THEMESYNC_API_VERSION
        if let Some(val) = env_var("API_VERSION") {
            if !val.is_empty() {
                self.api_version = val;
            }
        }

        // THEMESYNC_WORKERS
        if let Some(val) = env_var("WORKERS") {
            self.workers = match non_empty(val) {
                Some(v) => Some(
                    v.parse()
                        .with_context(|| format!("Invalid {}_WORKERS: {}", ENV_PREFIX, v))?,
                ),
                None => None,
            };
        }

        // THEMESYNC_DEVELOPMENT_THEME_ID
        if let Some(val) = env_var("DEVELOPMENT_THEME_ID") {
            self.development_theme_id = match non_empty(val) {
                Some(v) => Some(v.parse().with_context(|| {
                    format!("Invalid {}_DEVELOPMENT_THEME_ID: {}", ENV_PREFIX, v)
                })?),
                None => None,
            };
        }

        Ok(())
    }

    /// Set a single key from its string form, as `config set` does
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let cleared = value.is_empty();
        match key {
            "store" => self.store = non_empty(value.to_string()),
            "access_token" => self.access_token = non_empty(value.to_string()),
            "api_version" => {
                if cleared {
                    bail!("api_version cannot be empty");
                }
                self.api_version = value.to_string();
            }
            "workers" => {
                self.workers = if cleared {
                    None
                } else {
                    let n: usize = value.parse().context("workers must be a number")?;
                    if !(1..=MAX_WORKERS).contains(&n) {
                        bail!("workers must be between 1 and {}", MAX_WORKERS);
                    }
                    Some(n)
                };
            }
            "max_attempts" => {
                let n: u32 = value.parse().context("max_attempts must be a number")?;
                if n == 0 {
                    bail!("max_attempts must be at least 1");
                }
                self.max_attempts = n;
            }
            "retry_base_ms" => {
                self.retry_base_ms = value.parse().context("retry_base_ms must be a number")?;
            }
            "retry_max_ms" => {
                self.retry_max_ms = value.parse().context("retry_max_ms must be a number")?;
            }
            "development_theme_id" => {
                self.development_theme_id = if cleared {
                    None
                } else {
                    Some(value.parse().context("development_theme_id must be a number")?)
                };
            }
            "log_file" => {
                self.log_file = if cleared {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => bail!(
                "Unknown config key: {} (expected one of: {})",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with THEMESYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("themesync")
            .join("config.toml")
    }

    /// Worker pool size, clamped to `1..=MAX_WORKERS`
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(default_worker_count)
            .clamp(1, MAX_WORKERS)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_ms),
            max_delay: Duration::from_millis(self.retry_max_ms),
        }
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_retry_base_ms() -> u64 {
    RetryPolicy::default().base_delay.as_millis() as u64
}

fn default_retry_max_ms() -> u64 {
    RetryPolicy::default().max_delay.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "THEMESYNC_STORE",
        "THEMESYNC_ACCESS_TOKEN",
        "THEMESYNC_API_VERSION",
        "THEMESYNC_WORKERS",
        "THEMESYNC_DEVELOPMENT_THEME_ID",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.store.is_none());
        assert!(config.access_token.is_none());
        assert_eq!(config.api_version, "2024-01");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!((1..=MAX_WORKERS).contains(&config.worker_count()));
    }

    #[test]
    fn test_worker_count_clamped() {
        let mut config = Config::default();
        config.workers = Some(64);
        assert_eq!(config.worker_count(), MAX_WORKERS);
        config.workers = Some(0);
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_env_override_store_and_token() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("THEMESYNC_STORE", "shop.myshopify.com");
        env::set_var("THEMESYNC_ACCESS_TOKEN", "shpat_123");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.store.as_deref(), Some("shop.myshopify.com"));
        assert_eq!(config.access_token.as_deref(), Some("shpat_123"));

        // Empty string clears it
        env::set_var("THEMESYNC_STORE", "");
        config.apply_env_overrides().unwrap();
        assert!(config.store.is_none());
    }

    #[test]
    fn test_env_override_numbers() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("THEMESYNC_WORKERS", "3");
        env::set_var("THEMESYNC_DEVELOPMENT_THEME_ID", "42");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.development_theme_id, Some(42));

        env::set_var("THEMESYNC_WORKERS", "many");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            store: Some("shop.myshopify.com".to_string()),
            workers: Some(4),
            development_theme_id: Some(7),
            ..Config::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("store"));
        assert!(toml_str.contains("workers"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.store, config.store);
        assert_eq!(parsed.workers, config.workers);
        assert_eq!(parsed.development_theme_id, config.development_theme_id);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            store = "shop.myshopify.com"
            access_token = "shpat_abc"
            max_attempts = 2
            retry_base_ms = 10
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.store.as_deref(), Some("shop.myshopify.com"));
        assert_eq!(config.api_version, DEFAULT_API_VERSION);

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_secs(8));
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert!(config.store.is_none());
        assert_eq!(config.max_attempts, 4);
    }

    #[test]
    fn test_set_validates_keys() {
        let mut config = Config::default();

        config.set("workers", "2").unwrap();
        assert_eq!(config.workers, Some(2));
        config.set("workers", "").unwrap();
        assert!(config.workers.is_none());

        assert!(config.set("workers", "99").is_err());
        assert!(config.set("max_attempts", "0").is_err());
        assert!(config.set("api_version", "").is_err());
        assert!(config.set("colour", "blue").is_err());

        config.set("log_file", "/tmp/themesync.log").unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/themesync.log")));
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("store", "shop.myshopify.com").unwrap();
        config.set("development_theme_id", "99").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded.store.as_deref(), Some("shop.myshopify.com"));
        assert_eq!(loaded.development_theme_id, Some(99));
    }
}
