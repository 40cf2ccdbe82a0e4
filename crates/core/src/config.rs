//! Runtime configuration
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! `MARGINALIA_*` environment variables (a `.env` file in the working
//! directory is honoured by [`MarginaliaConfig::load`]).

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// API base URL override
pub const ENV_API_URL: &str = "MARGINALIA_API_URL";
/// Pointer motion debounce in milliseconds
pub const ENV_MOTION_DEBOUNCE_MS: &str = "MARGINALIA_MOTION_DEBOUNCE_MS";
/// Hover exit grace in milliseconds
pub const ENV_EXIT_GRACE_MS: &str = "MARGINALIA_EXIT_GRACE_MS";
/// Reply thread depth cap
pub const ENV_MAX_THREAD_DEPTH: &str = "MARGINALIA_MAX_THREAD_DEPTH";
/// Log filter fallback when `RUST_LOG` is unset
pub const ENV_LOG: &str = "MARGINALIA_LOG";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginaliaConfig {
    /// Base URL of the annotation API, e.g. `https://example.org/api`
    pub api_base_url: String,
    /// Quiet period after the last pointer move before hit-testing
    pub motion_debounce_ms: u64,
    /// How long a highlight stays hovered after the pointer leaves it
    pub exit_grace_ms: u64,
    /// Deepest reply level a thread walk descends to
    pub max_thread_depth: usize,
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for MarginaliaConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            motion_debounce_ms: 30,
            exit_grace_ms: 60,
            max_thread_depth: 32,
            log_level: "info".to_string(),
        }
    }
}

impl MarginaliaConfig {
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_motion_debounce_ms(mut self, ms: u64) -> Self {
        self.motion_debounce_ms = ms;
        self
    }

    pub fn with_exit_grace_ms(mut self, ms: u64) -> Self {
        self.exit_grace_ms = ms;
        self
    }

    pub fn with_max_thread_depth(mut self, depth: usize) -> Self {
        self.max_thread_depth = depth;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Motion debounce as a `Duration`
    pub fn motion_debounce(&self) -> Duration {
        Duration::from_millis(self.motion_debounce_ms)
    }

    /// Exit grace as a `Duration`
    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }

    /// Default config file location
    ///
    /// - Linux: ~/.config/marginalia/config.json
    /// - macOS: ~/Library/Application Support/marginalia/config.json
    /// - Windows: %APPDATA%\marginalia\config.json
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("marginalia").join("config.json"))
    }

    /// Load every layer: defaults, `path` (or the default location) if it
    /// exists, then the environment including `.env`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(dotenv) = dotenvy::dotenv() {
            tracing::debug!(path = %dotenv.display(), "loaded .env");
        }

        let file = path.map(Path::to_path_buf).or_else(Self::default_config_path);
        let config = match file {
            Some(file) if file.exists() => Self::from_file(&file)?,
            Some(file) if path.is_some() => {
                return Err(ConfigError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("config file not found: {}", file.display()),
                )))
            }
            _ => Self::default(),
        };

        config.apply_env()
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Override fields from `MARGINALIA_*` environment variables
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the variable when a numeric
    /// variable does not parse.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var(ENV_API_URL) {
            self.api_base_url = val;
        }
        if let Some(ms) = parse_env(ENV_MOTION_DEBOUNCE_MS)? {
            self.motion_debounce_ms = ms;
        }
        if let Some(ms) = parse_env(ENV_EXIT_GRACE_MS)? {
            self.exit_grace_ms = ms;
        }
        if let Some(depth) = parse_env(ENV_MAX_THREAD_DEPTH)? {
            self.max_thread_depth = depth;
        }
        if let Ok(val) = std::env::var(ENV_LOG) {
            self.log_level = val;
        }
        Ok(self)
    }

    /// Read a JSON config file; absent keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(None),
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serial_test::serial;
    use std::env;

    const ALL_VARS: [&str; 5] = [
        ENV_API_URL,
        ENV_MOTION_DEBOUNCE_MS,
        ENV_EXIT_GRACE_MS,
        ENV_MAX_THREAD_DEPTH,
        ENV_LOG,
    ];

    // Saves and restores environment variables around a test
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(names: &[&str]) -> Self {
            let vars = names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in names {
                env::remove_var(name);
            }
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = MarginaliaConfig::default();
        assert_eq!(config.motion_debounce(), Duration::from_millis(30));
        assert_eq!(config.exit_grace(), Duration::from_millis(60));
        assert_eq!(config.max_thread_depth, 32);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_builder_methods() {
        let config = MarginaliaConfig::default()
            .with_api_base_url("https://annotations.test/api")
            .with_motion_debounce_ms(10)
            .with_exit_grace_ms(100)
            .with_max_thread_depth(4)
            .with_log_level("debug");

        assert_eq!(config.api_base_url, "https://annotations.test/api");
        assert_eq!(config.motion_debounce_ms, 10);
        assert_eq!(config.exit_grace_ms, 100);
        assert_eq!(config.max_thread_depth, 4);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&ALL_VARS);
        env::set_var(ENV_API_URL, "https://env.test");
        env::set_var(ENV_MOTION_DEBOUNCE_MS, "15");
        env::set_var(ENV_EXIT_GRACE_MS, " 90 ");

        let config = MarginaliaConfig::from_env().unwrap();
        assert_eq!(config.api_base_url, "https://env.test");
        assert_eq!(config.motion_debounce_ms, 15);
        assert_eq!(config.exit_grace_ms, 90);
        assert_eq!(config.max_thread_depth, 32);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(&ALL_VARS);
        env::set_var(ENV_MAX_THREAD_DEPTH, "deep");

        assert_matches!(
            MarginaliaConfig::from_env(),
            Err(ConfigError::InvalidValue(key)) if key == ENV_MAX_THREAD_DEPTH
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "exit_grace_ms": 250 }"#).unwrap();

        let config = MarginaliaConfig::from_file(&path).unwrap();
        assert_eq!(config.exit_grace_ms, 250);
        assert_eq!(config.motion_debounce_ms, 30);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "motion_debounce_ms = 3").unwrap();

        assert_matches!(MarginaliaConfig::from_file(&path), Err(ConfigError::Parse(_)));
    }

    #[test]
    #[serial]
    fn test_load_env_overrides_file() {
        let _guard = EnvGuard::new(&ALL_VARS);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "motion_debounce_ms": 45, "log_level": "warn" }"#).unwrap();
        env::set_var(ENV_LOG, "trace");

        let config = MarginaliaConfig::load(Some(&path)).unwrap();
        assert_eq!(config.motion_debounce_ms, 45);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file() {
        let _guard = EnvGuard::new(&ALL_VARS);
        let dir = tempfile::tempdir().unwrap();

        let result = MarginaliaConfig::load(Some(&dir.path().join("absent.json")));
        assert_matches!(result, Err(ConfigError::Io(_)));
    }
}
