//! Configuration management
//!
//! Configuration is read from a YAML file, falls back to built-in defaults
//! and lets the provider credentials be overridden from the environment.

use crate::error::{AlliantError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Daily customer charge (USD) billed regardless of consumption
pub const DEFAULT_CUSTOMER_CHARGE: f64 = 0.4932;

/// Provider API host
pub const DEFAULT_BASE_URL: &str = "https://alliant-svc.smartcmobile.com";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "ALLIANT_CONFIG";
pub const USERNAME_ENV: &str = "ALLIANT_USERNAME";
pub const PASSWORD_ENV: &str = "ALLIANT_PASSWORD";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider account credentials
    pub account: AccountConfig,

    /// Provider API endpoints and transport settings
    pub api: ApiConfig,

    /// Tariff constants used by the derivation engine
    pub pricing: PricingConfig,

    /// Refresh schedule
    pub poll: PollConfig,

    /// Credential cache location
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// IANA timezone used to decide what "today" and "this month" are
    pub timezone: String,
}

/// Provider account credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,

    /// Distinguishes cached sessions of several installations sharing a cache directory
    pub installation_id: String,
}

// Keep the password out of debug output
impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("installation_id", &self.installation_id)
            .finish()
    }
}

/// Provider API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without trailing slash
    pub base_url: String,

    /// Path of the refresh-token exchange endpoint
    pub refresh_path: String,

    /// Per-request timeout
    pub timeout_seconds: u64,
}

/// Tariff constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Fixed daily customer charge
    pub customer_charge_per_day: f64,
}

/// Refresh schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between fetch cycles
    pub interval_seconds: u64,

    /// Run a single cycle and exit
    pub run_once: bool,
}

/// Credential cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Persist the session between runs
    pub enabled: bool,

    /// Directory holding the cache file
    pub directory: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file or log directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `ALLIANT_CONFIG` or the default locations, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            Self::from_file(path)?
        } else {
            let default_paths = [
                "alliant_energy.yaml",
                "/data/alliant_energy.yaml",
                "/etc/alliant-energy/config.yaml",
            ];
            match default_paths.iter().find(|p| Path::new(p).exists()) {
                Some(path) => Self::from_file(path)?,
                None => Config::default(),
            }
        };
        config.apply_overrides_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override credentials from a variable lookup (normally the process environment)
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup(USERNAME_ENV).filter(|v| !v.trim().is_empty()) {
            self.account.username = username;
        }
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.account.password = password;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            let message = format!("Unknown timezone: {}", self.timezone);
            AlliantError::validation("timezone", message.as_str())
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.account.username.trim().is_empty() {
            return Err(AlliantError::validation(
                "account.username",
                "Username cannot be empty",
            ));
        }

        if self.account.password.is_empty() {
            return Err(AlliantError::validation(
                "account.password",
                "Password cannot be empty",
            ));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(AlliantError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(AlliantError::validation(
                "api.timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if !self.pricing.customer_charge_per_day.is_finite()
            || self.pricing.customer_charge_per_day < 0.0
        {
            return Err(AlliantError::validation(
                "pricing.customer_charge_per_day",
                "Must be a non-negative number",
            ));
        }

        if self.poll.interval_seconds == 0 {
            return Err(AlliantError::validation(
                "poll.interval_seconds",
                "Must be greater than 0",
            ));
        }

        self.tz()?;
        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut config = Config::default();
        config.account.username = "user@example.com".to_string();
        config.account.password = "hunter2".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll.interval_seconds, 3600);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert!((config.pricing.customer_charge_per_day - 0.4932).abs() < f64::EPSILON);
        assert_eq!(config.timezone, "America/Chicago");
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid();
        assert!(config.validate().is_ok());

        // Default config carries no credentials
        assert!(Config::default().validate().is_err());

        config.poll.interval_seconds = 0;
        assert!(config.validate().is_err());

        config = valid();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        config = valid();
        config.pricing.customer_charge_per_day = -1.0;
        assert!(config.validate().is_err());

        config = valid();
        config.logging.level = "LOUD".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(|key| match key {
            USERNAME_ENV => Some("env-user".to_string()),
            PASSWORD_ENV => Some("env-pass".to_string()),
            _ => None,
        });
        assert_eq!(config.account.username, "env-user");
        assert_eq!(config.account.password, "env-pass");

        // Blank values leave the file values alone
        config.apply_overrides_from(|_| Some(String::new()));
        assert_eq!(config.account.username, "env-user");
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let config = valid();
        let dbg = format!("{:?}", config.account);
        assert!(dbg.contains("user@example.com"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "account:\n  username: a\n  password: b\npoll:\n  interval_seconds: 60\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.poll.interval_seconds, 60);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.account.installation_id, "default");
    }
}
