//! Bot configuration
//!
//! Values come from an optional YAML file, then environment variables (and a
//! `.env` file) override them.

use crate::consent::DEFAULT_DEBOUNCE;
use crate::health::DEFAULT_HEARTBEAT_TIMEOUT;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// YAML file read when `CONFIG_FILE` is not set
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Heartbeat URLs and probe intervals
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub gateway_heartbeat_url: Option<String>,
    pub store_heartbeat_url: Option<String>,
    pub cache_heartbeat_url: Option<String>,
    pub gateway_interval_secs: u64,
    pub store_interval_secs: u64,
    pub cache_interval_secs: u64,
    pub heartbeat_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            gateway_heartbeat_url: None,
            store_heartbeat_url: None,
            cache_heartbeat_url: None,
            gateway_interval_secs: 180,
            store_interval_secs: 1800,
            cache_interval_secs: 900,
            heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT.as_secs(),
        }
    }
}

impl HealthConfig {
    #[must_use]
    pub fn gateway_interval(&self) -> Duration {
        Duration::from_secs(self.gateway_interval_secs)
    }

    #[must_use]
    pub fn store_interval(&self) -> Duration {
        Duration::from_secs(self.store_interval_secs)
    }

    #[must_use]
    pub fn cache_interval(&self) -> Duration {
        Duration::from_secs(self.cache_interval_secs)
    }

    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Only ever read from the environment
    #[serde(skip)]
    pub discord_token: String,
    pub prefix: String,
    pub database_url: String,
    /// In-process cache is used when unset
    pub redis_url: Option<String>,
    /// Users who bypass the consent gate and may run owner commands
    pub owner_ids: Vec<u64>,
    /// Register slash commands in this guild only
    pub guild_id: Option<u64>,
    pub cooldown_debounce_secs: u64,
    pub store_timeout_ms: u64,
    pub cache_timeout_ms: u64,
    pub health: HealthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            prefix: ";".to_string(),
            database_url: String::new(),
            redis_url: None,
            owner_ids: Vec::new(),
            guild_id: None,
            cooldown_debounce_secs: DEFAULT_DEBOUNCE.as_secs(),
            store_timeout_ms: 5000,
            cache_timeout_ms: 2000,
            health: HealthConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and the environment.
    ///
    /// Required:
    /// - `DISCORD_TOKEN`
    /// - `DATABASE_URL` (or `POSTGRES_URL`, or `database_url` in the file)
    ///
    /// Optional:
    /// - `CONFIG_FILE`: YAML file path, default `config.yaml`
    /// - `DISCORD_PREFIX`, `REDIS_URL`, `OWNER_IDS` (comma-separated), `GUILD_ID`
    /// - `COOLDOWN_DEBOUNCE_SECS`
    /// - `GATEWAY_HEARTBEAT_URL` (or `BETTERSTACK_HEARTBEAT`), `STORE_HEARTBEAT_URL`,
    ///   `CACHE_HEARTBEAT_URL`
    /// - `GATEWAY_PROBE_INTERVAL_SECS`, `STORE_PROBE_INTERVAL_SECS`,
    ///   `CACHE_PROBE_INTERVAL_SECS`
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a required value is missing, a value does
    /// not parse, or the config file exists but cannot be read.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file, falling back to defaults if it does not exist
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns a `ConfigError` if the YAML does not match the config layout.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override values with variables resolved by `lookup`. Empty values are
    /// treated as unset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a variable does not parse.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("DISCORD_TOKEN") {
            self.discord_token = token;
        }
        if let Some(prefix) = get("DISCORD_PREFIX") {
            self.prefix = prefix;
        }
        if let Some(url) = get("DATABASE_URL").or_else(|| get("POSTGRES_URL")) {
            self.database_url = url;
        }
        if let Some(url) = get("REDIS_URL") {
            self.redis_url = Some(url);
        }
        if let Some(ids) = get("OWNER_IDS") {
            self.owner_ids = parse_id_list("OWNER_IDS", &ids)?;
        }
        if let Some(id) = get("GUILD_ID") {
            self.guild_id = Some(parse_number("GUILD_ID", &id)?);
        }
        if let Some(secs) = get("COOLDOWN_DEBOUNCE_SECS") {
            self.cooldown_debounce_secs = parse_number("COOLDOWN_DEBOUNCE_SECS", &secs)?;
        }

        let health = &mut self.health;
        if let Some(url) = get("GATEWAY_HEARTBEAT_URL").or_else(|| get("BETTERSTACK_HEARTBEAT")) {
            health.gateway_heartbeat_url = Some(url);
        }
        if let Some(url) = get("STORE_HEARTBEAT_URL") {
            health.store_heartbeat_url = Some(url);
        }
        if let Some(url) = get("CACHE_HEARTBEAT_URL") {
            health.cache_heartbeat_url = Some(url);
        }
        if let Some(secs) = get("GATEWAY_PROBE_INTERVAL_SECS") {
            health.gateway_interval_secs = parse_number("GATEWAY_PROBE_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = get("STORE_PROBE_INTERVAL_SECS") {
            health.store_interval_secs = parse_number("STORE_PROBE_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = get("CACHE_PROBE_INTERVAL_SECS") {
            health.cache_interval_secs = parse_number("CACHE_PROBE_INTERVAL_SECS", &secs)?;
        }

        Ok(())
    }

    /// # Errors
    ///
    /// Returns a `ConfigError` if a required value is missing, or an ID or a
    /// duration is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord_token.is_empty() {
            return Err(ConfigError::Missing("DISCORD_TOKEN"));
        }
        if self.database_url.is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        if self.owner_ids.contains(&0) {
            return Err(ConfigError::Invalid {
                var: "OWNER_IDS",
                value: "0".to_string(),
            });
        }
        if self.guild_id == Some(0) {
            return Err(ConfigError::Invalid {
                var: "GUILD_ID",
                value: "0".to_string(),
            });
        }

        let non_zero = [
            ("cooldown_debounce_secs", self.cooldown_debounce_secs),
            ("store_timeout_ms", self.store_timeout_ms),
            ("cache_timeout_ms", self.cache_timeout_ms),
            ("gateway_interval_secs", self.health.gateway_interval_secs),
            ("store_interval_secs", self.health.store_interval_secs),
            ("cache_interval_secs", self.health.cache_interval_secs),
            ("heartbeat_timeout_secs", self.health.heartbeat_timeout_secs),
        ];
        for (var, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    var,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn owners(&self) -> HashSet<u64> {
        self.owner_ids.iter().copied().collect()
    }

    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.cooldown_debounce_secs)
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    #[must_use]
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

fn parse_id_list(var: &'static str, value: &str) -> Result<Vec<u64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_number(var, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.prefix, ";");
        assert_eq!(config.debounce_window(), Duration::from_secs(15));
        assert_eq!(config.health.gateway_interval(), Duration::from_secs(180));
        assert_eq!(config.health.store_interval(), Duration::from_secs(1800));
        assert_eq!(config.health.cache_interval(), Duration::from_secs(900));
        assert!(config.health.gateway_heartbeat_url.is_none());
    }

    #[test]
    fn test_yaml_partial_file() {
        let config = Config::from_yaml(
            "prefix: \"!\"\nowner_ids: [1, 2]\nhealth:\n  cache_interval_secs: 60\n  cache_heartbeat_url: https://hb/cache\n",
        )
        .unwrap();

        assert_eq!(config.prefix, "!");
        assert_eq!(config.owners(), HashSet::from([1, 2]));
        assert_eq!(config.health.cache_interval_secs, 60);
        assert_eq!(config.health.cache_heartbeat_url.as_deref(), Some("https://hb/cache"));
        assert_eq!(config.health.gateway_interval_secs, 180);
        assert!(config.discord_token.is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::from_file(Path::new("does/not/exist.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_yaml("prefix: \"!\"\n").unwrap();
        config
            .apply_env(env(&[
                ("DISCORD_TOKEN", "token"),
                ("POSTGRES_URL", "postgres://localhost/drew"),
                ("OWNER_IDS", "1424164764858449920, 1263092918130966569"),
                ("BETTERSTACK_HEARTBEAT", "https://hb/gateway"),
                ("STORE_PROBE_INTERVAL_SECS", "600"),
                ("REDIS_URL", ""),
            ]))
            .unwrap();

        assert_eq!(config.discord_token, "token");
        assert_eq!(config.database_url, "postgres://localhost/drew");
        assert_eq!(config.prefix, "!");
        assert_eq!(
            config.owner_ids,
            vec![1_424_164_764_858_449_920, 1_263_092_918_130_966_569]
        );
        assert_eq!(config.health.gateway_heartbeat_url.as_deref(), Some("https://hb/gateway"));
        assert_eq!(config.health.store_interval_secs, 600);
        assert!(config.redis_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_url_takes_precedence() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("DATABASE_URL", "postgres://primary"),
                ("POSTGRES_URL", "postgres://legacy"),
            ]))
            .unwrap();
        assert_eq!(config.database_url, "postgres://primary");
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("OWNER_IDS", "12,abc")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for OWNER_IDS: 'abc'");

        let err = config
            .apply_env(env(&[("CACHE_PROBE_INTERVAL_SECS", "-5")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "CACHE_PROBE_INTERVAL_SECS", .. }));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("DISCORD_TOKEN"))));

        config.discord_token = "token".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("DATABASE_URL"))));

        config.database_url = "postgres://localhost/drew".to_string();
        config.owner_ids = vec![5, 0];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var: "OWNER_IDS", .. })
        ));

        config.owner_ids = vec![5];
        config.health.gateway_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { var: "gateway_interval_secs", .. })
        ));
    }
}
