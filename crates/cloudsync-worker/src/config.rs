use std::collections::HashSet;
use std::time::Duration;

use cloudsync_cloud::{AdapterSettings, BackoffPolicy, RateLimitSettings};
use cloudsync_core::{CloudAccount, Credentials, Provider};
use cloudsync_sync::SyncConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub adapter: AdapterConfig,
    /// Accounts seeded into the in-memory account store at startup.
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        // Sync validations
        let sync = &self.sync;
        if sync.workers == 0 {
            return Err("sync.workers must be > 0".into());
        }
        if sync.max_concurrent == 0 {
            return Err("sync.max_concurrent must be > 0".into());
        }
        if sync.poll_interval_secs == 0 || sync.account_sync_interval_secs == 0 {
            return Err("sync intervals must be > 0".into());
        }
        if sync.user_sync_timeout_secs == 0
            || sync.permission_sync_timeout_secs == 0
            || sync.batch_sync_timeout_secs == 0
            || sync.validation_timeout_secs == 0
        {
            return Err("sync timeouts must be > 0".into());
        }
        if sync.list_page_size == 0 || sync.max_pages == 0 {
            return Err("sync.list_page_size and sync.max_pages must be > 0".into());
        }

        // Adapter validations
        let adapter = &self.adapter;
        if !(adapter.requests_per_second > 0.0) || adapter.burst == 0 {
            return Err("adapter.requests_per_second and adapter.burst must be > 0".into());
        }
        if adapter.max_attempts == 0 {
            return Err("adapter.max_attempts must be > 0".into());
        }
        if adapter.base_delay_ms > adapter.max_delay_ms {
            return Err("adapter.base_delay_ms must be <= adapter.max_delay_ms".into());
        }

        // Account seeds
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.id) {
                return Err(format!("accounts: duplicate id {}", account.id));
            }
            if account.tenant_id.trim().is_empty() {
                return Err(format!("accounts[{}].tenant_id must not be empty", account.id));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Rate limiting and backoff applied to every provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub requests_per_second: f64,
    pub burst: u32,
    /// Attempts per provider call, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        let rate = RateLimitSettings::default();
        let backoff = BackoffPolicy::default();
        Self {
            requests_per_second: rate.requests_per_second,
            burst: rate.burst,
            max_attempts: backoff.max_attempts,
            base_delay_ms: backoff.base_delay.as_millis() as u64,
            max_delay_ms: backoff.max_delay.as_millis() as u64,
        }
    }
}

impl AdapterConfig {
    pub fn settings(&self) -> AdapterSettings {
        AdapterSettings {
            rate_limit: RateLimitSettings {
                requests_per_second: self.requests_per_second,
                burst: self.burst,
            },
            backoff: BackoffPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.base_delay_ms),
                Duration::from_millis(self.max_delay_ms),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub id: i64,
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
    pub provider: Provider,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub access_key_secret: String,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub default_region: Option<String>,
}

impl AccountSeed {
    pub fn to_account(&self) -> CloudAccount {
        let mut account = CloudAccount::new(
            self.id,
            &self.tenant_id,
            &self.name,
            self.provider,
            Credentials::new(&self.access_key_id, &self.access_key_secret),
        )
        .with_regions(self.regions.iter().cloned());
        account.default_region = self.default_region.clone();
        account
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "cloudsync.toml";
    pub const CONFIG_PATH_ENV: &str = "CLOUDSYNC_CONFIG";

    /// Where the worker's config file path came from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ConfigOrigin {
        Flag,
        Env,
        Default,
    }

    impl ConfigOrigin {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Flag => "--config",
                Self::Env => CONFIG_PATH_ENV,
                Self::Default => "default",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ConfigLocation {
        pub path: String,
        pub origin: ConfigOrigin,
    }

    impl ConfigLocation {
        /// `--config <path>` (or `--config=<path>`) first, then `CLOUDSYNC_CONFIG`,
        /// then [`DEFAULT_CONFIG_PATH`].
        pub fn resolve<I, E>(args: I, env: E) -> Self
        where
            I: IntoIterator<Item = String>,
            E: Fn(&str) -> Option<String>,
        {
            let mut args = args.into_iter();
            while let Some(arg) = args.next() {
                let path = match arg.strip_prefix("--config=") {
                    Some(inline) => Some(inline.to_string()),
                    None if arg == "--config" => args.next(),
                    None => None,
                };
                if let Some(path) = path.filter(|p| !p.is_empty()) {
                    return Self {
                        path,
                        origin: ConfigOrigin::Flag,
                    };
                }
            }

            match env(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
                Some(path) => Self {
                    path,
                    origin: ConfigOrigin::Env,
                },
                None => Self {
                    path: DEFAULT_CONFIG_PATH.to_string(),
                    origin: ConfigOrigin::Default,
                },
            }
        }
    }

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        let mut builder = Config::builder();
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CLOUDSYNC__SYNC__WORKERS=8
        builder = builder.add_source(
            Environment::with_prefix("CLOUDSYNC")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        let settings = cfg.adapter.settings();
        assert_eq!(settings, AdapterSettings::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.adapter.base_delay_ms = 10_000;
        cfg.adapter.max_delay_ms = 1;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.sync.workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_location_precedence() {
        use loader::{ConfigLocation, ConfigOrigin, DEFAULT_CONFIG_PATH};

        let args = |list: &[&str]| list.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        let env_set = |key: &str| (key == "CLOUDSYNC_CONFIG").then(|| "/etc/cloudsync.toml".to_string());
        let env_unset = |_: &str| None;

        let flag = ConfigLocation::resolve(args(&["--config", "local.toml"]), env_set);
        assert_eq!(flag.path, "local.toml");
        assert_eq!(flag.origin, ConfigOrigin::Flag);

        let inline = ConfigLocation::resolve(args(&["-v", "--config=inline.toml"]), env_unset);
        assert_eq!(inline.path, "inline.toml");

        let from_env = ConfigLocation::resolve(args(&["--config"]), env_set);
        assert_eq!(from_env.path, "/etc/cloudsync.toml");
        assert_eq!(from_env.origin, ConfigOrigin::Env);

        let fallback = ConfigLocation::resolve(args(&[]), env_unset);
        assert_eq!(fallback.path, DEFAULT_CONFIG_PATH);
        assert_eq!(fallback.origin.as_str(), "default");
    }

    #[test]
    fn test_duplicate_account_ids_rejected() {
        let seed = AccountSeed {
            id: 1,
            tenant_id: "t1".into(),
            name: "prod".into(),
            provider: Provider::Aws,
            access_key_id: "AKIA".into(),
            access_key_secret: "secret".into(),
            regions: vec!["us-east-1".into()],
            default_region: None,
        };
        let cfg = AppConfig {
            accounts: vec![seed.clone(), seed],
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().contains("duplicate id 1"));
    }
}
