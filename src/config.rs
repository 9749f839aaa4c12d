//! Runtime configuration.
//!
//! Settings are layered with the `config` crate: compiled defaults, then a
//! config file, then `CPAPWATCH_*` environment variables (`__` separates
//! nested keys, e.g. `CPAPWATCH_METRICS__POLLING_INTERVAL=300`).
//!
//! ```toml
//! records_days = 90
//! include_zero_scores = false
//!
//! [metrics]
//! listen_addr = "0.0.0.0:8933"
//! polling_interval = 60
//!
//! [store]
//! kind = "file"
//! path = "data"
//!
//! [[accounts]]
//! username = "ada@example.com"
//! password = "secret"
//! region = "NA"
//! endpoint = "http://localhost:8080"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use cpapwatch_adapters::http::HttpClient;
use cpapwatch_adapters::{FetchError, FileClient, SnapshotClient};

use crate::store::{FileStore, MemoryStore, Store, StoreError};

/// File stem searched for when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "cpapwatch";

const ENV_PREFIX: &str = "CPAPWATCH";
const DAYS_PER_MONTH: u32 = 30;

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub metrics: MetricsSettings,
    /// History window requested from the vendor, in days.
    #[serde(default = "default_records_days")]
    pub records_days: u32,
    /// Publish per-night gauges for nights with a zero score.
    #[serde(default)]
    pub include_zero_scores: bool,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub accounts: Vec<AccountSettings>,
}

/// Exporter and polling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen_addr: String,
    pub path: String,
    pub namespace: String,
    /// Seconds between poll passes.
    pub polling_interval: u64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "0.0.0.0:8933".to_string(),
            path: "/metrics".to_string(),
            namespace: "myair".to_string(),
            polling_interval: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    /// Data directory for the file store.
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: PathBuf::from("data"),
        }
    }
}

/// Where an account's snapshots come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    File,
}

/// One vendor account. Credentials are passed through to its client.
#[derive(Clone, Deserialize)]
pub struct AccountSettings {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub device_token: Option<String>,
    #[serde(default)]
    pub source: SourceKind,
    /// Bridge base URL for `http`, fixture directory for `file`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSettings")
            .field("username", &self.username)
            .field("region", &self.region)
            .field("source", &self.source)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl StoreSettings {
    /// Open the configured backend.
    pub fn open(&self) -> Result<Arc<dyn Store>, StoreError> {
        let store: Arc<dyn Store> = match self.kind {
            StoreKind::File => Arc::new(FileStore::open(&self.path)?),
            StoreKind::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

impl AccountSettings {
    /// Build the snapshot client for this account.
    pub fn client(&self) -> Result<Box<dyn SnapshotClient>, FetchError> {
        match self.source {
            SourceKind::File => {
                let dir = self.endpoint.as_deref().unwrap_or_default();
                Ok(Box::new(FileClient::new(dir)))
            }
            SourceKind::Http => {
                let mut builder = HttpClient::builder()
                    .credentials(&self.username, &self.password)
                    .region(&self.region);
                if let Some(endpoint) = &self.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                if let Some(token) = &self.device_token {
                    builder = builder.device_token(token);
                }
                Ok(Box::new(builder.build()?))
            }
        }
    }
}

fn default_records_days() -> u32 {
    90
}

fn default_region() -> String {
    "NA".to_string()
}

impl Settings {
    /// Load settings from `path` (required when given) or from an optional
    /// `cpapwatch.{toml,yaml,json}` in the working directory, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::from_builder(Config::builder().add_source(file))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.polling_interval == 0 {
            return Err(invalid("metrics.polling_interval must be greater than 0"));
        }
        if self.records_days == 0 {
            return Err(invalid("records_days must be greater than 0"));
        }
        if self.accounts.is_empty() {
            return Err(invalid("at least one account must be configured"));
        }
        for (i, account) in self.accounts.iter().enumerate() {
            if account.username.trim().is_empty() {
                return Err(invalid(format!("accounts[{}].username is empty", i)));
            }
            if account.source == SourceKind::File && account.endpoint.is_none() {
                return Err(invalid(format!(
                    "accounts[{}] uses the file source but has no endpoint directory",
                    i
                )));
            }
        }
        Ok(())
    }

    /// History window in whole months, rounded up.
    pub fn history_months(&self) -> u32 {
        self.records_days.div_ceil(DAYS_PER_MONTH)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.metrics.polling_interval)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Message(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    const MINIMAL: &str = r#"
        [[accounts]]
        username = "ada@example.com"
        password = "secret"
    "#;

    #[test]
    fn test_defaults() {
        let settings = from_toml(MINIMAL).unwrap();

        assert!(settings.metrics.enabled);
        assert_eq!(settings.metrics.listen_addr, "0.0.0.0:8933");
        assert_eq!(settings.metrics.path, "/metrics");
        assert_eq!(settings.metrics.namespace, "myair");
        assert_eq!(settings.polling_interval(), Duration::from_secs(60));
        assert_eq!(settings.records_days, 90);
        assert_eq!(settings.history_months(), 3);
        assert!(!settings.include_zero_scores);
        assert_eq!(settings.store.kind, StoreKind::File);
        assert_eq!(settings.store.path, PathBuf::from("data"));

        let account = &settings.accounts[0];
        assert_eq!(account.region, "NA");
        assert_eq!(account.source, SourceKind::Http);
        assert!(account.device_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = from_toml(
            r#"
            records_days = 31
            include_zero_scores = true

            [metrics]
            polling_interval = 300
            listen_addr = "127.0.0.1:9000"

            [store]
            kind = "memory"

            [[accounts]]
            username = "bob"
            region = "EU"
            source = "file"
            endpoint = "fixtures/bob"
            "#,
        )
        .unwrap();

        assert_eq!(settings.history_months(), 2);
        assert!(settings.include_zero_scores);
        assert_eq!(settings.metrics.polling_interval, 300);
        assert_eq!(settings.metrics.listen_addr, "127.0.0.1:9000");
        assert_eq!(settings.metrics.namespace, "myair");
        assert_eq!(settings.store.kind, StoreKind::Memory);
        assert_eq!(settings.accounts[0].source, SourceKind::File);
        assert_eq!(settings.accounts[0].region, "EU");
    }

    #[test]
    fn test_history_months_rounds_up() {
        let mut settings = from_toml(MINIMAL).unwrap();
        for (days, months) in [(1, 1), (30, 1), (31, 2), (60, 2), (90, 3), (91, 4)] {
            settings.records_days = days;
            assert_eq!(settings.history_months(), months, "{} days", days);
        }
    }

    #[test]
    fn test_validation() {
        let err = from_toml("").unwrap_err();
        assert!(err.to_string().contains("at least one account"));

        let err = from_toml(&format!("[metrics]\npolling_interval = 0\n{}", MINIMAL)).unwrap_err();
        assert!(err.to_string().contains("polling_interval"));

        let err = from_toml(&format!("records_days = 0\n{}", MINIMAL)).unwrap_err();
        assert!(err.to_string().contains("records_days"));

        let err = from_toml("[[accounts]]\nusername = \" \"").unwrap_err();
        assert!(err.to_string().contains("accounts[0].username"));

        let err = from_toml("[[accounts]]\nusername = \"bob\"\nsource = \"file\"").unwrap_err();
        assert!(err.to_string().contains("endpoint directory"));
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = from_toml(MINIMAL).unwrap();
        let debug = format!("{:?}", settings);
        assert!(debug.contains("ada@example.com"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_account_clients() {
        let settings = from_toml(
            r#"
            [[accounts]]
            username = "ada"
            endpoint = "https://bridge.local"

            [[accounts]]
            username = "bob"
            source = "file"
            endpoint = "fixtures/bob"
            "#,
        )
        .unwrap();

        let http = settings.accounts[0].client().unwrap();
        assert_eq!(http.description(), "http: https://bridge.local (ada)");
        let file = settings.accounts[1].client().unwrap();
        assert_eq!(file.description(), "file: fixtures/bob");
    }

    #[test]
    fn test_open_memory_store() {
        let store = StoreSettings {
            kind: StoreKind::Memory,
            path: PathBuf::from("/nonexistent"),
        };
        assert!(store.open().is_ok());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        assert!(Settings::load(Some(Path::new("/nonexistent/cpapwatch.toml"))).is_err());
    }
}
