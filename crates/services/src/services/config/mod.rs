use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Which `DeviceStore` adapter backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// On-disk shape of `config.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    host: Option<String>,
    port: Option<u16>,
    database_url: Option<String>,
    storage: Option<StorageBackend>,
    app_password: Option<String>,
    cors_allow_any_origin: Option<bool>,
}

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// `None` means the default SQLite file inside the asset directory.
    pub database_url: Option<String>,
    pub storage: StorageBackend,
    /// Shared password checked by `POST /api/auth`. Unset is a server
    /// misconfiguration, reported only when someone tries to log in.
    pub app_password: Option<SecretString>,
    pub cors_allow_any_origin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: None,
            storage: StorageBackend::default(),
            app_password: None,
            cors_allow_any_origin: true,
        }
    }
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(raw_config)?;
        let defaults = Self::default();
        let config = Self {
            host: raw.host.unwrap_or(defaults.host),
            port: raw.port.unwrap_or(defaults.port),
            database_url: raw.database_url.or(defaults.database_url),
            storage: raw.storage.unwrap_or(defaults.storage),
            app_password: raw.app_password.map(SecretString::from),
            cors_allow_any_origin: raw
                .cors_allow_any_origin
                .unwrap_or(defaults.cors_allow_any_origin),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError("host must not be empty".into()));
        }
        if matches!(&self.database_url, Some(url) if url.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "databaseUrl must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Layers environment variables over the file values. `lookup` is
    /// `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(raw) = lookup("BACKEND_PORT").or_else(|| lookup("PORT")) {
            match raw.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid port override"),
            }
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(raw) = lookup("STORAGE_BACKEND") {
            match raw.parse::<StorageBackend>() {
                Ok(storage) => self.storage = storage,
                Err(_) => tracing::warn!(value = %raw, "Ignoring unknown storage backend"),
            }
        }
        if let Some(password) = lookup("APP_PASSWORD") {
            self.app_password = Some(SecretString::from(password));
        }
        if let Some(raw) = lookup("CORS_ALLOW_ANY_ORIGIN") {
            match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.cors_allow_any_origin = true,
                "0" | "false" | "no" => self.cors_allow_any_origin = false,
                _ => tracing::warn!(value = %raw, "Ignoring invalid CORS override"),
            }
        }
    }

    pub fn database_url_or(&self, default_path: &Path) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}?mode=rwc", default_path.to_string_lossy()))
    }
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => match Config::from_raw(&raw_config) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Invalid config file {}: {}", config_path.display(), err);
                Config::default()
            }
        },
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found, using defaults");
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// File config with the process environment layered on top.
pub async fn load_config(config_path: &Path) -> Config {
    let mut config = load_config_from_file(config_path).await;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config
}
