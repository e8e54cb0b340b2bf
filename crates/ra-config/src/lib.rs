//! # ra-config
//!
//! Layered settings for the archive service:
//! built-in defaults → optional config file → `RA_*` environment variables
//! (nested keys use `__`, e.g. `RA_SERVER__PORT=8080`).

use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    /// Optional as a whole; absent means the in-memory store.
    #[serde(default)]
    pub storage: StorageSettings,
    pub sources: SourceSettings,
    pub archiver: ArchiverSettings,
    pub log: LogSettings,
    /// Required in `X-Admin-Token` for privileged routes. Empty disables them.
    #[serde(default = "empty_secret")]
    pub admin_token: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageSettings {
    /// SQLite database file. Unset means the volatile in-memory store.
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SourceSettings {
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchiverSettings {
    pub tick_ms: u64,
    /// Used when a watch request carries no `every`, e.g. `30s`
    pub default_watch_interval: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

impl Settings {
    /// Loads `.env`, then the given file (or `config.yaml` if present), then
    /// the process environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        let required = path.is_some();
        let file = File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(required);
        Self::build(file, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("RA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn build(
        file: File<config::FileSourceFile, config::FileFormat>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 7200)?
            .set_default("sources.user_agent", "rusty-archive/0.1")?
            .set_default("archiver.tick_ms", 2000)?
            .set_default("archiver.default_watch_interval", "30s")?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info,sqlx=warn")?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.archiver.tick_ms == 0 {
            return Err(ConfigError::Invalid("archiver.tick_ms", "must be positive".into()));
        }
        if self.sources.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("sources.user_agent", "must not be empty".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.archiver.tick_ms)
    }

    pub fn admin_enabled(&self) -> bool {
        !self.admin_token.expose_secret().is_empty()
    }
}
