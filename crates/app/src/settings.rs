//! Settings for the `caja` binary.
//!
//! Read from an optional TOML file (`settings.toml` by default) and then
//! from `CAJA__<SECTION>__<KEY>` environment variables, e.g.
//! `CAJA__DATABASE__PATH=/var/lib/caja.db`.
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use engine::OpeningBalancePolicy;
use serde::Deserialize;

pub const DEFAULT_SETTINGS_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the ledger lives. `url` wins over `path`, which wins over `memory`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Database {
    pub memory: bool,
    pub path: Option<String>,
    pub url: Option<String>,
}

impl Database {
    pub fn url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        match (&self.path, self.memory) {
            (Some(path), _) => format!("sqlite:{path}?mode=rwc"),
            (None, true) => "sqlite::memory:".to_string(),
            (None, false) => "sqlite:./caja.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Ledger {
    pub opening_balance: OpeningBalancePolicy,
    pub operation_timeout_ms: Option<u64>,
}

impl Ledger {
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub ledger: Ledger,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("CAJA").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
