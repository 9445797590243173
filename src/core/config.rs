use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

fn default_rates_base_url() -> String {
    "https://api.apilayer.com/exchangerates_data".to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_warehouse_base_url() -> String {
    "https://bigquery.googleapis.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 5, 17).expect("2022-05-17 is a valid date")
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatesConfig {
    #[serde(default = "default_rates_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    /// Environment variable read when `api_key` is not set.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            base_url: default_rates_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl RatesConfig {
    /// Returns the configured API key, falling back to `$<api_key_env>` (`$API_KEY` by default).
    pub fn api_key(&self) -> Result<String> {
        resolve_secret(self.api_key.as_deref(), &self.api_key_env).ok_or_else(|| {
            anyhow!(
                "No API key configured: set rates.api_key or ${}",
                self.api_key_env
            )
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WarehouseConfig {
    /// Fully qualified `project.dataset.table` identifier.
    pub table: String,
    #[serde(default = "default_warehouse_base_url")]
    pub base_url: String,
    pub access_token: Option<String>,
    pub location: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WarehouseConfig {
    /// Returns the configured OAuth token, falling back to `$GOOGLE_OAUTH_ACCESS_TOKEN`.
    pub fn access_token(&self) -> Result<String> {
        resolve_secret(self.access_token.as_deref(), ACCESS_TOKEN_ENV).ok_or_else(|| {
            anyhow!("No access token configured: set warehouse.access_token or ${ACCESS_TOKEN_ENV}")
        })
    }
}

fn resolve_secret(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub rates: RatesConfig,
    pub warehouse: WarehouseConfig,
    /// Date assumed to be already loaded when the table is empty.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "fxload")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
