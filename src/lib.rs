pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::{RateSync, TableRef};
use crate::providers::bigquery::BigQueryWarehouse;
use crate::providers::exchangerates_api::ExchangeRatesApiProvider;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Sync { dry_run: bool },
    Status,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxload starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(table = %config.warehouse.table, "Loaded config");

    run_with_config(command, &config, Utc::now().date_naive()).await
}

/// Runs `command` against the collaborators described by `config`, treating `today` as the
/// last day to load.
pub async fn run_with_config(command: AppCommand, config: &AppConfig, today: NaiveDate) -> Result<()> {
    let table: TableRef = config.warehouse.table.parse()?;
    let client = reqwest::Client::builder()
        .user_agent(concat!("fxload/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let warehouse = BigQueryWarehouse::new(
        client.clone(),
        &config.warehouse.base_url,
        &table.project,
        &config.warehouse.access_token()?,
        config.warehouse.location.as_deref(),
        Duration::from_millis(config.warehouse.poll_interval_ms),
    );

    match command {
        AppCommand::Status => {
            cli::status::run(&warehouse, &table, config.start_date, today).await?;
        }
        AppCommand::Sync { dry_run } => {
            let provider = ExchangeRatesApiProvider::new(
                client,
                &config.rates.base_url,
                &config.rates.api_key()?,
            );
            let sync = RateSync::new(&provider, &warehouse, table, config.start_date);
            if dry_run {
                cli::sync::preview(&sync, today).await?;
            } else {
                cli::sync::run(&sync, today).await?;
            }
        }
    }
    Ok(())
}
