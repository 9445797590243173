//! Incremental load of exchange rates into the warehouse

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt::Display;
use tracing::{debug, info, warn};

use super::rates::{BASE_CURRENCY, ExchangeRateRow, RateProvider, TARGET_CURRENCIES};
use super::transform::reshape;
use super::warehouse::{TableRef, Warehouse, last_date_query, rate_table_schema};
use super::window::FetchWindow;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Inserted { count: usize, window: FetchWindow },
    UpToDate { table: TableRef },
}

impl Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Inserted { count, .. } => {
                write!(f, "{count} records were inserted to the BigQuery table")
            }
            RunOutcome::UpToDate { table } => write!(f, "The {table} table is already up-to-date"),
        }
    }
}

/// Latest date stored in `table`, or `default_last_date` when the table is empty.
pub async fn last_stored_date(
    warehouse: &dyn Warehouse,
    table: &TableRef,
    default_last_date: NaiveDate,
) -> Result<NaiveDate> {
    let value = warehouse
        .query_scalar(&last_date_query(table))
        .await
        .with_context(|| format!("Failed to read last stored date from {table}"))?;

    match value {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date returned by warehouse: '{s}'")),
        None => {
            debug!(default = %default_last_date, "Table is empty, using bootstrap date");
            Ok(default_last_date)
        }
    }
}

pub struct RateSync<'a> {
    provider: &'a dyn RateProvider,
    warehouse: &'a dyn Warehouse,
    table: TableRef,
    default_last_date: NaiveDate,
}

impl<'a> RateSync<'a> {
    pub fn new(
        provider: &'a dyn RateProvider,
        warehouse: &'a dyn Warehouse,
        table: TableRef,
        default_last_date: NaiveDate,
    ) -> Self {
        RateSync {
            provider,
            warehouse,
            table,
            default_last_date,
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub async fn last_stored_date(&self) -> Result<NaiveDate> {
        last_stored_date(self.warehouse, &self.table, self.default_last_date).await
    }

    pub async fn window(&self, today: NaiveDate) -> Result<FetchWindow> {
        let last_date = self.last_stored_date().await?;
        let window = FetchWindow::after(last_date, today)?;
        debug!(%last_date, %window, "Computed fetch window");
        Ok(window)
    }

    pub async fn fetch_rows(&self, window: &FetchWindow) -> Result<Vec<ExchangeRateRow>> {
        let raw = self
            .provider
            .fetch_timeseries(window, BASE_CURRENCY, &TARGET_CURRENCIES)
            .await
            .with_context(|| format!("Failed to fetch exchange rates for {window}"))?;

        let (rows, outside): (Vec<_>, Vec<_>) = reshape(&raw)?
            .into_iter()
            .partition(|row| window.contains(row.date));
        for row in &outside {
            warn!(date = %row.date, %window, "Dropping rate outside the fetch window");
        }
        Ok(rows)
    }

    /// Fetches every day after the last stored one up to `today` and appends it to the table.
    pub async fn run(&self, today: NaiveDate) -> Result<RunOutcome> {
        let window = self.window(today).await?;
        if !window.is_fetchable() {
            info!(table = %self.table, "Table is up-to-date");
            return Ok(RunOutcome::UpToDate {
                table: self.table.clone(),
            });
        }

        let rows = self.fetch_rows(&window).await?;
        info!(count = rows.len(), %window, "Loading exchange rates");
        self.warehouse
            .load_batch(&self.table, &rate_table_schema(), &rows)
            .await
            .with_context(|| format!("Failed to load exchange rates into {}", self.table))?;

        Ok(RunOutcome::Inserted {
            count: rows.len(),
            window,
        })
    }
}
