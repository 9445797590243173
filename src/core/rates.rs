//! Exchange rate types and the rate provider abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::window::FetchWindow;

/// Currency every rate is quoted against.
pub const BASE_CURRENCY: &str = "EUR";

/// Currencies recorded in the warehouse table, in column order.
pub const TARGET_CURRENCIES: [&str; 3] = ["USD", "GBP", "CHF"];

/// Date (`YYYY-MM-DD`) to currency code to rate, as returned by the rates API.
pub type RawRates = BTreeMap<String, BTreeMap<String, f64>>;

/// One warehouse row: the rates of each target currency against the base on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRow {
    pub date: NaiveDate,
    #[serde(rename = "USD_EUR")]
    pub usd_eur: f64,
    #[serde(rename = "GBP_EUR")]
    pub gbp_eur: f64,
    #[serde(rename = "CHF_EUR")]
    pub chf_eur: f64,
}

/// Column name for a target currency, e.g. `USD` becomes `USD_EUR`.
pub fn column_name(code: &str) -> String {
    format!("{code}_{BASE_CURRENCY}")
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches daily rates of `symbols` against `base` for every day in `window`.
    async fn fetch_timeseries(
        &self,
        window: &FetchWindow,
        base: &str,
        symbols: &[&str],
    ) -> Result<RawRates>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_follow_base_currency() {
        let columns: Vec<String> = TARGET_CURRENCIES.iter().map(|c| column_name(c)).collect();
        assert_eq!(columns, vec!["USD_EUR", "GBP_EUR", "CHF_EUR"]);
    }

    #[test]
    fn test_row_serializes_with_warehouse_column_names() {
        let row = ExchangeRateRow {
            date: NaiveDate::from_ymd_opt(2022, 5, 18).unwrap(),
            usd_eur: 1.05,
            gbp_eur: 0.85,
            chf_eur: 0.97,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2022-05-18",
                "USD_EUR": 1.05,
                "GBP_EUR": 0.85,
                "CHF_EUR": 0.97
            })
        );
    }
}
