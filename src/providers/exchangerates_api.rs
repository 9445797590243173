use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::{FetchWindow, RateProvider, RawRates};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ExchangeRatesApiProvider implementation for RateProvider
pub struct ExchangeRatesApiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExchangeRatesApiProvider {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        ExchangeRatesApiProvider {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<serde_json::Value>,
    #[serde(alias = "info")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesResponse {
    success: Option<bool>,
    error: Option<ApiError>,
    rates: Option<RawRates>,
}

fn validate_currency_code(code: &str) -> Result<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(anyhow!("Invalid currency code: '{}'", code))
    }
}

#[async_trait]
impl RateProvider for ExchangeRatesApiProvider {
    #[instrument(
        name = "ExchangeRatesFetch",
        skip(self, window, symbols),
        fields(window = %window)
    )]
    async fn fetch_timeseries(
        &self,
        window: &FetchWindow,
        base: &str,
        symbols: &[&str],
    ) -> Result<RawRates> {
        validate_currency_code(base)?;
        for symbol in symbols {
            validate_currency_code(symbol)?;
        }

        let start_date = window.start_date.format(DATE_FORMAT).to_string();
        let end_date = window.end_date.format(DATE_FORMAT).to_string();
        let symbols = symbols.join(",");
        let url = Url::parse_with_params(
            &format!("{}/timeseries", self.base_url),
            &[
                ("start_date", start_date.as_str()),
                ("end_date", end_date.as_str()),
                ("base", base),
                ("symbols", symbols.as_str()),
            ],
        )
        .with_context(|| format!("Invalid rates API URL: {}", self.base_url))?;
        debug!("Requesting exchange rates from {}", url);

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for window: {}", e, window))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for window: {}",
                response.status(),
                window
            ));
        }

        let text = response.text().await?;

        let data: TimeseriesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", window, e))?;

        if data.success == Some(false) {
            let detail = data
                .error
                .map(|e| {
                    let code = e.code.map(|c| c.to_string()).unwrap_or_default();
                    format!("{} {}", code, e.message.unwrap_or_default())
                        .trim()
                        .to_string()
                })
                .unwrap_or_else(|| "unknown error".to_string());
            bail!("Rates API error for {}: {}", window, detail);
        }

        let rates = data
            .rates
            .ok_or_else(|| anyhow!("No rates found in response for window: {}", window))?;
        debug!(dates = rates.len(), "Received exchange rates");

        Ok(rates)
    }
}
