use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::rates::{ExchangeRateRow, RawRates, TARGET_CURRENCIES, column_name};

fn rate_for(rates: &BTreeMap<String, f64>, code: &str, date: &str) -> Result<f64> {
    rates
        .get(code)
        .copied()
        .ok_or_else(|| anyhow!("Missing {} rate for {}", column_name(code), date))
}

fn to_row(date_str: &str, rates: &BTreeMap<String, f64>) -> Result<ExchangeRateRow> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date in rates response: '{date_str}'"))?;

    let [usd, gbp, chf] = TARGET_CURRENCIES;
    Ok(ExchangeRateRow {
        date,
        usd_eur: rate_for(rates, usd, date_str)?,
        gbp_eur: rate_for(rates, gbp, date_str)?,
        chf_eur: rate_for(rates, chf, date_str)?,
    })
}

/// Reshapes the date to currency mapping into one row per date, ordered by date.
///
/// Two keys naming the same calendar day (`2022-05-18` and `2022-5-18`) are rejected.
pub fn reshape(raw: &RawRates) -> Result<Vec<ExchangeRateRow>> {
    let mut rows = raw
        .iter()
        .map(|(date_str, rates)| to_row(date_str, rates))
        .collect::<Result<Vec<_>>>()?;

    rows.sort_by_key(|row| row.date);
    if let Some(pair) = rows.windows(2).find(|pair| pair[0].date == pair[1].date) {
        bail!("Duplicate date in rates response: {}", pair[0].date);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_from_json(json: &str) -> RawRates {
        #[derive(serde::Deserialize)]
        struct Envelope {
            rates: RawRates,
        }
        serde_json::from_str::<Envelope>(json).unwrap().rates
    }

    #[test]
    fn test_single_date_reshape() {
        let raw = raw_from_json(
            r#"{"rates": {"2022-05-18": {"USD": 1.05, "GBP": 0.85, "CHF": 0.97}}}"#,
        );

        let rows = reshape(&raw).unwrap();
        assert_eq!(
            rows,
            vec![ExchangeRateRow {
                date: NaiveDate::from_ymd_opt(2022, 5, 18).unwrap(),
                usd_eur: 1.05,
                gbp_eur: 0.85,
                chf_eur: 0.97,
            }]
        );
    }

    #[test]
    fn test_rows_are_ordered_by_date() {
        let raw = raw_from_json(
            r#"{"rates": {
                "2022-05-22": {"USD": 1.06, "GBP": 0.84, "CHF": 1.02},
                "2022-05-21": {"USD": 1.05, "GBP": 0.85, "CHF": 1.03}
            }}"#,
        );

        let rows = reshape(&raw).unwrap();
        let dates: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2022-05-21", "2022-05-22"]);
        assert_eq!(rows[0].usd_eur, 1.05);
        assert_eq!(rows[1].chf_eur, 1.02);
    }

    #[test]
    fn test_reshape_is_deterministic() {
        let raw = raw_from_json(
            r#"{"rates": {
                "2022-05-18": {"USD": 1.05, "GBP": 0.85, "CHF": 0.97},
                "2022-05-19": {"USD": 1.04, "GBP": 0.86, "CHF": 0.98}
            }}"#,
        );

        assert_eq!(reshape(&raw).unwrap(), reshape(&raw).unwrap());
    }

    #[test]
    fn test_extra_currencies_are_ignored() {
        let raw = raw_from_json(
            r#"{"rates": {"2022-05-18": {"USD": 1.05, "GBP": 0.85, "CHF": 0.97, "JPY": 136.2}}}"#,
        );

        let rows = reshape(&raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chf_eur, 0.97);
    }

    #[test]
    fn test_missing_currency_is_an_error() {
        let raw = raw_from_json(r#"{"rates": {"2022-05-18": {"USD": 1.05, "GBP": 0.85}}}"#);

        let result = reshape(&raw);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Missing CHF_EUR rate for 2022-05-18"
        );
    }

    #[test]
    fn test_invalid_date_is_an_error() {
        let raw = raw_from_json(r#"{"rates": {"18/05/2022": {"USD": 1.0, "GBP": 1.0, "CHF": 1.0}}}"#);

        let result = reshape(&raw);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Invalid date in rates response: '18/05/2022'")
        );
    }

    #[test]
    fn test_duplicate_calendar_date_is_an_error() {
        let raw = raw_from_json(
            r#"{"rates": {
                "2022-05-18": {"USD": 1.05, "GBP": 0.85, "CHF": 0.97},
                "2022-5-18": {"USD": 1.06, "GBP": 0.84, "CHF": 0.98}
            }}"#,
        );

        let result = reshape(&raw);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Duplicate date in rates response: 2022-05-18"
        );
    }

    #[test]
    fn test_unpadded_date_sorts_by_calendar_order() {
        let raw = raw_from_json(
            r#"{"rates": {
                "2022-5-9": {"USD": 1.01, "GBP": 0.81, "CHF": 0.91},
                "2022-05-10": {"USD": 1.02, "GBP": 0.82, "CHF": 0.92}
            }}"#,
        );

        let rows = reshape(&raw).unwrap();
        let dates: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2022-05-09", "2022-05-10"]);
    }

    #[test]
    fn test_empty_rates_give_no_rows() {
        assert!(reshape(&RawRates::new()).unwrap().is_empty());
    }
}
