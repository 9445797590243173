pub mod bigquery;
pub mod exchangerates_api;
