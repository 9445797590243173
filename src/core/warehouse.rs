//! Warehouse abstractions and the exchange rate table definition

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

use super::rates::{ExchangeRateRow, TARGET_CURRENCIES, column_name};

/// A `project.dataset.table` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl FromStr for TableRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if [project, dataset, table].iter().all(|p| !p.trim().is_empty()) =>
            {
                Ok(TableRef {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                    table: table.to_string(),
                })
            }
            _ => Err(anyhow!(
                "Invalid table identifier '{}': expected project.dataset.table",
                s
            )),
        }
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Date,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Fixed schema of the exchange rate table.
pub fn rate_table_schema() -> Vec<SchemaField> {
    let mut schema = vec![SchemaField {
        name: "date".to_string(),
        field_type: FieldType::Date,
    }];
    schema.extend(TARGET_CURRENCIES.iter().map(|code| SchemaField {
        name: column_name(code),
        field_type: FieldType::Float,
    }));
    schema
}

pub fn last_date_query(table: &TableRef) -> String {
    format!("SELECT MAX(date) FROM `{table}`")
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs `sql` and returns the first column of the first row, `None` for NULL or no rows.
    async fn query_scalar(&self, sql: &str) -> Result<Option<String>>;

    /// Appends `rows` to `table` as a single load job and waits for it to finish.
    async fn load_batch(
        &self,
        table: &TableRef,
        schema: &[SchemaField],
        rows: &[ExchangeRateRow],
    ) -> Result<()>;
}
