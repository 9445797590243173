//! Incremental fetch window calculation

use anyhow::{Result, anyhow};
use chrono::{Days, NaiveDate};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl FetchWindow {
    /// Window starting the day after `last_date` and ending on `today`.
    pub fn after(last_date: NaiveDate, today: NaiveDate) -> Result<Self> {
        let start_date = last_date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| anyhow!("Can't get next date for {}", last_date))?;

        Ok(FetchWindow {
            start_date,
            end_date: today,
        })
    }

    /// A window is only fetched when it ends strictly after it starts.
    pub fn is_fetchable(&self) -> bool {
        self.end_date > self.start_date
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start_date..=self.end_date).contains(&date)
    }
}

impl Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_date, self.end_date)
    }
}
