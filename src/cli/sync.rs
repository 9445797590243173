use super::ui;
use crate::core::{RateSync, RunOutcome};
use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

/// Loads every missing day up to `today` and prints the outcome.
pub async fn run(sync: &RateSync<'_>, today: NaiveDate) -> Result<RunOutcome> {
    info!(table = %sync.table(), %today, "Syncing exchange rates");

    let pb = ui::new_spinner(&format!("Syncing {}", sync.table()));
    let result = sync.run(today).await;
    pb.finish_and_clear();

    let outcome = result?;
    println!("{outcome}");
    Ok(outcome)
}

/// Fetches the pending rows and prints them without loading anything.
pub async fn preview(sync: &RateSync<'_>, today: NaiveDate) -> Result<usize> {
    let window = sync.window(today).await?;
    if !window.is_fetchable() {
        let outcome = RunOutcome::UpToDate {
            table: sync.table().clone(),
        };
        println!("{outcome}");
        return Ok(0);
    }

    let pb = ui::new_spinner(&format!("Fetching rates for {window}"));
    let rows = sync.fetch_rows(&window).await;
    pb.finish_and_clear();
    let rows = rows?;

    println!(
        "{}",
        ui::style_text(&format!("Pending rows for {window}"), ui::StyleType::Title)
    );
    println!("{}", ui::rates_table(&rows));
    println!(
        "{}",
        ui::style_text(
            &format!(
                "{} records would be inserted to the {} table (dry run)",
                rows.len(),
                sync.table()
            ),
            ui::StyleType::Subtle
        )
    );
    Ok(rows.len())
}
