use super::ui;
use crate::core::sync::last_stored_date;
use crate::core::{FetchWindow, TableRef, Warehouse};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

pub async fn run(
    warehouse: &dyn Warehouse,
    table: &TableRef,
    default_last_date: NaiveDate,
    today: NaiveDate,
) -> Result<FetchWindow> {
    let last_date = last_stored_date(warehouse, table, default_last_date).await?;
    let window = FetchWindow::after(last_date, today)?;

    let pending = if window.is_fetchable() {
        ui::style_text(&window.to_string(), ui::StyleType::Success)
    } else {
        ui::style_text("up-to-date", ui::StyleType::Subtle)
    };

    let mut status = ui::new_styled_table();
    status.add_row(vec![
        Cell::new(ui::style_text("Table", ui::StyleType::Label)),
        Cell::new(table.to_string()),
    ]);
    status.add_row(vec![
        Cell::new(ui::style_text("Last stored date", ui::StyleType::Label)),
        Cell::new(last_date.to_string()),
    ]);
    status.add_row(vec![
        Cell::new(ui::style_text("Pending window", ui::StyleType::Label)),
        Cell::new(pending),
    ]);
    println!("{status}");

    Ok(window)
}
