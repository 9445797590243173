use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::ExchangeRateRow;
use crate::core::rates::{TARGET_CURRENCIES, column_name};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Success,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Success => style(text).green().bold(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn rate_cell(rate: f64) -> Cell {
    Cell::new(format!("{rate:.6}")).set_alignment(CellAlignment::Right)
}

/// Renders rows in warehouse column order.
pub fn rates_table(rows: &[ExchangeRateRow]) -> Table {
    let mut table = new_styled_table();

    let mut header = vec![header_cell("date")];
    header.extend(TARGET_CURRENCIES.iter().map(|c| header_cell(&column_name(c))));
    table.set_header(header);

    for row in rows {
        table.add_row(vec![
            Cell::new(row.date.to_string()),
            rate_cell(row.usd_eur),
            rate_cell(row.gbp_eur),
            rate_cell(row.chf_eur),
        ]);
    }
    table
}

/// Creates a spinner for long-running warehouse calls. Hidden when stderr is not a terminal.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
