use crate::core::format::format_with_separators;
use crate::core::growth::{BadgeClass, GrowthBadges, classify_badge};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_WIDTH: usize = 32;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Ticker,
    Label,
    Positive,
    Negative,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Ticker => style(text).cyan().bold(),
        StyleType::Label => style(text).bold(),
        StyleType::Positive => style(text).green().bold(),
        StyleType::Negative => style(text).red().bold(),
        StyleType::Error => style(text).red(),
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

/// A metric tile value. "N/A" is dimmed.
pub fn tile_cell(text: &str) -> Cell {
    let cell = Cell::new(text).set_alignment(CellAlignment::Center);
    if text == crate::core::format::NOT_AVAILABLE {
        cell.fg(Color::DarkGrey)
    } else {
        cell.add_attribute(Attribute::Bold)
    }
}

/// Renders growth badges as `1Y: 12.34%  3Y: -1.20%`, colored by sign.
pub fn render_badges(badges: &GrowthBadges) -> String {
    badges
        .iter()
        .map(|(horizon, value)| {
            let text = format!("{horizon}: {:.2}%", value * 100.0);
            match classify_badge(value) {
                BadgeClass::Positive => style_text(&text, StyleType::Positive),
                BadgeClass::Negative => style_text(&text, StyleType::Negative),
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Horizontal bar chart of `(label, value)` pairs. Negative values are drawn
/// in red against the largest absolute value.
pub fn bar_chart(title: &str, labels: &[String], values: &[f64]) -> String {
    let max_abs = values
        .iter()
        .map(|v| v.abs())
        .fold(0.0_f64, f64::max);

    let mut table = new_styled_table();
    table.set_header(vec![header_cell(title), header_cell(""), header_cell("")]);

    for (label, value) in labels.iter().zip(values) {
        let len = if max_abs > 0.0 {
            ((value.abs() / max_abs) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar = "█".repeat(len.max(usize::from(*value != 0.0)));
        let bar_cell = if *value < 0.0 {
            Cell::new(bar).fg(Color::Red)
        } else {
            Cell::new(bar).fg(Color::Blue)
        };
        table.add_row(vec![
            Cell::new(label),
            bar_cell,
            Cell::new(format_with_separators(*value, 2)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// One-line chart of a value series, scaled between its minimum and maximum.
pub fn sparkline(values: &[f64]) -> String {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let span = max - min;

    values
        .iter()
        .map(|v| {
            if span > 0.0 {
                let level = ((v - min) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            } else {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            }
        })
        .collect()
}

/// Boxed notice, used for errors and informational banners.
pub fn banner(lines: &[String], style_type: StyleType) -> String {
    let mut table = new_styled_table();
    for line in lines {
        let cell = match style_type {
            StyleType::Error | StyleType::Negative => Cell::new(line).fg(Color::Red),
            StyleType::Positive => Cell::new(line).fg(Color::Green),
            _ => Cell::new(line).fg(Color::Cyan),
        };
        table.add_row(vec![cell]);
    }
    table.to_string()
}

/// Creates a spinner shown while data is being fetched.
pub fn new_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
