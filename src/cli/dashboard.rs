//! The dashboard views: a main page with tiles, charts and earnings cards,
//! and placeholder pages that only show the ticker header.

use super::ui;
use crate::core::company::{
    CompanyData, CompanyDataProvider, EarningsEvent, EarningsOutcome, FinancialSeries, Frequency,
    PricePoint, Statement, StatementKind, ViewMode, normalize_ticker,
};
use crate::core::format::{
    format_eps, format_magnitude, format_percent, format_price, format_ratio,
};
use crate::core::growth::compute_growth_badges;
use crate::core::quote::{Direction, compute_price_change};
use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use comfy_table::{Cell, Color};
use std::fmt::Display;
use tracing::{error, info};

const UPCOMING_EARNINGS_LIMIT: usize = 3;
const HISTORICAL_EARNINGS_LIMIT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Main,
    Cash,
    Debt,
    Valuation,
    IntrinsicValue,
    Shares,
}

impl Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Page::Main => "Main",
                Page::Cash => "Cash",
                Page::Debt => "Debt",
                Page::Valuation => "Valuation",
                Page::IntrinsicValue => "Intrinsic Value",
                Page::Shares => "Shares",
            }
        )
    }
}

struct IncomeChart {
    label: &'static str,
    title: &'static str,
    scale: f64,
}

const INCOME_CHARTS: [IncomeChart; 6] = [
    IncomeChart {
        label: "Total Revenue",
        title: "Revenue ($B)",
        scale: 1e9,
    },
    IncomeChart {
        label: "Basic EPS",
        title: "Earnings Per Share (EPS)",
        scale: 1.0,
    },
    IncomeChart {
        label: "Net Income",
        title: "Net Income ($B)",
        scale: 1e9,
    },
    IncomeChart {
        label: "Gross Profit",
        title: "Gross Profit ($B)",
        scale: 1e9,
    },
    IncomeChart {
        label: "EBITDA",
        title: "EBITDA ($B)",
        scale: 1e9,
    },
    IncomeChart {
        label: "Operating Income",
        title: "Operating Income ($B)",
        scale: 1e9,
    },
];

/// Fetches the ticker and prints the requested page. A failed fetch is shown
/// as an error banner rather than returned.
pub async fn run(
    provider: &(dyn CompanyDataProvider + Send + Sync),
    ticker_input: &str,
    view: ViewMode,
    page: Page,
) -> Result<()> {
    let ticker = normalize_ticker(ticker_input);
    if ticker.is_empty() {
        println!("Enter a ticker symbol to load the dashboard.");
        return Ok(());
    }
    info!(%ticker, %view, %page, "Rendering dashboard");

    let spinner = ui::new_spinner(format!("Loading {ticker}..."));
    let result = provider.fetch_company(&ticker).await;
    spinner.finish_and_clear();

    match result {
        Ok(data) => println!("{}", render(&data, view, page, Utc::now())),
        Err(e) => {
            error!(error = %e, %ticker, "Failed to load ticker");
            println!("{}", render_error(&ticker, &e));
        }
    }
    Ok(())
}

pub fn render(data: &CompanyData, view: ViewMode, page: Page, now: DateTime<Utc>) -> String {
    let mut sections = vec![render_header(data)];

    match page {
        Page::Main => {
            let frequency = view.frequency();
            let income = data.statements.get(StatementKind::Income, frequency);
            sections.push(render_key_stats(data));
            sections.extend(render_income_charts(income, frequency));
            if let Some(history) = render_price_history(&data.price_history) {
                sections.push(history);
            }
            sections.push(render_earnings(data, now));
        }
        other => sections.push(render_placeholder(other)),
    }

    sections.join("\n\n")
}

pub fn render_error(ticker: &str, err: &anyhow::Error) -> String {
    ui::banner(
        &[
            format!("Error loading {ticker}. Please check the ticker and try again."),
            err.to_string(),
        ],
        ui::StyleType::Error,
    )
}

fn render_header(data: &CompanyData) -> String {
    let profile = &data.profile;
    let name = profile.long_name.as_deref().unwrap_or(&data.symbol);
    let details = [&profile.sector, &profile.exchange, &profile.industry]
        .iter()
        .map(|s| s.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" · ");

    let price = profile.price();
    let change = compute_price_change(price, profile.previous_close);
    let change_text = format!(
        "{} ${:.2} ({:.2}%) today",
        change.direction.arrow(),
        change.change.abs(),
        change.change_percent.abs()
    );
    let change_style = match change.direction {
        Direction::Up => ui::StyleType::Positive,
        Direction::Down => ui::StyleType::Negative,
    };

    format!(
        "{}  {}\n{}\n{}  {}",
        ui::style_text(&data.symbol, ui::StyleType::Ticker),
        ui::style_text(name, ui::StyleType::Label),
        ui::style_text(&details, ui::StyleType::Subtle),
        ui::style_text(&format_price(price), ui::StyleType::Title),
        ui::style_text(&change_text, change_style),
    )
}

fn render_key_stats(data: &CompanyData) -> String {
    let profile = &data.profile;
    let tiles = [
        ("Market Cap", format_magnitude(profile.market_cap)),
        ("P/E Ratio", format_ratio(profile.trailing_pe)),
        ("EPS (TTM)", format_eps(profile.trailing_eps)),
        ("Revenue", format_magnitude(profile.total_revenue)),
        ("Net Margin", format_percent(profile.profit_margins)),
        ("ROE", format_percent(profile.return_on_equity)),
    ];

    let mut table = ui::new_styled_table();
    table.set_header(tiles.iter().map(|(label, _)| ui::header_cell(label)));
    table.add_row(tiles.iter().map(|(_, value)| ui::tile_cell(value)));
    table.to_string()
}

fn period_label(date: chrono::NaiveDate, frequency: Frequency) -> String {
    match frequency {
        Frequency::Annual => date.year().to_string(),
        Frequency::Quarterly => date.format("%Y-%m").to_string(),
    }
}

fn chart_data(series: &FinancialSeries, scale: f64, frequency: Frequency) -> (Vec<String>, Vec<f64>) {
    series
        .valid_points()
        .into_iter()
        .map(|(date, value)| (period_label(date, frequency), value / scale))
        .unzip()
}

/// One chart per income line item present in the statement, each followed by
/// its growth badges. Missing line items are skipped.
fn render_income_charts(income: &Statement, frequency: Frequency) -> Vec<String> {
    INCOME_CHARTS
        .iter()
        .filter_map(|chart_def| {
            let series = income.series(chart_def.label)?;
            let (labels, values) = chart_data(&series, chart_def.scale, frequency);
            if labels.is_empty() {
                return None;
            }
            let chart = ui::bar_chart(chart_def.title, &labels, &values);
            let badges = ui::render_badges(&compute_growth_badges(&series));
            Some(if badges.is_empty() {
                chart
            } else {
                format!("{chart}\n{badges}")
            })
        })
        .collect()
}

/// Month-end closes over the fetched history as a sparkline.
fn render_price_history(history: &[PricePoint]) -> Option<String> {
    let mut monthly: Vec<PricePoint> = Vec::new();
    for point in history {
        match monthly.last_mut() {
            Some(last)
                if last.date.year() == point.date.year()
                    && last.date.month() == point.date.month() =>
            {
                *last = *point;
            }
            _ => monthly.push(*point),
        }
    }
    let (first, last) = (monthly.first()?, monthly.last()?);

    let closes: Vec<f64> = monthly.iter().map(|p| p.close).collect();
    let low = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let high = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(format!(
        "{}\n{}\n{}",
        ui::style_text("Price History", ui::StyleType::Title),
        ui::sparkline(&closes),
        ui::style_text(
            &format!(
                "{} {} → {} {}   low {}  high {}",
                first.date.format("%b %Y"),
                format_price(first.close),
                last.date.format("%b %Y"),
                format_price(last.close),
                format_price(low),
                format_price(high)
            ),
            ui::StyleType::Subtle
        )
    ))
}

fn eps_or(value: Option<f64>, missing: &str) -> String {
    value.map_or_else(|| missing.to_string(), |v| format!("${v:.2}"))
}

fn render_earnings(data: &CompanyData, now: DateTime<Utc>) -> String {
    let mut output = ui::style_text("Earnings Events", ui::StyleType::Title);

    output.push_str("\n\nUpcoming Earnings\n");
    let upcoming = data.upcoming_earnings(now, UPCOMING_EARNINGS_LIMIT);
    if upcoming.is_empty() {
        output.push_str(&ui::banner(
            &["No upcoming earnings found".to_string()],
            ui::StyleType::Subtle,
        ));
    } else {
        output.push_str(&upcoming_table(&upcoming));
    }

    output.push_str("\n\nHistorical Earnings\n");
    let historical = data.historical_earnings(now, HISTORICAL_EARNINGS_LIMIT);
    if historical.is_empty() {
        output.push_str(&ui::banner(
            &["Historical earnings unavailable".to_string()],
            ui::StyleType::Subtle,
        ));
    } else {
        output.push_str(&historical_table(&historical));
    }

    output
}

fn upcoming_table(events: &[&EarningsEvent]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Event"),
        ui::header_cell("Est. EPS"),
        ui::header_cell(""),
    ]);
    for event in events {
        table.add_row(vec![
            Cell::new(event.date.format("%b %d, %Y")).fg(Color::Cyan),
            Cell::new("Earnings Report"),
            Cell::new(eps_or(event.eps_estimate, "TBD")),
            Cell::new("UPCOMING").fg(Color::Cyan),
        ]);
    }
    table.to_string()
}

fn historical_table(events: &[&EarningsEvent]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Event"),
        ui::header_cell("Reported EPS"),
        ui::header_cell("Est"),
        ui::header_cell("Result"),
    ]);
    for event in events {
        let (result_text, color) = match event.outcome() {
            EarningsOutcome::Beat => ("Beat ✓", Color::Green),
            EarningsOutcome::Miss => ("Miss ✗", Color::Red),
            EarningsOutcome::Unknown => ("", Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(event.date.format("%b %d, %Y")).fg(Color::Cyan),
            Cell::new("Quarterly Earnings"),
            Cell::new(eps_or(event.reported_eps, "N/A")).fg(color),
            Cell::new(eps_or(event.eps_estimate, "N/A")),
            Cell::new(result_text).fg(color),
        ]);
    }
    table.to_string()
}

fn render_placeholder(page: Page) -> String {
    ui::banner(
        &[format!("{page} page: coming soon!")],
        ui::StyleType::Subtle,
    )
}
