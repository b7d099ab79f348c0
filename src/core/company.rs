//! Company data model and the provider abstraction that fills it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Statement granularity as requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ViewMode {
    #[default]
    Ttm,
    Quarterly,
    Yearly,
}

impl ViewMode {
    /// TTM and Yearly both read the annual statements.
    pub fn frequency(&self) -> Frequency {
        match self {
            ViewMode::Quarterly => Frequency::Quarterly,
            ViewMode::Ttm | ViewMode::Yearly => Frequency::Annual,
        }
    }
}

impl Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ViewMode::Ttm => "TTM",
                ViewMode::Quarterly => "Quarterly",
                ViewMode::Yearly => "Yearly",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Annual,
    Quarterly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Income,
    CashFlow,
    BalanceSheet,
}

/// One line item: period-end dates in ascending order, values possibly missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinancialSeries {
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl FinancialSeries {
    /// Builds a series, sorting the points by period-end date.
    pub fn new(mut points: Vec<(NaiveDate, Option<f64>)>) -> Self {
        points.sort_by_key(|(date, _)| *date);
        Self { points }
    }

    /// Values that are present and numeric, oldest first.
    pub fn valid_values(&self) -> Vec<f64> {
        self.points
            .iter()
            .filter_map(|(_, v)| v.filter(|x| !x.is_nan()))
            .collect()
    }

    /// Points that carry a value, oldest first.
    pub fn valid_points(&self) -> Vec<(NaiveDate, f64)> {
        self.points
            .iter()
            .filter_map(|(d, v)| v.filter(|x| !x.is_nan()).map(|x| (*d, x)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A statement table indexed by line-item label and then by period-end date.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statement {
    pub line_items: BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>>,
}

impl Statement {
    pub fn insert(&mut self, label: &str, date: NaiveDate, value: Option<f64>) {
        self.line_items
            .entry(label.to_string())
            .or_default()
            .insert(date, value);
    }

    pub fn series(&self, label: &str) -> Option<FinancialSeries> {
        self.line_items.get(label).map(|row| FinancialSeries {
            points: row.iter().map(|(d, v)| (*d, *v)).collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatementPair {
    pub annual: Statement,
    pub quarterly: Statement,
}

impl StatementPair {
    pub fn get(&self, frequency: Frequency) -> &Statement {
        match frequency {
            Frequency::Annual => &self.annual,
            Frequency::Quarterly => &self.quarterly,
        }
    }

    pub fn get_mut(&mut self, frequency: Frequency) -> &mut Statement {
        match frequency {
            Frequency::Annual => &mut self.annual,
            Frequency::Quarterly => &mut self.quarterly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statements {
    pub income: StatementPair,
    pub cash_flow: StatementPair,
    pub balance_sheet: StatementPair,
}

impl Statements {
    pub fn get(&self, kind: StatementKind, frequency: Frequency) -> &Statement {
        self.pair(kind).get(frequency)
    }

    pub fn get_mut(&mut self, kind: StatementKind, frequency: Frequency) -> &mut Statement {
        match kind {
            StatementKind::Income => self.income.get_mut(frequency),
            StatementKind::CashFlow => self.cash_flow.get_mut(frequency),
            StatementKind::BalanceSheet => self.balance_sheet.get_mut(frequency),
        }
    }

    fn pair(&self, kind: StatementKind) -> &StatementPair {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::CashFlow => &self.cash_flow,
            StatementKind::BalanceSheet => &self.balance_sheet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    pub current_price: Option<f64>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub total_revenue: Option<f64>,
    pub profit_margins: Option<f64>,
    pub return_on_equity: Option<f64>,
}

impl CompanyProfile {
    /// Last traded price, or zero when the provider reported neither price field.
    pub fn price(&self) -> f64 {
        self.current_price
            .or(self.regular_market_price)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningsOutcome {
    Beat,
    Miss,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub date: DateTime<Utc>,
    pub eps_estimate: Option<f64>,
    pub reported_eps: Option<f64>,
}

impl EarningsEvent {
    pub fn outcome(&self) -> EarningsOutcome {
        match (self.reported_eps, self.eps_estimate) {
            (Some(actual), Some(estimate)) if actual >= estimate => EarningsOutcome::Beat,
            (Some(_), Some(_)) => EarningsOutcome::Miss,
            _ => EarningsOutcome::Unknown,
        }
    }
}

/// Everything fetched for one ticker in a single request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyData {
    pub symbol: String,
    pub profile: CompanyProfile,
    pub statements: Statements,
    pub price_history: Vec<PricePoint>,
    /// Newest first.
    pub earnings: Vec<EarningsEvent>,
}

impl CompanyData {
    pub fn upcoming_earnings(&self, now: DateTime<Utc>, limit: usize) -> Vec<&EarningsEvent> {
        self.earnings
            .iter()
            .filter(|e| e.date > now)
            .take(limit)
            .collect()
    }

    pub fn historical_earnings(&self, now: DateTime<Utc>, limit: usize) -> Vec<&EarningsEvent> {
        self.earnings
            .iter()
            .filter(|e| e.date <= now)
            .take(limit)
            .collect()
    }
}

/// Normalizes free-text ticker input.
pub fn normalize_ticker(input: &str) -> String {
    input.trim().to_uppercase()
}

#[async_trait]
pub trait CompanyDataProvider: Send + Sync {
    async fn fetch_company(&self, symbol: &str) -> Result<CompanyData>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_view_mode_frequency() {
        assert_eq!(ViewMode::Ttm.frequency(), Frequency::Annual);
        assert_eq!(ViewMode::Yearly.frequency(), Frequency::Annual);
        assert_eq!(ViewMode::Quarterly.frequency(), Frequency::Quarterly);
    }

    #[test]
    fn test_statement_series_is_ascending() {
        let mut statement = Statement::default();
        statement.insert("Total Revenue", date(2023, 9, 30), Some(300.0));
        statement.insert("Total Revenue", date(2021, 9, 30), None);
        statement.insert("Total Revenue", date(2020, 9, 30), Some(100.0));

        let series = statement.series("Total Revenue").unwrap();
        assert_eq!(
            series.points,
            vec![
                (date(2020, 9, 30), Some(100.0)),
                (date(2021, 9, 30), None),
                (date(2023, 9, 30), Some(300.0)),
            ]
        );
        assert_eq!(series.valid_values(), vec![100.0, 300.0]);
        assert!(statement.series("EBITDA").is_none());
    }

    #[test]
    fn test_series_new_sorts_and_valid_values_skip_nan() {
        let series = FinancialSeries::new(vec![
            (date(2022, 1, 1), Some(2.0)),
            (date(2020, 1, 1), Some(f64::NAN)),
            (date(2021, 1, 1), Some(1.0)),
        ]);
        assert_eq!(series.points[0].0, date(2020, 1, 1));
        assert_eq!(series.valid_values(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_profile_price_fallbacks() {
        let mut profile = CompanyProfile::default();
        assert_eq!(profile.price(), 0.0);
        profile.regular_market_price = Some(10.0);
        assert_eq!(profile.price(), 10.0);
        profile.current_price = Some(11.0);
        assert_eq!(profile.price(), 11.0);
    }

    #[test]
    fn test_earnings_outcome() {
        let event = |actual, estimate| EarningsEvent {
            date: Utc::now(),
            eps_estimate: estimate,
            reported_eps: actual,
        };
        assert_eq!(event(Some(1.5), Some(1.4)).outcome(), EarningsOutcome::Beat);
        assert_eq!(event(Some(1.4), Some(1.4)).outcome(), EarningsOutcome::Beat);
        assert_eq!(event(Some(1.3), Some(1.4)).outcome(), EarningsOutcome::Miss);
        assert_eq!(event(None, Some(1.4)).outcome(), EarningsOutcome::Unknown);
        assert_eq!(event(Some(1.3), None).outcome(), EarningsOutcome::Unknown);
    }

    #[test]
    fn test_upcoming_and_historical_earnings_split() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let at = |m| EarningsEvent {
            date: Utc.with_ymd_and_hms(2024, m, 1, 0, 0, 0).unwrap(),
            eps_estimate: None,
            reported_eps: None,
        };
        let data = CompanyData {
            earnings: vec![at(10), at(8), at(6), at(4), at(2), at(1)],
            ..Default::default()
        };

        let upcoming = data.upcoming_earnings(now, 3);
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].date, at(10).date);

        let historical = data.historical_earnings(now, 4);
        assert_eq!(historical.len(), 4);
        assert_eq!(historical[0].date, now);
        assert_eq!(historical[3].date, at(1).date);
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("  aapl "), "AAPL");
        assert_eq!(normalize_ticker("brk-b"), "BRK-B");
        assert_eq!(normalize_ticker("   "), "");
    }
}
