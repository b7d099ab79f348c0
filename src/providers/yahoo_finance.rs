use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use reqwest::header::{COOKIE, SET_COOKIE};
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::core::company::{
    CompanyData, CompanyDataProvider, CompanyProfile, EarningsEvent, Frequency, PricePoint,
    StatementKind, Statements,
};

/// Statement line items requested from the fundamentals timeseries endpoint,
/// as (Yahoo type key, display label, statement).
pub const LINE_ITEMS: &[(&str, &str, StatementKind)] = &[
    ("TotalRevenue", "Total Revenue", StatementKind::Income),
    ("GrossProfit", "Gross Profit", StatementKind::Income),
    ("OperatingIncome", "Operating Income", StatementKind::Income),
    ("NetIncome", "Net Income", StatementKind::Income),
    ("EBITDA", "EBITDA", StatementKind::Income),
    ("BasicEPS", "Basic EPS", StatementKind::Income),
    ("DilutedEPS", "Diluted EPS", StatementKind::Income),
    ("OperatingCashFlow", "Operating Cash Flow", StatementKind::CashFlow),
    ("CapitalExpenditure", "Capital Expenditure", StatementKind::CashFlow),
    ("FreeCashFlow", "Free Cash Flow", StatementKind::CashFlow),
    ("TotalAssets", "Total Assets", StatementKind::BalanceSheet),
    ("TotalDebt", "Total Debt", StatementKind::BalanceSheet),
    (
        "CashAndCashEquivalents",
        "Cash And Cash Equivalents",
        StatementKind::BalanceSheet,
    ),
    (
        "StockholdersEquity",
        "Stockholders Equity",
        StatementKind::BalanceSheet,
    ),
    (
        "OrdinarySharesNumber",
        "Ordinary Shares Number",
        StatementKind::BalanceSheet,
    ),
];

const SUMMARY_MODULES: &str = "price,assetProfile,summaryDetail,financialData,defaultKeyStatistics,earningsHistory,calendarEvents";

// Yahoo wraps most numbers as {"raw": 1.23, "fmt": "1.23"}, or {} when absent.
#[derive(Deserialize, Debug, Default, Clone, Copy)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

#[derive(Deserialize, Debug)]
struct YahooErrorBody {
    code: Option<String>,
    description: Option<String>,
}

impl YahooErrorBody {
    fn message(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
    error: Option<YahooErrorBody>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryItem {
    price: Option<PriceModule>,
    asset_profile: Option<AssetProfileModule>,
    summary_detail: Option<SummaryDetailModule>,
    financial_data: Option<FinancialDataModule>,
    default_key_statistics: Option<KeyStatisticsModule>,
    earnings_history: Option<EarningsHistoryModule>,
    calendar_events: Option<CalendarEventsModule>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    exchange_name: Option<String>,
    regular_market_price: Option<RawValue>,
    regular_market_previous_close: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
struct AssetProfileModule {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    previous_close: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    current_price: Option<RawValue>,
    total_revenue: Option<RawValue>,
    profit_margins: Option<RawValue>,
    return_on_equity: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    trailing_eps: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
struct EarningsHistoryModule {
    #[serde(default)]
    history: Vec<EarningsHistoryItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EarningsHistoryItem {
    quarter: Option<RawValue>,
    eps_actual: Option<RawValue>,
    eps_estimate: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
struct CalendarEventsModule {
    earnings: Option<CalendarEarnings>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct CalendarEarnings {
    #[serde(default)]
    earnings_date: Vec<RawValue>,
    earnings_average: Option<RawValue>,
}

impl QuoteSummaryItem {
    fn profile(&self) -> CompanyProfile {
        let price = self.price.as_ref();
        let profile = self.asset_profile.as_ref();
        let detail = self.summary_detail.as_ref();
        let financial = self.financial_data.as_ref();

        CompanyProfile {
            long_name: price.and_then(|p| p.long_name.clone().or_else(|| p.short_name.clone())),
            sector: profile.and_then(|p| p.sector.clone()),
            industry: profile.and_then(|p| p.industry.clone()),
            exchange: price.and_then(|p| p.exchange_name.clone()),
            current_price: financial.and_then(|f| raw(&f.current_price)),
            regular_market_price: price.and_then(|p| raw(&p.regular_market_price)),
            previous_close: detail
                .and_then(|d| raw(&d.previous_close))
                .or_else(|| price.and_then(|p| raw(&p.regular_market_previous_close))),
            market_cap: price
                .and_then(|p| raw(&p.market_cap))
                .or_else(|| detail.and_then(|d| raw(&d.market_cap))),
            trailing_pe: detail.and_then(|d| raw(&d.trailing_pe)),
            trailing_eps: self
                .default_key_statistics
                .as_ref()
                .and_then(|k| raw(&k.trailing_eps)),
            total_revenue: financial.and_then(|f| raw(&f.total_revenue)),
            profit_margins: financial.and_then(|f| raw(&f.profit_margins)),
            return_on_equity: financial.and_then(|f| raw(&f.return_on_equity)),
        }
    }

    /// Past quarters with actuals plus the next scheduled report, newest first.
    fn earnings(&self) -> Vec<EarningsEvent> {
        let mut events: Vec<EarningsEvent> = self
            .earnings_history
            .iter()
            .flat_map(|h| h.history.iter())
            .filter_map(|item| {
                let date = timestamp_to_datetime(raw(&item.quarter)? as i64)?;
                Some(EarningsEvent {
                    date,
                    eps_estimate: raw(&item.eps_estimate),
                    reported_eps: raw(&item.eps_actual),
                })
            })
            .collect();

        if let Some(calendar) = self.calendar_events.as_ref().and_then(|c| c.earnings.as_ref()) {
            // A second date, when present, is the end of the announcement window.
            if let Some(date) = calendar
                .earnings_date
                .first()
                .and_then(|d| d.raw)
                .and_then(|ts| timestamp_to_datetime(ts as i64))
            {
                events.push(EarningsEvent {
                    date,
                    eps_estimate: raw(&calendar.earnings_average),
                    reported_eps: None,
                });
            }
        }

        events.sort_by(|a, b| b.date.cmp(&a.date));
        events.dedup_by_key(|e| e.date);
        events
    }
}

#[derive(Deserialize, Debug)]
struct TimeseriesResponse {
    timeseries: TimeseriesResult,
}

#[derive(Deserialize, Debug)]
struct TimeseriesResult {
    result: Option<Vec<TimeseriesItem>>,
}

#[derive(Deserialize, Debug)]
struct TimeseriesItem {
    meta: TimeseriesMeta,
    // Values are keyed by the requested type, e.g. "annualTotalRevenue".
    #[serde(flatten)]
    values: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    types: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TimeseriesPoint {
    as_of_date: NaiveDate,
    reported_value: Option<RawValue>,
}

fn split_timeseries_type(name: &str) -> Option<(Frequency, &'static str, StatementKind)> {
    let (frequency, key) = if let Some(key) = name.strip_prefix("annual") {
        (Frequency::Annual, key)
    } else if let Some(key) = name.strip_prefix("quarterly") {
        (Frequency::Quarterly, key)
    } else {
        return None;
    };
    LINE_ITEMS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, label, kind)| (frequency, *label, *kind))
}

fn parse_statements(response: TimeseriesResponse) -> Statements {
    let mut statements = Statements::default();

    for item in response.timeseries.result.unwrap_or_default() {
        for type_name in &item.meta.types {
            let Some((frequency, label, kind)) = split_timeseries_type(type_name) else {
                debug!("Ignoring unknown timeseries type {}", type_name);
                continue;
            };
            let Some(values) = item.values.get(type_name) else {
                continue;
            };
            let points: Vec<Option<TimeseriesPoint>> =
                match serde_json::from_value(values.clone()) {
                    Ok(points) => points,
                    Err(e) => {
                        debug!("Skipping malformed timeseries {}: {}", type_name, e);
                        continue;
                    }
                };

            let statement = statements.get_mut(kind, frequency);
            for point in points.into_iter().flatten() {
                statement.insert(label, point.as_of_date, raw(&point.reported_value));
            }
        }
    }

    statements
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

struct ChartData {
    history: Vec<PricePoint>,
    regular_market_price: Option<f64>,
}

fn extract_price_history(item: &ChartItem) -> Vec<PricePoint> {
    let (Some(timestamps), Some(closes)) = (
        item.timestamp.as_ref(),
        item.indicators
            .as_ref()
            .and_then(|inds| inds.quote.first())
            .and_then(|q| q.close.as_ref()),
    ) else {
        return Vec::new();
    };

    timestamps
        .iter()
        .zip(closes.iter())
        .filter_map(|(ts, close)| {
            let close = (*close)?;
            let date = timestamp_to_datetime(*ts)?.date_naive();
            Some(PricePoint { date, close })
        })
        .collect()
}

/// Consent cookie and crumb that Yahoo requires on its quote endpoints.
#[derive(Debug)]
struct YahooSession {
    cookie: Option<String>,
    crumb: String,
}

/// Fetches profile, statements, price history and earnings from Yahoo Finance.
pub struct YahooFinanceProvider {
    base_url: String,
    cookie_url: Option<String>,
    client: reqwest::Client,
    session: OnceCell<YahooSession>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("stocklens/0.1")
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: None,
            client,
            session: OnceCell::new(),
        })
    }

    /// Visits `cookie_url` for a consent cookie before asking for a crumb.
    pub fn with_cookie_url(mut self, cookie_url: &str) -> Self {
        self.cookie_url = Some(cookie_url.to_string());
        self
    }

    async fn open_session(&self) -> Result<YahooSession> {
        let cookie = match &self.cookie_url {
            Some(url) => {
                // The consent page answers 404 but still sets the cookie.
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;
                let pairs: Vec<&str> = response
                    .headers()
                    .get_all(SET_COOKIE)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .filter_map(|v| v.split(';').next())
                    .map(str::trim)
                    .filter(|pair| !pair.is_empty())
                    .collect();
                (!pairs.is_empty()).then(|| pairs.join("; "))
            }
            None => None,
        };

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(cookie) = &cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;
        let status = response.status();
        let crumb = response.text().await?.trim().to_string();
        if !status.is_success() || crumb.is_empty() {
            return Err(anyhow!("HTTP error: {} for crumb", status));
        }

        debug!(has_cookie = cookie.is_some(), "Obtained Yahoo crumb");
        Ok(YahooSession { cookie, crumb })
    }

    /// The session is fetched once per provider. A failed attempt is not kept,
    /// and the request goes out without a crumb.
    async fn session(&self) -> Option<&YahooSession> {
        match self.session.get_or_try_init(|| self.open_session()).await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Continuing without Yahoo crumb: {}", e);
                None
            }
        }
    }

    async fn get_text(&self, url: &str, symbol: &str) -> Result<(reqwest::StatusCode, String)> {
        let mut url = reqwest::Url::parse(url)
            .map_err(|e| anyhow!("Invalid URL {} for symbol {}: {}", url, symbol, e))?;
        let mut request_cookie = None;
        if let Some(session) = self.session().await {
            url.query_pairs_mut().append_pair("crumb", &session.crumb);
            request_cookie = session.cookie.as_deref();
        }

        debug!("Requesting {}", url);
        let mut request = self.client.get(url.clone());
        if let Some(cookie) = request_cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, symbol: &str, what: &str) -> Result<T> {
        let (status, text) = self.get_text(url, symbol).await?;
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for {} of {}", status, what, symbol));
        }
        serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse {} response for {}: {}", what, symbol, e))
    }

    async fn fetch_summary(&self, symbol: &str) -> Result<QuoteSummaryItem> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, symbol, SUMMARY_MODULES
        );
        let (status, text) = self.get_text(&url, symbol).await?;

        // Unknown symbols come back as 404 with an error object in the body.
        let parsed = serde_json::from_str::<QuoteSummaryResponse>(&text);
        if let Ok(QuoteSummaryResponse {
            quote_summary:
                QuoteSummaryResult {
                    error: Some(error), ..
                },
        }) = &parsed
        {
            return Err(anyhow!(
                "Yahoo Finance error for {}: {}",
                symbol,
                error.message()
            ));
        }
        if !status.is_success() {
            return Err(anyhow!("HTTP error: {} for symbol: {}", status, symbol));
        }

        let data = parsed
            .map_err(|e| anyhow!("Failed to parse summary response for {}: {}", symbol, e))?;
        data.quote_summary
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No company data found for symbol: {}", symbol))
    }

    async fn fetch_statements(&self, symbol: &str) -> Result<Statements> {
        let types = LINE_ITEMS
            .iter()
            .flat_map(|(key, _, _)| [format!("annual{key}"), format!("quarterly{key}")])
            .collect::<Vec<_>>()
            .join(",");
        let now = Utc::now();
        let period1 = (now - Duration::days(365 * 15)).timestamp();
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}?symbol={}&type={}&period1={}&period2={}",
            self.base_url,
            symbol,
            symbol,
            types,
            period1,
            now.timestamp()
        );

        let response: TimeseriesResponse = self.get_json(&url, symbol, "statements").await?;
        Ok(parse_statements(response))
    }

    async fn fetch_chart(&self, symbol: &str) -> Result<ChartData> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=10y",
            self.base_url, symbol
        );
        let data: YahooChartResponse = self.get_json(&url, symbol, "price history").await?;
        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        Ok(ChartData {
            history: extract_price_history(&item),
            regular_market_price: item.meta.regular_market_price,
        })
    }
}

#[async_trait]
impl CompanyDataProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooCompanyFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_company(&self, symbol: &str) -> Result<CompanyData> {
        let (summary, statements, chart) = futures::join!(
            self.fetch_summary(symbol),
            self.fetch_statements(symbol),
            self.fetch_chart(symbol)
        );

        let summary = summary?;
        let mut profile = summary.profile();
        let earnings = summary.earnings();

        let statements = statements.unwrap_or_else(|e| {
            warn!("Statements unavailable for {}: {}", symbol, e);
            Statements::default()
        });

        let price_history = match chart {
            Ok(chart) => {
                profile.regular_market_price =
                    profile.regular_market_price.or(chart.regular_market_price);
                chart.history
            }
            Err(e) => {
                warn!("Price history unavailable for {}: {}", symbol, e);
                Vec::new()
            }
        };

        debug!(
            statements_empty = statements.income.annual.is_empty(),
            history_len = price_history.len(),
            earnings_len = earnings.len(),
            "Assembled company data"
        );

        Ok(CompanyData {
            symbol: symbol.to_string(),
            profile,
            statements,
            price_history,
            earnings,
        })
    }
}
