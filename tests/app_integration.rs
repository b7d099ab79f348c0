use std::fs;
use stocklens::cli::dashboard::Page;
use stocklens::core::ViewMode;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUMMARY: &str = r#"{
    "quoteSummary": {
        "result": [{
            "price": {
                "longName": "Microsoft Corporation",
                "exchangeName": "NasdaqGS",
                "regularMarketPrice": {"raw": 415.1},
                "marketCap": {"raw": 3085000000000}
            },
            "assetProfile": {"sector": "Technology", "industry": "Software - Infrastructure"},
            "summaryDetail": {"previousClose": {"raw": 410.0}, "trailingPE": {"raw": 36.2}},
            "financialData": {"currentPrice": {"raw": 415.1}, "totalRevenue": {"raw": 236584000000}},
            "defaultKeyStatistics": {"trailingEps": {"raw": 11.45}},
            "earningsHistory": {"history": [
                {"quarter": {"raw": 1711843200}, "epsActual": {"raw": 2.94}, "epsEstimate": {"raw": 2.82}}
            ]}
        }],
        "error": null
    }
}"#;

const TIMESERIES: &str = r#"{
    "timeseries": {
        "result": [{
            "meta": {"symbol": ["MSFT"], "type": ["annualTotalRevenue"]},
            "annualTotalRevenue": [
                {"asOfDate": "2022-06-30", "reportedValue": {"raw": 198270000000}},
                {"asOfDate": "2023-06-30", "reportedValue": {"raw": 211915000000}}
            ]
        }],
        "error": null
    }
}"#;

const CHART: &str = r#"{
    "chart": {
        "result": [{
            "meta": {"regularMarketPrice": 415.1, "currency": "USD"},
            "timestamp": [1700000000, 1702592000],
            "indicators": {"quote": [{"close": [369.8, 374.6]}]}
        }]
    }
}"#;

async fn mount(server: &MockServer, url_path: String, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

async fn create_mock_server(symbol: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/consent"))
        .respond_with(ResponseTemplate::new(404).insert_header("set-cookie", "A3=token; Path=/"))
        .mount(&server)
        .await;
    mount(&server, "/v1/test/getcrumb".to_string(), 200, "test-crumb").await;
    Mock::given(method("GET"))
        .and(path(format!("/v10/finance/quoteSummary/{symbol}")))
        .and(query_param("crumb", "test-crumb"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUMMARY))
        .mount(&server)
        .await;
    mount(
        &server,
        format!("/ws/fundamentals-timeseries/v1/finance/timeseries/{symbol}"),
        200,
        TIMESERIES,
    )
    .await;
    mount(&server, format!("/v8/finance/chart/{symbol}"), 200, CHART).await;
    server
}

fn write_config(base_url: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
        providers:
          yahoo:
            base_url: {base_url}
            cookie_url: {base_url}/consent
        cache:
          ttl_secs: 3600
          persist: false
    "#
    );
    fs::write(config_file.path(), config_content).expect("Failed to write config file");
    config_file
}

async fn run_dashboard(config: &NamedTempFile, page: Page, ticker: &str) -> anyhow::Result<()> {
    stocklens::run_command(
        stocklens::AppCommand::Dashboard {
            page,
            ticker: ticker.to_string(),
            view: ViewMode::Ttm,
        },
        config.path().to_str(),
    )
    .await
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let server = create_mock_server("MSFT").await;
    let config = write_config(&server.uri());

    let result = run_dashboard(&config, Page::Main, " msft ").await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );

    // Consent cookie, crumb, then the three data requests.
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 5);
}

#[test_log::test(tokio::test)]
async fn test_placeholder_page_flow() {
    let server = create_mock_server("MSFT").await;
    let config = write_config(&server.uri());

    let result = run_dashboard(&config, Page::Valuation, "MSFT").await;
    assert!(result.is_ok(), "Valuation page failed: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_unknown_ticker_renders_error_and_succeeds() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/v10/finance/quoteSummary/NOPE".to_string(),
        404,
        r#"{"quoteSummary":{"result":null,"error":{"code":"Not Found","description":"Quote not found for symbol: NOPE"}}}"#,
    )
    .await;
    let config = write_config(&server.uri());

    let result = run_dashboard(&config, Page::Main, "nope").await;
    assert!(result.is_ok(), "Fetch errors should not fail the command");
}

#[test_log::test(tokio::test)]
async fn test_empty_ticker_makes_no_requests() {
    let server = MockServer::start().await;
    let config = write_config(&server.uri());

    let result = run_dashboard(&config, Page::Main, "   ").await;
    assert!(result.is_ok());
    assert!(
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[test_log::test(tokio::test)]
async fn test_clear_cache_without_persistence() {
    let server = MockServer::start().await;
    let config = write_config(&server.uri());

    for ticker in [Some("msft".to_string()), None] {
        let result = stocklens::run_command(
            stocklens::AppCommand::ClearCache { ticker },
            config.path().to_str(),
        )
        .await;
        assert!(result.is_ok(), "Clear cache failed: {:?}", result.err());
    }
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let result = stocklens::run_command(
        stocklens::AppCommand::ClearCache { ticker: None },
        Some("/nonexistent/stocklens/config.yaml"),
    )
    .await;
    assert!(result.is_err());
}
