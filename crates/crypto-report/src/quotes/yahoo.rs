//! Yahoo Finance Chart Client
//!
//! Implementation of `QuoteSource` over the public v8 chart endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::QuoteSource;
use crate::error::{ReportError, Result};
use crate::model::PriceBar;

/// Yahoo client configuration
#[derive(Clone, Debug)]
pub struct YahooConfig {
    /// API base URL (no trailing slash)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Exchange region hint
    pub region: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".into(),
            timeout_secs: 30,
            user_agent: concat!("crypto-report/", env!("CARGO_PKG_VERSION")).into(),
            region: "US".into(),
        }
    }
}

impl YahooConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("QUOTE_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let timeout_secs = std::env::var("QUOTE_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            base_url,
            timeout_secs,
            ..defaults
        }
    }
}

/// Yahoo Finance daily chart client
pub struct YahooChartClient {
    client: Client,
    config: YahooConfig,
}

impl YahooChartClient {
    /// Create from configuration
    pub fn from_config(config: YahooConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(YahooConfig::from_env())
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.config.base_url, symbol)
    }

    /// Shape one chart result into bars, dropping rows without an adjusted close
    fn into_bars(result: ChartResult) -> Vec<PriceBar> {
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let adj_close = result
            .indicators
            .adjclose
            .into_iter()
            .next()
            .map(|block| block.adjclose)
            .unwrap_or_default();

        result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let date = DateTime::from_timestamp(ts, 0)?.date_naive();
                let adj_close = at(&adj_close, i).and_then(to_decimal)?;

                Some(PriceBar {
                    date,
                    open: at(&quote.open, i).and_then(to_decimal),
                    high: at(&quote.high, i).and_then(to_decimal),
                    low: at(&quote.low, i).and_then(to_decimal),
                    close: at(&quote.close, i).and_then(to_decimal),
                    adj_close,
                    volume: at(&quote.volume, i),
                })
            })
            .collect()
    }
}

#[async_trait]
impl QuoteSource for YahooChartClient {
    async fn daily_history(&self, symbol: &str, range: &str) -> Result<Vec<PriceBar>> {
        let response = self
            .client
            .get(self.chart_url(symbol))
            .query(&[
                ("symbol", symbol),
                ("interval", "1d"),
                ("range", range),
                ("region", self.config.region.as_str()),
                ("includeAdjustedClose", "true"),
                ("events", "div,split"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Upstream(format!("{symbol}: HTTP {status}")));
        }

        let envelope: ChartEnvelope = response.json().await?;

        if let Some(error) = envelope.chart.error {
            return Err(ReportError::Upstream(format!(
                "{symbol}: {} ({})",
                error.description, error.code
            )));
        }

        let result = envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ReportError::NoData(symbol.to_string()))?;

        let bars = Self::into_bars(result);
        tracing::debug!(symbol, bars = bars.len(), "Parsed chart response");
        Ok(bars)
    }

    async fn health_check(&self) -> bool {
        match self.client.get(&self.config.base_url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Quote API health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "YahooFinance"
    }
}

fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

/// f64 from JSON to a Decimal without binary noise
fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(value).map(|d| d.round_dp(8).normalize())
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> YahooChartClient {
        YahooChartClient::from_config(YahooConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn chart_body() -> serde_json::Value {
        // 2025-05-06, 2025-05-07, 2025-05-08 00:00 UTC
        json!({
            "chart": {
                "result": [{
                    "timestamp": [1746489600, 1746576000, 1746662400],
                    "indicators": {
                        "quote": [{
                            "open": [94000.5, 96000.0, 97000.0],
                            "high": [95000.0, 97500.0, 99000.25],
                            "low": [93000.0, 95500.0, 96500.0],
                            "close": [94500.0, 97000.0, 98800.0],
                            "volume": [31000000000u64, null, 29000000000u64]
                        }],
                        "adjclose": [{ "adjclose": [94500.0, null, 98800.12] }]
                    }
                }],
                "error": null
            }
        })
    }

    #[tokio::test]
    async fn test_parses_chart_and_drops_missing_adj_close() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BTC-USD"))
            .and(query_param("interval", "1d"))
            .and(query_param("range", "10d"))
            .and(query_param("includeAdjustedClose", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
            .mount(&server)
            .await;

        let bars = client_for(&server).daily_history("BTC-USD", "10d").await.unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 5, 6).unwrap());
        assert_eq!(bars[0].open, Some(dec!(94000.5)));
        assert_eq!(bars[0].volume, Some(31_000_000_000));
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2025, 5, 8).unwrap());
        assert_eq!(bars[1].adj_close, dec!(98800.12));
        assert_eq!(bars[1].high, Some(dec!(99000.25)));
    }

    #[tokio::test]
    async fn test_empty_result_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "chart": { "result": [], "error": null } })),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).daily_history("ETH-USD", "10d").await;
        assert!(matches!(result, Err(ReportError::NoData(_))));
    }

    #[tokio::test]
    async fn test_upstream_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chart": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).daily_history("XXX-USD", "10d").await.unwrap_err();
        assert!(matches!(err, ReportError::Upstream(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).daily_history("BTC-USD", "10d").await;
        assert!(matches!(result, Err(ReportError::Upstream(_))));
    }
}
