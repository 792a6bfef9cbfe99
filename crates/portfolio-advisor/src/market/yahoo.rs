//! Yahoo Finance chart API client.
//!
//! Uses the public `v8/finance/chart` endpoint with daily candles.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header;
use serde::Deserialize;
use std::time::Duration;

use super::{Candle, MarketDataClient, Period, PriceHistory};
use crate::error::{AdvisorError, Result};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; portfolio-advisor)";

pub struct YahooChartClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataClient for YahooChartClient {
    async fn history(&self, ticker: &str, period: Period) -> Result<PriceHistory> {
        let ticker = ticker.trim().to_uppercase();
        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);

        tracing::debug!(%ticker, %period, "Fetching chart");

        let response = self
            .http
            .get(&url)
            .query(&[("range", period.as_str()), ("interval", "1d")])
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AdvisorError::NoMarketData(ticker));
        }
        if !status.is_success() {
            tracing::warn!(%ticker, %status, "Chart request failed");
            return Err(AdvisorError::MarketData(format!("HTTP {status} for {ticker}")));
        }

        let body = response.text().await?;
        parse_chart(&ticker, period, &body)
    }

    fn name(&self) -> &str {
        "YahooFinance"
    }
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Deserialize)]
struct ChartApiError {
    code: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

/// Columns are parallel to `timestamp`; halted days come back as null
#[derive(Default, Deserialize)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// Parse a chart response body. Days with any missing price are skipped.
fn parse_chart(ticker: &str, period: Period, body: &str) -> Result<PriceHistory> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.chart.error {
        tracing::warn!(%ticker, code = %error.code, "Chart API returned an error");
        return Err(match error.code.as_str() {
            "Not Found" => AdvisorError::NoMarketData(ticker.to_string()),
            _ => AdvisorError::MarketData(error.description.unwrap_or(error.code)),
        });
    }

    let result = envelope
        .chart
        .result
        .and_then(|mut results| results.pop())
        .ok_or_else(|| AdvisorError::NoMarketData(ticker.to_string()))?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    let candles: Vec<Candle> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            Some(Candle {
                date: DateTime::from_timestamp(*ts, 0)?.date_naive(),
                open: at(&quote.open, i)?,
                high: at(&quote.high, i)?,
                low: at(&quote.low, i)?,
                close: at(&quote.close, i)?,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            })
        })
        .collect();

    if candles.is_empty() {
        return Err(AdvisorError::NoMarketData(ticker.to_string()));
    }

    let name = result
        .meta
        .long_name
        .or(result.meta.short_name)
        .unwrap_or_else(|| ticker.to_string());

    Ok(PriceHistory {
        ticker: ticker.to_string(),
        name,
        period,
        candles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL", "longName": "Apple Inc.", "shortName": "Apple"},
                "timestamp": [1719408600, 1719495000, 1719581400],
                "indicators": {
                    "quote": [{
                        "open":   [212.1, null, 215.8],
                        "high":   [214.9, 215.0, 216.1],
                        "low":    [211.0, 212.0, 210.5],
                        "close":  [213.2, 214.1, 210.6],
                        "volume": [49772700, 51230000, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_skips_incomplete_days() {
        let history = parse_chart("AAPL", Period::OneMonth, FIXTURE).unwrap();

        assert_eq!(history.name, "Apple Inc.");
        assert_eq!(history.candles.len(), 2);
        assert!((history.candles[1].close - 210.6).abs() < 1e-9);
        assert_eq!(history.candles[1].volume, 0);
        assert_eq!(history.candles[0].date.to_string(), "2024-06-26");
    }

    #[test]
    fn test_parse_chart_not_found() {
        let body = r#"{"chart": {"result": null,
            "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let result = parse_chart("ZZZZ", Period::OneYear, body);
        assert!(matches!(result, Err(AdvisorError::NoMarketData(t)) if t == "ZZZZ"));
    }

    #[test]
    fn test_parse_chart_empty_result() {
        let body = r#"{"chart": {"result": [{"meta": {}, "indicators": {"quote": [{}]}}], "error": null}}"#;
        assert!(matches!(
            parse_chart("EMPTY", Period::OneYear, body),
            Err(AdvisorError::NoMarketData(_))
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_chart("AAPL", Period::OneYear, "<html>"),
            Err(AdvisorError::Serialization(_))
        ));
    }
}
