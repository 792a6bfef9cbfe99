//! Market Data
//!
//! Daily price histories behind a client trait, so the advisor can run
//! against Yahoo Finance, a deterministic mock, or either one wrapped in
//! an LRU cache.

mod analysis;
mod cache;
mod mock;
mod yahoo;

pub use analysis::{ReturnStats, StockReport, VolumeBar, VolumeDirection};
pub use cache::{CachedMarketData, Clock, ManualClock, MarketDataCache, SystemClock};
pub use mock::MockMarketDataClient;
pub use yahoo::YahooChartClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AdvisorError, Result};

/// Lookback window of a history request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
        }
    }

    /// Approximate number of trading days in the window
    pub const fn trading_days(self) -> usize {
        match self {
            Self::OneMonth => 21,
            Self::ThreeMonths => 63,
            Self::SixMonths => 126,
            Self::OneYear => 252,
            Self::TwoYears => 504,
            Self::FiveYears => 1260,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1mo" => Ok(Self::OneMonth),
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            other => Err(AdvisorError::MarketData(format!("unsupported period '{other}'"))),
        }
    }
}

/// One trading day
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily candles for one ticker, oldest first
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceHistory {
    pub ticker: String,

    /// Company name, falling back to the ticker
    pub name: String,

    pub period: Period,
    pub candles: Vec<Candle>,
}

impl PriceHistory {
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Market data source (Strategy pattern)
///
/// Implement this per data vendor.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Daily history for `ticker` over `period`
    async fn history(&self, ticker: &str, period: Period) -> Result<PriceHistory>;

    /// Source name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse_and_display() {
        for period in [
            Period::OneMonth,
            Period::ThreeMonths,
            Period::SixMonths,
            Period::OneYear,
            Period::TwoYears,
            Period::FiveYears,
        ] {
            assert_eq!(period.as_str().parse::<Period>().unwrap(), period);
        }
        assert_eq!(" 1Y ".parse::<Period>().unwrap(), Period::OneYear);
        assert!("10y".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_serde_names() {
        let json = serde_json::to_string(&Period::SixMonths).unwrap();
        assert_eq!(json, "\"6mo\"");
    }
}
