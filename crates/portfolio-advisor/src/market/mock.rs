//! Mock Market Data Client
//!
//! For testing and demo purposes. Generates a seeded random walk per ticker,
//! so the same ticker always yields the same history.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Candle, MarketDataClient, Period, PriceHistory};
use crate::error::{AdvisorError, Result};

/// Mock client with deterministic histories
pub struct MockMarketDataClient {
    /// Last trading day of every generated history
    end_date: NaiveDate,

    /// Tickers that return no data
    missing: HashSet<String>,

    /// Number of `history` calls served
    calls: AtomicUsize,
}

impl Default for MockMarketDataClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketDataClient {
    pub fn new() -> Self {
        Self {
            end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default(),
            missing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Tickers for which the mock reports no market data
    pub fn with_missing<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.missing
            .extend(tickers.into_iter().map(|t| t.as_ref().to_uppercase()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// (company name, starting price) for well-known tickers
    fn profile(ticker: &str) -> (String, f64) {
        match ticker {
            "AAPL" => ("Apple Inc.".into(), 190.0),
            "MSFT" => ("Microsoft Corporation".into(), 420.0),
            "NVDA" => ("NVIDIA Corporation".into(), 120.0),
            "TSLA" => ("Tesla, Inc.".into(), 250.0),
            "005930.KS" => ("Samsung Electronics Co., Ltd.".into(), 72_000.0),
            "000660.KS" => ("SK hynix Inc.".into(), 180_000.0),
            other => (other.to_string(), 100.0),
        }
    }

    fn trading_days_until(end: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count);
        let mut day = end;
        while days.len() < count {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(day);
            }
            day -= Duration::days(1);
        }
        days.reverse();
        days
    }
}

/// Stable seed per ticker (FNV-1a)
fn seed_for(ticker: &str) -> u64 {
    ticker.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl MarketDataClient for MockMarketDataClient {
    async fn history(&self, ticker: &str, period: Period) -> Result<PriceHistory> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let ticker = ticker.trim().to_uppercase();

        if ticker.is_empty() || self.missing.contains(&ticker) {
            return Err(AdvisorError::NoMarketData(ticker));
        }

        let (name, mut price) = Self::profile(&ticker);
        let mut rng = StdRng::seed_from_u64(seed_for(&ticker));
        let daily = Normal::new(0.0004, 0.018)
            .map_err(|e| AdvisorError::MarketData(e.to_string()))?;

        let candles = Self::trading_days_until(self.end_date, period.trading_days())
            .into_iter()
            .map(|date| {
                let open = price;
                let close = open * (1.0 + daily.sample(&mut rng));
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = rng.gen_range(1_000_000..20_000_000);
                price = close;
                Candle {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }
            })
            .collect();

        Ok(PriceHistory {
            ticker,
            name,
            period,
            candles,
        })
    }

    fn name(&self) -> &str {
        "MockMarketData"
    }
}
