//! Stock chart data and summary metrics for one price history.

use serde::Serialize;
use std::fmt::Write as _;

use super::{Candle, PriceHistory};
use crate::error::{AdvisorError, Result};

/// Return statistics need more candles than this
const MIN_CANDLES_FOR_RETURNS: usize = 30;

/// Trading days per month used for the monthly projection
const TRADING_DAYS_PER_MONTH: i32 = 21;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeDirection {
    /// First candle, nothing to compare against
    Neutral,
    Up,
    Down,
}

impl VolumeDirection {
    pub const fn color(self) -> &'static str {
        match self {
            Self::Neutral => "#888888",
            Self::Up => "#26a69a",
            Self::Down => "#ef5350",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct VolumeBar {
    pub volume: u64,
    pub direction: VolumeDirection,
    pub color: &'static str,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct ReturnStats {
    /// Mean daily return, percent
    pub daily_mean_pct: f64,

    /// `((1 + mean)^21 - 1) * 100`
    pub monthly_expected_pct: f64,

    /// Sample standard deviation of daily returns, percent
    pub daily_volatility_pct: f64,
}

/// Everything needed to draw a candlestick chart with moving averages
/// and volume, plus the headline metrics.
#[derive(Clone, Debug, Serialize)]
pub struct StockReport {
    pub ticker: String,
    pub name: String,
    pub candles: Vec<Candle>,
    pub ma20: Vec<Option<f64>>,
    pub ma50: Vec<Option<f64>>,
    pub volume: Vec<VolumeBar>,
    pub last_close: f64,

    /// Day-over-day change of the last close, percent
    pub day_change_pct: Option<f64>,

    pub period_high: f64,
    pub period_low: f64,
    pub average_volume: u64,
    pub returns: Option<ReturnStats>,
}

impl StockReport {
    pub fn from_history(history: &PriceHistory) -> Result<Self> {
        let last = history
            .candles
            .last()
            .ok_or_else(|| AdvisorError::NoMarketData(history.ticker.clone()))?;

        let closes = history.closes();
        let n = history.candles.len();

        let day_change_pct = (n >= 2)
            .then(|| closes[n - 2])
            .filter(|prev| *prev != 0.0)
            .map(|prev| (last.close / prev - 1.0) * 100.0);

        let total_volume: u128 = history.candles.iter().map(|c| u128::from(c.volume)).sum();

        Ok(Self {
            ticker: history.ticker.clone(),
            name: history.name.clone(),
            candles: history.candles.clone(),
            ma20: moving_average(&closes, 20),
            ma50: moving_average(&closes, 50),
            volume: volume_bars(&history.candles),
            last_close: last.close,
            day_change_pct,
            period_high: history.candles.iter().map(|c| c.high).fold(f64::MIN, f64::max),
            period_low: history.candles.iter().map(|c| c.low).fold(f64::MAX, f64::min),
            average_volume: u64::try_from(total_volume / n as u128).unwrap_or(u64::MAX),
            returns: return_stats(&closes),
        })
    }

    /// Plain-text summary for tool output
    pub fn summary(&self) -> String {
        let mut out = format!("{} ({})\n", self.name, self.ticker);
        let _ = write!(out, "Last close: {:.2}", self.last_close);
        if let Some(change) = self.day_change_pct {
            let _ = write!(out, " ({change:+.2}%)");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Period high: {:.2}", self.period_high);
        let _ = writeln!(out, "Period low: {:.2}", self.period_low);
        let _ = writeln!(out, "Average volume: {}", self.average_volume);

        if let Some(stats) = self.returns {
            let _ = writeln!(out, "Mean daily return: {:.3}%", stats.daily_mean_pct);
            let _ = writeln!(out, "Expected monthly return: {:.2}%", stats.monthly_expected_pct);
            let _ = writeln!(out, "Daily volatility: {:.2}%", stats.daily_volatility_pct);
        }

        out.trim_end().to_string()
    }
}

/// Trailing mean; `None` until the window is full
fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        out.push((i + 1 >= window).then(|| sum / window as f64));
    }

    out
}

fn volume_bars(candles: &[Candle]) -> Vec<VolumeBar> {
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let direction = match i.checked_sub(1).map(|p| &candles[p]) {
                None => VolumeDirection::Neutral,
                Some(prev) if candle.close > prev.close => VolumeDirection::Up,
                Some(_) => VolumeDirection::Down,
            };
            VolumeBar {
                volume: candle.volume,
                direction,
                color: direction.color(),
            }
        })
        .collect()
}

fn return_stats(closes: &[f64]) -> Option<ReturnStats> {
    if closes.len() <= MIN_CANDLES_FOR_RETURNS {
        return None;
    }

    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }

    let count = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / count;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (count - 1.0);

    Some(ReturnStats {
        daily_mean_pct: mean * 100.0,
        monthly_expected_pct: ((1.0 + mean).powi(TRADING_DAYS_PER_MONTH) - 1.0) * 100.0,
        daily_volatility_pct: variance.sqrt() * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Period;
    use chrono::{Duration, NaiveDate};

    fn history(closes: &[f64]) -> PriceHistory {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        PriceHistory {
            ticker: "TEST".into(),
            name: "Test Corp".into(),
            period: Period::OneYear,
            candles: closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Candle {
                    date: start + Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 100 * (i as u64 + 1),
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_history_is_no_market_data() {
        let result = StockReport::from_history(&history(&[]));
        assert!(matches!(result, Err(AdvisorError::NoMarketData(t)) if t == "TEST"));
    }

    #[test]
    fn test_short_history_metrics() {
        let report = StockReport::from_history(&history(&[100.0, 110.0, 99.0])).unwrap();

        assert!((report.last_close - 99.0).abs() < 1e-9);
        assert!((report.day_change_pct.unwrap() + 10.0).abs() < 1e-9);
        assert!((report.period_high - 111.0).abs() < 1e-9);
        assert!((report.period_low - 98.0).abs() < 1e-9);
        assert_eq!(report.average_volume, 200);
        assert!(report.returns.is_none());
        assert!(report.ma20.iter().all(Option::is_none));

        let directions: Vec<_> = report.volume.iter().map(|v| v.direction).collect();
        assert_eq!(
            directions,
            [VolumeDirection::Neutral, VolumeDirection::Up, VolumeDirection::Down]
        );
    }

    #[test]
    fn test_moving_average_window() {
        let ma = moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(ma, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn test_return_stats_on_constant_growth() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let report = StockReport::from_history(&history(&closes)).unwrap();

        let stats = report.returns.unwrap();
        assert!((stats.daily_mean_pct - 1.0).abs() < 1e-9);
        assert!((stats.monthly_expected_pct - (1.01_f64.powi(21) - 1.0) * 100.0).abs() < 1e-6);
        assert!(stats.daily_volatility_pct.abs() < 1e-9);
        assert_eq!(report.ma20.iter().filter(|v| v.is_some()).count(), 21);
        assert!(report.summary().contains("Expected monthly return"));
    }

    #[test]
    fn test_exactly_thirty_candles_has_no_returns() {
        let closes = vec![10.0; 30];
        let report = StockReport::from_history(&history(&closes)).unwrap();
        assert!(report.returns.is_none());
    }
}
