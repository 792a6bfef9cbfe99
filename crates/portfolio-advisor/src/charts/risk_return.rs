//! Risk-return comparison against fixed reference portfolios.

use serde::Serialize;

/// Bubble size per unit of Sharpe ratio
const BUBBLE_SCALE: f64 = 50.0;

#[derive(Clone, Debug, Serialize)]
pub struct Benchmark {
    pub name: &'static str,

    /// Expected annual return, percent
    pub expected_return: f64,

    /// Annual volatility, percent
    pub volatility: f64,

    pub sharpe: f64,
    pub bubble_size: f64,
}

impl Benchmark {
    const fn new(name: &'static str, expected_return: f64, volatility: f64, sharpe: f64) -> Self {
        Self {
            name,
            expected_return,
            volatility,
            sharpe,
            bubble_size: sharpe * BUBBLE_SCALE,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RiskReturn {
    /// Scatter points, recommended portfolio first
    pub points: Vec<Benchmark>,

    /// Names ordered by Sharpe ratio, best first
    pub sharpe_ranking: Vec<&'static str>,
}

impl RiskReturn {
    /// Illustrative figures; they do not depend on the recommended holdings
    pub fn benchmarks() -> Self {
        let points = vec![
            Benchmark::new("Recommended portfolio", 8.5, 12.3, 0.69),
            Benchmark::new("Stable", 5.2, 8.1, 0.64),
            Benchmark::new("Balanced", 7.4, 10.8, 0.68),
            Benchmark::new("Aggressive", 10.1, 15.6, 0.65),
            Benchmark::new("S&P 500", 9.8, 16.2, 0.60),
            Benchmark::new("KOSPI", 7.2, 14.8, 0.49),
        ];

        let mut ranked: Vec<&Benchmark> = points.iter().collect();
        ranked.sort_by(|a, b| b.sharpe.total_cmp(&a.sharpe));
        let sharpe_ranking = ranked.iter().map(|b| b.name).collect();

        Self {
            points,
            sharpe_ranking,
        }
    }
}
