//! Monte-Carlo projection of portfolio value.
//!
//! Each path compounds independent normal annual returns. Results are
//! summarised per year (median and the 10th/90th percentiles), with a
//! subset of raw paths and a histogram of final values for display.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub initial_value: f64,
    pub years: usize,
    pub paths: usize,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub seed: u64,

    /// Raw paths kept for plotting
    pub display_paths: usize,

    pub histogram_bins: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            initial_value: 10_000.0,
            years: 10,
            paths: 500,
            annual_return: 0.08,
            annual_volatility: 0.12,
            seed: 42,
            display_paths: 100,
            histogram_bins: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// Equal-width bins over `[min, max]`; the last bin includes `max`
    fn of(values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if values.is_empty() || !min.is_finite() || !max.is_finite() {
            return Self { bins: Vec::new() };
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for value in values {
            let slot = if width > 0.0 {
                (((value - min) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[slot] += 1;
        }

        Self {
            bins: counts
                .into_iter()
                .enumerate()
                .map(|(i, count)| HistogramBin {
                    start: (i as f64).mul_add(width, min),
                    end: ((i + 1) as f64).mul_add(width, min),
                    count,
                })
                .collect(),
        }
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Simulation {
    /// 0..=years
    pub years: Vec<usize>,
    pub median: Vec<f64>,
    pub p10: Vec<f64>,
    pub p90: Vec<f64>,
    pub sample_paths: Vec<Vec<f64>>,
    pub histogram: Histogram,
    pub final_median: f64,
}

impl Simulation {
    pub fn run(params: &SimulationParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let sigma = if params.annual_volatility.is_finite() {
            params.annual_volatility.abs()
        } else {
            0.0
        };

        let paths: Vec<Vec<f64>> = (0..params.paths)
            .map(|_| {
                let mut value = params.initial_value;
                let mut path = Vec::with_capacity(params.years + 1);
                path.push(value);
                for _ in 0..params.years {
                    let z: f64 = StandardNormal.sample(&mut rng);
                    value *= 1.0 + sigma.mul_add(z, params.annual_return);
                    path.push(value);
                }
                path
            })
            .collect();

        let per_year = |year: usize| -> Vec<f64> {
            let mut column: Vec<f64> = paths.iter().map(|p| p[year]).collect();
            column.sort_by(f64::total_cmp);
            column
        };

        let mut median = Vec::with_capacity(params.years + 1);
        let mut p10 = Vec::with_capacity(params.years + 1);
        let mut p90 = Vec::with_capacity(params.years + 1);
        for year in 0..=params.years {
            let column = per_year(year);
            median.push(quantile(&column, 0.5));
            p10.push(quantile(&column, 0.1));
            p90.push(quantile(&column, 0.9));
        }

        let shown = params.display_paths.min(paths.len());
        let sample_paths = index::sample(&mut rng, paths.len(), shown)
            .into_iter()
            .map(|i| paths[i].clone())
            .collect();

        let finals: Vec<f64> = paths.iter().filter_map(|p| p.last().copied()).collect();

        Self {
            years: (0..=params.years).collect(),
            final_median: median.last().copied().unwrap_or(params.initial_value),
            median,
            p10,
            p90,
            sample_paths,
            histogram: Histogram::of(&finals, params.histogram_bins),
        }
    }
}

/// Linear-interpolated quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            (sorted[upper] - sorted[lower]).mul_add(fraction, sorted[lower])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_shape() {
        let params = SimulationParams::default();
        let simulation = Simulation::run(&params);

        assert_eq!(simulation.years.len(), 11);
        assert_eq!(simulation.median.len(), 11);
        assert_eq!(simulation.sample_paths.len(), 100);
        assert_eq!(simulation.histogram.bins.len(), 30);
        assert_eq!(simulation.histogram.total(), 500);
        assert!((simulation.median[0] - 10_000.0).abs() < 1e-9);

        for year in 0..=10 {
            assert!(simulation.p10[year] <= simulation.median[year]);
            assert!(simulation.median[year] <= simulation.p90[year]);
        }
        assert!(simulation.final_median > 10_000.0);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let params = SimulationParams::default();
        let first = Simulation::run(&params);
        let second = Simulation::run(&params);
        assert_eq!(first.median, second.median);
        assert_eq!(first.sample_paths, second.sample_paths);
    }

    #[test]
    fn test_zero_volatility_is_deterministic_growth() {
        let params = SimulationParams {
            annual_volatility: 0.0,
            paths: 10,
            years: 2,
            ..Default::default()
        };
        let simulation = Simulation::run(&params);

        assert!((simulation.final_median - 10_000.0 * 1.08 * 1.08).abs() < 1e-6);
        assert_eq!(simulation.histogram.bins[0].count, 10);
    }

    #[test]
    fn test_quantile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((quantile(&data, 0.5) - 3.0).abs() < 1e-9);
        assert!((quantile(&data, 0.1) - 1.4).abs() < 1e-9);
        assert!((quantile(&data, 0.9) - 4.6).abs() < 1e-9);
    }
}
