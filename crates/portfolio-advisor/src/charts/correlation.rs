//! Correlation heatmap for the largest holdings.
//!
//! The coefficients are synthetic: drawn from a fixed-seed RNG so the same
//! labels always give the same matrix.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Heatmap size limit
pub const MAX_CORRELATION_ASSETS: usize = 8;

const SEED: u64 = 42;
const LOW: f64 = -0.3;
const HIGH: f64 = 0.9;

#[derive(Clone, Debug, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,

    /// Row-major, symmetric, unit diagonal
    pub values: Vec<Vec<f64>>,

    pub synthetic: bool,
}

impl CorrelationMatrix {
    /// Matrix for at most `MAX_CORRELATION_ASSETS` labels; extra labels are ignored
    pub fn synthetic(mut labels: Vec<String>) -> Self {
        labels.truncate(MAX_CORRELATION_ASSETS);
        let n = labels.len();

        let mut rng = StdRng::seed_from_u64(SEED);
        let mut values = vec![vec![0.0; n]; n];

        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let corr = rng.gen_range(LOW..HIGH);
                values[i][j] = corr;
                values[j][i] = corr;
            }
        }

        Self {
            labels,
            values,
            synthetic: true,
        }
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.values[i][j])
    }
}
