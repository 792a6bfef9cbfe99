//! Chart Datasets
//!
//! Turns a `NormalizedTable` into plain data series for the dashboard:
//! composition (pie, bars, treemap), risk-return comparison, correlation
//! heatmap, Monte-Carlo projection and a geographic distribution.
//! Rendering is left to the client.

mod composition;
mod correlation;
mod geography;
mod risk_return;
mod simulation;

pub use composition::{Composition, GroupWeight, Slice, Treemap, TreemapLeaf};
pub use correlation::{CorrelationMatrix, MAX_CORRELATION_ASSETS};
pub use geography::{CountryWeight, Geography};
pub use risk_return::{Benchmark, RiskReturn};
pub use simulation::{Histogram, HistogramBin, Simulation, SimulationParams};

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;

use crate::table::{ColumnKeywords, NormalizedTable};

/// One holding with its share of the invested amount
#[derive(Clone, Debug, Serialize)]
pub struct Allocation {
    pub name: String,
    pub weight: f64,

    /// `weight% × amount`, rounded to whole units
    pub amount: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct PortfolioCharts {
    pub composition: Composition,
    pub risk_return: RiskReturn,
    pub correlation: CorrelationMatrix,
    pub simulation: Simulation,
    pub geography: Geography,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocations: Option<Vec<Allocation>>,
}

/// Builds chart datasets with configurable column keywords
#[derive(Clone, Debug, Default)]
pub struct ChartAdapter {
    keywords: ColumnKeywords,
    simulation: SimulationParams,
}

impl ChartAdapter {
    pub const fn new(keywords: ColumnKeywords, simulation: SimulationParams) -> Self {
        Self {
            keywords,
            simulation,
        }
    }

    pub fn build(&self, table: &NormalizedTable) -> PortfolioCharts {
        let composition = Composition::from_table(table, &self.keywords);
        let labels: Vec<String> = composition
            .slices
            .iter()
            .take(MAX_CORRELATION_ASSETS)
            .map(|s| s.label.clone())
            .collect();

        tracing::debug!(rows = table.len(), "Building portfolio charts");

        PortfolioCharts {
            correlation: CorrelationMatrix::synthetic(labels),
            composition,
            risk_return: RiskReturn::benchmarks(),
            simulation: Simulation::run(&self.simulation),
            geography: Geography::from_table(table, &self.keywords),
            allocations: None,
        }
    }

    /// Charts plus the amount allotted to each holding
    pub fn build_with_amount(&self, table: &NormalizedTable, amount: Decimal) -> PortfolioCharts {
        PortfolioCharts {
            allocations: Some(allocation_amounts(table, amount)),
            ..self.build(table)
        }
    }
}

/// Split `amount` by each row's weight percentage.
///
/// Weights outside the `Decimal` range, or shares whose product with
/// `amount` overflows, allot zero.
pub fn allocation_amounts(table: &NormalizedTable, amount: Decimal) -> Vec<Allocation> {
    table
        .rows()
        .iter()
        .map(|row| {
            let name = row.cell(0);
            let allotted = Decimal::from_f64(row.weight())
                .and_then(|weight| weight.checked_div(Decimal::ONE_HUNDRED))
                .and_then(|share| share.checked_mul(amount));

            let amount = allotted.map_or_else(
                || {
                    tracing::warn!(name, weight = row.weight(), "Allocation out of range, allotting zero");
                    Decimal::ZERO
                },
                |value| value.round_dp(0),
            );

            Allocation {
                name: name.to_string(),
                weight: row.weight(),
                amount,
            }
        })
        .collect()
}
