//! Survey → model answer → table → charts.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use agent_core::{GenerationOptions, LlmProvider, Message};

use crate::charts::{ChartAdapter, PortfolioCharts};
use crate::error::{Result, TableError};
use crate::survey::InvestorSurvey;
use crate::table::{NormalizedTable, TableNormalizer, parse_response};

/// Outcome of one recommendation request.
///
/// When the table cannot be charted, `charts` is `None`, `failure` says
/// why, and `table_text` still carries whatever table text was found.
#[derive(Clone, Debug, Serialize)]
pub struct Recommendation {
    /// Full model answer
    pub answer: String,

    /// Answer without the table
    pub prose: String,

    pub table_text: Option<String>,
    pub table: Option<NormalizedTable>,
    pub charts: Option<PortfolioCharts>,
    pub failure: Option<TableError>,
}

/// Asks the model for a portfolio and turns the answer into chart data
pub struct Recommender {
    provider: Arc<dyn LlmProvider>,
    generation: GenerationOptions,
    normalizer: TableNormalizer,
    charts: ChartAdapter,
}

impl Recommender {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        generation: GenerationOptions,
        normalizer: TableNormalizer,
        charts: ChartAdapter,
    ) -> Self {
        Self {
            provider,
            generation,
            normalizer,
            charts,
        }
    }

    /// Raw model answer for the survey
    pub async fn answer(&self, survey: &InvestorSurvey) -> Result<String> {
        survey.validate()?;

        let messages = [Message::user(survey.recommendation_prompt())];
        let completion = self.provider.complete(&messages, &self.generation).await?;

        tracing::debug!(
            model = %completion.model,
            chars = completion.content.len(),
            "Received recommendation"
        );
        Ok(completion.content)
    }

    pub async fn recommend(&self, survey: &InvestorSurvey) -> Result<Recommendation> {
        let answer = self.answer(survey).await?;
        Ok(self.interpret(answer, Some(Decimal::from(survey.amount_krw()))))
    }

    /// Parse an answer; `amount` adds per-holding allocations
    pub fn interpret(&self, answer: String, amount: Option<Decimal>) -> Recommendation {
        let parsed = parse_response(&answer, &self.normalizer);

        let (table, charts, failure) = match parsed.table {
            Ok(table) => {
                let charts = match amount {
                    Some(amount) => self.charts.build_with_amount(&table, amount),
                    None => self.charts.build(&table),
                };
                (Some(table), Some(charts), None)
            }
            Err(e) => (None, None, Some(e)),
        };

        Recommendation {
            answer,
            prose: parsed.prose,
            table_text: parsed.table_text,
            table,
            charts,
            failure,
        }
    }

    pub const fn normalizer(&self) -> &TableNormalizer {
        &self.normalizer
    }
}
