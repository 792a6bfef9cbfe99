//! Portfolio Analysis Tool
//!
//! Recommends a portfolio for the investor's survey answers.

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{
    ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
};

use crate::recommend::Recommender;
use crate::survey::InvestorSurvey;

pub struct PortfolioAnalysisTool {
    recommender: Arc<Recommender>,

    /// Survey of the current user, used when the call carries none
    survey: InvestorSurvey,
}

impl PortfolioAnalysisTool {
    pub fn new(recommender: Arc<Recommender>, survey: InvestorSurvey) -> Self {
        Self {
            recommender,
            survey,
        }
    }
}

#[async_trait]
impl Tool for PortfolioAnalysisTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "portfolio_analysis".into(),
            description: "Analyze the user's investment survey and recommend an optimal portfolio \
                          as a markdown table with rationale."
                .into(),
            parameters: vec![ParameterSchema::optional(
                "survey",
                "object",
                "Survey answers overriding the user's saved survey",
            )],
            category: Some("analysis".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let survey = match call.arguments.get("survey") {
            Some(value) if value.is_object() => {
                match serde_json::from_value::<InvestorSurvey>(value.clone()) {
                    Ok(survey) => survey,
                    Err(e) => {
                        return Ok(ToolResult::failure(
                            "portfolio_analysis",
                            format!("Invalid survey: {e}"),
                        ));
                    }
                }
            }
            _ => self.survey.clone(),
        };

        let answer = match self.recommender.answer(&survey).await {
            Ok(answer) => answer,
            Err(e) => return Ok(ToolResult::failure("portfolio_analysis", e.user_message())),
        };

        let recommendation = self.recommender.interpret(answer, None);
        let data = serde_json::json!({
            "table": recommendation.table,
            "failure": recommendation.failure,
        });

        Ok(ToolResult::success("portfolio_analysis", recommendation.answer).with_data(data))
    }
}
