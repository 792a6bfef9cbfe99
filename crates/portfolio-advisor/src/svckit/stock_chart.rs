//! Stock Chart Tool
//!
//! Price history, moving averages and return metrics for one ticker.

use async_trait::async_trait;
use std::sync::Arc;

use agent_core::{
    ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
};

use crate::market::{MarketDataClient, Period, StockReport};

pub struct StockChartTool {
    market: Arc<dyn MarketDataClient>,
}

impl StockChartTool {
    pub fn new(market: Arc<dyn MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl Tool for StockChartTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "stock_chart".into(),
            description: "Get the stock chart and key metrics (last close, high/low, average \
                          volume, returns, volatility) for a ticker symbol."
                .into(),
            parameters: vec![
                ParameterSchema::required(
                    "ticker",
                    "string",
                    "Ticker symbol (e.g., 'AAPL', '005930.KS')",
                ),
                ParameterSchema::optional(
                    "period",
                    "string",
                    "Lookback period: 1mo, 3mo, 6mo, 1y (default), 2y, 5y",
                ),
            ],
            category: Some("market_data".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let Some(ticker) = call.str_arg("ticker") else {
            return Ok(ToolResult::failure("stock_chart", "Missing ticker"));
        };

        let period = match call.str_arg("period").map(str::parse::<Period>) {
            None => Period::default(),
            Some(Ok(period)) => period,
            Some(Err(e)) => return Ok(ToolResult::failure("stock_chart", e.to_string())),
        };

        let report = match self.market.history(ticker, period).await {
            Ok(history) => StockReport::from_history(&history),
            Err(e) => Err(e),
        };

        match report {
            Ok(report) => {
                let data = serde_json::to_value(&report)?;
                Ok(ToolResult::success("stock_chart", report.summary()).with_data(data))
            }
            Err(e) => {
                tracing::warn!(ticker, error = %e, "Stock chart unavailable");
                Ok(ToolResult::failure("stock_chart", e.user_message()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MockMarketDataClient;

    fn tool() -> StockChartTool {
        StockChartTool::new(Arc::new(MockMarketDataClient::new().with_missing(["DELISTED"])))
    }

    #[tokio::test]
    async fn test_stock_chart_summary() {
        let call = ToolCall::new("stock_chart")
            .with_arg("ticker", serde_json::json!("AAPL"))
            .with_arg("period", serde_json::json!("6mo"));
        let result = tool().execute(&call).await.unwrap();

        assert!(result.success);
        assert!(result.output.starts_with("Apple Inc. (AAPL)"));
        assert!(result.output.contains("Daily volatility"));
        assert_eq!(result.data.unwrap()["candles"].as_array().unwrap().len(), 126);
    }

    #[tokio::test]
    async fn test_stock_chart_failures() {
        let missing = tool().execute(&ToolCall::new("stock_chart")).await.unwrap();
        assert!(!missing.success);

        let call = ToolCall::new("stock_chart").with_arg("ticker", serde_json::json!("DELISTED"));
        let result = tool().execute(&call).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("DELISTED"));

        let call = ToolCall::new("stock_chart")
            .with_arg("ticker", serde_json::json!("AAPL"))
            .with_arg("period", serde_json::json!("decade"));
        assert!(!tool().execute(&call).await.unwrap().success);
    }
}
