//! # portfolio-advisor
//!
//! Survey-driven portfolio recommendations. The model answers in prose with
//! an embedded markdown table; this crate pulls the table out, normalizes
//! it, and turns it into chart datasets.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────┐   ┌────────────┐   ┌─────────┐   ┌───────────┐   ┌────────┐
//! │ Survey │──▶│ LLM answer │──▶│ extract │──▶│ normalize │──▶│ charts │
//! └────────┘   └────────────┘   └─────────┘   └─────┬─────┘   └────────┘
//!                                                   │
//!                                  NoTable / Unparseable(reason)
//! ```
//!
//! Around the pipeline sit market data (Yahoo chart API or a seeded mock,
//! behind a TTL/LRU cache), local report search, and the agent tools that
//! let a chat session call all of it.

pub mod advisor;
pub mod charts;
pub mod config;
pub mod documents;
pub mod error;
pub mod market;
pub mod presets;
pub mod recommend;
pub mod survey;
pub mod svckit;
pub mod table;

pub use advisor::{ChatReply, PortfolioAdvisor, PresetRun, SessionSummary};
pub use charts::{ChartAdapter, PortfolioCharts};
pub use config::{AdvisorConfig, MarketSource};
pub use documents::{DocumentStore, ReportAnswer};
pub use error::{AdvisorError, Result, TableError, UnparseableReason};
pub use market::{MarketDataClient, Period, PriceHistory, StockReport};
pub use presets::{PRESETS, Preset};
pub use recommend::{Recommendation, Recommender};
pub use survey::{InvestorSurvey, RiskAppetite};
pub use table::{ColumnKeywords, NormalizedTable, TableNormalizer, parse_response};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{PortfolioAnalysisTool, ReportSearchTool, StockChartTool};
}

/// System prompt for the portfolio advisor agent
pub const ADVISOR_PROMPT: &str = r#"You are a professional investment advisor. You help users build portfolios that match their survey answers and explain individual stocks and market conditions.

## Tools

- `portfolio_analysis` - recommend a portfolio for the user's survey. Use it whenever the user asks what to invest in or how to allocate.
- `stock_chart` - price history and key metrics for one ticker (e.g. AAPL, 005930.KS). Use it whenever a specific company or ticker is discussed.
- `market_report_search` - answers from the stored market reports. Use it for questions about the economy, sectors or market outlook, when available.

## How to answer

1. Call a tool whenever the question matches one; do not invent prices or figures.
2. When recommending holdings, include a markdown table with Name, Ticker, Weight, Country and Industry columns, weights in percent summing to about 100.
3. Explain the rationale, the main risks and how the portfolio is diversified.
4. Keep answers clear and concise, and remind the user that this is not personalised financial advice."#;
