//! Service Kit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the
//! portfolio advisor.

mod portfolio_analysis;
mod report_search;
mod stock_chart;

pub use portfolio_analysis::PortfolioAnalysisTool;
pub use report_search::ReportSearchTool;
pub use stock_chart::StockChartTool;
