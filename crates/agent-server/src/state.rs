//! Application State

use std::sync::Arc;

use agent_core::LlmProvider;
use portfolio_advisor::PortfolioAdvisor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Ollama, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Recommendation pipeline, market data, report search and chat sessions
    pub advisor: Arc<PortfolioAdvisor>,
}
