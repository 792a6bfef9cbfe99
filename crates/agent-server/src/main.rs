//! Portfolio Advisor HTTP Server
//!
//! Axum-based server exposing survey recommendations with chart datasets,
//! stock charts, report search and a tool-using chat agent.

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::LlmProvider;
use agent_runtime::OllamaProvider;
use portfolio_advisor::{AdvisorConfig, PortfolioAdvisor};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::from_env());

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Ollama");
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - recommendations and chat will fail");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    let config = AdvisorConfig::from_env()?;
    tracing::info!(
        model = %config.model,
        market = ?config.market_source,
        documents_dir = %config.documents_dir.display(),
        "Advisor configuration loaded"
    );

    let advisor = PortfolioAdvisor::from_config(provider.clone(), &config).await?;
    if advisor.documents().is_empty() {
        tracing::warn!("⚠ No reference documents - market_report_search disabled");
    } else if advisor.documents().embedding_model().is_none() {
        tracing::warn!("⚠ Report search is using term matching (no embedding model)");
    }

    let app = routes::router(AppState {
        provider,
        advisor: Arc::new(advisor),
    });

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 portfolio advisor running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                  - Health check");
    tracing::info!("  GET  /api/models              - List available models");
    tracing::info!("  POST /api/portfolio/recommend - Survey → portfolio + charts");
    tracing::info!("  GET  /api/presets             - Preset analyses");
    tracing::info!("  POST /api/presets/{{index}}     - Run a preset");
    tracing::info!("  GET  /api/stock/{{ticker}}      - Stock chart data");
    tracing::info!("  POST /api/reports/search      - Search market reports");
    tracing::info!("  POST /api/chat                - Chat with the advisor");
    tracing::info!("  GET  /api/sessions            - Recent chat sessions");
    tracing::info!("  DELETE /api/sessions/{{id}}     - End a chat session");

    axum::serve(listener, app).await?;

    Ok(())
}
