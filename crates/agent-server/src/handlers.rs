//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use agent_core::{AgentError, ModelInfo, SessionId};
use portfolio_advisor::{
    AdvisorError, ChatReply, InvestorSurvey, PRESETS, Period, PresetRun, Recommendation,
    ReportAnswer, SessionSummary, StockReport,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
    pub documents: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub survey: Option<InvestorSurvey>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_session_limit")]
    pub limit: usize,
}

const fn default_session_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    #[serde(default)]
    pub period: Option<Period>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct PresetSummary {
    pub index: usize,
    pub label: &'static str,
    pub prompt: &'static str,
    pub ticker: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Status code and error code for an advisor failure
fn api_error(e: &AdvisorError) -> ApiError {
    let (status, code) = match e {
        AdvisorError::InvalidSurvey(_) => (StatusCode::BAD_REQUEST, "INVALID_SURVEY"),
        AdvisorError::EmptyMessage => (StatusCode::BAD_REQUEST, "EMPTY_MESSAGE"),
        AdvisorError::Document(_) => (StatusCode::BAD_REQUEST, "DOCUMENT_ERROR"),
        AdvisorError::UnknownPreset(_) => (StatusCode::NOT_FOUND, "UNKNOWN_PRESET"),
        AdvisorError::UnknownSession(_) => (StatusCode::NOT_FOUND, "UNKNOWN_SESSION"),
        AdvisorError::NoMarketData(_) => (StatusCode::NOT_FOUND, "NO_MARKET_DATA"),
        AdvisorError::MarketData(_) | AdvisorError::Network(_) => {
            (StatusCode::BAD_GATEWAY, "MARKET_DATA_ERROR")
        }
        AdvisorError::Agent(AgentError::Timeout(_)) => {
            (StatusCode::GATEWAY_TIMEOUT, "AGENT_TIMEOUT")
        }
        AdvisorError::Agent(e) if e.is_retryable() => {
            (StatusCode::SERVICE_UNAVAILABLE, "AGENT_UNAVAILABLE")
        }
        AdvisorError::Agent(_) => (StatusCode::BAD_GATEWAY, "AGENT_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!(code, error = %e, "Request failed");
    } else {
        tracing::debug!(code, error = %e, "Request rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: e.user_message(),
            code: code.into(),
        }),
    )
}

fn session_id(raw: Option<String>) -> Option<SessionId> {
    raw.filter(|s| !s.trim().is_empty())
        .map(SessionId::from_string)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
        documents: state.advisor.documents().document_count(),
    })
}

pub async fn list_models(State(state): State<AppState>) -> Result<Json<Vec<ModelInfo>>, ApiError> {
    state
        .provider
        .list_models()
        .await
        .map(Json)
        .map_err(|e| api_error(&AdvisorError::Agent(e)))
}

/// Survey → recommendation with chart datasets
pub async fn recommend(
    State(state): State<AppState>,
    Json(survey): Json<InvestorSurvey>,
) -> Result<Json<Recommendation>, ApiError> {
    state
        .advisor
        .recommend(&survey)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

pub async fn list_presets() -> Json<Vec<PresetSummary>> {
    Json(
        PRESETS
            .iter()
            .enumerate()
            .map(|(index, preset)| PresetSummary {
                index,
                label: preset.label,
                prompt: preset.prompt,
                ticker: preset.ticker_hint(),
            })
            .collect(),
    )
}

pub async fn run_preset(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<PresetRun>, ApiError> {
    state
        .advisor
        .run_preset(index, session_id(query.session_id))
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

pub async fn stock_report(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<StockQuery>,
) -> Result<Json<StockReport>, ApiError> {
    state
        .advisor
        .stock_report(&ticker, query.period.unwrap_or_default())
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

pub async fn search_reports(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<ReportAnswer>, ApiError> {
    state
        .advisor
        .search_reports(&payload.query)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

/// Agent chat with session memory
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    state
        .advisor
        .chat(session_id(payload.session_id), &payload.message, payload.survey)
        .await
        .map(Json)
        .map_err(|e| api_error(&e))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    state
        .advisor
        .list_sessions(query.limit)
        .map(Json)
        .map_err(|e| api_error(&e))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .advisor
        .end_session(&SessionId::from_string(id))
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| api_error(&e))
}
