//! Router

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    chat_handler, delete_session, health_check, list_models, list_presets, list_sessions,
    recommend, run_preset, search_reports, stock_report,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        // Portfolio
        .route("/api/portfolio/recommend", post(recommend))
        .route("/api/presets", get(list_presets))
        .route("/api/presets/{index}", post(run_preset))
        // Market data and reports
        .route("/api/stock/{ticker}", get(stock_report))
        .route("/api/reports/search", post(search_reports))
        // Agent
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{id}", delete(delete_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{
        Completion, GenerationOptions, LlmProvider, MemorySessionStore, Message, ModelInfo,
        ProviderInfo,
    };
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use portfolio_advisor::market::MockMarketDataClient;
    use portfolio_advisor::{AdvisorConfig, DocumentStore, PortfolioAdvisor};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TableProvider;

    #[async_trait]
    impl LlmProvider for TableProvider {
        async fn info(&self) -> agent_core::Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "table".into(),
                models: vec![],
                supports_tools: false,
            })
        }

        async fn health_check(&self) -> agent_core::Result<bool> {
            Ok(false)
        }

        async fn complete(
            &self,
            _: &[Message],
            _: &GenerationOptions,
        ) -> agent_core::Result<Completion> {
            Ok(Completion::text(
                "Plan:\n| Name | Weight |\n|---|---|\n| Apple | 60 |\n| Bonds | 40 |",
                "table",
            ))
        }

        async fn list_models(&self) -> agent_core::Result<Vec<ModelInfo>> {
            Ok(vec![ModelInfo {
                id: "llama3.2".into(),
                name: "llama3.2".into(),
                context_length: None,
            }])
        }
    }

    fn app() -> Router {
        let provider: Arc<dyn LlmProvider> = Arc::new(TableProvider);
        let advisor = PortfolioAdvisor::new(
            provider.clone(),
            Arc::new(MockMarketDataClient::new()),
            Arc::new(DocumentStore::empty()),
            Arc::new(MemorySessionStore::new()),
            &AdvisorConfig::default(),
        );
        router(AppState {
            provider,
            advisor: Arc::new(advisor),
        })
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        send_to(app(), request).await
    }

    async fn send_to(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ollama_connected"], false);
        assert_eq!(body["documents"], 0);
    }

    #[tokio::test]
    async fn test_recommend_returns_charts() {
        let (status, body) = send(post_json(
            "/api/portfolio/recommend",
            serde_json::json!({"risk": "stable", "amount": 100}),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["charts"]["composition"]["slices"][0]["label"], "Apple");
        assert_eq!(body["charts"]["allocations"][0]["name"], "Apple");
        assert!(body["charts"]["allocations"][0]["amount"].is_string());
    }

    #[tokio::test]
    async fn test_invalid_survey_is_bad_request() {
        let (status, body) = send(post_json(
            "/api/portfolio/recommend",
            serde_json::json!({"amount": 50}),
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SURVEY");
    }

    #[tokio::test]
    async fn test_presets_and_stock() {
        let (_, presets) = send(Request::get("/api/presets").body(Body::empty()).unwrap()).await;
        assert_eq!(presets.as_array().unwrap().len(), 7);
        assert_eq!(presets[6]["ticker"], "AAPL");

        let (status, report) = send(
            Request::get("/api/stock/AAPL?period=3mo")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["candles"].as_array().unwrap().len(), 63);

        let (status, body) = send(post_json("/api/presets/99", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_PRESET");
    }

    #[tokio::test]
    async fn test_chat_returns_session() {
        let (status, body) = send(post_json(
            "/api/chat",
            serde_json::json!({"message": "Build me a portfolio"}),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["session_id"].as_str().is_some());
        assert_eq!(body["message_count"], 3);
    }

    #[tokio::test]
    async fn test_list_and_delete_sessions() {
        let app = app();
        let (_, chat) = send_to(
            app.clone(),
            post_json("/api/chat", serde_json::json!({"message": "Dividend ideas?"})),
        )
        .await;
        let id = chat["session_id"].as_str().unwrap().to_string();

        let (status, sessions) = send_to(
            app.clone(),
            Request::get("/api/sessions").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sessions[0]["session_id"], id.as_str());
        assert_eq!(sessions[0]["title"], "Dividend ideas?");

        let uri = format!("/api/sessions/{id}");
        let (status, _) = send_to(
            app.clone(),
            Request::delete(uri.as_str()).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send_to(app, Request::delete(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_SESSION");
    }
}
