//! HTTP server for the dashboard and JSON API

use crate::error::{AppError, Result};
use crate::server::handlers;
use crate::server::rate_limiter::{rate_limit_middleware, RateLimiterState};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let config = &state.config;
    info!(
        "Rate limits: API={}/s, Refresh={}/s",
        config.api_rate_limit, config.refresh_rate_limit
    );

    let rate_limiter = Arc::new(RateLimiterState::new(
        config.api_rate_limit,
        config.refresh_rate_limit,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/health", get(handlers::health_check))
        .route("/debug", get(handlers::debug_info))
        .route("/api/v1/sentiment", get(handlers::get_sentiment))
        .route("/api/v1/refresh", post(handlers::refresh))
        .with_state(state)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.bind_addr()?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Dashboard listening on http://{}", addr);
    info!("  GET  /                  dashboard");
    info!("  GET  /health            health check");
    info!("  GET  /api/v1/sentiment  latest snapshot");
    info!("  POST /api/v1/refresh    force refresh");
    info!("  GET  /debug             connection diagnostics");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Dashboard server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn sample_state(config: AppConfig) -> Arc<AppState> {
        Arc::new(AppState::new(config).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(sample_state(AppConfig::default()));
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "success");
    }

    #[tokio::test]
    async fn test_sentiment_before_first_refresh() {
        let app = build_router(sample_state(AppConfig::default()));
        let response = app.oneshot(get("/api/v1/sentiment")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["status"], "error");
    }

    #[tokio::test]
    async fn test_refresh_then_sentiment() {
        let state = sample_state(AppConfig::default());

        let response = build_router(state.clone())
            .oneshot(post("/api/v1/refresh"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["data_source"], "Sample Data");
        assert_eq!(json["data"]["reports"].as_array().unwrap().len(), 2);

        let response = build_router(state)
            .oneshot(get("/api/v1/sentiment"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["stale"], false);
        assert_eq!(json["data"]["reports"][0]["index"], "NIFTY 50");
        assert!(json["data"]["reports"][0]["result"]["sentiment"].is_string());
    }

    #[tokio::test]
    async fn test_refresh_rate_limited() {
        let app = build_router(sample_state(AppConfig::default()));

        let first = app.clone().oneshot(post("/api/v1/refresh")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(post("/api/v1/refresh")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key("Retry-After"));
    }

    #[tokio::test]
    async fn test_dashboard_page() {
        let state = sample_state(AppConfig::default());
        crate::services::DashboardService::refresh(&state).await.unwrap();

        let response = build_router(state).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Bank NIFTY"));
        assert!(html.contains(">SAMPLE<"));
    }

    #[tokio::test]
    async fn test_debug_masks_nothing_without_credentials() {
        let app = build_router(sample_state(AppConfig::default()));
        let response = app.oneshot(get("/debug")).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["authenticated"], false);
        assert_eq!(json["api_key"], "Not set");
        assert_eq!(json["broker"], "Sample Data");
        assert!(json["upstream"].is_null());
    }

    #[tokio::test]
    async fn test_debug_checks_upstream_once_connected() {
        let state = sample_state(AppConfig::default());
        crate::services::DashboardService::refresh(&state).await.unwrap();

        let response = build_router(state).oneshot(get("/debug")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["authenticated"], true);

        let upstream = &json["upstream"];
        assert_eq!(upstream["movers_request"], "PercOIGainers/NEAR");
        assert!(upstream["movers_count"].as_u64().unwrap() > 0);
        assert_eq!(upstream["movers_sample"].as_array().unwrap().len(), 3);
        assert_eq!(upstream["live_price_count"], 3);
    }
}
