//! HTTP endpoint handlers

use crate::error::Result;
use crate::security::mask_secret;
use crate::server::render::{render_dashboard, PageContext};
use crate::server::types::*;
use crate::services::{DashboardService, DashboardSnapshot};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Dashboard page - GET /
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = state.get_snapshot();
    let last_error = state.get_last_error();

    Html(render_dashboard(&PageContext {
        snapshot: snapshot.as_ref(),
        last_error: last_error.as_ref(),
        stale: state.is_stale(),
        refresh_secs: state.config.refresh_interval_secs,
    }))
}

/// Health check endpoint - GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::<Empty>::success_with_message("Index sentiment dashboard is running"))
}

/// Latest snapshot - GET /api/v1/sentiment
pub async fn get_sentiment(State(state): State<Arc<AppState>>) -> Response {
    let last_error = state.get_last_error();

    match state.get_snapshot() {
        Some(snapshot) => Json(ApiResponse::success_with_data(SentimentData {
            snapshot,
            stale: state.is_stale(),
            last_error,
        }))
        .into_response(),
        None => {
            let message = match last_error {
                Some(err) => format!("No market data available yet: {}", err.message),
                None => "No market data available yet".to_string(),
            };
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<Empty>::error(message)),
            )
                .into_response()
        }
    }
}

/// Force a poll cycle - POST /api/v1/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DashboardSnapshot>>> {
    info!("Manual refresh requested");
    let snapshot = DashboardService::refresh(&state).await?;
    Ok(Json(ApiResponse::success_with_data(snapshot)))
}

/// Connection diagnostics - GET /debug
pub async fn debug_info(State(state): State<Arc<AppState>>) -> Json<DebugInfo> {
    let session = state.get_broker_session();
    let (api_key, client_id) = match &state.config.angel {
        Some(angel) => (mask_secret(&angel.api_key, 4), angel.client_id.clone()),
        None => (mask_secret("", 4), String::new()),
    };

    let upstream = match &session {
        Some(session) => Some(DashboardService::check_upstream(&state, session).await),
        None => None,
    };

    Json(DebugInfo {
        broker: state.broker.name().to_string(),
        live: state.broker.is_live(),
        authenticated: session.is_some(),
        token_length: session.map(|s| s.auth_token.len()).unwrap_or(0),
        api_key,
        client_id,
        refresh_interval_secs: state.config.refresh_interval_secs,
        indices: state.tables.iter().map(|t| t.name().to_string()).collect(),
        last_error: state.get_last_error(),
        upstream,
        timestamp: Utc::now().to_rfc3339(),
    })
}
