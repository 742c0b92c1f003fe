//! HTTP API types

use crate::services::{DashboardSnapshot, UpstreamCheck};
use crate::state::RefreshError;
use serde::Serialize;

/// Standard API response format
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_message(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.to_string()),
            data: None,
        }
    }

    pub fn success_with_data(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Empty data type for responses without data
#[derive(Debug, Clone, Serialize)]
pub struct Empty {}

/// Latest snapshot plus freshness
#[derive(Debug, Clone, Serialize)]
pub struct SentimentData {
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
    /// True when the most recent refresh failed after this snapshot
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RefreshError>,
}

/// Connection diagnostics for `/debug`
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub broker: String,
    pub live: bool,
    pub authenticated: bool,
    pub token_length: usize,
    pub api_key: String,
    pub client_id: String,
    pub refresh_interval_secs: u64,
    pub indices: Vec<String>,
    pub last_error: Option<RefreshError>,
    /// Live broker answers; absent until a session exists
    pub upstream: Option<UpstreamCheck>,
    pub timestamp: String,
}
