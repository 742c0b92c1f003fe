//! Application state management

use crate::brokers::angel::AngelBroker;
use crate::brokers::sample::SampleBroker;
use crate::brokers::MarketDataBroker;
use crate::config::{AppConfig, DataSource};
use crate::error::{AppError, Result};
use crate::market::ConstituentTable;
use crate::security::Totp;
use crate::services::DashboardSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Broker session information
#[derive(Debug, Clone)]
pub struct BrokerSession {
    pub broker_id: String,
    pub auth_token: String,
    pub feed_token: Option<String>,
    pub user_id: String,
    pub authenticated_at: DateTime<Utc>,
}

/// Most recent failed refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshError {
    pub code: &'static str,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl From<&AppError> for RefreshError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            at: Utc::now(),
        }
    }
}

/// Application state shared by the server and background tasks
pub struct AppState {
    pub config: AppConfig,

    /// Market data source
    pub broker: Arc<dyn MarketDataBroker>,

    /// One table per tracked index
    pub tables: Vec<Arc<ConstituentTable>>,

    /// Code generator for broker login, when the source needs one
    pub totp: Option<Totp>,

    /// Current broker session
    pub broker_session: RwLock<Option<BrokerSession>>,

    /// Latest successful poll cycle
    pub snapshot: RwLock<Option<DashboardSnapshot>>,

    pub last_error: RwLock<Option<RefreshError>>,

    /// Serializes poll cycles
    pub refresh_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let tables = config.load_tables()?;

        let (broker, totp): (Arc<dyn MarketDataBroker>, Option<Totp>) = match config.data_source {
            DataSource::Angel => {
                let angel = config.angel.as_ref().ok_or_else(|| {
                    AppError::Config("Angel One credentials are not configured".to_string())
                })?;
                let broker = AngelBroker::new(
                    &config.base_url,
                    &angel.api_key,
                    Duration::from_secs(config.http_timeout_secs),
                )?;
                let totp = Totp::from_base32(&angel.totp_secret)?;
                (Arc::new(broker), Some(totp))
            }
            DataSource::Sample => (Arc::new(SampleBroker::new()), None),
        };

        tracing::info!(
            "Using {} with {} index tables",
            broker.name(),
            tables.len()
        );

        Ok(Self::with_broker(config, broker, tables, totp))
    }

    /// Create application state around an existing broker
    pub fn with_broker(
        config: AppConfig,
        broker: Arc<dyn MarketDataBroker>,
        tables: Vec<ConstituentTable>,
        totp: Option<Totp>,
    ) -> Self {
        Self {
            config,
            broker,
            tables: tables.into_iter().map(Arc::new).collect(),
            totp,
            broker_session: RwLock::new(None),
            snapshot: RwLock::new(None),
            last_error: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Check if broker is connected
    pub fn is_broker_connected(&self) -> bool {
        self.broker_session.read().is_some()
    }

    /// Get current broker session
    pub fn get_broker_session(&self) -> Option<BrokerSession> {
        self.broker_session.read().clone()
    }

    /// Set broker session
    pub fn set_broker_session(&self, session: Option<BrokerSession>) {
        *self.broker_session.write() = session;
    }

    pub fn get_snapshot(&self) -> Option<DashboardSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn set_snapshot(&self, snapshot: DashboardSnapshot) {
        *self.snapshot.write() = Some(snapshot);
    }

    pub fn get_last_error(&self) -> Option<RefreshError> {
        self.last_error.read().clone()
    }

    pub fn record_error(&self, err: &AppError) {
        *self.last_error.write() = Some(RefreshError::from(err));
    }

    pub fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    /// Whether the shown snapshot is older than the last failure
    pub fn is_stale(&self) -> bool {
        match (self.snapshot.read().as_ref(), self.last_error.read().as_ref()) {
            (Some(snapshot), Some(error)) => error.at >= snapshot.generated_at,
            (None, _) => true,
            _ => false,
        }
    }
}
