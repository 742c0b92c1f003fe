//! Broker market-data adapters

pub mod types;
pub mod angel;
pub mod sample;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use types::*;

/// Market data source the poll cycle talks to
#[async_trait]
pub trait MarketDataBroker: Send + Sync {
    /// Broker ID (e.g., "angel", "sample")
    fn id(&self) -> &'static str;

    /// Broker display name
    fn name(&self) -> &'static str;

    /// Whether data comes from a live exchange feed
    fn is_live(&self) -> bool;

    /// Minimum spacing between consecutive requests of one poll cycle
    fn min_request_interval(&self) -> Duration {
        Duration::ZERO
    }

    /// Authenticate with broker
    async fn authenticate(&self, credentials: BrokerCredentials) -> Result<AuthResponse>;

    /// Get a gainers/losers list
    async fn get_movers(
        &self,
        auth_token: &str,
        kind: MoversKind,
        expiry: ExpiryType,
    ) -> Result<Vec<MoverItem>>;

    /// Get put-call ratios
    async fn get_put_call_ratio(&self, auth_token: &str) -> Result<Vec<PcrItem>>;

    /// Get the latest traded price for an instrument token, if any
    async fn get_last_price(
        &self,
        auth_token: &str,
        exchange: &str,
        token: &str,
    ) -> Result<Option<f64>>;
}

/// Broker credentials for one login attempt
#[derive(Clone, Default)]
pub struct BrokerCredentials {
    pub client_id: String,
    pub password: String,
    /// One-time code valid for the current time step
    pub totp: String,
}

impl std::fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Authentication response from broker
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub auth_token: String,
    pub feed_token: Option<String>,
    pub user_id: String,
}
