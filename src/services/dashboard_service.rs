//! Dashboard Service
//!
//! One full poll cycle: session, feed, per-index evaluation, price
//! enrichment, snapshot.

use crate::brokers::types::{ExpiryType, MoverItem, MoversKind};
use crate::brokers::BrokerCredentials;
use crate::error::{AppError, Result};
use crate::market::SymbolMatcher;
use crate::services::market_data_service::MarketDataService;
use crate::services::sentiment_service::{IndexReport, SentimentService};
use crate::state::{AppState, BrokerSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Exchange used for constituent price lookups
const PRICE_EXCHANGE: &str = "NSE";

/// Constituents priced by the upstream connectivity check
const CHECK_PRICE_SYMBOLS: [&str; 3] = ["RELIANCE", "INFY", "HDFCBANK"];
/// Mover rows echoed back by the upstream connectivity check
const CHECK_SAMPLE_ROWS: usize = 3;

/// Everything the dashboard shows for one poll cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub reports: Vec<IndexReport>,
    /// Human readable origin, e.g. "Live Market Data" or "Sample Data"
    pub data_source: String,
    pub broker: String,
    pub live: bool,
    /// Constituents that received a last price this cycle
    pub priced: usize,
    pub generated_at: DateTime<Utc>,
}

/// Last-price result for one constituent in the upstream check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceCheck {
    pub symbol: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Live answers from the broker, independent of the cached snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamCheck {
    /// Movers list requested, e.g. "PercOIGainers/NEAR"
    pub movers_request: String,
    pub movers_count: usize,
    pub movers_sample: Vec<MoverItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movers_error: Option<String>,
    pub prices: Vec<PriceCheck>,
    pub live_price_count: usize,
}

/// Dashboard service for business logic
pub struct DashboardService;

impl DashboardService {
    /// Run one poll cycle and store the result
    ///
    /// On failure the previous snapshot is left in place and the error is
    /// recorded. Authentication failures also drop the broker session so the
    /// next cycle logs in again.
    pub async fn refresh(state: &AppState) -> Result<DashboardSnapshot> {
        let _guard = state.refresh_lock.lock().await;

        match Self::run_cycle(state).await {
            Ok(snapshot) => {
                state.set_snapshot(snapshot.clone());
                state.clear_error();
                Ok(snapshot)
            }
            Err(e) => {
                if matches!(e, AppError::Auth(_)) {
                    warn!("Dropping broker session after auth failure: {}", e);
                    state.set_broker_session(None);
                }
                state.record_error(&e);
                Err(e)
            }
        }
    }

    async fn run_cycle(state: &AppState) -> Result<DashboardSnapshot> {
        let session = Self::ensure_session(state).await?;
        let broker = state.broker.as_ref();

        let feed = MarketDataService::fetch(broker, &session.auth_token).await?;

        let mut reports: Vec<IndexReport> = state
            .tables
            .iter()
            .map(|table| {
                let matcher = SymbolMatcher::new(table);
                SentimentService::evaluate(table, &feed.quotes_for(&matcher))
            })
            .collect();

        let priced = Self::attach_prices(state, &session, &mut reports).await?;

        let data_source = if broker.is_live() {
            "Live Market Data".to_string()
        } else {
            "Sample Data".to_string()
        };

        info!(
            "DashboardService::refresh - {} indices from {}, {} prices",
            reports.len(),
            data_source,
            priced
        );

        Ok(DashboardSnapshot {
            reports,
            data_source,
            broker: broker.name().to_string(),
            live: broker.is_live(),
            priced,
            generated_at: Utc::now(),
        })
    }

    /// Reuse the current broker session or log in with a fresh one-time code
    async fn ensure_session(state: &AppState) -> Result<BrokerSession> {
        if let Some(session) = state.get_broker_session() {
            return Ok(session);
        }

        let credentials = match &state.config.angel {
            Some(angel) => BrokerCredentials {
                client_id: angel.client_id.clone(),
                password: angel.password.clone(),
                totp: state.totp.as_ref().map(|t| t.now()).unwrap_or_default(),
            },
            None => BrokerCredentials::default(),
        };

        info!("Authenticating with {}", state.broker.name());
        let auth = state.broker.authenticate(credentials).await?;

        let session = BrokerSession {
            broker_id: state.broker.id().to_string(),
            auth_token: auth.auth_token,
            feed_token: auth.feed_token,
            user_id: auth.user_id,
            authenticated_at: Utc::now(),
        };
        state.set_broker_session(Some(session.clone()));
        info!("Broker session established for {}", state.broker.name());

        Ok(session)
    }

    /// Ask the broker for one movers list and a few last prices
    ///
    /// Failures are reported in the result rather than returned, and the
    /// stored session and snapshot are left untouched.
    pub async fn check_upstream(state: &AppState, session: &BrokerSession) -> UpstreamCheck {
        let broker = state.broker.as_ref();
        let spacing = broker.min_request_interval();
        let (kind, expiry) = (MoversKind::PercOiGainers, ExpiryType::Near);

        let mut check = UpstreamCheck {
            movers_request: format!("{}/{}", kind.datatype(), expiry.as_str()),
            movers_count: 0,
            movers_sample: Vec::new(),
            movers_error: None,
            prices: Vec::new(),
            live_price_count: 0,
        };

        match broker.get_movers(&session.auth_token, kind, expiry).await {
            Ok(items) => {
                check.movers_count = items.len();
                check.movers_sample = items.into_iter().take(CHECK_SAMPLE_ROWS).collect();
            }
            Err(e) => {
                warn!("Upstream check: {} failed: {}", check.movers_request, e);
                check.movers_error = Some(e.to_string());
            }
        }

        let tokens = CHECK_PRICE_SYMBOLS.iter().filter_map(|symbol| {
            state
                .tables
                .iter()
                .find_map(|table| table.get(symbol).and_then(|c| c.token.clone()))
                .map(|token| (symbol.to_string(), token))
        });

        for (symbol, token) in tokens {
            if !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }
            let (price, error) = match broker
                .get_last_price(&session.auth_token, PRICE_EXCHANGE, &token)
                .await
            {
                Ok(price) => (price, None),
                Err(e) => (None, Some(e.to_string())),
            };
            if price.is_some() {
                check.live_price_count += 1;
            }
            check.prices.push(PriceCheck {
                symbol,
                token,
                price,
                error,
            });
        }

        info!(
            "Upstream check: {} movers, {} of {} prices",
            check.movers_count,
            check.live_price_count,
            check.prices.len()
        );
        check
    }

    /// Fill in last prices for matched constituents that carry a token
    ///
    /// Each token is looked up once per cycle even when several indices hold
    /// it. Lookups that fail for other reasons than auth are skipped.
    async fn attach_prices(
        state: &AppState,
        session: &BrokerSession,
        reports: &mut [IndexReport],
    ) -> Result<usize> {
        let limit = state.config.max_price_lookups;
        if limit == 0 {
            return Ok(0);
        }

        let mut tokens: Vec<String> = Vec::new();
        for (table, report) in state.tables.iter().zip(reports.iter()) {
            for row in &report.constituents {
                if let Some(token) = table.get(&row.quote.symbol).and_then(|c| c.token.clone()) {
                    if !tokens.contains(&token) {
                        tokens.push(token);
                    }
                }
            }
        }
        tokens.truncate(limit);

        let spacing = state.broker.min_request_interval();
        let mut prices: HashMap<String, f64> = HashMap::new();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }
            match state
                .broker
                .get_last_price(&session.auth_token, PRICE_EXCHANGE, token)
                .await
            {
                Ok(Some(price)) => {
                    prices.insert(token.clone(), price);
                }
                Ok(None) => {}
                Err(e @ AppError::Auth(_)) => return Err(e),
                Err(e) => warn!("Price lookup for token {} failed: {}", token, e),
            }
        }

        let mut priced = 0;
        for (table, report) in state.tables.iter().zip(reports.iter_mut()) {
            for row in report.constituents.iter_mut() {
                let price = table
                    .get(&row.quote.symbol)
                    .and_then(|c| c.token.as_ref())
                    .and_then(|token| prices.get(token));
                if let Some(price) = price {
                    row.last_price = Some(*price);
                    priced += 1;
                }
            }
        }

        Ok(priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::types::{ExpiryType, MoverItem, MoversKind, PcrItem};
    use crate::brokers::{AuthResponse, MarketDataBroker};
    use crate::config::AppConfig;
    use crate::market::{ConstituentTable, Sentiment};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted broker: fails login or price calls on demand and counts calls
    #[derive(Default)]
    struct MockBroker {
        logins: AtomicUsize,
        price_calls: AtomicUsize,
        reject_session: Mutex<bool>,
        fail_movers: Mutex<bool>,
    }

    #[async_trait]
    impl MarketDataBroker for MockBroker {
        fn id(&self) -> &'static str {
            "mock"
        }

        fn name(&self) -> &'static str {
            "Mock"
        }

        fn is_live(&self) -> bool {
            true
        }

        async fn authenticate(&self, credentials: BrokerCredentials) -> Result<AuthResponse> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AuthResponse {
                auth_token: format!("token-{}", n),
                feed_token: None,
                user_id: credentials.client_id,
            })
        }

        async fn get_movers(
            &self,
            _auth_token: &str,
            kind: MoversKind,
            _expiry: ExpiryType,
        ) -> Result<Vec<MoverItem>> {
            if *self.reject_session.lock() {
                return Err(AppError::Auth("Invalid Token".to_string()));
            }
            if *self.fail_movers.lock() {
                return Err(AppError::Broker("gainersLosers returned HTTP 500".to_string()));
            }
            Ok(match kind {
                MoversKind::PercOiGainers => vec![
                    MoverItem::new("HDFCBANK25JAN24FUT", 3.0, 500.0),
                    MoverItem::new("RELIANCE25JAN24FUT", 2.0, 300.0),
                ],
                MoversKind::PercOiLosers => vec![MoverItem::new("LT25JAN24FUT", -1.0, -100.0)],
                _ => Vec::new(),
            })
        }

        async fn get_put_call_ratio(&self, _auth_token: &str) -> Result<Vec<PcrItem>> {
            Ok(vec![PcrItem {
                trading_symbol: "HDFCBANK25JAN24FUT".to_string(),
                pcr: 0.9,
            }])
        }

        async fn get_last_price(
            &self,
            _auth_token: &str,
            _exchange: &str,
            token: &str,
        ) -> Result<Option<f64>> {
            self.price_calls.fetch_add(1, Ordering::SeqCst);
            match token {
                "1333" => Ok(Some(1680.45)),
                _ => Err(AppError::Broker("no candles".to_string())),
            }
        }
    }

    fn state_with(broker: Arc<MockBroker>) -> AppState {
        AppState::with_broker(AppConfig::default(), broker, ConstituentTable::defaults(), None)
    }

    #[tokio::test]
    async fn test_refresh_builds_snapshot() {
        let broker = Arc::new(MockBroker::default());
        let state = state_with(broker.clone());

        let snapshot = DashboardService::refresh(&state).await.unwrap();
        assert_eq!(snapshot.reports.len(), 2);
        assert_eq!(snapshot.data_source, "Live Market Data");

        let nifty = &snapshot.reports[0];
        assert_eq!(nifty.result.matched, 3);
        // 3.0 * 11.50 + 2.0 * 9.37 - 1.0 * 3.80, all over 100
        assert!((nifty.result.net_impact - 0.4944).abs() < 1e-9);
        assert!((nifty.result.weighted_pcr - 0.9).abs() < 1e-9);

        let bank = &snapshot.reports[1];
        assert_eq!(bank.result.matched, 1);
        assert_eq!(bank.result.sentiment, Sentiment::StrongBullish);

        // HDFCBANK and RELIANCE carry tokens, shared across both indices
        assert_eq!(broker.price_calls.load(Ordering::SeqCst), 2);
        assert_eq!(snapshot.priced, 2);
        assert_eq!(bank.constituents[0].last_price, Some(1680.45));

        assert_eq!(state.get_snapshot(), Some(snapshot));
        assert!(state.get_last_error().is_none());
        assert!(!state.is_stale());
    }

    #[tokio::test]
    async fn test_session_reused_between_cycles() {
        let broker = Arc::new(MockBroker::default());
        let state = state_with(broker.clone());

        DashboardService::refresh(&state).await.unwrap();
        DashboardService::refresh(&state).await.unwrap();
        assert_eq!(broker.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_drops_session() {
        let broker = Arc::new(MockBroker::default());
        let state = state_with(broker.clone());
        DashboardService::refresh(&state).await.unwrap();

        *broker.reject_session.lock() = true;
        let result = DashboardService::refresh(&state).await;
        assert!(matches!(result, Err(AppError::Auth(_))));
        assert!(!state.is_broker_connected());
        assert!(state.is_stale());

        *broker.reject_session.lock() = false;
        DashboardService::refresh(&state).await.unwrap();
        assert_eq!(broker.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_broker_failure_keeps_previous_snapshot() {
        let broker = Arc::new(MockBroker::default());
        let state = state_with(broker.clone());
        let first = DashboardService::refresh(&state).await.unwrap();

        *broker.fail_movers.lock() = true;
        assert!(DashboardService::refresh(&state).await.is_err());

        assert_eq!(state.get_snapshot(), Some(first));
        assert!(state.is_broker_connected());
        assert_eq!(state.get_last_error().unwrap().code, "BROKER_ERROR");
    }

    #[tokio::test]
    async fn test_price_lookups_capped() {
        let broker = Arc::new(MockBroker::default());
        let config = AppConfig {
            max_price_lookups: 1,
            ..AppConfig::default()
        };
        let state =
            AppState::with_broker(config, broker.clone(), ConstituentTable::defaults(), None);

        DashboardService::refresh(&state).await.unwrap();
        assert_eq!(broker.price_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_upstream_reports_movers_and_prices() {
        let broker = Arc::new(MockBroker::default());
        let state = state_with(broker.clone());
        let session = DashboardService::ensure_session(&state).await.unwrap();

        let check = DashboardService::check_upstream(&state, &session).await;
        assert_eq!(check.movers_request, "PercOIGainers/NEAR");
        assert_eq!(check.movers_count, 2);
        assert_eq!(check.movers_sample[0].trading_symbol, "HDFCBANK25JAN24FUT");
        assert!(check.movers_error.is_none());

        // RELIANCE and INFY have no mock candles, HDFCBANK does
        assert_eq!(check.prices.len(), 3);
        assert_eq!(check.live_price_count, 1);
        assert_eq!(check.prices[2].symbol, "HDFCBANK");
        assert_eq!(check.prices[2].price, Some(1680.45));
        assert!(check.prices[0].error.as_deref().unwrap().contains("no candles"));
    }

    #[tokio::test]
    async fn test_check_upstream_reports_errors_without_side_effects() {
        let broker = Arc::new(MockBroker::default());
        let state = state_with(broker.clone());
        let session = DashboardService::ensure_session(&state).await.unwrap();

        *broker.reject_session.lock() = true;
        let check = DashboardService::check_upstream(&state, &session).await;
        assert_eq!(check.movers_count, 0);
        assert!(check.movers_error.as_deref().unwrap().contains("Invalid Token"));
        assert!(state.is_broker_connected());
        assert!(state.get_last_error().is_none());
    }
}
