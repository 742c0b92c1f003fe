//! Offline sample market data
//!
//! Fixed, deterministic figures for demos and local development. Only used
//! when explicitly selected in configuration; never as a fallback.

use crate::brokers::types::*;
use crate::brokers::{AuthResponse, BrokerCredentials, MarketDataBroker};
use crate::error::Result;
use async_trait::async_trait;

const SAMPLE_EXPIRY: &str = "25JAN24FUT";

/// (symbol, % change, OI change, PCR, NSE token, last price)
const SAMPLE_ROWS: [(&str, f64, f64, f64, &str, f64); 13] = [
    ("RELIANCE", 2.45, 15000.0, 0.85, "2885", 1371.30),
    ("HDFCBANK", 1.82, 12000.0, 0.92, "1333", 1680.45),
    ("BHARTIARTL", -0.95, -8000.0, 1.15, "10604", 1623.80),
    ("TCS", 1.25, 6000.0, 0.78, "11536", 4156.25),
    ("ICICIBANK", 0.85, 4000.0, 0.88, "4963", 1298.70),
    ("SBIN", -1.25, -5000.0, 1.22, "3045", 891.65),
    ("BAJFINANCE", 3.15, 8000.0, 0.65, "16675", 7234.55),
    ("INFY", 0.65, 3000.0, 0.95, "1594", 1445.50),
    ("HINDUNILVR", -0.45, -2000.0, 1.08, "13611", 2387.90),
    ("ITC", 1.95, 7000.0, 0.72, "424", 456.75),
    ("KOTAKBANK", 2.45, 6000.0, 0.76, "1922", 1789.30),
    ("AXISBANK", -0.65, -3000.0, 1.18, "5900", 1198.85),
    ("BANKBARODA", 1.25, 2000.0, 0.95, "4668", 267.45),
];

/// Sample data broker
#[derive(Debug, Default, Clone)]
pub struct SampleBroker;

impl SampleBroker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MarketDataBroker for SampleBroker {
    fn id(&self) -> &'static str {
        "sample"
    }

    fn name(&self) -> &'static str {
        "Sample Data"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn authenticate(&self, credentials: BrokerCredentials) -> Result<AuthResponse> {
        Ok(AuthResponse {
            auth_token: "sample-session".to_string(),
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
        let mut items: Vec<MoverItem> = SAMPLE_ROWS
            .iter()
            .filter(|row| (row.1 > 0.0) == kind.is_gainers())
            .map(|&(symbol, change, oi_change, ..)| {
                MoverItem::new(&format!("{}{}", symbol, SAMPLE_EXPIRY), change, oi_change)
            })
            .collect();

        // Largest moves first, like the live lists
        items.sort_by(|a, b| b.percent_change.abs().total_cmp(&a.percent_change.abs()));
        Ok(items)
    }

    async fn get_put_call_ratio(&self, _auth_token: &str) -> Result<Vec<PcrItem>> {
        Ok(SAMPLE_ROWS
            .iter()
            .map(|&(symbol, _, _, pcr, ..)| PcrItem {
                trading_symbol: format!("{}{}", symbol, SAMPLE_EXPIRY),
                pcr,
            })
            .collect())
    }

    async fn get_last_price(
        &self,
        _auth_token: &str,
        _exchange: &str,
        token: &str,
    ) -> Result<Option<f64>> {
        Ok(SAMPLE_ROWS
            .iter()
            .find(|row| row.4 == token)
            .map(|row| row.5))
    }
}
