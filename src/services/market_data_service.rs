//! Market Data Service
//!
//! Pulls one poll cycle's movers and put-call ratios from the broker.

use crate::brokers::types::{ExpiryType, MoversKind, PcrItem};
use crate::brokers::MarketDataBroker;
use crate::error::Result;
use crate::market::{RawQuote, SymbolMatcher};
use std::collections::HashMap;
use tracing::info;

/// Movers lists requested every cycle
pub const MOVERS_FEEDS: [MoversKind; 2] = [MoversKind::PercOiGainers, MoversKind::PercOiLosers];

/// Raw upstream data for one poll cycle
#[derive(Debug, Clone, Default)]
pub struct MarketFeed {
    /// Movers from every requested list, in arrival order
    pub quotes: Vec<RawQuote>,
    pub pcr: Vec<PcrItem>,
}

impl MarketFeed {
    /// Quotes with the put-call ratio of the same constituent attached
    pub fn quotes_for(&self, matcher: &SymbolMatcher) -> Vec<RawQuote> {
        let mut ratios: HashMap<&str, f64> = HashMap::new();
        for item in &self.pcr {
            if !item.pcr.is_finite() {
                continue;
            }
            if let Some((symbol, _)) = matcher.find(&item.trading_symbol) {
                ratios.entry(symbol).or_insert(item.pcr);
            }
        }

        self.quotes
            .iter()
            .map(|quote| {
                let pcr = matcher
                    .find(&quote.trading_symbol)
                    .and_then(|(symbol, _)| ratios.get(symbol).copied());
                match pcr {
                    Some(pcr) if quote.pcr.is_none() => quote.clone().with_pcr(pcr),
                    _ => quote.clone(),
                }
            })
            .collect()
    }
}

/// Market data service for business logic
pub struct MarketDataService;

impl MarketDataService {
    /// Fetch the near-expiry OI movers lists and the PCR list
    pub async fn fetch(broker: &dyn MarketDataBroker, auth_token: &str) -> Result<MarketFeed> {
        let spacing = broker.min_request_interval();
        let mut feed = MarketFeed::default();

        for (i, kind) in MOVERS_FEEDS.iter().enumerate() {
            if i > 0 && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }
            let items = broker.get_movers(auth_token, *kind, ExpiryType::Near).await?;
            feed.quotes.extend(items.into_iter().map(RawQuote::from));
        }

        if !spacing.is_zero() {
            tokio::time::sleep(spacing).await;
        }
        feed.pcr = broker.get_put_call_ratio(auth_token).await?;

        info!(
            "MarketDataService::fetch - {} movers, {} PCR entries from {}",
            feed.quotes.len(),
            feed.pcr.len(),
            broker.name()
        );

        Ok(feed)
    }
}
