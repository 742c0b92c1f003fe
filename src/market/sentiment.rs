//! Weighted sentiment aggregation
//!
//! Turns one poll cycle's matched quotes into a net weighted impact, a
//! weighted put-call ratio and a combined sentiment label.

use crate::market::symbol_matcher::SymbolMatcher;
use crate::market::types::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Net impact above this (percentage points) is bullish
pub const OI_BULLISH_THRESHOLD: f64 = 0.5;
/// Net impact below this (percentage points) is bearish
pub const OI_BEARISH_THRESHOLD: f64 = -0.5;

pub const PCR_BEARISH_ABOVE: f64 = 1.2;
pub const PCR_CAUTIOUS_ABOVE: f64 = 1.0;
pub const PCR_BULLISH_ABOVE: f64 = 0.8;

impl OiSentiment {
    pub fn from_net_impact(net_impact: f64) -> Self {
        if net_impact > OI_BULLISH_THRESHOLD {
            OiSentiment::Bullish
        } else if net_impact < OI_BEARISH_THRESHOLD {
            OiSentiment::Bearish
        } else {
            OiSentiment::Neutral
        }
    }
}

impl PcrSentiment {
    pub fn from_pcr(pcr: f64) -> Self {
        if pcr > PCR_BEARISH_ABOVE {
            PcrSentiment::Bearish
        } else if pcr > PCR_CAUTIOUS_ABOVE {
            PcrSentiment::Cautious
        } else if pcr > PCR_BULLISH_ABOVE {
            PcrSentiment::Bullish
        } else {
            PcrSentiment::VeryBullish
        }
    }
}

impl Sentiment {
    /// Combine both factors. First matching rule wins.
    pub fn combine(oi: OiSentiment, pcr: PcrSentiment) -> Self {
        let oi_bullish = oi == OiSentiment::Bullish;
        let oi_bearish = oi == OiSentiment::Bearish;

        if oi_bullish && pcr.is_bullish() {
            Sentiment::StrongBullish
        } else if oi_bearish && pcr.is_bearish() {
            Sentiment::StrongBearish
        } else if pcr.is_bullish() {
            Sentiment::VeryBullish
        } else if oi_bullish {
            Sentiment::Bullish
        } else if oi_bearish || pcr.is_bearish() {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }
}

/// Aggregate one index's matched quotes
pub fn aggregate(quotes: &[MatchedQuote]) -> SentimentResult {
    let mut gainers_impact = 0.0;
    let mut losers_impact = 0.0;
    let mut advancing = 0;
    let mut declining = 0;

    let mut pcr_weighted_sum = 0.0;
    let mut pcr_weight_sum = 0.0;
    let mut pcr_samples = 0usize;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut coverage = 0.0;

    for quote in quotes {
        let impact = quote.impact();
        if quote.percent_change > 0.0 {
            gainers_impact += impact;
            advancing += 1;
        } else {
            losers_impact += impact.abs();
            declining += 1;
        }

        if let Some(pcr) = quote.pcr {
            pcr_weighted_sum += pcr * quote.weight;
            pcr_weight_sum += quote.weight;
            pcr_samples += 1;
        }

        if seen.insert(quote.symbol.as_str()) {
            coverage += quote.weight;
        }
    }

    let net_impact = gainers_impact - losers_impact;

    let (weighted_pcr, pcr_sentiment) = if pcr_samples > 0 && pcr_weight_sum > 0.0 {
        let pcr = pcr_weighted_sum / pcr_weight_sum;
        (pcr, PcrSentiment::from_pcr(pcr))
    } else {
        (NEUTRAL_PCR, PcrSentiment::Unavailable)
    };

    let oi_sentiment = OiSentiment::from_net_impact(net_impact);

    SentimentResult {
        net_impact,
        gainers_impact,
        losers_impact,
        weighted_pcr,
        coverage,
        matched: seen.len(),
        advancing,
        declining,
        oi_sentiment,
        pcr_sentiment,
        sentiment: Sentiment::combine(oi_sentiment, pcr_sentiment),
    }
}

/// Resolve raw quotes against a table. Unmatched quotes and quotes with a
/// non-finite change are dropped, and the first quote seen for a constituent
/// wins.
pub fn match_quotes(quotes: &[RawQuote], matcher: &SymbolMatcher) -> Vec<MatchedQuote> {
    let mut seen = HashSet::new();
    let mut matched = Vec::new();

    for raw in quotes {
        let Some((symbol, weight)) = matcher.find(&raw.trading_symbol) else {
            continue;
        };
        if !raw.percent_change.is_finite() || !raw.oi_change.is_finite() {
            warn!(
                "Skipping {}: non-finite change ({}%, OI {})",
                raw.trading_symbol, raw.percent_change, raw.oi_change
            );
            continue;
        }
        if !seen.insert(symbol.to_string()) {
            debug!("Skipping repeat quote for {} ({})", symbol, raw.trading_symbol);
            continue;
        }
        debug!(
            "Matched {} -> {} ({}%, weight {})",
            raw.trading_symbol, symbol, raw.percent_change, weight
        );
        matched.push(MatchedQuote {
            symbol: symbol.to_string(),
            weight,
            percent_change: raw.percent_change,
            oi_change: raw.oi_change,
            pcr: raw.pcr,
        });
    }

    matched
}
