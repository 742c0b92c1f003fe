//! Core market data model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Put-call ratio used when no ratio is known
pub const NEUTRAL_PCR: f64 = 1.0;

/// One upstream market item as delivered by the broker feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    /// Exchange trading symbol, possibly carrying expiry and instrument suffixes
    pub trading_symbol: String,
    pub percent_change: f64,
    pub oi_change: f64,
    pub pcr: Option<f64>,
}

impl RawQuote {
    pub fn new(trading_symbol: impl Into<String>, percent_change: f64, oi_change: f64) -> Self {
        Self {
            trading_symbol: trading_symbol.into(),
            percent_change,
            oi_change,
            pcr: None,
        }
    }

    pub fn with_pcr(mut self, pcr: f64) -> Self {
        self.pcr = Some(pcr);
        self
    }
}

/// A raw quote resolved to a canonical constituent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedQuote {
    pub symbol: String,
    /// Index weight in percent
    pub weight: f64,
    pub percent_change: f64,
    pub oi_change: f64,
    pub pcr: Option<f64>,
}

impl MatchedQuote {
    pub fn pcr_or_neutral(&self) -> f64 {
        self.pcr.unwrap_or(NEUTRAL_PCR)
    }

    /// Weighted contribution to the index, in percentage points
    pub fn impact(&self) -> f64 {
        (self.percent_change * self.weight) / 100.0
    }
}

/// Sentiment derived from weighted price impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OiSentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl OiSentiment {
    pub fn label(&self) -> &'static str {
        match self {
            OiSentiment::Bullish => "Bullish",
            OiSentiment::Neutral => "Neutral",
            OiSentiment::Bearish => "Bearish",
        }
    }
}

/// Sentiment derived from the weighted put-call ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PcrSentiment {
    #[serde(rename = "Very Bullish")]
    VeryBullish,
    Bullish,
    Cautious,
    Bearish,
    /// No quote carried a ratio
    Unavailable,
}

impl PcrSentiment {
    pub fn label(&self) -> &'static str {
        match self {
            PcrSentiment::VeryBullish => "Very Bullish",
            PcrSentiment::Bullish => "Bullish",
            PcrSentiment::Cautious => "Cautious",
            PcrSentiment::Bearish => "Bearish",
            PcrSentiment::Unavailable => "Unavailable",
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, PcrSentiment::VeryBullish | PcrSentiment::Bullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, PcrSentiment::Bearish)
    }
}

/// Final index sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "Strong Bullish")]
    StrongBullish,
    #[serde(rename = "Very Bullish")]
    VeryBullish,
    Bullish,
    Neutral,
    Bearish,
    #[serde(rename = "Strong Bearish")]
    StrongBearish,
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::StrongBullish => "Strong Bullish",
            Sentiment::VeryBullish => "Very Bullish",
            Sentiment::Bullish => "Bullish",
            Sentiment::Neutral => "Neutral",
            Sentiment::Bearish => "Bearish",
            Sentiment::StrongBearish => "Strong Bearish",
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(
            self,
            Sentiment::StrongBullish | Sentiment::VeryBullish | Sentiment::Bullish
        )
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Sentiment::Bearish | Sentiment::StrongBearish)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate sentiment for one index over one poll cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// gainers_impact - losers_impact
    pub net_impact: f64,
    pub gainers_impact: f64,
    /// Unsigned magnitude
    pub losers_impact: f64,
    pub weighted_pcr: f64,
    /// Total weight of distinct matched symbols
    pub coverage: f64,
    pub matched: usize,
    pub advancing: usize,
    pub declining: usize,
    pub oi_sentiment: OiSentiment,
    pub pcr_sentiment: PcrSentiment,
    pub sentiment: Sentiment,
}
