//! Sentiment Service
//!
//! Runs the symbol matcher and the aggregator for one index.

use crate::market::{
    aggregate, match_quotes, ConstituentTable, MatchedQuote, RawQuote, SentimentResult,
    SymbolMatcher,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One matched constituent as shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituentRow {
    #[serde(flatten)]
    pub quote: MatchedQuote,
    /// Weighted contribution in percentage points
    pub impact: f64,
    pub last_price: Option<f64>,
}

/// Sentiment for one index over one poll cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    pub index: String,
    pub result: SentimentResult,
    /// Sorted by absolute impact, largest first
    pub constituents: Vec<ConstituentRow>,
}

/// Sentiment service for business logic
pub struct SentimentService;

impl SentimentService {
    /// Evaluate one index against a cycle's quotes
    pub fn evaluate(table: &ConstituentTable, quotes: &[RawQuote]) -> IndexReport {
        let matcher = SymbolMatcher::new(table);
        let matched = match_quotes(quotes, &matcher);
        let result = aggregate(&matched);

        info!(
            "SentimentService::evaluate - {}: {} of {} quotes matched, net impact {:.3}, PCR {:.2}, {}",
            table.name(),
            matched.len(),
            quotes.len(),
            result.net_impact,
            result.weighted_pcr,
            result.sentiment
        );

        let mut constituents: Vec<ConstituentRow> = matched
            .into_iter()
            .map(|quote| ConstituentRow {
                impact: quote.impact(),
                quote,
                last_price: None,
            })
            .collect();
        constituents.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));

        IndexReport {
            index: table.name().to_string(),
            result,
            constituents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::types::MoverItem;
    use crate::market::{OiSentiment, Sentiment};

    #[test]
    fn test_evaluate_bank_nifty() {
        let quotes = vec![
            RawQuote::new("HDFCBANK25JAN24FUT", 3.0, 100.0).with_pcr(0.9),
            RawQuote::new("SBIN25JAN24FUT", -1.0, -50.0).with_pcr(0.9),
            RawQuote::new("TCS25JAN24FUT", 3.0, 10.0),
        ];
        let report = SentimentService::evaluate(&ConstituentTable::bank_nifty(), &quotes);

        assert_eq!(report.index, "Bank NIFTY");
        assert_eq!(report.result.matched, 2);
        assert_eq!(report.constituents[0].quote.symbol, "HDFCBANK");
        assert!((report.constituents[0].impact - 0.9618).abs() < 1e-9);
        // 0.9618 - 0.1724 is above the OI threshold and PCR 0.9 is bullish
        assert_eq!(report.result.sentiment, Sentiment::StrongBullish);
        assert!(report.constituents.iter().all(|row| row.last_price.is_none()));
    }

    #[test]
    fn test_no_quotes_is_neutral() {
        let report = SentimentService::evaluate(&ConstituentTable::nifty_50(), &[]);
        assert!(report.constituents.is_empty());
        assert_eq!(report.result.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_row_serializes_flat() {
        let report = SentimentService::evaluate(
            &ConstituentTable::nifty_50(),
            &[RawQuote::new("ITC25JAN24FUT", 1.0, 5.0)],
        );
        let json = serde_json::to_value(&report.constituents[0]).unwrap();
        assert_eq!(json["symbol"], "ITC");
        assert!(json["last_price"].is_null());
    }

    #[test]
    fn test_nan_change_does_not_poison_index() {
        let bad: MoverItem = serde_json::from_str(
            r#"{"tradingSymbol": "ITC25JAN24FUT", "percentChange": "NaN", "netChangeOpnInterest": 10}"#,
        )
        .unwrap();
        assert!(bad.percent_change.is_nan());

        let quotes = vec![
            RawQuote::new("RELIANCE25JAN24FUT", 8.0, 100.0).with_pcr(0.7),
            bad.into(),
        ];
        let report = SentimentService::evaluate(&ConstituentTable::nifty_50(), &quotes);

        assert_eq!(report.result.matched, 1);
        assert_eq!(report.result.losers_impact, 0.0);
        assert!((report.result.net_impact - 0.7496).abs() < 1e-9);
        assert_eq!(report.result.oi_sentiment, OiSentiment::Bullish);
        assert_eq!(report.result.sentiment, Sentiment::StrongBullish);

        let json = serde_json::to_value(&report.result).unwrap();
        assert!(json["net_impact"].is_number());
    }
}
