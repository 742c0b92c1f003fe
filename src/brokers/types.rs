//! Common broker market-data types

use crate::market::RawQuote;
use serde::{Deserialize, Deserializer, Serialize};

/// Brokers send numbers both as JSON numbers and as strings
fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleFloat {
        Float(f64),
        Int(i64),
        Str(String),
        Null,
    }

    match FlexibleFloat::deserialize(deserializer)? {
        FlexibleFloat::Float(f) => Ok(f),
        FlexibleFloat::Int(i) => Ok(i as f64),
        FlexibleFloat::Str(s) if s.trim().is_empty() => Ok(0.0),
        FlexibleFloat::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
        FlexibleFloat::Null => Ok(0.0),
    }
}

/// Market movers list to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoversKind {
    PercPriceGainers,
    PercPriceLosers,
    PercOiGainers,
    PercOiLosers,
}

impl MoversKind {
    /// Value of the `datatype` request field
    pub fn datatype(&self) -> &'static str {
        match self {
            MoversKind::PercPriceGainers => "PercPriceGainers",
            MoversKind::PercPriceLosers => "PercPriceLosers",
            MoversKind::PercOiGainers => "PercOIGainers",
            MoversKind::PercOiLosers => "PercOILosers",
        }
    }

    pub fn is_gainers(&self) -> bool {
        matches!(self, MoversKind::PercPriceGainers | MoversKind::PercOiGainers)
    }
}

/// Derivatives expiry to request movers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExpiryType {
    Near,
    Next,
    Far,
}

impl ExpiryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryType::Near => "NEAR",
            ExpiryType::Next => "NEXT",
            ExpiryType::Far => "FAR",
        }
    }
}

/// One row of a gainers/losers list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverItem {
    pub trading_symbol: String,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub percent_change: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub opn_interest: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub net_change_opn_interest: f64,
}

impl MoverItem {
    pub fn new(trading_symbol: &str, percent_change: f64, net_change_opn_interest: f64) -> Self {
        Self {
            trading_symbol: trading_symbol.to_string(),
            percent_change,
            opn_interest: 0.0,
            net_change_opn_interest,
        }
    }
}

impl From<MoverItem> for RawQuote {
    fn from(item: MoverItem) -> Self {
        RawQuote::new(
            item.trading_symbol,
            item.percent_change,
            item.net_change_opn_interest,
        )
    }
}

/// Put-call ratio for one underlying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcrItem {
    pub trading_symbol: String,
    #[serde(deserialize_with = "deserialize_flexible_f64")]
    pub pcr: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mover_item_from_broker_json() {
        let json = r#"{
            "tradingSymbol": "HDFCBANK25JAN24FUT",
            "percentChange": 20.02,
            "symbolToken": 55394,
            "opnInterest": "118386000",
            "netChangeOpnInterest": 19724700
        }"#;
        let item: MoverItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.trading_symbol, "HDFCBANK25JAN24FUT");
        assert_eq!(item.percent_change, 20.02);
        assert_eq!(item.opn_interest, 118386000.0);
        assert_eq!(item.net_change_opn_interest, 19724700.0);

        let quote: RawQuote = item.into();
        assert_eq!(quote.oi_change, 19724700.0);
        assert_eq!(quote.pcr, None);
    }

    #[test]
    fn test_mover_item_missing_numbers_default_to_zero() {
        let item: MoverItem =
            serde_json::from_str(r#"{"tradingSymbol": "SBIN25JAN24FUT", "percentChange": null}"#)
                .unwrap();
        assert_eq!(item.percent_change, 0.0);
        assert_eq!(item.net_change_opn_interest, 0.0);
    }

    #[test]
    fn test_pcr_item() {
        let item: PcrItem =
            serde_json::from_str(r#"{"pcr": "1.04", "tradingSymbol": "NIFTY25JAN24FUT"}"#).unwrap();
        assert_eq!(item.pcr, 1.04);
    }

    #[test]
    fn test_datatype_strings() {
        assert_eq!(MoversKind::PercOiGainers.datatype(), "PercOIGainers");
        assert_eq!(MoversKind::PercPriceLosers.datatype(), "PercPriceLosers");
        assert!(!MoversKind::PercOiLosers.is_gainers());
        assert_eq!(ExpiryType::Near.as_str(), "NEAR");
    }
}
