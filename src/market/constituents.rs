//! Index constituent tables
//!
//! A table maps canonical NSE tickers to their index weight in percent.
//! Tables are built once at startup and shared read-only.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One index constituent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub symbol: String,
    /// Weight in percent
    pub weight: f64,
    /// NSE equity token, used for last-price lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Constituent {
    pub fn new(symbol: &str, weight: f64, token: Option<&str>) -> Self {
        Self {
            symbol: symbol.to_string(),
            weight,
            token: token.map(str::to_string),
        }
    }
}

/// Immutable weight table for a single index
#[derive(Debug, Clone, PartialEq)]
pub struct ConstituentTable {
    name: String,
    constituents: Vec<Constituent>,
}

impl ConstituentTable {
    /// Build a validated table. Symbols are trimmed and upper-cased.
    pub fn new(name: impl Into<String>, entries: Vec<Constituent>) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        let mut constituents = Vec::with_capacity(entries.len());

        for entry in entries {
            let symbol = entry.symbol.trim().to_uppercase();
            if symbol.is_empty() {
                return Err(AppError::Validation(format!(
                    "{}: constituent symbol must not be empty",
                    name
                )));
            }
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(AppError::Validation(format!(
                    "{}: invalid weight {} for {}",
                    name, entry.weight, symbol
                )));
            }
            if !seen.insert(symbol.clone()) {
                return Err(AppError::Validation(format!(
                    "{}: duplicate constituent {}",
                    name, symbol
                )));
            }
            constituents.push(Constituent {
                symbol,
                weight: entry.weight,
                token: entry.token.filter(|t| !t.trim().is_empty()),
            });
        }

        Ok(Self { name, constituents })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, symbol: &str) -> Option<&Constituent> {
        self.constituents
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn weight(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).map(|c| c.weight)
    }

    /// Constituents in table order
    pub fn iter(&self) -> impl Iterator<Item = &Constituent> {
        self.constituents.iter()
    }

    pub fn len(&self) -> usize {
        self.constituents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.constituents.iter().map(|c| c.weight).sum()
    }

    /// NIFTY 50 weights
    pub fn nifty_50() -> Self {
        let entries = [
            ("RELIANCE", 9.37, Some("2885")),
            ("HDFCBANK", 11.50, Some("1333")),
            ("BHARTIARTL", 5.76, Some("10604")),
            ("TCS", 5.33, Some("11536")),
            ("ICICIBANK", 7.90, Some("4963")),
            ("SBIN", 4.03, Some("3045")),
            ("LT", 3.80, None),
            ("BAJFINANCE", 3.11, Some("16675")),
            ("INFY", 3.04, Some("1594")),
            ("HINDUNILVR", 3.01, Some("13611")),
            ("AXISBANK", 2.90, Some("5900")),
            ("KOTAKBANK", 2.70, Some("1922")),
            ("ITC", 2.57, Some("424")),
            ("M&M", 2.20, None),
            ("SUNPHARMA", 1.70, None),
            ("HCLTECH", 1.60, None),
            ("TATAMOTORS", 1.60, None),
            ("MARUTI", 1.50, None),
            ("NTPC", 1.50, None),
            ("TITAN", 1.20, None),
            ("POWERGRID", 1.20, None),
            ("ULTRACEMCO", 1.10, None),
            ("ASIANPAINT", 1.10, None),
            ("TATASTEEL", 1.10, None),
            ("ONGC", 0.95, None),
            ("BAJAJFINSV", 0.90, None),
            ("TECHM", 0.90, None),
            ("ADANIPORTS", 0.90, None),
            ("HINDALCO", 0.90, None),
            ("JSWSTEEL", 0.85, None),
            ("COALINDIA", 0.85, None),
            ("GRASIM", 0.85, None),
            ("BAJAJ-AUTO", 0.85, None),
            ("NESTLEIND", 0.80, None),
            ("CIPLA", 0.75, None),
            ("WIPRO", 0.70, None),
            ("DRREDDY", 0.70, None),
            ("EICHERMOT", 0.65, None),
            ("SBILIFE", 0.65, None),
            ("DMART", 0.60, None),
            ("APOLLOHOSP", 0.60, None),
            ("TATACONSUM", 0.60, None),
            ("INDUSINDBK", 0.60, None),
            ("ADANIENT", 0.60, None),
            ("LTIM", 0.60, None),
            ("BPCL", 0.55, None),
            ("BRITANNIA", 0.55, None),
            ("DIVISLAB", 0.50, None),
            ("HEROMOTOCO", 0.50, None),
            ("UPL", 0.35, None),
        ];
        Self::from_static("NIFTY 50", &entries)
    }

    /// Bank NIFTY weights
    pub fn bank_nifty() -> Self {
        let entries = [
            ("HDFCBANK", 32.06, Some("1333")),
            ("ICICIBANK", 21.20, Some("4963")),
            ("SBIN", 17.24, Some("3045")),
            ("KOTAKBANK", 8.87, Some("1922")),
            ("AXISBANK", 7.78, Some("5900")),
            ("INDUSINDBK", 3.20, None),
            ("BANKBARODA", 2.90, Some("4668")),
            ("FEDERALBNK", 1.95, None),
            ("IDFCFIRSTB", 1.60, None),
            ("PNB", 1.55, None),
            ("AUBANK", 1.20, None),
            ("BANDHANBNK", 0.85, None),
            ("RBLBANK", 0.50, None),
        ];
        Self::from_static("Bank NIFTY", &entries)
    }

    /// Built-in tables, broad market first
    pub fn defaults() -> Vec<Self> {
        vec![Self::nifty_50(), Self::bank_nifty()]
    }

    fn from_static(name: &str, entries: &[(&str, f64, Option<&str>)]) -> Self {
        // Built-in entries are already upper-cased and unique.
        Self {
            name: name.to_string(),
            constituents: entries
                .iter()
                .map(|(symbol, weight, token)| Constituent::new(symbol, *weight, *token))
                .collect(),
        }
    }
}

/// On-disk layout of a constituents file
#[derive(Debug, Deserialize)]
struct TablesFile {
    indices: Vec<IndexDefinition>,
}

#[derive(Debug, Deserialize)]
struct IndexDefinition {
    name: String,
    constituents: Vec<Constituent>,
}

/// Load constituent tables from a JSON file
pub fn load_tables(path: &Path) -> Result<Vec<ConstituentTable>> {
    let contents = std::fs::read_to_string(path)?;
    let file: TablesFile = serde_json::from_str(&contents)?;

    if file.indices.is_empty() {
        return Err(AppError::Config(format!(
            "No indices defined in {}",
            path.display()
        )));
    }

    let tables = file
        .indices
        .into_iter()
        .map(|index| ConstituentTable::new(index.name, index.constituents))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Loaded {} constituent tables from {}",
        tables.len(),
        path.display()
    );

    Ok(tables)
}
