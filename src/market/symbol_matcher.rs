//! Resolution of exchange trading symbols to index constituents
//!
//! Derivative feeds report symbols such as `RELIANCE25JAN24FUT` or
//! `LTIM25JAN245000CE`. The matcher finds the constituent ticker embedded in
//! such a symbol. Candidates are tried longest first so that `BAJAJFINSV`
//! wins over any shorter ticker it contains, and tickers of three characters
//! or fewer must be followed by a boundary so `LT` never matches inside `LTIM`.

use crate::market::constituents::ConstituentTable;
use regex::Regex;
use std::cmp::Reverse;
use std::sync::OnceLock;

/// Derivatives expiry suffix: `DDMMMYY`, optionally followed by the instrument type
pub const EXPIRY_SUFFIX_PATTERN: &str = r"^[0-9]{2}[A-Z]{3}[0-9]{2}(FUT|CE|PE)?";

/// Tickers up to this many characters need a boundary after them
pub const SHORT_SYMBOL_MAX_LEN: usize = 3;

fn expiry_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EXPIRY_SUFFIX_PATTERN).expect("valid expiry suffix pattern"))
}

/// Precomputed matcher for one constituent table
#[derive(Debug, Clone)]
pub struct SymbolMatcher {
    /// (symbol, weight), longest first, ties in table order
    candidates: Vec<(String, f64)>,
}

impl SymbolMatcher {
    pub fn new(table: &ConstituentTable) -> Self {
        let mut candidates: Vec<(String, f64)> = table
            .iter()
            .map(|c| (c.symbol.to_uppercase(), c.weight))
            .collect();
        // sort_by_key is stable, which keeps table order among equal lengths
        candidates.sort_by_key(|(symbol, _)| Reverse(symbol.chars().count()));
        Self { candidates }
    }

    /// Find the constituent embedded in `trading_symbol`
    pub fn find(&self, trading_symbol: &str) -> Option<(&str, f64)> {
        let normalized = trading_symbol.trim().to_uppercase();
        if normalized.is_empty() {
            return None;
        }

        self.candidates
            .iter()
            .find(|(candidate, _)| Self::accepts(&normalized, candidate))
            .map(|(symbol, weight)| (symbol.as_str(), *weight))
    }

    fn accepts(normalized: &str, candidate: &str) -> bool {
        if candidate.chars().count() > SHORT_SYMBOL_MAX_LEN {
            return normalized.contains(candidate);
        }

        normalized
            .match_indices(candidate)
            .any(|(start, _)| is_boundary(&normalized[start + candidate.len()..]))
    }
}

/// What follows a short ticker must end it: nothing, a non-letter, or an expiry suffix
fn is_boundary(rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(c) if !c.is_alphabetic() => true,
        Some(_) => expiry_suffix().is_match(rest),
    }
}

/// Resolve a trading symbol against a table without keeping a matcher around
pub fn match_symbol(trading_symbol: &str, table: &ConstituentTable) -> Option<(String, f64)> {
    SymbolMatcher::new(table)
        .find(trading_symbol)
        .map(|(symbol, weight)| (symbol.to_string(), weight))
}
