//! Market core
//!
//! Pure, synchronous building blocks shared by the poll cycle and the tests:
//!
//! - `constituents` - index weight tables
//! - `symbol_matcher` - trading symbol to constituent resolution
//! - `sentiment` - weighted impact / PCR aggregation and labelling
//!
//! Nothing in here performs I/O or holds shared state.

pub mod constituents;
pub mod sentiment;
pub mod symbol_matcher;
pub mod types;

pub use constituents::{load_tables, Constituent, ConstituentTable};
pub use sentiment::{aggregate, match_quotes};
pub use symbol_matcher::{match_symbol, SymbolMatcher};
pub use types::{
    MatchedQuote, OiSentiment, PcrSentiment, RawQuote, Sentiment, SentimentResult, NEUTRAL_PCR,
};
