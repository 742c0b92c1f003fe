//! Services Layer
//!
//! Business logic shared between the background refresh task and the HTTP
//! handlers.
//!
//! # Architecture
//!
//! ```text
//! RefreshScheduler ──┐
//!                    ├──> DashboardService --> MarketDataService --> Broker
//! HTTP handlers ─────┘                     └─> SentimentService  --> market core
//! ```
//!
//! # Services
//!
//! - `MarketDataService` - Fetch movers and put-call ratios
//! - `SentimentService` - Match and aggregate one index
//! - `DashboardService` - Full poll cycle, snapshot storage, upstream check

pub mod dashboard_service;
pub mod market_data_service;
pub mod sentiment_service;

pub use dashboard_service::{DashboardService, DashboardSnapshot, PriceCheck, UpstreamCheck};
pub use market_data_service::{MarketDataService, MarketFeed};
pub use sentiment_service::{ConstituentRow, IndexReport, SentimentService};
