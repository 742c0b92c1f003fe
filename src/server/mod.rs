//! Dashboard and REST API server
//!
//! Provides:
//! - HTML dashboard (/)
//! - JSON snapshot and forced refresh (/api/v1/*)
//! - Health check and connection diagnostics

pub mod handlers;
pub mod rate_limiter;
pub mod render;
mod router;
mod types;

pub use router::{build_router, serve};
pub use types::{ApiResponse, DebugInfo, Empty, SentimentData};
