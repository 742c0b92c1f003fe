//! Background tasks
//!
//! - Poll cycle every `refresh_interval_secs`
//! - Broker session reset at 3:00 AM IST

mod refresh;
mod session_reset;

pub use refresh::RefreshScheduler;
pub use session_reset::SessionResetScheduler;
