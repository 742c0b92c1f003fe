//! Daily broker session reset
//!
//! Drops the broker session at 3:00 AM IST every day. Angel One tokens are
//! only valid until the next trading day, and 3:00 AM is well outside market
//! hours (9:15 AM - 3:30 PM IST), so the next poll cycle logs in fresh.

use crate::state::AppState;
use chrono::{DateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Asia::Kolkata;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

const RESET_HOUR_IST: u32 = 3;
const SECS_PER_DAY: u64 = 24 * 3600;

/// Session reset scheduler that runs at 3:00 AM IST
pub struct SessionResetScheduler {
    state: Arc<AppState>,
}

impl SessionResetScheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Duration from `now` until the next 3:00 AM IST
    pub fn duration_until_reset<Tz: TimeZone>(now: DateTime<Tz>) -> Duration {
        let now_time = now.with_timezone(&Kolkata).time();
        let target = NaiveTime::from_hms_opt(RESET_HOUR_IST, 0, 0).unwrap_or(NaiveTime::MIN);

        let now_secs = now_time.num_seconds_from_midnight() as u64;
        let target_secs = target.num_seconds_from_midnight() as u64;

        let secs = if now_secs < target_secs {
            target_secs - now_secs
        } else {
            SECS_PER_DAY - now_secs + target_secs
        };

        Duration::from_secs(secs)
    }

    /// Spawn the scheduler on the tokio runtime
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Session reset scheduler started");

            loop {
                let duration = Self::duration_until_reset(chrono::Utc::now());
                info!(
                    "Next session reset in {} hours {} minutes",
                    duration.as_secs() / 3600,
                    (duration.as_secs() % 3600) / 60
                );

                tokio::time::sleep(duration).await;
                self.execute_reset();
            }
        })
    }

    fn execute_reset(&self) {
        if self.state.is_broker_connected() {
            info!("Clearing broker session at 3:00 AM IST");
            self.state.set_broker_session(None);
        } else {
            info!("No broker session to clear at 3:00 AM IST");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ist(h: u32, m: u32, s: u32) -> DateTime<chrono_tz::Tz> {
        Kolkata.with_ymd_and_hms(2024, 1, 25, h, m, s).unwrap()
    }

    #[test]
    fn test_before_reset_same_day() {
        assert_eq!(
            SessionResetScheduler::duration_until_reset(ist(1, 30, 0)),
            Duration::from_secs(90 * 60)
        );
    }

    #[test]
    fn test_after_reset_next_day() {
        assert_eq!(
            SessionResetScheduler::duration_until_reset(ist(15, 30, 0)),
            Duration::from_secs((11 * 60 + 30) * 60)
        );
    }

    #[test]
    fn test_exactly_at_reset_waits_a_day() {
        assert_eq!(
            SessionResetScheduler::duration_until_reset(ist(3, 0, 0)),
            Duration::from_secs(SECS_PER_DAY)
        );
    }

    #[test]
    fn test_utc_input_is_converted() {
        // 21:00 UTC is 02:30 IST
        let now = Utc.with_ymd_and_hms(2024, 1, 24, 21, 0, 0).unwrap();
        assert_eq!(
            SessionResetScheduler::duration_until_reset(now),
            Duration::from_secs(30 * 60)
        );
    }

    #[test]
    fn test_reset_clears_session() {
        let state = Arc::new(AppState::new(crate::config::AppConfig::default()).unwrap());
        state.set_broker_session(Some(crate::state::BrokerSession {
            broker_id: "sample".to_string(),
            auth_token: "token".to_string(),
            feed_token: None,
            user_id: String::new(),
            authenticated_at: Utc::now(),
        }));

        SessionResetScheduler::new(state.clone()).execute_reset();
        assert!(!state.is_broker_connected());
    }
}
