//! Periodic poll cycle

use crate::services::DashboardService;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Runs a refresh immediately and then every `refresh_interval_secs`
pub struct RefreshScheduler {
    state: Arc<AppState>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        let interval = Duration::from_secs(state.config.refresh_interval_secs);
        Self { state, interval }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Refresh scheduler started, every {}s", self.interval.as_secs());

            let mut ticker = tokio::time::interval(self.interval);
            // A slow cycle pushes the next one back instead of bunching up
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }

    async fn tick(&self) {
        // Failures are already recorded on the state; the old snapshot stays up
        if let Err(e) = DashboardService::refresh(&self.state).await {
            warn!("Refresh failed: {}", e);
        }
    }
}
