//! Retention sweeper - periodic purge of old, read notifications

use std::sync::Arc;
use std::time::Duration;

use chime_core::{EngineResult, NotificationEngine};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct RetentionSweeper {
    engine: Arc<NotificationEngine>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(engine: Arc<NotificationEngine>, retention: Duration, interval: Duration) -> Self {
        Self {
            engine,
            retention,
            interval,
        }
    }

    /// Purge read notifications older than the retention window once
    pub async fn sweep_once(&self) -> EngineResult<u64> {
        self.engine.purge_expired(self.retention, true).await
    }

    /// Sweep at startup, then every `interval`
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                retention_days = self.retention.as_secs() / (24 * 60 * 60),
                interval_secs = self.interval.as_secs(),
                "[RetentionSweeper] Started"
            );

            // First tick fires immediately, so the startup sweep is the first iteration
            let mut interval = tokio::time::interval(self.interval);
            loop {
                interval.tick().await;
                match self.sweep_once().await {
                    Ok(n) if n > 0 => info!("[RetentionSweeper] Purged {} notification(s)", n),
                    Ok(_) => debug!("[RetentionSweeper] Nothing to purge"),
                    Err(e) => warn!("[RetentionSweeper] Sweep failed: {}", e),
                }
            }
        })
    }
}
