//! Engine configuration

use std::time::Duration;

/// Trailing window in which an identical event is treated as the same notification
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Deadline for a single ledger append
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning knobs for the notification engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Dedup lookback window
    pub dedup_window: Duration,
    /// Ledger write deadline; the create call fails when exceeded
    pub write_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }
}
