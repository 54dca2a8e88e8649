//! Server configuration
//!
//! Read from `CHIME_*` environment variables. The binary loads `.env` first,
//! so a local file can override the defaults during development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chime_core::EngineConfig;

use crate::presence::DEFAULT_OUTBOX_CAPACITY;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4610;
pub const DEFAULT_RETENTION_DAYS: u32 = 90;
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Gateway + engine settings for one server process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Per-session outbox depth before pushes start failing
    pub outbox_capacity: usize,
    /// Lifecycle event bus depth before slow consumers lag
    pub event_bus_capacity: usize,
    /// Read notifications older than this are purged; 0 disables the sweeper
    pub retention_days: u32,
    pub sweep_interval: Duration,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_path: chime_storage::default_database_path()
                .unwrap_or_else(|| PathBuf::from(chime_storage::DATABASE_FILE)),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            event_bus_capacity: chime_core::event_bus::DEFAULT_CAPACITY,
            retention_days: DEFAULT_RETENTION_DAYS,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparseable values keep their default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let mut engine = defaults.engine.clone();
        if let Some(secs) = parse("CHIME_DEDUP_WINDOW_SECS") {
            engine = engine.with_dedup_window(Duration::from_secs(secs));
        }
        if let Some(ms) = parse("CHIME_WRITE_TIMEOUT_MS") {
            engine = engine.with_write_timeout(Duration::from_millis(ms.max(1)));
        }

        Self {
            host: lookup("CHIME_HOST").unwrap_or(defaults.host),
            port: parse("CHIME_PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(defaults.port),
            database_path: lookup("CHIME_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            outbox_capacity: parse("CHIME_OUTBOX_CAPACITY")
                .map(|v| v as usize)
                .unwrap_or(defaults.outbox_capacity)
                .max(1),
            event_bus_capacity: parse("CHIME_EVENT_BUS_CAPACITY")
                .map(|v| v as usize)
                .unwrap_or(defaults.event_bus_capacity)
                .max(1),
            retention_days: parse("CHIME_RETENTION_DAYS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.retention_days),
            sweep_interval: parse("CHIME_SWEEP_INTERVAL_SECS")
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or(defaults.sweep_interval),
            engine,
        }
    }

    /// Get the socket address
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", self.host, self.port, e))
    }

    /// Retention as a duration, `None` when disabled
    pub fn retention(&self) -> Option<Duration> {
        (self.retention_days > 0)
            .then(|| Duration::from_secs(u64::from(self.retention_days) * 24 * 60 * 60))
    }
}
