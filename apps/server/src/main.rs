//! Chime Server
//!
//! Standalone process hosting the notification engine, the presence
//! registry and the HTTP/WebSocket gateway.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chime_gateway::{GatewayDependencies, GatewayServer, ServerConfig};
use chime_storage::Database;
use tokio::sync::Mutex;
use tracing::info;

const LOG_PREFIX: &str = "chime";

/// Get the logs directory path
///
/// - Linux: ~/.local/share/chime/logs/
/// - macOS: ~/Library/Application Support/chime/logs/
/// - Windows: %LOCALAPPDATA%/chime/logs/
fn get_logs_dir() -> PathBuf {
    std::env::var_os("CHIME_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("chime")
                .join("logs")
        })
}

/// Initialize tracing with console and file logging
///
/// - Console: colored, compact format
/// - File: daily rotation under the logs directory
fn init_tracing() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let logs_dir = get_logs_dir();
    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
    }

    // Creates files like: chime.2026-01-22.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)
        .context("Failed to create log file appender")?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG takes precedence over the defaults
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive("chime_core=debug".parse()?)
            .add_directive("chime_gateway=debug".parse()?)
            .add_directive("chime_storage=debug".parse()?)
            .add_directive("tower_http=info".parse()?),
    };

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Must be kept alive for the duration of the program
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    let _guard = init_tracing()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        logs = %get_logs_dir().display(),
        "[Chime] Starting"
    );

    let config = ServerConfig::from_env();
    info!(
        database = %config.database_path.display(),
        dedup_window_secs = config.engine.dedup_window.as_secs(),
        retention_days = config.retention_days,
        "[Chime] Configuration loaded"
    );

    let db = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    let db = Arc::new(Mutex::new(db));

    let server = GatewayServer::new(config, GatewayDependencies::sqlite(db))?;
    server.run().await
}
