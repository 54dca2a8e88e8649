//! SQLite database handle and migration runner.
//!
//! Schema changes are plain SQL files under `migrations/`, applied in
//! version order. Every applied version is recorded in `schema_migrations`,
//! so reopening an existing file only runs what is new.
//!
//! Adding a migration: drop `NNN_description.sql` next to the others and
//! append an entry to `MIGRATIONS`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::{debug, info};

/// (version, name, sql)
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "initial",
    include_str!("migrations/001_initial.sql"),
)];

/// How long a statement waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Owned SQLite connection with the ledger schema applied.
///
/// Repositories share it as `Arc<tokio::sync::Mutex<Database>>`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create database directory {}", dir.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Cannot open database {}", path.display()))?;
        // WAL lets readers proceed while the ledger is being appended to
        conn.pragma_update(None, "journal_mode", "WAL")?;
        debug!(path = %path.display(), "[Database] Opened file");

        Self::init(conn)
    }

    /// Private in-memory database; used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("[Database] Opened in-memory");
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );",
        )?;

        let current = self.schema_version()?;
        let pending: Vec<_> = MIGRATIONS
            .iter()
            .filter(|(version, _, _)| *version > current)
            .collect();
        if pending.is_empty() {
            debug!(schema_version = current, "[Database] Schema up to date");
            return Ok(());
        }

        for (version, name, sql) in pending {
            self.with_transaction(|conn| {
                conn.execute_batch(sql)
                    .with_context(|| format!("Migration {} ({}) failed", version, name))?;
                conn.execute(
                    "INSERT INTO schema_migrations (version, name, applied_at)
                     VALUES (?1, ?2, datetime('now'))",
                    params![version, name],
                )?;
                Ok(())
            })?;
            info!(version, name, "[Database] Applied migration");
        }
        Ok(())
    }

    /// Highest applied migration version, 0 for a fresh file.
    pub fn schema_version(&self) -> Result<i64> {
        let version = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` atomically; any error rolls the whole closure back.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}
