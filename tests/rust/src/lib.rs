//! Shared test utilities and fixtures for Chime integration tests.

pub use chime_core::{
    DomainEvent, NewNotification, NotificationRecord, NotificationType, PreferenceProfile,
};

pub use mocks::MockRepositories;

pub use harness::{drain_outbox, EngineHarness, GatewayHarness};

/// Event testing utilities
pub mod events {
    use chime_core::{DomainEvent, EventReceiver};
    use std::time::Duration;

    /// Everything already queued on the receiver, without waiting
    pub fn drain(rx: &mut EventReceiver) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the first event matching `predicate`
    pub async fn wait_for_event<F>(
        rx: &mut EventReceiver,
        timeout: Duration,
        predicate: F,
    ) -> Option<DomainEvent>
    where
        F: Fn(&DomainEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(event)) if predicate(&event) => return Some(event),
                Ok(Some(_)) => continue,
                Ok(None) => return None,
                Err(_) => return None,
            }
        }
    }

    /// Count events of a given type name (`notification_created`, ...)
    pub fn count_of(events: &[DomainEvent], type_name: &str) -> usize {
        events.iter().filter(|e| e.type_name() == type_name).count()
    }
}

/// Test fixture utilities
pub mod fixtures {
    use super::*;

    pub const ALICE: &str = "user-alice";
    pub const BOB: &str = "user-bob";
    pub const CAROL: &str = "user-carol";
    pub const DAVE: &str = "user-dave";

    /// Every user the mock directory knows about by default
    pub const USERS: [&str; 4] = [ALICE, BOB, CAROL, DAVE];

    pub const POST: &str = "post:1";
    pub const OTHER_POST: &str = "post:2";

    /// Targets the mock resolver knows about by default
    pub const TARGETS: [&str; 2] = [POST, OTHER_POST];

    /// `actor` liked `recipient`'s post
    pub fn like(recipient: &str, actor: &str) -> NewNotification {
        NewNotification::new(NotificationType::Like, recipient, actor).with_target(POST)
    }

    /// `actor` replied to `recipient` with `content`
    pub fn reply(recipient: &str, actor: &str, content: &str) -> NewNotification {
        NewNotification::new(NotificationType::Reply, recipient, actor)
            .with_target(POST)
            .with_content(content)
    }

    pub fn follow(recipient: &str, actor: &str) -> NewNotification {
        NewNotification::new(NotificationType::Follow, recipient, actor)
    }

    /// A stored record, for seeding repositories directly
    pub fn record(recipient: &str, actor: &str) -> NotificationRecord {
        like(recipient, actor).into_record()
    }

    /// Record created `age` ago
    pub fn aged_record(recipient: &str, actor: &str, age: chrono::Duration) -> NotificationRecord {
        let mut record = record(recipient, actor);
        record.created_at = chrono::Utc::now() - age;
        record
    }
}

/// Database test helpers
pub mod db {
    use chime_storage::{Database, DATABASE_FILE};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    /// Create a temporary database for testing
    pub struct TestDatabase {
        pub db: Database,
        _temp_dir: TempDir,
        db_path: PathBuf,
    }

    impl TestDatabase {
        /// Create a new test database in a temporary directory
        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db_path = temp_dir.path().join(DATABASE_FILE);
            let db = Database::open(&db_path).expect("Failed to open test database");
            Self {
                db,
                db_path,
                _temp_dir: temp_dir,
            }
        }

        /// Create an in-memory database for fast tests
        pub fn in_memory() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db = Database::open_in_memory().expect("Failed to open in-memory database");
            Self {
                db,
                db_path: PathBuf::new(),
                _temp_dir: temp_dir,
            }
        }

        /// Get the full database file path
        pub fn db_path(&self) -> &Path {
            &self.db_path
        }

        /// Shared handle as the repositories expect it
        ///
        /// The temp directory is returned alongside so file-backed
        /// databases outlive the handle.
        pub fn shared(self) -> (Arc<Mutex<Database>>, TempDir) {
            (Arc::new(Mutex::new(self.db)), self._temp_dir)
        }
    }

    impl Default for TestDatabase {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Async test helpers
pub mod async_helpers {
    use std::time::Duration;

    /// Default timeout for async operations in tests
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Run an async operation with the default timeout
    pub async fn with_timeout<F, T>(future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        tokio::time::timeout(DEFAULT_TIMEOUT, future)
            .await
            .expect("Operation timed out")
    }
}

/// Route engine and storage logs to the test output; honours `RUST_LOG`
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
