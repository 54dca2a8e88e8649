//! SQLite implementation of NotificationRepository.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chime_core::{
    DedupKey, MarkReadOutcome, Metadata, NotificationRecord, NotificationRepository,
    NotificationType, OwnershipViolation, PageRequest,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::time;
use crate::Database;

const SELECT_COLUMNS: &str = "id, notification_type, recipient_id, actor_id, target_ref, \
     is_read, read_at, metadata, created_at, deleted_at";

/// SQLite-backed notification ledger.
pub struct SqliteNotificationRepository {
    db: Arc<Mutex<Database>>,
}

impl SqliteNotificationRepository {
    /// Create a new SQLite notification repository.
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<NotificationRecord> {
        let id_str: String = row.get(0)?;
        let type_str: String = row.get(1)?;
        let metadata_json: String = row.get(7)?;

        let notification_type = NotificationType::parse(&type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown notification type '{}'", type_str).into(),
            )
        })?;

        let metadata: Metadata = serde_json::from_str(&metadata_json).unwrap_or_else(|e| {
            tracing::warn!(
                "[NotificationRepository] Bad metadata on notification {}: {}",
                id_str,
                e
            );
            Metadata::new()
        });

        Ok(NotificationRecord {
            id: id_str.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            notification_type,
            recipient_id: row.get(2)?,
            actor_id: row.get(3)?,
            target_ref: row.get(4)?,
            read: row.get::<_, i32>(5)? == 1,
            read_at: row.get::<_, Option<String>>(6)?.map(|s| time::decode(&s)),
            created_at: time::decode(&row.get::<_, String>(8)?),
            deleted_at: row.get::<_, Option<String>>(9)?.map(|s| time::decode(&s)),
            metadata,
        })
    }

    /// Owner and read flag of a visible notification.
    fn visible_state(
        conn: &rusqlite::Connection,
        id: &Uuid,
    ) -> Result<Option<(String, bool)>> {
        Ok(conn
            .query_row(
                "SELECT recipient_id, is_read FROM notifications
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![id.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)? == 1)),
            )
            .optional()?)
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    async fn append(&self, record: &NotificationRecord) -> Result<NotificationRecord> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let metadata =
            serde_json::to_string(&record.metadata).context("Failed to encode metadata")?;

        conn.execute(
            "INSERT INTO notifications
                (id, notification_type, recipient_id, actor_id, target_ref,
                 is_read, read_at, metadata, created_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id.to_string(),
                record.notification_type.as_str(),
                record.recipient_id,
                record.actor_id,
                record.target_ref,
                if record.read { 1 } else { 0 },
                record.read_at.as_ref().map(time::encode),
                metadata,
                time::encode(&record.created_at),
                record.deleted_at.as_ref().map(time::encode),
            ],
        )?;

        tracing::debug!(
            "[NotificationRepository] Appended {} notification {} for {}",
            record.notification_type,
            record.id,
            record.recipient_id
        );

        Ok(record.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<NotificationRecord>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let sql = format!(
            "SELECT {} FROM notifications WHERE id = ?1 AND deleted_at IS NULL",
            SELECT_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![id.to_string()], Self::row_to_record)
            .optional()?;

        Ok(record)
    }

    async fn find_recent(
        &self,
        key: &DedupKey,
        since: DateTime<Utc>,
    ) -> Result<Option<NotificationRecord>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let sql = format!(
            "SELECT {} FROM notifications
             WHERE recipient_id = ?1 AND actor_id = ?2 AND notification_type = ?3
               AND target_ref IS ?4 AND created_at >= ?5 AND deleted_at IS NULL
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
            SELECT_COLUMNS
        );
        let record = conn
            .query_row(
                &sql,
                params![
                    key.recipient_id,
                    key.actor_id,
                    key.notification_type.as_str(),
                    key.target_ref,
                    time::encode(&since),
                ],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    async fn list_by_recipient(
        &self,
        recipient_id: &str,
        page: PageRequest,
    ) -> Result<(Vec<NotificationRecord>, u64)> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND deleted_at IS NULL",
            params![recipient_id],
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM notifications
             WHERE recipient_id = ?1 AND deleted_at IS NULL
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2 OFFSET ?3",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![recipient_id, i64::from(page.limit), page.offset() as i64],
                Self::row_to_record,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((records, total.max(0) as u64))
    }

    async fn mark_read(&self, recipient_id: &str, id: &Uuid) -> Result<MarkReadOutcome> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let Some((owner, is_read)) = Self::visible_state(conn, id)? else {
            return Ok(MarkReadOutcome::NotFound);
        };
        if owner != recipient_id {
            return Err(OwnershipViolation {
                notification_id: *id,
            }
            .into());
        }
        if is_read {
            return Ok(MarkReadOutcome::AlreadyRead);
        }

        conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = ?2 WHERE id = ?1 AND is_read = 0",
            params![id.to_string(), time::encode(&Utc::now())],
        )?;

        Ok(MarkReadOutcome::Marked)
    }

    async fn mark_all_read(&self, recipient_id: &str) -> Result<u64> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1, read_at = ?2
             WHERE recipient_id = ?1 AND is_read = 0 AND deleted_at IS NULL",
            params![recipient_id, time::encode(&Utc::now())],
        )?;

        Ok(updated as u64)
    }

    async fn unread_count(&self, recipient_id: &str) -> Result<u64> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications
             WHERE recipient_id = ?1 AND is_read = 0 AND deleted_at IS NULL",
            params![recipient_id],
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }

    async fn soft_delete(&self, recipient_id: &str, id: &Uuid) -> Result<bool> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let Some((owner, _)) = Self::visible_state(conn, id)? else {
            return Ok(false);
        };
        if owner != recipient_id {
            return Err(OwnershipViolation {
                notification_id: *id,
            }
            .into());
        }

        let changed = conn.execute(
            "UPDATE notifications SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id.to_string(), time::encode(&Utc::now())],
        )?;

        Ok(changed > 0)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>, only_read: bool) -> Result<u64> {
        let db = self.db.lock().await;
        let conn = db.connection();

        // Soft-deleted rows are purged regardless of read state
        let sql = if only_read {
            "DELETE FROM notifications
             WHERE created_at < ?1 AND (is_read = 1 OR deleted_at IS NOT NULL)"
        } else {
            "DELETE FROM notifications WHERE created_at < ?1"
        };
        let deleted = conn.execute(sql, params![time::encode(&cutoff)])?;

        if deleted > 0 {
            tracing::info!(
                "[NotificationRepository] Purged {} notifications older than {}",
                deleted,
                cutoff
            );
        }

        Ok(deleted as u64)
    }
}
