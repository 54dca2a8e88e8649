//! SQLite implementation of PreferenceRepository.
//!
//! Channel toggles are stored as JSON objects, muted users and keywords in
//! child tables so the sets stay duplicate-free at the schema level.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chime_core::{
    ChannelToggles, DeliveryTiming, PreferenceProfile, PreferenceRepository, ProfileEdit,
};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::time;
use crate::Database;

/// SQLite-backed implementation of PreferenceRepository.
pub struct SqlitePreferenceRepository {
    db: Arc<Mutex<Database>>,
}

impl SqlitePreferenceRepository {
    /// Create a new SQLite preference repository.
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn load(conn: &Connection, user_id: &str) -> Result<Option<PreferenceProfile>> {
        let row = conn
            .query_row(
                "SELECT in_app, email, push, email_digest, delivery_timing, created_at, updated_at
                 FROM preference_profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i32>(3)? == 1,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((in_app, email, push, email_digest, timing, created_at, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(PreferenceProfile {
            user_id: user_id.to_string(),
            in_app: decode_toggles(&in_app).context("in_app toggles")?,
            email: decode_toggles(&email).context("email toggles")?,
            push: decode_toggles(&push).context("push toggles")?,
            email_digest,
            delivery_timing: DeliveryTiming::parse(&timing),
            muted_user_ids: Self::load_set(
                conn,
                "SELECT muted_user_id FROM preference_muted_users WHERE user_id = ?1",
                user_id,
            )?,
            muted_keywords: Self::load_set(
                conn,
                "SELECT keyword FROM preference_muted_keywords WHERE user_id = ?1",
                user_id,
            )?,
            created_at: time::decode(&created_at),
            updated_at: time::decode(&updated_at),
        }))
    }

    fn load_set(conn: &Connection, sql: &str, user_id: &str) -> Result<BTreeSet<String>> {
        let mut stmt = conn.prepare(sql)?;
        let values = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(values)
    }

    fn write(conn: &Connection, profile: &PreferenceProfile, replace: bool) -> Result<bool> {
        let verb = if replace {
            "INSERT OR REPLACE"
        } else {
            "INSERT OR IGNORE"
        };
        let sql = format!(
            "{} INTO preference_profiles
                (user_id, in_app, email, push, email_digest, delivery_timing, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            verb
        );
        let inserted = conn.execute(
            &sql,
            params![
                profile.user_id,
                serde_json::to_string(&profile.in_app)?,
                serde_json::to_string(&profile.email)?,
                serde_json::to_string(&profile.push)?,
                if profile.email_digest { 1 } else { 0 },
                profile.delivery_timing.as_str(),
                time::encode(&profile.created_at),
                time::encode(&profile.updated_at),
            ],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        // Sets are rewritten wholesale
        conn.execute(
            "DELETE FROM preference_muted_users WHERE user_id = ?1",
            params![profile.user_id],
        )?;
        conn.execute(
            "DELETE FROM preference_muted_keywords WHERE user_id = ?1",
            params![profile.user_id],
        )?;
        for muted in &profile.muted_user_ids {
            conn.execute(
                "INSERT OR IGNORE INTO preference_muted_users (user_id, muted_user_id) VALUES (?1, ?2)",
                params![profile.user_id, muted],
            )?;
        }
        for keyword in &profile.muted_keywords {
            conn.execute(
                "INSERT OR IGNORE INTO preference_muted_keywords (user_id, keyword) VALUES (?1, ?2)",
                params![profile.user_id, keyword],
            )?;
        }

        Ok(true)
    }
}

fn decode_toggles(json: &str) -> Result<ChannelToggles> {
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl PreferenceRepository for SqlitePreferenceRepository {
    async fn get(&self, user_id: &str) -> Result<Option<PreferenceProfile>> {
        let db = self.db.lock().await;
        Self::load(db.connection(), user_id)
    }

    async fn get_or_insert(&self, profile: &PreferenceProfile) -> Result<PreferenceProfile> {
        let db = self.db.lock().await;

        let stored = db.with_transaction(|conn| {
            if Self::write(conn, profile, false)? {
                tracing::debug!(
                    "[PreferenceRepository] Created default profile for {}",
                    profile.user_id
                );
            }
            Self::load(conn, &profile.user_id)
        })?;

        stored.with_context(|| format!("Profile for {} vanished after insert", profile.user_id))
    }

    async fn modify(
        &self,
        user_id: &str,
        edit: ProfileEdit,
    ) -> Result<(PreferenceProfile, bool)> {
        // One lock hold and one transaction for the whole read-modify-write
        let db = self.db.lock().await;
        db.with_transaction(|conn| {
            let mut profile = match Self::load(conn, user_id)? {
                Some(profile) => profile,
                None => PreferenceProfile::new_default(user_id),
            };
            let changed = edit(&mut profile);
            if changed {
                Self::write(conn, &profile, true)?;
            }
            Ok((profile, changed))
        })
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "DELETE FROM preference_profiles WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }
}
