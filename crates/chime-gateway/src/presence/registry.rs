//! Presence Registry - who is connected right now
//!
//! Two maps kept in lock-step:
//! - `session_id -> PresenceEntry { user_id, connected_at }`
//! - `user_id -> {session_id}`
//!
//! Both live behind a single `parking_lot::RwLock`, so a reader can never
//! observe a session in one map but not the other. No I/O happens while the
//! lock is held; callers take a snapshot and push outside it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// One live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub user_id: String,
    pub connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct Maps {
    sessions: HashMap<String, PresenceEntry>,
    users: HashMap<String, HashSet<String>>,
}

impl Maps {
    fn detach(&mut self, session_id: &str) -> Option<PresenceEntry> {
        let entry = self.sessions.remove(session_id)?;
        if let Some(set) = self.users.get_mut(&entry.user_id) {
            set.remove(session_id);
            if set.is_empty() {
                self.users.remove(&entry.user_id);
            }
        }
        Some(entry)
    }
}

/// In-memory, process-local presence registry
#[derive(Default)]
pub struct PresenceRegistry {
    maps: RwLock<Maps>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `session_id` to `user_id`
    ///
    /// A session already bound to a different user is detached from that
    /// user first. Returns the previous owner in that case.
    pub fn register(&self, session_id: &str, user_id: &str) -> Option<String> {
        let mut maps = self.maps.write();

        let bound_to = maps
            .sessions
            .get(session_id)
            .map(|entry| entry.user_id.clone());
        let previous = match bound_to {
            Some(current) if current == user_id => {
                debug!(
                    session_id = %session_id,
                    user_id = %user_id,
                    "[PresenceRegistry] Session already registered"
                );
                return None;
            }
            Some(_) => maps.detach(session_id).map(|entry| entry.user_id),
            None => None,
        };

        if let Some(prev_user) = &previous {
            warn!(
                session_id = %session_id,
                previous_user = %prev_user,
                user_id = %user_id,
                "[PresenceRegistry] Session re-bound to a different user"
            );
        }

        maps.sessions.insert(
            session_id.to_string(),
            PresenceEntry {
                user_id: user_id.to_string(),
                connected_at: Utc::now(),
            },
        );
        let sessions = maps.users.entry(user_id.to_string()).or_default();
        sessions.insert(session_id.to_string());
        let user_sessions = sessions.len();

        info!(
            session_id = %session_id,
            user_id = %user_id,
            user_sessions,
            online_users = maps.users.len(),
            "[PresenceRegistry] Registered session"
        );

        previous
    }

    /// Remove a session; no-op if unknown. Returns what was removed.
    pub fn unregister(&self, session_id: &str) -> Option<PresenceEntry> {
        let mut maps = self.maps.write();
        let removed = maps.detach(session_id);

        match &removed {
            Some(entry) => info!(
                session_id = %session_id,
                user_id = %entry.user_id,
                online_users = maps.users.len(),
                "[PresenceRegistry] Unregistered session"
            ),
            None => debug!(
                session_id = %session_id,
                "[PresenceRegistry] Unregister for unknown session ignored"
            ),
        }

        removed
    }

    /// Snapshot of a user's sessions
    pub fn sessions_for(&self, user_id: &str) -> HashSet<String> {
        self.maps
            .read()
            .users
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.maps.read().users.contains_key(user_id)
    }

    /// Number of users with at least one session
    pub fn online_count(&self) -> usize {
        self.maps.read().users.len()
    }

    pub fn session_count(&self) -> usize {
        self.maps.read().sessions.len()
    }

    pub fn user_for(&self, session_id: &str) -> Option<String> {
        self.maps
            .read()
            .sessions
            .get(session_id)
            .map(|entry| entry.user_id.clone())
    }

    pub fn entry(&self, session_id: &str) -> Option<PresenceEntry> {
        self.maps.read().sessions.get(session_id).cloned()
    }
}
