//! Preference Application Service
//!
//! Owns preference profiles: lazy creation, merge updates, mute toggles,
//! reset, and the fail-open permission check used by the engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{
    normalize_keyword, Channel, DomainEvent, NotificationType, PermissionCheck, PreferenceProfile,
    PreferenceUpdate,
};
use crate::error::{EngineError, EngineResult};
use crate::event_bus::EventSender;
use crate::repository::{PreferenceRepository, UserDirectory};

/// Application service for preference profiles
pub struct PreferenceAppService {
    repo: Arc<dyn PreferenceRepository>,
    users: Arc<dyn UserDirectory>,
    event_sender: EventSender,
}

impl PreferenceAppService {
    pub fn new(
        repo: Arc<dyn PreferenceRepository>,
        users: Arc<dyn UserDirectory>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            repo,
            users,
            event_sender,
        }
    }

    /// Existing profile, or a freshly stored default one
    pub async fn get_profile(&self, user_id: &str) -> EngineResult<PreferenceProfile> {
        self.ensure_user(user_id).await?;
        self.load_or_create(user_id).await
    }

    async fn ensure_user(&self, user_id: &str) -> EngineResult<()> {
        if !self.users.user_exists(user_id).await? {
            return Err(EngineError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    /// Merge `update` into the profile
    ///
    /// Emits: `PreferencesUpdated`
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: PreferenceUpdate,
    ) -> EngineResult<PreferenceProfile> {
        self.ensure_user(user_id).await?;
        // Handles resolve before the edit so nothing awaits inside it
        let muted_users = if update.touches_muted_users() {
            Some(self.resolve_muted_users(user_id, &update).await?)
        } else {
            None
        };

        let (profile, _) = self
            .repo
            .modify(
                user_id,
                Box::new(move |profile: &mut PreferenceProfile| {
                    profile.apply(&update);
                    if let Some(muted) = muted_users {
                        profile.muted_user_ids = muted;
                    }
                    profile.updated_at = Utc::now();
                    true
                }),
            )
            .await?;

        info!(user_id = %user_id, "[PreferenceAppService] Updated profile");
        self.emit_updated(user_id);

        Ok(profile)
    }

    /// Idempotently add or remove a muted user
    ///
    /// Emits: `PreferencesUpdated` (only when the set changed)
    pub async fn toggle_mute_user(
        &self,
        user_id: &str,
        target_id: &str,
        mute: bool,
    ) -> EngineResult<PreferenceProfile> {
        if target_id == user_id {
            return Err(EngineError::InvalidArgument(
                "cannot mute yourself".to_string(),
            ));
        }
        if mute && !self.users.user_exists(target_id).await? {
            return Err(EngineError::NotFound(format!("user {}", target_id)));
        }
        self.ensure_user(user_id).await?;

        let target = target_id.to_string();
        let (profile, changed) = self
            .repo
            .modify(
                user_id,
                Box::new(move |profile: &mut PreferenceProfile| {
                    touch_if(profile.set_user_muted(&target, mute), profile)
                }),
            )
            .await?;

        if changed {
            info!(
                user_id = %user_id,
                target_id = %target_id,
                mute,
                "[PreferenceAppService] Toggled user mute"
            );
            self.emit_updated(user_id);
        }
        Ok(profile)
    }

    /// Idempotently add or remove a muted keyword
    ///
    /// Emits: `PreferencesUpdated` (only when the set changed)
    pub async fn toggle_mute_keyword(
        &self,
        user_id: &str,
        keyword: &str,
        mute: bool,
    ) -> EngineResult<PreferenceProfile> {
        let keyword = normalize_keyword(keyword)
            .ok_or_else(|| EngineError::InvalidArgument("keyword is empty".to_string()))?;
        self.ensure_user(user_id).await?;

        let edited = keyword.clone();
        let (profile, changed) = self
            .repo
            .modify(
                user_id,
                Box::new(move |profile: &mut PreferenceProfile| {
                    touch_if(profile.set_keyword_muted(&edited, mute), profile)
                }),
            )
            .await?;

        if changed {
            info!(
                user_id = %user_id,
                keyword = %keyword,
                mute,
                "[PreferenceAppService] Toggled keyword mute"
            );
            self.emit_updated(user_id);
        }
        Ok(profile)
    }

    /// Discard the stored profile and recreate the defaults
    ///
    /// Emits: `PreferencesUpdated`
    pub async fn reset_to_defaults(&self, user_id: &str) -> EngineResult<PreferenceProfile> {
        self.ensure_user(user_id).await?;

        self.repo.delete(user_id).await?;
        let profile = self
            .repo
            .get_or_insert(&PreferenceProfile::new_default(user_id))
            .await?;

        info!(user_id = %user_id, "[PreferenceAppService] Reset profile to defaults");
        self.emit_updated(user_id);

        Ok(profile)
    }

    /// In-app permission check used by the engine. Fails open.
    pub async fn is_allowed(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        actor_id: Option<&str>,
        content: Option<&str>,
    ) -> PermissionCheck {
        self.is_allowed_on_channel(user_id, Channel::InApp, notification_type, actor_id, content)
            .await
    }

    /// Permission check against an arbitrary channel. Fails open.
    pub async fn is_allowed_on_channel(
        &self,
        user_id: &str,
        channel: Channel,
        notification_type: NotificationType,
        actor_id: Option<&str>,
        content: Option<&str>,
    ) -> PermissionCheck {
        match self.load_or_create(user_id).await {
            Ok(profile) => {
                let check = profile.evaluate(channel, notification_type, actor_id, content);
                if let Some(reason) = check.reason {
                    debug!(
                        user_id = %user_id,
                        channel = channel.as_str(),
                        notification_type = %notification_type,
                        reason = reason.as_str(),
                        "[PreferenceAppService] Notification suppressed by preferences"
                    );
                }
                check
            }
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "[PreferenceAppService] Preference lookup failed, allowing notification"
                );
                PermissionCheck::allow()
            }
        }
    }

    async fn load_or_create(&self, user_id: &str) -> EngineResult<PreferenceProfile> {
        if let Some(profile) = self.repo.get(user_id).await? {
            return Ok(profile);
        }
        let profile = self
            .repo
            .get_or_insert(&PreferenceProfile::new_default(user_id))
            .await?;
        debug!(user_id = %user_id, "[PreferenceAppService] Created default profile");
        Ok(profile)
    }

    /// Union of explicit ids and resolved handles, minus the user themself
    async fn resolve_muted_users(
        &self,
        user_id: &str,
        update: &PreferenceUpdate,
    ) -> EngineResult<BTreeSet<String>> {
        let mut muted: BTreeSet<String> = update
            .muted_user_ids
            .iter()
            .flatten()
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .collect();

        if let Some(handles) = update.muted_handles.as_ref().filter(|h| !h.is_empty()) {
            let resolved = self.users.resolve_handles(handles).await?;
            for handle in handles {
                match resolved.get(handle) {
                    Some(id) => {
                        muted.insert(id.clone());
                    }
                    None => warn!(
                        user_id = %user_id,
                        handle = %handle,
                        "[PreferenceAppService] Dropping unresolvable muted handle"
                    ),
                }
            }
        }

        if muted.remove(user_id) {
            warn!(user_id = %user_id, "[PreferenceAppService] Ignoring self in muted users");
        }
        Ok(muted)
    }

    fn emit_updated(&self, user_id: &str) {
        self.event_sender.emit(DomainEvent::PreferencesUpdated {
            user_id: user_id.to_string(),
        });
    }
}

/// Bump `updated_at` when an edit changed the profile
fn touch_if(changed: bool, profile: &mut PreferenceProfile) -> bool {
    if changed {
        profile.updated_at = Utc::now();
    }
    changed
}
