//! Per-user notification preferences

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NotificationType;

/// Delivery channel a toggle applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InApp => "in_app",
            Self::Email => "email",
            Self::Push => "push",
        }
    }
}

/// When out-of-app channels deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTiming {
    #[default]
    Immediate,
    Digest,
    Off,
}

impl DeliveryTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Digest => "digest",
            Self::Off => "off",
        }
    }

    /// Lenient parse of the stored form; unknown values mean immediate
    pub fn parse(s: &str) -> Self {
        match s {
            "digest" => Self::Digest,
            "off" => Self::Off,
            _ => Self::Immediate,
        }
    }
}

/// One boolean per notification type for a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelToggles {
    pub like: bool,
    pub reply: bool,
    pub repost: bool,
    pub follow: bool,
    pub mention: bool,
    pub system: bool,
}

impl ChannelToggles {
    pub fn all(on: bool) -> Self {
        Self {
            like: on,
            reply: on,
            repost: on,
            follow: on,
            mention: on,
            system: on,
        }
    }

    /// Type → toggle table
    pub fn enabled(&self, notification_type: NotificationType) -> bool {
        match notification_type {
            NotificationType::Like => self.like,
            NotificationType::Reply => self.reply,
            NotificationType::Repost => self.repost,
            NotificationType::Follow => self.follow,
            NotificationType::Mention => self.mention,
            NotificationType::System => self.system,
        }
    }

    pub fn set(&mut self, notification_type: NotificationType, on: bool) {
        let slot = match notification_type {
            NotificationType::Like => &mut self.like,
            NotificationType::Reply => &mut self.reply,
            NotificationType::Repost => &mut self.repost,
            NotificationType::Follow => &mut self.follow,
            NotificationType::Mention => &mut self.mention,
            NotificationType::System => &mut self.system,
        };
        *slot = on;
    }
}

/// Why a notification was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    ActorMuted,
    KeywordMuted,
    TypeDisabled,
    DeliveryOff,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActorMuted => "actor_muted",
            Self::KeywordMuted => "keyword_muted",
            Self::TypeDisabled => "type_disabled",
            Self::DeliveryOff => "delivery_off",
        }
    }
}

/// Outcome of a preference check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl PermissionCheck {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Trim and lowercase a keyword; `None` if nothing is left
pub fn normalize_keyword(keyword: &str) -> Option<String> {
    let normalized = keyword.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// A user's notification preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceProfile {
    pub user_id: String,
    pub in_app: ChannelToggles,
    pub email: ChannelToggles,
    pub push: ChannelToggles,
    /// Receive the periodic email digest
    pub email_digest: bool,
    pub delivery_timing: DeliveryTiming,
    pub muted_user_ids: BTreeSet<String>,
    /// Stored normalized
    pub muted_keywords: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PreferenceProfile {
    /// Permissive defaults: in-app and push on, email only for system + digest
    pub fn new_default(user_id: impl Into<String>) -> Self {
        let mut email = ChannelToggles::all(false);
        email.set(NotificationType::System, true);
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            in_app: ChannelToggles::all(true),
            email,
            push: ChannelToggles::all(true),
            email_digest: true,
            delivery_timing: DeliveryTiming::Immediate,
            muted_user_ids: BTreeSet::new(),
            muted_keywords: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn toggles(&self, channel: Channel) -> &ChannelToggles {
        match channel {
            Channel::InApp => &self.in_app,
            Channel::Email => &self.email,
            Channel::Push => &self.push,
        }
    }

    pub fn toggles_mut(&mut self, channel: Channel) -> &mut ChannelToggles {
        match channel {
            Channel::InApp => &mut self.in_app,
            Channel::Email => &mut self.email,
            Channel::Push => &mut self.push,
        }
    }

    /// Returns true if the set changed
    pub fn set_user_muted(&mut self, target_id: &str, mute: bool) -> bool {
        if mute {
            self.muted_user_ids.insert(target_id.to_string())
        } else {
            self.muted_user_ids.remove(target_id)
        }
    }

    /// Returns true if the set changed. `keyword` must already be normalized.
    pub fn set_keyword_muted(&mut self, keyword: &str, mute: bool) -> bool {
        if mute {
            self.muted_keywords.insert(keyword.to_string())
        } else {
            self.muted_keywords.remove(keyword)
        }
    }

    pub fn is_actor_muted(&self, actor_id: &str) -> bool {
        self.muted_user_ids.contains(actor_id)
    }

    /// Case-insensitive substring match against muted keywords
    pub fn matches_muted_keyword(&self, content: &str) -> bool {
        if self.muted_keywords.is_empty() {
            return false;
        }
        let haystack = content.to_lowercase();
        self.muted_keywords
            .iter()
            .any(|keyword| haystack.contains(keyword.as_str()))
    }

    /// Evaluate mute rules, then the channel toggle
    ///
    /// Order: muted actor, muted keyword, disabled type. Out-of-app channels
    /// are additionally denied when delivery timing is off.
    pub fn evaluate(
        &self,
        channel: Channel,
        notification_type: NotificationType,
        actor_id: Option<&str>,
        content: Option<&str>,
    ) -> PermissionCheck {
        if actor_id.is_some_and(|actor| self.is_actor_muted(actor)) {
            return PermissionCheck::deny(DenyReason::ActorMuted);
        }
        if content.is_some_and(|text| self.matches_muted_keyword(text)) {
            return PermissionCheck::deny(DenyReason::KeywordMuted);
        }
        if !self.toggles(channel).enabled(notification_type) {
            return PermissionCheck::deny(DenyReason::TypeDisabled);
        }
        if channel != Channel::InApp && self.delivery_timing == DeliveryTiming::Off {
            return PermissionCheck::deny(DenyReason::DeliveryOff);
        }
        PermissionCheck::allow()
    }

    /// Merge the scalar and toggle fields of `update`
    ///
    /// Muted-user lists are applied by the preference service, which first
    /// resolves handles through the user directory.
    pub fn apply(&mut self, update: &PreferenceUpdate) {
        for (channel, changes) in [
            (Channel::InApp, &update.in_app),
            (Channel::Email, &update.email),
            (Channel::Push, &update.push),
        ] {
            if let Some(changes) = changes {
                let toggles = self.toggles_mut(channel);
                for (notification_type, on) in changes {
                    toggles.set(*notification_type, *on);
                }
            }
        }
        if let Some(email_digest) = update.email_digest {
            self.email_digest = email_digest;
        }
        if let Some(timing) = update.delivery_timing {
            self.delivery_timing = timing;
        }
        if let Some(keywords) = &update.muted_keywords {
            self.muted_keywords = keywords
                .iter()
                .filter_map(|k| normalize_keyword(k))
                .collect();
        }
    }
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app: Option<BTreeMap<NotificationType, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<BTreeMap<NotificationType, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<BTreeMap<NotificationType, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_digest: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_timing: Option<DeliveryTiming>,
    /// Replaces the muted set (together with `muted_handles`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted_user_ids: Option<Vec<String>>,
    /// Human-readable handles, resolved to ids before storing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted_handles: Option<Vec<String>>,
    /// Replaces the muted keyword set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted_keywords: Option<Vec<String>>,
}

impl PreferenceUpdate {
    pub fn touches_muted_users(&self) -> bool {
        self.muted_user_ids.is_some() || self.muted_handles.is_some()
    }
}
