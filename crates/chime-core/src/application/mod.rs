//! Application Services - orchestration layer with event emission
//!
//! ```text
//! Engagement subsystems / transport layer
//!         │
//!         ▼
//! ┌──────────────────────────────────────────┐
//! │ NotificationEngine                       │
//! │   ├─ PreferenceAppService (fail-open)    │
//! │   ├─ DedupGuard                          │
//! │   ├─ NotificationRepository (ledger)     │
//! │   └─ NotificationDelivery (fan-out)      │
//! │                │                         │
//! │                ▼                         │
//! │           Event Bus                      │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let engine = EngineBuilder::new()
//!     .with_event_bus(bus)
//!     .with_ledger(ledger)
//!     .with_preference_repo(prefs)
//!     .with_delivery(dispatcher)
//!     .build()?;
//!
//! let record = engine.create_notification(event).await?;
//! // -> Emits NotificationCreated when a new record was written
//! ```

mod dedup;
mod engine;
mod preference;

pub use dedup::DedupGuard;
pub use engine::{CreateOutcome, NotificationEngine};
pub use preference::PreferenceAppService;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::delivery::{NoopDelivery, NotificationDelivery};
use crate::event_bus::EventBus;
use crate::repository::*;

/// Builder wiring the engine and its preference service from shared dependencies
pub struct EngineBuilder {
    event_bus: Option<Arc<EventBus>>,
    ledger: Option<Arc<dyn NotificationRepository>>,
    preference_repo: Option<Arc<dyn PreferenceRepository>>,
    users: Option<Arc<dyn UserDirectory>>,
    targets: Option<Arc<dyn TargetResolver>>,
    delivery: Option<Arc<dyn NotificationDelivery>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            event_bus: None,
            ledger: None,
            preference_repo: None,
            users: None,
            targets: None,
            delivery: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_ledger(mut self, repo: Arc<dyn NotificationRepository>) -> Self {
        self.ledger = Some(repo);
        self
    }

    pub fn with_preference_repo(mut self, repo: Arc<dyn PreferenceRepository>) -> Self {
        self.preference_repo = Some(repo);
        self
    }

    /// Defaults to [`PermissiveUserDirectory`]
    pub fn with_user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    /// Defaults to [`PermissiveTargetResolver`]
    pub fn with_target_resolver(mut self, targets: Arc<dyn TargetResolver>) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Defaults to [`NoopDelivery`]
    pub fn with_delivery(mut self, delivery: Arc<dyn NotificationDelivery>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> anyhow::Result<NotificationEngine> {
        let event_bus = self
            .event_bus
            .ok_or_else(|| anyhow::anyhow!("Event bus required"))?;
        let ledger = self
            .ledger
            .ok_or_else(|| anyhow::anyhow!("Notification ledger required"))?;
        let preference_repo = self
            .preference_repo
            .ok_or_else(|| anyhow::anyhow!("Preference repository required"))?;
        let users = self
            .users
            .unwrap_or_else(|| Arc::new(PermissiveUserDirectory));
        let targets = self
            .targets
            .unwrap_or_else(|| Arc::new(PermissiveTargetResolver));
        let delivery = self.delivery.unwrap_or_else(|| Arc::new(NoopDelivery));

        let sender = event_bus.sender();
        let preferences = Arc::new(PreferenceAppService::new(
            preference_repo,
            users.clone(),
            sender.clone(),
        ));

        Ok(NotificationEngine::new(
            ledger,
            preferences,
            users,
            targets,
            delivery,
            sender,
            self.config,
        ))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
