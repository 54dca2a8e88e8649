//! Gateway Server
//!
//! HTTP + WebSocket surface over the notification engine. All external
//! collaborators are injected through `GatewayDependencies`, so the same
//! server runs against SQLite in production and in-memory mocks in tests.

mod handlers;
mod state;

pub use handlers::{ApiError, AuthenticatedUser, USER_ID_HEADER};
pub use state::AppState;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chime_core::{
    EngineBuilder, EventBus, NotificationEngine, NotificationRepository,
    PermissiveTargetResolver, PermissiveUserDirectory, PreferenceRepository, TargetResolver,
    UserDirectory,
};
use chime_storage::{Database, SqliteNotificationRepository, SqlitePreferenceRepository};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::consumers::LifecycleLogger;
use crate::dispatcher::FanoutDispatcher;
use crate::presence::{ChannelTransport, PresenceRegistry};
use crate::retention::RetentionSweeper;
use crate::session::SessionHub;

/// External collaborators the gateway needs
#[derive(Clone)]
pub struct GatewayDependencies {
    pub ledger: Arc<dyn NotificationRepository>,
    pub preference_repo: Arc<dyn PreferenceRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub targets: Arc<dyn TargetResolver>,
}

impl GatewayDependencies {
    /// SQLite-backed ledger and preferences, permissive user/target lookups
    pub fn sqlite(db: Arc<Mutex<Database>>) -> Self {
        Self {
            ledger: Arc::new(SqliteNotificationRepository::new(db.clone())),
            preference_repo: Arc::new(SqlitePreferenceRepository::new(db)),
            users: Arc::new(PermissiveUserDirectory),
            targets: Arc::new(PermissiveTargetResolver),
        }
    }

    pub fn with_user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = users;
        self
    }

    pub fn with_target_resolver(mut self, targets: Arc<dyn TargetResolver>) -> Self {
        self.targets = targets;
        self
    }
}

/// Chime Gateway Server
///
/// Owns the process-wide services: event bus, presence registry, session
/// transport, fan-out dispatcher, engine and session hub.
pub struct GatewayServer {
    config: ServerConfig,
    event_bus: Arc<EventBus>,
    registry: Arc<PresenceRegistry>,
    state: AppState,
}

impl GatewayServer {
    pub fn new(config: ServerConfig, dependencies: GatewayDependencies) -> anyhow::Result<Self> {
        info!("[Gateway] Initializing services...");

        let event_bus = Arc::new(EventBus::with_capacity(config.event_bus_capacity));
        let registry = Arc::new(PresenceRegistry::new());
        let transport = Arc::new(ChannelTransport::new(config.outbox_capacity));

        let dispatcher = Arc::new(FanoutDispatcher::new(
            registry.clone(),
            transport.clone(),
            dependencies.ledger.clone(),
        ));

        let engine = Arc::new(
            EngineBuilder::new()
                .with_event_bus(event_bus.clone())
                .with_ledger(dependencies.ledger)
                .with_preference_repo(dependencies.preference_repo)
                .with_user_directory(dependencies.users)
                .with_target_resolver(dependencies.targets)
                .with_delivery(dispatcher)
                .with_config(config.engine.clone())
                .build()?,
        );

        let hub = Arc::new(SessionHub::new(
            engine.clone(),
            registry.clone(),
            transport,
            event_bus.sender(),
        ));

        let state = AppState {
            engine,
            hub,
            lifecycle: Arc::new(LifecycleLogger::new()),
        };

        info!("[Gateway] Services initialized successfully");

        Ok(Self {
            config,
            event_bus,
            registry,
            state,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Entry point for engagement subsystems (`create_notification`, ...)
    pub fn engine(&self) -> Arc<NotificationEngine> {
        self.state.engine.clone()
    }

    pub fn session_hub(&self) -> Arc<SessionHub> {
        self.state.hub.clone()
    }

    pub fn presence(&self) -> Arc<PresenceRegistry> {
        self.registry.clone()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn lifecycle(&self) -> Arc<LifecycleLogger> {
        self.state.lifecycle.clone()
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/ws", get(handlers::ws_upgrade))
            .route("/notifications", get(handlers::list_notifications))
            .route("/notifications/unread-count", get(handlers::unread_count))
            .route("/notifications/read-all", post(handlers::mark_all_as_read))
            .route("/notifications/{id}/read", post(handlers::mark_as_read))
            .route(
                "/notifications/{id}",
                axum::routing::delete(handlers::delete_notification),
            )
            .route(
                "/preferences",
                get(handlers::get_preferences).patch(handlers::update_preferences),
            )
            .route("/preferences/reset", post(handlers::reset_preferences))
            .route("/preferences/muted-users", post(handlers::mute_user))
            .route("/preferences/muted-keywords", post(handlers::mute_keyword))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Start background consumers and the retention sweeper
    fn start_background_tasks(&self) {
        self.state
            .lifecycle
            .clone()
            .start(self.event_bus.subscribe());
        info!("[Gateway] LifecycleLogger started (listening to DomainEvents)");

        match self.config.retention() {
            Some(retention) => {
                let sweeper = Arc::new(RetentionSweeper::new(
                    self.state.engine.clone(),
                    retention,
                    self.config.sweep_interval,
                ));
                sweeper.start();
            }
            None => info!("[Gateway] Retention sweeper disabled"),
        }
    }

    /// Run the gateway server until the listener fails
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.addr()?;
        info!("[Gateway] Starting on {}", addr);

        self.start_background_tasks();

        let router = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("[Gateway] Ready to accept connections");

        axum::serve(listener, router).await?;

        Ok(())
    }

    /// Start the server in the background
    ///
    /// Returns a JoinHandle that can be used to wait for completion or abort.
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
