//! Session Hub - connection lifecycle and the client command protocol
//!
//! The socket layer calls `connect` when a client's connection is accepted,
//! `handle_text` for each inbound frame, and `disconnect` when it closes.
//! Command replies go to the issuing session only; read and delete
//! confirmations are broadcast by the engine to all of the user's sessions.

use std::sync::Arc;

use chime_core::{
    DomainEvent, EngineError, EngineResult, EventSender, NotificationEngine, DEFAULT_PAGE_LIMIT,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::presence::{ChannelTransport, PresenceRegistry, SessionTransport};
use crate::protocol::{ClientCommand, PushMessage};

pub struct SessionHub {
    engine: Arc<NotificationEngine>,
    registry: Arc<PresenceRegistry>,
    transport: Arc<ChannelTransport>,
    event_sender: EventSender,
}

impl SessionHub {
    pub fn new(
        engine: Arc<NotificationEngine>,
        registry: Arc<PresenceRegistry>,
        transport: Arc<ChannelTransport>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            engine,
            registry,
            transport,
            event_sender,
        }
    }

    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    /// Register the session and open its outbox
    ///
    /// The current unread count is queued as the first message so the
    /// client can render its badge without a round trip.
    ///
    /// Emits: `SessionConnected` (and `SessionDisconnected` for a displaced user)
    pub async fn connect(&self, session_id: &str, user_id: &str) -> mpsc::Receiver<PushMessage> {
        let outbox = self.transport.open(session_id);

        if let Some(previous_user) = self.registry.register(session_id, user_id) {
            self.event_sender.emit(DomainEvent::SessionDisconnected {
                user_id: previous_user,
                session_id: session_id.to_string(),
            });
        }
        self.event_sender.emit(DomainEvent::SessionConnected {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        });

        match self.engine.get_unread_count(user_id).await {
            Ok(count) => self.reply(session_id, PushMessage::UnreadCount { count }),
            Err(e) => warn!(
                session_id = %session_id,
                user_id = %user_id,
                error = %e,
                "[SessionHub] Initial unread count failed"
            ),
        }

        info!(
            session_id = %session_id,
            user_id = %user_id,
            "[SessionHub] Session connected"
        );
        outbox
    }

    /// Tear down a session; no-op if it is unknown
    ///
    /// Emits: `SessionDisconnected`
    pub fn disconnect(&self, session_id: &str) {
        self.transport.close(session_id);

        if let Some(entry) = self.registry.unregister(session_id) {
            let connected_for = chrono::Utc::now() - entry.connected_at;
            info!(
                session_id = %session_id,
                user_id = %entry.user_id,
                connected_secs = connected_for.num_seconds(),
                "[SessionHub] Session disconnected"
            );
            self.event_sender.emit(DomainEvent::SessionDisconnected {
                user_id: entry.user_id,
                session_id: session_id.to_string(),
            });
        }
    }

    /// Parse and execute one inbound frame
    pub async fn handle_text(&self, session_id: &str, text: &str) {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => self.handle_command(session_id, command).await,
            Err(e) => {
                debug!(
                    session_id = %session_id,
                    error = %e,
                    "[SessionHub] Rejected malformed command"
                );
                self.reply(
                    session_id,
                    PushMessage::error("invalid_argument", format!("malformed command: {}", e)),
                );
            }
        }
    }

    pub async fn handle_command(&self, session_id: &str, command: ClientCommand) {
        let Some(user_id) = self.registry.user_for(session_id) else {
            warn!(
                session_id = %session_id,
                "[SessionHub] Command from unregistered session dropped"
            );
            return;
        };

        debug!(
            session_id = %session_id,
            user_id = %user_id,
            command = ?command,
            "[SessionHub] Handling command"
        );

        match self.execute(&user_id, command).await {
            Ok(Some(reply)) => self.reply(session_id, reply),
            Ok(None) => {}
            Err(e) => {
                if !matches!(e, EngineError::NotFound(_) | EngineError::InvalidArgument(_)) {
                    warn!(
                        session_id = %session_id,
                        user_id = %user_id,
                        error = %e,
                        "[SessionHub] Command failed"
                    );
                }
                self.reply(session_id, PushMessage::error(e.code(), e.to_string()));
            }
        }
    }

    async fn execute(
        &self,
        user_id: &str,
        command: ClientCommand,
    ) -> EngineResult<Option<PushMessage>> {
        match command {
            ClientCommand::MarkAsRead { notification_id } => {
                self.engine.mark_as_read(notification_id, user_id).await?;
                Ok(None)
            }
            ClientCommand::MarkAllAsRead => {
                self.engine.mark_all_as_read(user_id).await?;
                Ok(None)
            }
            ClientCommand::GetUnreadCount => {
                let count = self.engine.get_unread_count(user_id).await?;
                Ok(Some(PushMessage::UnreadCount { count }))
            }
            ClientCommand::ListNotifications { page, limit } => {
                let page = self
                    .engine
                    .list_notifications(
                        user_id,
                        page.unwrap_or(1),
                        limit.unwrap_or(DEFAULT_PAGE_LIMIT),
                    )
                    .await?;
                Ok(Some(page.into()))
            }
            ClientCommand::DeleteNotification { notification_id } => {
                self.engine
                    .delete_notification(notification_id, user_id)
                    .await?;
                Ok(None)
            }
        }
    }

    fn reply(&self, session_id: &str, message: PushMessage) {
        if let Err(e) = self.transport.push(session_id, message) {
            warn!(
                session_id = %session_id,
                error = %e,
                "[SessionHub] Reply dropped"
            );
        }
    }
}
