//! Shared state handed to every HTTP and WebSocket handler

use std::sync::Arc;

use chime_core::NotificationEngine;

use crate::consumers::LifecycleLogger;
use crate::session::SessionHub;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<NotificationEngine>,
    pub hub: Arc<SessionHub>,
    pub lifecycle: Arc<LifecycleLogger>,
}
