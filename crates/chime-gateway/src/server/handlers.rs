//! HTTP and WebSocket handlers
//!
//! Authentication happens upstream; the authenticated user id arrives in the
//! `x-user-id` header and is trusted as-is.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chime_core::{
    EngineError, NotificationPage, PreferenceProfile, PreferenceUpdate, DEFAULT_PAGE_LIMIT,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::AppState;
use crate::consumers::LifecycleStats;
use crate::session::SessionHub;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Errors returned by HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or empty x-user-id header")]
    Unauthenticated,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Engine(e) => match e {
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
                EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                EngineError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Engine(e) => e.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = %status, error = %self, "[Gateway] Request failed");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// The caller, as identified by the upstream auth layer
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AuthenticatedUser(value.to_string()))
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub online_users: usize,
    pub sessions: usize,
    pub lifecycle: LifecycleStats,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("[Gateway] Health check");
    let registry = state.hub.registry();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        online_users: registry.online_count(),
        sessions: registry.session_count(),
        lifecycle: state.lifecycle.stats(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationPage>, ApiError> {
    let page = state
        .engine
        .list_notifications(
            &user_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;
    Ok(Json(page))
}

pub async fn unread_count(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let count = state.engine.get_unread_count(&user_id).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.engine.mark_as_read(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_as_read(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated_count = state.engine.mark_all_as_read(&user_id).await?;
    Ok(Json(json!({ "updatedCount": updated_count })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_notification(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_preferences(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<PreferenceProfile>, ApiError> {
    let profile = state.engine.preferences().get_profile(&user_id).await?;
    Ok(Json(profile))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(update): Json<PreferenceUpdate>,
) -> Result<Json<PreferenceProfile>, ApiError> {
    let profile = state
        .engine
        .preferences()
        .update_profile(&user_id, update)
        .await?;
    Ok(Json(profile))
}

pub async fn reset_preferences(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<PreferenceProfile>, ApiError> {
    let profile = state
        .engine
        .preferences()
        .reset_to_defaults(&user_id)
        .await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteUserRequest {
    pub user_id: String,
    #[serde(default = "default_mute")]
    pub mute: bool,
}

#[derive(Debug, Deserialize)]
pub struct MuteKeywordRequest {
    pub keyword: String,
    #[serde(default = "default_mute")]
    pub mute: bool,
}

fn default_mute() -> bool {
    true
}

pub async fn mute_user(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<MuteUserRequest>,
) -> Result<Json<PreferenceProfile>, ApiError> {
    let profile = state
        .engine
        .preferences()
        .toggle_mute_user(&user_id, &request.user_id, request.mute)
        .await?;
    Ok(Json(profile))
}

pub async fn mute_keyword(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<MuteKeywordRequest>,
) -> Result<Json<PreferenceProfile>, ApiError> {
    let profile = state
        .engine
        .preferences()
        .toggle_mute_keyword(&user_id, &request.keyword, request.mute)
        .await?;
    Ok(Json(profile))
}

/// Live session endpoint
pub async fn ws_upgrade(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(hub, user_id, socket))
}

async fn handle_socket(hub: Arc<SessionHub>, user_id: String, socket: WebSocket) {
    let session_id = Uuid::new_v4().to_string();
    let mut outbox = hub.connect(&session_id, &user_id).await;
    let (mut sink, mut stream) = socket.split();

    let writer_session = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        session_id = %writer_session,
                        error = %e,
                        "[Gateway] Failed to encode push message"
                    );
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let reader_hub = hub.clone();
    let reader_session = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => reader_hub.handle_text(&reader_session, text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.disconnect(&session_id);
}
