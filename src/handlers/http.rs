//! HTTP handlers: health and room online list.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::auth::ConnectionAuthenticator;
use crate::error::AppError;
use crate::middleware::auth::AuthSession;
use crate::models::{RoomId, RoomJoinedPayload};
use crate::services::Realtime;

/// Shared application state for HTTP and WS.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: ConnectionAuthenticator,
    pub realtime: Realtime,
}

impl AppState {
    pub fn new(authenticator: ConnectionAuthenticator, realtime: Realtime) -> Self {
        Self {
            authenticator,
            realtime,
        }
    }

    pub fn authenticator(&self) -> &ConnectionAuthenticator {
        &self.authenticator
    }

    pub fn realtime(&self) -> &Realtime {
        &self.realtime
    }
}

/// GET /rooms/:room_id/online — who is in the room right now. Members only.
pub async fn room_online(
    State(state): State<AppState>,
    session: AuthSession,
    Path(room_id): Path<String>,
) -> Result<Json<RoomJoinedPayload>, AppError> {
    let room_id = RoomId::new(room_id);
    state
        .realtime()
        .membership
        .require_member(session.identity.user_id(), &room_id)
        .await?;
    let online_users = state.realtime().presence.list_online(&room_id).await;
    Ok(Json(RoomJoinedPayload {
        room_id,
        online_users,
    }))
}

/// GET /health — liveness probe.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let connections = state.realtime().presence.connection_count().await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "roomcast", "connections": connections })),
    )
}
