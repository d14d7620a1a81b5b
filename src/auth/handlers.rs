//! Auth HTTP handlers: logout.

use axum::{extract::State, Json};
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::middleware::auth::AuthSession;

/// POST /auth/logout — revoke the presented bearer token.
pub async fn logout(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .authenticator()
        .revoke(&session.token, session.expires_at)
        .await?;
    info!(user_id = %session.identity.user_id(), "logged out");
    Ok(Json(json!({ "ok": true })))
}
