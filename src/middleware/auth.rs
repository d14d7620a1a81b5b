//! Bearer-token extractor for authenticated HTTP routes.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::Identity;

/// Extractor: verified identity plus the raw token it came from.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    debug!("rejected request: missing bearer token");
                    AppError::Auth("Missing or invalid Authorization header".to_string())
                })?;
        let token = bearer.token().to_string();
        let verified = state.authenticator().verify(&token).await?;
        Ok(AuthSession {
            identity: verified.identity,
            token,
            expires_at: verified.expires_at,
        })
    }
}
