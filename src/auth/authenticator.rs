//! Connection authenticator: bearer credential -> identity, checked once per handshake.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use super::jwt::JwtSecret;
use crate::error::{AppError, AppResult, EventError};
use crate::models::{Identity, UserId};
use crate::repositories::RevocationList;

/// Why a credential was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("invalid token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("token has been invalidated")]
    Revoked,
    #[error("revocation check unavailable: {0}")]
    Unavailable(String),
}

/// A credential that passed every check.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConnectionAuthenticator {
    jwt: JwtSecret,
    revocations: Arc<dyn RevocationList>,
}

impl ConnectionAuthenticator {
    pub fn new(jwt: JwtSecret, revocations: Arc<dyn RevocationList>) -> Self {
        Self { jwt, revocations }
    }

    pub fn jwt(&self) -> &JwtSecret {
        &self.jwt
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, TokenRejection> {
        let claims = self.jwt.validate(token).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenRejection::Expired,
            _ => TokenRejection::Malformed,
        })?;

        match self.revocations.is_revoked(token).await {
            Ok(false) => {}
            Ok(true) => return Err(TokenRejection::Revoked),
            Err(e) => return Err(TokenRejection::Unavailable(e.to_string())),
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenRejection::Malformed)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenRejection::Malformed)?;

        Ok(VerifiedToken {
            identity: Identity::new(UserId(user_id), claims.email),
            expires_at,
        })
    }

    /// Handshake check. Every refusal collapses to `AuthenticationFailed` except a
    /// failed revocation lookup, which fails closed as an internal error.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, EventError> {
        match self.verify(token).await {
            Ok(verified) => Ok(verified.identity),
            Err(TokenRejection::Unavailable(reason)) => {
                error!(%reason, "revocation lookup failed during handshake");
                Err(EventError::InternalFailure)
            }
            Err(rejection) => {
                warn!(reason = %rejection, "handshake rejected");
                Err(EventError::AuthenticationFailed)
            }
        }
    }

    /// Invalidate a token until its natural expiry.
    pub async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        self.revocations.revoke(token, expires_at).await
    }
}

impl From<TokenRejection> for AppError {
    fn from(rejection: TokenRejection) -> Self {
        match rejection {
            TokenRejection::Unavailable(reason) => {
                AppError::Internal(anyhow::anyhow!("revocation check: {}", reason))
            }
            other => AppError::Auth(other.to_string()),
        }
    }
}
