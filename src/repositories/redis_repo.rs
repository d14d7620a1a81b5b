//! Redis-backed revocation list, shared by every process pointing at the same Redis.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::sync::Arc;
use tracing::debug;

use super::{token_fingerprint, RevocationList};
use crate::error::{AppError, AppResult};

const REVOKED_PREFIX: &str = "roomcast:revoked:";

fn revoked_key(token: &str) -> String {
    format!("{}{}", REVOKED_PREFIX, token_fingerprint(token))
}

/// Revoked tokens stored as `roomcast:revoked:<sha256>` keys that expire with the token.
#[derive(Clone)]
pub struct RedisRevocationList {
    client: Arc<redis::Client>,
}

impl RedisRevocationList {
    /// Create the list from a Redis URL.
    pub fn new(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

#[async_trait]
impl RevocationList for RedisRevocationList {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        let ttl = (expires_at - Utc::now()).num_seconds();
        if ttl <= 0 {
            // already expired; verification rejects it anyway
            return Ok(());
        }
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(revoked_key(token))
            .arg(1)
            .arg("EX")
            .arg(ttl)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(ttl, "token revoked");
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(revoked_key(token)).await?;
        Ok(exists)
    }
}
