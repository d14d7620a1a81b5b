//! Narrow interfaces to the external collaborators the real-time core consumes.

mod memory;
mod redis_repo;

pub use memory::InMemoryRevocationList;
pub use redis_repo::RedisRevocationList;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::AppResult;
use crate::models::{ChatMessage, NewMessage, RoomId, UserId};

/// Persisted room membership lookup.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// True if the user holds an active membership in the room.
    async fn is_active_member(&self, user_id: UserId, room_id: &RoomId) -> AppResult<bool>;
}

/// Persisted chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert the message. `Ok(None)` means the chat does not belong to the room.
    async fn create_message(&self, message: &NewMessage) -> AppResult<Option<ChatMessage>>;
}

/// Tokens invalidated before their natural expiry (logout).
#[async_trait]
pub trait RevocationList: Send + Sync {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> AppResult<()>;

    async fn is_revoked(&self, token: &str) -> AppResult<bool>;
}

/// Revocation entries are keyed by digest so bearer tokens are never stored.
pub(crate) fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
