//! Postgres store: room membership lookup and message insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{ChatMessage, MessageType, NewMessage, RoomId, UserId};
use crate::repositories::{MembershipStore, MessageStore};

// ---- Messages ----

#[derive(Debug, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let message_type = row
            .message_type
            .parse::<MessageType>()
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        Ok(ChatMessage {
            id: row.id,
            chat_id: row.chat_id,
            sender_id: UserId(row.sender_id),
            content: row.content,
            message_type,
            created_at: row.created_at,
        })
    }
}

pub async fn message_create_in_room(
    pool: &DbPool,
    message: &NewMessage,
) -> AppResult<Option<MessageRow>> {
    let row = sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO messages (chat_id, sender_id, content, message_type)
        SELECT c.id, $2, $3, $4
        FROM chats c
        WHERE c.id = $1 AND c.room_id = $5
        RETURNING id, chat_id, sender_id, content, message_type, created_at
        "#,
    )
    .bind(message.chat_id)
    .bind(message.sender_id.0)
    .bind(&message.content)
    .bind(message.message_type.as_str())
    .bind(message.room_id.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ---- Room members ----

pub async fn room_member_is_active(
    pool: &DbPool,
    room_id: &str,
    user_id: Uuid,
) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM room_members
            WHERE room_id = $1 AND user_id = $2 AND is_active = true
        )
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Membership and message store over the relational schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    #[instrument(skip(self))]
    async fn is_active_member(&self, user_id: UserId, room_id: &RoomId) -> AppResult<bool> {
        room_member_is_active(&self.pool, room_id.as_str(), user_id.0).await
    }
}

#[async_trait]
impl MessageStore for PgStore {
    #[instrument(skip(self, message), fields(chat_id = %message.chat_id))]
    async fn create_message(&self, message: &NewMessage) -> AppResult<Option<ChatMessage>> {
        let Some(row) = message_create_in_room(&self.pool, message).await? else {
            debug!(room_id = %message.room_id, "chat not in room");
            return Ok(None);
        };
        ChatMessage::try_from(row).map(Some)
    }
}
