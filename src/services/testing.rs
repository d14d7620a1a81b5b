//! In-memory collaborator doubles for unit tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ChatMessage, NewMessage, RoomId, UserId};
use crate::repositories::{MembershipStore, MessageStore};

#[derive(Clone, Default)]
pub struct StaticMembership {
    members: Arc<RwLock<HashSet<(UserId, RoomId)>>>,
    failing: Arc<AtomicBool>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, user_id: UserId, room: &RoomId) {
        self.members.write().await.insert((user_id, room.clone()));
    }

    pub async fn revoke(&self, user_id: UserId, room: &RoomId) {
        self.members.write().await.remove(&(user_id, room.clone()));
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MembershipStore for StaticMembership {
    async fn is_active_member(&self, user_id: UserId, room_id: &RoomId) -> AppResult<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("membership store offline")));
        }
        Ok(self.members.read().await.contains(&(user_id, room_id.clone())))
    }
}

#[derive(Clone, Default)]
pub struct RecordingMessages {
    chats: Arc<RwLock<HashMap<Uuid, RoomId>>>,
    stored: Arc<RwLock<Vec<ChatMessage>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_chat(&self, room: &RoomId) -> Uuid {
        let chat_id = Uuid::new_v4();
        self.chats.write().await.insert(chat_id, room.clone());
        chat_id
    }

    pub fn fail_writes(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub async fn stored(&self) -> Vec<ChatMessage> {
        self.stored.read().await.clone()
    }
}

#[async_trait]
impl MessageStore for RecordingMessages {
    async fn create_message(&self, message: &NewMessage) -> AppResult<Option<ChatMessage>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("message store offline")));
        }
        if self.chats.read().await.get(&message.chat_id) != Some(&message.room_id) {
            return Ok(None);
        }
        let saved = ChatMessage {
            id: Uuid::new_v4(),
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            message_type: message.message_type,
            created_at: Utc::now(),
        };
        self.stored.write().await.push(saved.clone());
        Ok(Some(saved))
    }
}
