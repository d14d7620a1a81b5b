//! Shared fixtures: in-memory collaborators and an app state wired to them.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use roomcast::auth::{ConnectionAuthenticator, JwtSecret};
use roomcast::error::AppResult;
use roomcast::models::{ChatMessage, Identity, NewMessage, RoomId, UserId};
use roomcast::repositories::{InMemoryRevocationList, MembershipStore, MessageStore};
use roomcast::{AppState, Realtime};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

#[derive(Clone, Default)]
pub struct Memberships(Arc<Mutex<HashSet<(UserId, RoomId)>>>);

impl Memberships {
    pub fn grant(&self, user: &Identity, room: &RoomId) {
        self.0.lock().unwrap().insert((user.user_id(), room.clone()));
    }
}

#[async_trait]
impl MembershipStore for Memberships {
    async fn is_active_member(&self, user_id: UserId, room_id: &RoomId) -> AppResult<bool> {
        Ok(self.0.lock().unwrap().contains(&(user_id, room_id.clone())))
    }
}

#[derive(Clone, Default)]
pub struct Messages {
    chats: Arc<Mutex<HashMap<Uuid, RoomId>>>,
    stored: Arc<Mutex<Vec<Uuid>>>,
    ack_delay: Arc<Mutex<Option<Duration>>>,
}

impl Messages {
    pub fn add_chat(&self, room: &RoomId) -> Uuid {
        let id = Uuid::new_v4();
        self.chats.lock().unwrap().insert(id, room.clone());
        id
    }

    /// Commit immediately, then hold the acknowledgement back for `delay`.
    pub fn delay_acks(&self, delay: Duration) {
        *self.ack_delay.lock().unwrap() = Some(delay);
    }

    pub fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageStore for Messages {
    async fn create_message(&self, message: &NewMessage) -> AppResult<Option<ChatMessage>> {
        if self.chats.lock().unwrap().get(&message.chat_id) != Some(&message.room_id) {
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
        self.stored.lock().unwrap().push(saved.id);

        let delay = *self.ack_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Some(saved))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub memberships: Memberships,
    pub messages: Messages,
}

impl TestApp {
    pub fn new() -> Self {
        let memberships = Memberships::default();
        let messages = Messages::default();
        let authenticator = ConnectionAuthenticator::new(
            JwtSecret::new(JWT_SECRET.to_string(), 3600),
            Arc::new(InMemoryRevocationList::new()),
        );
        let realtime = Realtime::new(
            Arc::new(memberships.clone()),
            Arc::new(messages.clone()),
            1000,
        );
        Self {
            state: AppState::new(authenticator, realtime),
            memberships,
            messages,
        }
    }

    pub fn user(&self, label: &str) -> (Identity, String) {
        let identity = Identity::new(UserId(Uuid::new_v4()), label);
        let token = self
            .state
            .authenticator()
            .jwt()
            .issue(&identity)
            .expect("issue token");
        (identity, token)
    }
}
