//! Inbound and outbound WebSocket events.
//!
//! Frames are JSON objects tagged by `event` with a camelCase `data` payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::{Identity, OnlineUser, RoomId, UserId};
use super::message::{ChatMessage, MessageType};
use super::presence::ConnectionId;
use crate::error::EventError;

/// Event sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom { data: JoinRoomPayload },
    SendMessage { data: SendMessagePayload },
    TypingStart { data: TypingPayload },
    TypingStop { data: TypingPayload },
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub room_id: RoomId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub chat_id: Uuid,
    pub room_id: RoomId,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub room_id: RoomId,
    pub chat_id: Uuid,
}

/// Event sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    ConnectionEstablished { data: ConnectionEstablishedPayload },
    RoomJoined { data: RoomJoinedPayload },
    UserJoined { data: OnlineUser },
    UserLeft { data: OnlineUser },
    NewMessage { data: NewMessagePayload },
    UserTyping { data: UserTypingPayload },
    Error { data: ErrorPayload },
    SessionSuperseded,
    Pong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEstablishedPayload {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    pub room_id: RoomId,
    pub online_users: Vec<OnlineUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_label: String,
    pub content: String,
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingPayload {
    pub user_id: UserId,
    pub label: String,
    pub chat_id: Uuid,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl ServerEvent {
    pub fn connection_established(connection_id: ConnectionId, identity: &Identity) -> Self {
        ServerEvent::ConnectionEstablished {
            data: ConnectionEstablishedPayload {
                connection_id,
                user_id: identity.user_id(),
                label: identity.label().to_string(),
            },
        }
    }

    pub fn user_joined(identity: &Identity) -> Self {
        ServerEvent::UserJoined {
            data: identity.to_online_user(),
        }
    }

    pub fn user_left(identity: &Identity) -> Self {
        ServerEvent::UserLeft {
            data: identity.to_online_user(),
        }
    }

    pub fn new_message(message: &ChatMessage, room_id: &RoomId, sender: &Identity) -> Self {
        ServerEvent::NewMessage {
            data: NewMessagePayload {
                id: message.id,
                chat_id: message.chat_id,
                room_id: room_id.clone(),
                sender_id: message.sender_id,
                sender_label: sender.label().to_string(),
                content: message.content.clone(),
                message_type: message.message_type,
                timestamp: message.created_at,
            },
        }
    }

    pub fn user_typing(identity: &Identity, chat_id: Uuid, is_typing: bool) -> Self {
        ServerEvent::UserTyping {
            data: UserTypingPayload {
                user_id: identity.user_id(),
                label: identity.label().to_string(),
                chat_id,
                is_typing,
            },
        }
    }
}

impl From<&EventError> for ServerEvent {
    fn from(err: &EventError) -> Self {
        ServerEvent::Error {
            data: ErrorPayload {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}
