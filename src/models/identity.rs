//! Authenticated participants and the rooms they occupy.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Persistent user id (`users.id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Room id (`rooms.id`). Rooms are keyed by free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a connection is. Fixed at handshake and never changed for the connection's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: UserId,
    label: String,
}

impl Identity {
    pub fn new(user_id: UserId, label: impl Into<String>) -> Self {
        Self {
            user_id,
            label: label.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Human-readable display label (the user's email).
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn to_online_user(&self) -> OnlineUser {
        OnlineUser {
            user_id: self.user_id,
            label: self.label.clone(),
        }
    }
}

/// One entry of a room's online list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: UserId,
    pub label: String,
}
