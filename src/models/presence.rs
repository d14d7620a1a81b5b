//! Connection handles held by the presence registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::event::ServerEvent;

/// Opaque id of one physical connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a unique connection id.
    pub fn generate() -> Self {
        Self(format!("{}.{}", std::process::id(), Uuid::new_v4().as_simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound side of a connection: the registry delivers events through this.
/// The transport owns the socket; dropping every handle ends its writer.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Queue an event for the connection. Returns false if the connection is gone.
    pub fn deliver(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}
