//! Departure handling: transport teardown and superseded sessions.

use tracing::{debug, info, instrument};

use super::presence::{PresenceRegistry, Superseded};
use crate::models::{ConnectionId, Identity, ServerEvent};

#[derive(Clone)]
pub struct DisconnectReconciler {
    presence: PresenceRegistry,
}

impl DisconnectReconciler {
    pub fn new(presence: PresenceRegistry) -> Self {
        Self { presence }
    }

    /// Unwind the connection's presence and tell the vacated room. Idempotent: a repeat
    /// call, or a call for a superseded connection, is a silent no-op.
    /// Returns true if a room was notified.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()))]
    pub async fn disconnect(&self, identity: &Identity, connection_id: &ConnectionId) -> bool {
        let Some(room) = self
            .presence
            .remove_connection(identity.user_id(), connection_id)
            .await
        else {
            debug!("nothing to reconcile");
            return false;
        };
        let notified = self
            .presence
            .broadcast(&room, ServerEvent::user_left(identity), None)
            .await;
        info!(room = %room, notified, "user left");
        true
    }

    /// Tell the room an older connection for `identity` has gone, then tell that
    /// connection it was replaced.
    pub async fn retract_superseded(&self, identity: &Identity, superseded: Superseded) {
        if let Some(room) = &superseded.room {
            self.presence
                .broadcast(room, ServerEvent::user_left(identity), Some(identity.user_id()))
                .await;
        }
        superseded.connection.deliver(ServerEvent::SessionSuperseded);
    }
}
